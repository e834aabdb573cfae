//! Staff operation surface (application-level orchestration).
//!
//! `StaffService` is what the (out-of-scope) request layer calls into. It
//! validates inputs before any transaction opens, then composes the engine
//! pieces inside a single `run_atomic` call per operation:
//!
//! - **Create** = sequence allocation + record insert, one transaction, so a
//!   failed insert (e.g. a duplicate employee code) rolls the counter
//!   increment back and committed callers stay gap-free.
//! - **Update** = one conditional write via `ConcurrencyGuard`.
//! - **UpdateStatus** = `StatusLedger::transition`, one transaction.
//! - **PreviewNextCode** = advisory counter read, no transaction, no
//!   allocation.
//!
//! Errors propagate verbatim; conflicts are for the caller to resolve by
//! re-reading and resubmitting.

use chrono::Utc;

use forgehr_core::{ExpectedVersion, StaffError, StaffId, StaffResult, TenantId, UserId};
use forgehr_staff::{
    EmployeeCode, NewStaffRecord, StaffRecord, StaffUpdate, StatusChange, StatusHistoryEntry,
    validate_prefix,
};

use crate::guard::ConcurrencyGuard;
use crate::ledger::StatusLedger;
use crate::sequence::SequenceAllocator;
use crate::uow::{StaffStore, UnitOfWork};

/// Tenant-scoped staff record operations over a [`StaffStore`].
pub struct StaffService<S: StaffStore> {
    store: S,
}

impl<S: StaffStore> StaffService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Create a staff record, minting its employee code.
    ///
    /// Allocation and insert share one transaction; any failure rolls both
    /// back.
    pub fn create(
        &self,
        tenant_id: TenantId,
        prefix: &str,
        fields: NewStaffRecord,
        actor: UserId,
    ) -> StaffResult<StaffRecord> {
        if tenant_id.is_nil() {
            return Err(StaffError::TenantRequired);
        }
        validate_prefix(prefix)?;
        fields.validate()?;

        let record = self.store.run_atomic(|uow| {
            let sequence = SequenceAllocator::allocate(uow, tenant_id, prefix)?;
            let code = EmployeeCode::format(prefix, sequence);
            let record = StaffRecord::create(
                StaffId::new(),
                tenant_id,
                code,
                fields.clone(),
                actor,
                Utc::now(),
            );
            uow.insert_staff(&record)?;
            Ok(record)
        })?;

        tracing::info!(
            tenant_id = %tenant_id,
            staff_id = %record.id,
            employee_code = %record.employee_code,
            "staff record created"
        );
        Ok(record)
    }

    /// Apply a partial field update under optimistic concurrency control.
    ///
    /// `expected = ExpectedVersion::Any` bypasses the version check (the
    /// unset-version sentinel); the update still bumps the version by 1.
    pub fn update(
        &self,
        tenant_id: TenantId,
        staff_id: StaffId,
        changes: StaffUpdate,
        expected: ExpectedVersion,
        actor: UserId,
    ) -> StaffResult<StaffRecord> {
        changes.validate()?;

        let record = self.store.run_atomic(|uow| {
            ConcurrencyGuard::conditional_update(
                uow,
                tenant_id,
                staff_id,
                &changes,
                expected,
                actor,
                Utc::now(),
            )
        })?;

        tracing::debug!(
            tenant_id = %tenant_id,
            staff_id = %staff_id,
            version = record.version,
            "staff record updated"
        );
        Ok(record)
    }

    /// Change a record's status, appending one ledger entry atomically with
    /// the status field update.
    pub fn update_status(
        &self,
        tenant_id: TenantId,
        staff_id: StaffId,
        change: StatusChange,
        actor: UserId,
    ) -> StaffResult<(StaffRecord, StatusHistoryEntry)> {
        // Resolved before the transaction opens; transition re-checks.
        change.validate()?;

        let (record, entry) = self.store.run_atomic(|uow| {
            StatusLedger::transition(uow, tenant_id, staff_id, &change, actor, Utc::now())
        })?;

        tracing::info!(
            tenant_id = %tenant_id,
            staff_id = %staff_id,
            old_status = ?entry.old_status,
            new_status = %entry.new_status,
            "staff status changed"
        );
        Ok((record, entry))
    }

    /// The code that *would* be issued next for `(tenant, prefix)`.
    ///
    /// Read-only and advisory: it does not increment the counter and is not
    /// safe against racing creates — two previews under concurrent creates
    /// may show the same value. Matches the non-binding preview endpoint of
    /// the surrounding system.
    pub fn preview_next_code(&self, tenant_id: TenantId, prefix: &str) -> StaffResult<EmployeeCode> {
        validate_prefix(prefix)?;
        let last = self.store.peek_last_sequence(tenant_id, prefix)?;
        Ok(EmployeeCode::format(prefix, last + 1))
    }

    /// Fetch a record by id.
    pub fn get(&self, tenant_id: TenantId, staff_id: StaffId) -> StaffResult<StaffRecord> {
        self.store
            .get_staff(tenant_id, staff_id)?
            .ok_or_else(StaffError::not_found)
    }

    /// Fetch the status-transition history for a record, oldest first.
    pub fn history(
        &self,
        tenant_id: TenantId,
        staff_id: StaffId,
    ) -> StaffResult<Vec<StatusHistoryEntry>> {
        self.store.history_for(tenant_id, staff_id)
    }
}
