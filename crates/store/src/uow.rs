//! Transactional storage contracts.
//!
//! Two traits split the storage engine along its transaction boundary:
//!
//! - [`UnitOfWork`] is the row-level surface available **inside** an open
//!   transaction: counter reads with write intent, conditional staff writes,
//!   append-only history inserts.
//! - [`StaffStore`] opens transactions ([`StaffStore::run_atomic`]) and
//!   serves the read-only paths that deliberately run outside one.
//!
//! `run_atomic` is the transaction coordinator of the module: every write a
//! unit of work performs becomes visible atomically, and any error raised
//! inside the closure — validation, conflict, storage — rolls the whole unit
//! back, counter increments included. The coordinator retries nothing; errors
//! propagate verbatim after rollback completes.
//!
//! ## Implementations
//!
//! - `InMemoryStaffStore`: mutex-serialized working-copy transactions, for
//!   tests and development.
//! - `PostgresStaffStore`: real transactions over a sqlx connection pool,
//!   with `FOR UPDATE` row-intent locks on the sequence counter.

use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;

use forgehr_core::{ExpectedVersion, StaffId, StaffResult, TenantId, UserId};
use forgehr_staff::{StaffRecord, StaffStatus, StaffUpdate, StatusHistoryEntry};

/// Row-level operations available inside an open transaction.
///
/// Implementations must ensure that *nothing* performed through a unit of
/// work is visible to other transactions until `run_atomic` commits.
pub trait UnitOfWork {
    /// Atomically increment and return the sequence counter for
    /// `(tenant, prefix)`, creating the row at 1 if it does not exist yet.
    ///
    /// One statement, one row lock: the write-intent lock taken here is held
    /// until the surrounding transaction ends, so concurrent allocators for
    /// the same pair serialize — including two first-ever allocations racing
    /// to create the row.
    fn increment_counter(&mut self, tenant_id: TenantId, prefix: &str) -> StaffResult<u64>;

    /// Insert a freshly created staff record.
    ///
    /// Surfaces a tenant-scoped employee-code uniqueness violation as
    /// `StaffError::DuplicateCode`.
    fn insert_staff(&mut self, record: &StaffRecord) -> StaffResult<()>;

    /// Load a staff record within the transaction.
    fn load_staff(&mut self, tenant_id: TenantId, staff_id: StaffId)
    -> StaffResult<Option<StaffRecord>>;

    /// Load a staff record with a write-intent lock, held until the
    /// surrounding transaction ends.
    ///
    /// Read-then-write sequences that must observe a stable record (the
    /// status ledger's old-status read) go through here; concurrent writers
    /// of the same record serialize on the lock.
    fn load_staff_for_update(
        &mut self,
        tenant_id: TenantId,
        staff_id: StaffId,
    ) -> StaffResult<Option<StaffRecord>>;

    /// Single conditional write: apply `changes` and bump the version by 1,
    /// but only if the stored version matches `expected`.
    ///
    /// Returns `None` when zero rows were affected — the caller cannot tell
    /// a missing row from a version mismatch here and must re-read to
    /// distinguish them. No pre-read happens inside this call; that would
    /// reintroduce the lost-update race.
    fn update_staff_checked(
        &mut self,
        tenant_id: TenantId,
        staff_id: StaffId,
        changes: &StaffUpdate,
        expected: ExpectedVersion,
        actor: UserId,
        now: DateTime<Utc>,
    ) -> StaffResult<Option<StaffRecord>>;

    /// Update the status field (and termination stamp for terminal statuses),
    /// bumping the version by 1. Returns `None` if the record does not exist.
    fn update_status(
        &mut self,
        tenant_id: TenantId,
        staff_id: StaffId,
        new_status: StaffStatus,
        effective_date: NaiveDate,
        actor: UserId,
        now: DateTime<Utc>,
    ) -> StaffResult<Option<StaffRecord>>;

    /// Append one immutable status-history entry.
    fn append_history(&mut self, entry: &StatusHistoryEntry) -> StaffResult<()>;
}

/// Transaction coordinator + read-only access to the staff store.
pub trait StaffStore: Send + Sync {
    /// The unit-of-work type handed to `run_atomic` closures.
    type Uow<'a>: UnitOfWork
    where
        Self: 'a;

    /// Run `work` inside a single transaction.
    ///
    /// All-or-nothing: on `Ok` every write commits together; on `Err` every
    /// write rolls back, including sequence-counter increments made earlier
    /// in the same unit of work. The error is returned unchanged.
    fn run_atomic<T>(
        &self,
        work: impl FnOnce(&mut Self::Uow<'_>) -> StaffResult<T>,
    ) -> StaffResult<T>;

    /// Read the counter's current value without locking or incrementing.
    ///
    /// Returns 0 if no counter row exists. Advisory only: not safe against
    /// racing allocations, by design.
    fn peek_last_sequence(&self, tenant_id: TenantId, prefix: &str) -> StaffResult<u64>;

    /// Read a staff record outside any transaction.
    fn get_staff(&self, tenant_id: TenantId, staff_id: StaffId)
    -> StaffResult<Option<StaffRecord>>;

    /// Read the status-transition history for a record, in insertion order.
    fn history_for(
        &self,
        tenant_id: TenantId,
        staff_id: StaffId,
    ) -> StaffResult<Vec<StatusHistoryEntry>>;
}

impl<S> StaffStore for Arc<S>
where
    S: StaffStore + ?Sized + 'static,
{
    type Uow<'a>
        = S::Uow<'a>
    where
        Self: 'a;

    fn run_atomic<T>(
        &self,
        work: impl FnOnce(&mut Self::Uow<'_>) -> StaffResult<T>,
    ) -> StaffResult<T> {
        (**self).run_atomic(work)
    }

    fn peek_last_sequence(&self, tenant_id: TenantId, prefix: &str) -> StaffResult<u64> {
        (**self).peek_last_sequence(tenant_id, prefix)
    }

    fn get_staff(
        &self,
        tenant_id: TenantId,
        staff_id: StaffId,
    ) -> StaffResult<Option<StaffRecord>> {
        (**self).get_staff(tenant_id, staff_id)
    }

    fn history_for(
        &self,
        tenant_id: TenantId,
        staff_id: StaffId,
    ) -> StaffResult<Vec<StatusHistoryEntry>> {
        (**self).history_for(tenant_id, staff_id)
    }
}
