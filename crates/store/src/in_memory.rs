//! In-memory staff store.
//!
//! Intended for tests/dev. Transactions are serialized through a mutex: a
//! unit of work operates on a cloned working copy of the state, and commit is
//! the swap back into the shared state. Rollback is simply dropping the copy,
//! which gives the same all-or-nothing semantics as a database transaction —
//! a failed closure leaves no trace, counter increments included.

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use forgehr_core::{ExpectedVersion, StaffError, StaffId, StaffResult, TenantId, UserId};
use forgehr_staff::{StaffRecord, StaffStatus, StaffUpdate, StatusHistoryEntry};

use crate::uow::{StaffStore, UnitOfWork};

#[derive(Debug, Clone, Default)]
struct StoreState {
    // Last issued sequence per (tenant, prefix).
    counters: HashMap<(TenantId, String), u64>,
    staff: HashMap<(TenantId, StaffId), StaffRecord>,
    history: Vec<StatusHistoryEntry>,
}

/// In-memory implementation of [`StaffStore`].
#[derive(Debug, Default)]
pub struct InMemoryStaffStore {
    state: Mutex<StoreState>,
}

impl InMemoryStaffStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Working copy of the store state for one transaction.
#[derive(Debug)]
pub struct InMemoryUow {
    state: StoreState,
}

impl UnitOfWork for InMemoryUow {
    fn increment_counter(&mut self, tenant_id: TenantId, prefix: &str) -> StaffResult<u64> {
        // The surrounding mutex already serializes transactions, which is the
        // in-memory stand-in for the row-intent lock.
        let next = self
            .state
            .counters
            .entry((tenant_id, prefix.to_string()))
            .and_modify(|last| *last += 1)
            .or_insert(1);
        Ok(*next)
    }

    fn insert_staff(&mut self, record: &StaffRecord) -> StaffResult<()> {
        let key = (record.tenant_id, record.id);
        if self.state.staff.contains_key(&key) {
            return Err(StaffError::conflict(format!(
                "staff {} already exists",
                record.id
            )));
        }
        // Tenant-scoped uniqueness of the employee code, as the unique index
        // enforces in Postgres.
        let duplicate = self.state.staff.values().any(|existing| {
            existing.tenant_id == record.tenant_id
                && existing.employee_code == record.employee_code
        });
        if duplicate {
            return Err(StaffError::duplicate_code(record.employee_code.as_str()));
        }
        self.state.staff.insert(key, record.clone());
        Ok(())
    }

    fn load_staff(
        &mut self,
        tenant_id: TenantId,
        staff_id: StaffId,
    ) -> StaffResult<Option<StaffRecord>> {
        Ok(self.state.staff.get(&(tenant_id, staff_id)).cloned())
    }

    fn load_staff_for_update(
        &mut self,
        tenant_id: TenantId,
        staff_id: StaffId,
    ) -> StaffResult<Option<StaffRecord>> {
        // Whole transactions are mutex-serialized, so the plain read already
        // has the stability the row lock provides in Postgres.
        self.load_staff(tenant_id, staff_id)
    }

    fn update_staff_checked(
        &mut self,
        tenant_id: TenantId,
        staff_id: StaffId,
        changes: &StaffUpdate,
        expected: ExpectedVersion,
        actor: UserId,
        now: DateTime<Utc>,
    ) -> StaffResult<Option<StaffRecord>> {
        let Some(record) = self.state.staff.get_mut(&(tenant_id, staff_id)) else {
            return Ok(None);
        };
        if !expected.matches(record.version) {
            // Zero rows affected; the caller distinguishes conflict from
            // not-found with a re-read.
            return Ok(None);
        }
        record.apply_update(changes, actor, now);
        Ok(Some(record.clone()))
    }

    fn update_status(
        &mut self,
        tenant_id: TenantId,
        staff_id: StaffId,
        new_status: StaffStatus,
        effective_date: NaiveDate,
        actor: UserId,
        now: DateTime<Utc>,
    ) -> StaffResult<Option<StaffRecord>> {
        let Some(record) = self.state.staff.get_mut(&(tenant_id, staff_id)) else {
            return Ok(None);
        };
        record.apply_status(new_status, effective_date, actor, now);
        Ok(Some(record.clone()))
    }

    fn append_history(&mut self, entry: &StatusHistoryEntry) -> StaffResult<()> {
        self.state.history.push(entry.clone());
        Ok(())
    }
}

impl StaffStore for InMemoryStaffStore {
    type Uow<'a> = InMemoryUow;

    fn run_atomic<T>(
        &self,
        work: impl FnOnce(&mut Self::Uow<'_>) -> StaffResult<T>,
    ) -> StaffResult<T> {
        let mut guard = self
            .state
            .lock()
            .map_err(|_| StaffError::storage("lock poisoned"))?;

        let mut uow = InMemoryUow {
            state: guard.clone(),
        };
        let value = work(&mut uow)?;

        // Commit: swap the working copy in. On the error path above the copy
        // is dropped and the shared state is untouched.
        *guard = uow.state;
        Ok(value)
    }

    fn peek_last_sequence(&self, tenant_id: TenantId, prefix: &str) -> StaffResult<u64> {
        let guard = self
            .state
            .lock()
            .map_err(|_| StaffError::storage("lock poisoned"))?;
        Ok(guard
            .counters
            .get(&(tenant_id, prefix.to_string()))
            .copied()
            .unwrap_or(0))
    }

    fn get_staff(
        &self,
        tenant_id: TenantId,
        staff_id: StaffId,
    ) -> StaffResult<Option<StaffRecord>> {
        let guard = self
            .state
            .lock()
            .map_err(|_| StaffError::storage("lock poisoned"))?;
        Ok(guard.staff.get(&(tenant_id, staff_id)).cloned())
    }

    fn history_for(
        &self,
        tenant_id: TenantId,
        staff_id: StaffId,
    ) -> StaffResult<Vec<StatusHistoryEntry>> {
        let guard = self
            .state
            .lock()
            .map_err(|_| StaffError::storage("lock poisoned"))?;
        Ok(guard
            .history
            .iter()
            .filter(|e| e.tenant_id == tenant_id && e.staff_id == staff_id)
            .cloned()
            .collect())
    }
}
