//! Append-only status-transition ledger.

use chrono::{DateTime, Utc};

use forgehr_core::{HistoryId, StaffError, StaffId, StaffResult, TenantId, UserId};
use forgehr_staff::{StaffRecord, StatusChange, StatusHistoryEntry};

use crate::uow::UnitOfWork;

/// Writes one immutable history entry per status transition, atomically with
/// the record's status field.
///
/// Within the caller's transaction the ledger reads the current status as
/// `old_status` under a write-intent lock on the record, appends the history
/// entry, then updates the record (status, termination stamp for terminal
/// statuses, version bump). The lock serializes concurrent transitions for
/// the same record: without it, two transitions could read the same
/// `old_status` and the later committer would write a stale chain link.
/// History insert and status update commit together or not at all, so a
/// reader never observes a status whose corresponding entry is missing.
///
/// The transition table is flat: any status may follow any other, including
/// itself. A `Terminated` record can be reactivated. No adjacency restriction
/// is enforced on purpose.
pub struct StatusLedger;

impl StatusLedger {
    /// Record a status transition for the given staff record.
    pub fn transition<U>(
        uow: &mut U,
        tenant_id: TenantId,
        staff_id: StaffId,
        change: &StatusChange,
        actor: UserId,
        now: DateTime<Utc>,
    ) -> StaffResult<(StaffRecord, StatusHistoryEntry)>
    where
        U: UnitOfWork + ?Sized,
    {
        let effective_date = change.validate()?;

        let current = uow
            .load_staff_for_update(tenant_id, staff_id)?
            .ok_or_else(StaffError::not_found)?;

        let entry = StatusHistoryEntry {
            id: HistoryId::new(),
            tenant_id,
            staff_id,
            old_status: Some(current.status),
            new_status: change.new_status,
            reason: change.reason.clone(),
            effective_date,
            changed_by: actor,
            changed_at: now,
        };
        uow.append_history(&entry)?;

        let updated = uow
            .update_status(tenant_id, staff_id, change.new_status, effective_date, actor, now)?
            .ok_or_else(StaffError::not_found)?;

        Ok((updated, entry))
    }
}
