//! Optimistic concurrency control for staff record updates.

use chrono::{DateTime, Utc};

use forgehr_core::{ExpectedVersion, StaffError, StaffId, StaffResult, TenantId, UserId};
use forgehr_staff::{StaffRecord, StaffUpdate};

use crate::uow::UnitOfWork;

/// Compare-and-swap update protocol over the record's version counter.
///
/// The guard never blocks on a lock: it issues one conditional write and
/// either succeeds (version bumped by exactly 1) or reports the failure. If
/// two callers read the same record at version V and both submit with
/// `expected = Exact(V)`, at most one wins; the loser gets
/// `StaffError::Conflict` and must re-read and resubmit. Retry is the
/// caller's responsibility — nothing here retries.
pub struct ConcurrencyGuard;

impl ConcurrencyGuard {
    /// Apply `changes` to the record if the stored version matches
    /// `expected`, returning the updated record.
    ///
    /// `ExpectedVersion::Any` bypasses the version check entirely (the
    /// zero/unset sentinel escape hatch); the write still bumps the version.
    ///
    /// Zero rows affected means either the record is gone or the version
    /// moved; a re-read inside the same transaction distinguishes `NotFound`
    /// from `Conflict`.
    pub fn conditional_update<U>(
        uow: &mut U,
        tenant_id: TenantId,
        staff_id: StaffId,
        changes: &StaffUpdate,
        expected: ExpectedVersion,
        actor: UserId,
        now: DateTime<Utc>,
    ) -> StaffResult<StaffRecord>
    where
        U: UnitOfWork + ?Sized,
    {
        if let Some(updated) =
            uow.update_staff_checked(tenant_id, staff_id, changes, expected, actor, now)?
        {
            return Ok(updated);
        }

        match uow.load_staff(tenant_id, staff_id)? {
            None => Err(StaffError::not_found()),
            Some(current) => Err(StaffError::conflict(format!(
                "version mismatch on staff {staff_id}: expected {expected:?}, stored {}",
                current.version
            ))),
        }
    }
}
