//! Per-tenant, per-prefix transactional sequence allocation.

use forgehr_core::{StaffError, StaffResult, TenantId};
use forgehr_staff::validate_prefix;

use crate::uow::UnitOfWork;

/// Mints the next integer in a `(tenant, prefix)` monotonic sequence.
///
/// The counter is a durable row, never an in-process value, so uniqueness
/// holds across concurrently running instances of the service. Increments
/// ride the caller's transaction: if the caller rolls back, so does the
/// increment, which is what keeps committed callers gap-free — under any set
/// of concurrent transactions that allocate for the same pair and commit,
/// the issued values are exactly `{1, 2, ..., N}`.
pub struct SequenceAllocator;

impl SequenceAllocator {
    /// Allocate the next sequence number for `(tenant, prefix)`.
    ///
    /// Must be called from within an active unit of work. The increment is a
    /// single atomic statement that locks the counter row, so concurrent
    /// allocators for the same pair serialize here and nowhere else — the
    /// first-ever allocation included, where there is no row to lock yet and
    /// a read-then-insert would let two callers both mint 1.
    ///
    /// Lazily created: the first allocation for a pair returns 1.
    pub fn allocate<U>(uow: &mut U, tenant_id: TenantId, prefix: &str) -> StaffResult<u64>
    where
        U: UnitOfWork + ?Sized,
    {
        if tenant_id.is_nil() {
            return Err(StaffError::TenantRequired);
        }
        validate_prefix(prefix)?;

        uow.increment_counter(tenant_id, prefix)
    }
}
