//! Opt-in bounded retry for optimistic-concurrency conflicts.
//!
//! The core never retries on its own; every conflict surfaces to the caller.
//! Callers that want refresh-and-retry semantics can wrap their re-read +
//! resubmit loop in this helper instead of hand-rolling the bound.

use forgehr_core::{StaffError, StaffResult};

/// Run `op` up to `max_attempts` times, retrying only on
/// [`StaffError::Conflict`].
///
/// `op` must itself re-read current state on each attempt (it receives the
/// 1-based attempt number). Any non-conflict error, and the conflict from the
/// final attempt, are returned unchanged.
pub fn retry_on_conflict<T, F>(max_attempts: u32, mut op: F) -> StaffResult<T>
where
    F: FnMut(u32) -> StaffResult<T>,
{
    assert!(max_attempts > 0, "max_attempts must be at least 1");

    let mut attempt = 1;
    loop {
        match op(attempt) {
            Err(StaffError::Conflict(reason)) if attempt < max_attempts => {
                tracing::debug!(attempt, %reason, "retrying after version conflict");
                attempt += 1;
            }
            other => return other,
        }
    }
}
