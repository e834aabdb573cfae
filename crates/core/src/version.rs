//! Optimistic concurrency expectations for record updates.

use crate::error::{StaffError, StaffResult};

/// Optimistic concurrency expectation for a staff record update.
///
/// Updates are issued as a single conditional write against the stored
/// version counter; "zero rows affected" is the conflict signal. There is no
/// pre-read-then-write — that would reintroduce the race this exists to close.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Skip version checking entirely.
    ///
    /// This mirrors the zero/unset sentinel of the original API: callers that
    /// don't supply a version bypass the optimistic check. Whether that is
    /// intentional API design or an oversight is an open product question;
    /// the behavior is preserved as-is.
    Any,
    /// Require the record to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    /// Interpret a raw caller-supplied version, treating zero as the
    /// check-bypass sentinel.
    pub fn from_raw(version: u64) -> Self {
        if version == 0 {
            ExpectedVersion::Any
        } else {
            ExpectedVersion::Exact(version)
        }
    }

    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }

    pub fn check(self, actual: u64) -> StaffResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(StaffError::conflict(format!(
                "optimistic concurrency check failed (expected: {self:?}, actual: {actual})"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_raw_version_means_any() {
        assert_eq!(ExpectedVersion::from_raw(0), ExpectedVersion::Any);
        assert_eq!(ExpectedVersion::from_raw(3), ExpectedVersion::Exact(3));
    }

    #[test]
    fn any_matches_every_version() {
        assert!(ExpectedVersion::Any.matches(0));
        assert!(ExpectedVersion::Any.matches(42));
        assert!(ExpectedVersion::Any.check(7).is_ok());
    }

    #[test]
    fn exact_matches_only_itself() {
        assert!(ExpectedVersion::Exact(3).matches(3));
        assert!(!ExpectedVersion::Exact(3).matches(4));
        let err = ExpectedVersion::Exact(3).check(4).unwrap_err();
        assert!(matches!(err, StaffError::Conflict(_)));
    }
}
