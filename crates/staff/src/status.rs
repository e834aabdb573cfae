//! Staff status lifecycle and the status-transition ledger entry.

use chrono::{DateTime, NaiveDate, Utc};
use core::str::FromStr;
use serde::{Deserialize, Serialize};

use forgehr_core::{HistoryId, StaffError, StaffId, StaffResult, TenantId, UserId};

/// Business status of a staff record.
///
/// The transition table is deliberately permissive: every status may
/// transition to every other status, including itself. A `Terminated` record
/// can be reactivated. This mirrors the behavior of the system this module
/// replaces; tightening it into a stricter state machine would be a
/// behavioral change, not a fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffStatus {
    Active,
    Inactive,
    OnLeave,
    Terminated,
}

impl StaffStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaffStatus::Active => "active",
            StaffStatus::Inactive => "inactive",
            StaffStatus::OnLeave => "on_leave",
            StaffStatus::Terminated => "terminated",
        }
    }

    /// Whether this status stamps a termination date on the record.
    ///
    /// "Terminal" only in the sense of the termination-date side effect; it
    /// does not block further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StaffStatus::Terminated)
    }
}

impl core::fmt::Display for StaffStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StaffStatus {
    type Err = StaffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(StaffStatus::Active),
            "inactive" => Ok(StaffStatus::Inactive),
            "on_leave" => Ok(StaffStatus::OnLeave),
            "terminated" => Ok(StaffStatus::Terminated),
            other => Err(StaffError::invalid_status(other)),
        }
    }
}

/// Requested status change (input to `UpdateStatus`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub new_status: StaffStatus,
    /// Human-readable reason; required.
    pub reason: String,
    /// Date the change takes effect; required.
    pub effective_date: Option<NaiveDate>,
}

impl StatusChange {
    /// Validate the change before any transaction opens.
    pub fn validate(&self) -> StaffResult<NaiveDate> {
        if self.reason.trim().is_empty() {
            return Err(StaffError::ReasonRequired);
        }
        self.effective_date.ok_or(StaffError::EffectiveDateRequired)
    }
}

/// Immutable audit record of one status transition.
///
/// Entries are append-only and written in the same transaction as the status
/// field update, so a reader never observes a status value whose history
/// entry is missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub id: HistoryId,
    pub tenant_id: TenantId,
    pub staff_id: StaffId,
    /// Empty only for the first transition of a record.
    pub old_status: Option<StaffStatus>,
    pub new_status: StaffStatus,
    pub reason: String,
    pub effective_date: NaiveDate,
    pub changed_by: UserId,
    pub changed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            StaffStatus::Active,
            StaffStatus::Inactive,
            StaffStatus::OnLeave,
            StaffStatus::Terminated,
        ] {
            assert_eq!(status.as_str().parse::<StaffStatus>().unwrap(), status);
        }
    }

    #[test]
    fn status_parse_is_case_insensitive() {
        assert_eq!("Active".parse::<StaffStatus>().unwrap(), StaffStatus::Active);
        assert_eq!("ON_LEAVE".parse::<StaffStatus>().unwrap(), StaffStatus::OnLeave);
    }

    #[test]
    fn unknown_status_is_rejected() {
        let err = "retired".parse::<StaffStatus>().unwrap_err();
        match err {
            StaffError::InvalidStatus(s) => assert_eq!(s, "retired"),
            _ => panic!("Expected InvalidStatus error"),
        }
    }

    #[test]
    fn only_terminated_is_terminal() {
        assert!(StaffStatus::Terminated.is_terminal());
        assert!(!StaffStatus::Active.is_terminal());
        assert!(!StaffStatus::Inactive.is_terminal());
        assert!(!StaffStatus::OnLeave.is_terminal());
    }

    #[test]
    fn status_change_requires_reason() {
        let change = StatusChange {
            new_status: StaffStatus::OnLeave,
            reason: "   ".to_string(),
            effective_date: Some(NaiveDate::from_ymd_opt(2026, 2, 1).unwrap()),
        };
        assert_eq!(change.validate().unwrap_err(), StaffError::ReasonRequired);
    }

    #[test]
    fn status_change_requires_effective_date() {
        let change = StatusChange {
            new_status: StaffStatus::OnLeave,
            reason: "Medical".to_string(),
            effective_date: None,
        };
        assert_eq!(
            change.validate().unwrap_err(),
            StaffError::EffectiveDateRequired
        );
    }

    #[test]
    fn valid_status_change_yields_effective_date() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        let change = StatusChange {
            new_status: StaffStatus::OnLeave,
            reason: "Medical".to_string(),
            effective_date: Some(date),
        };
        assert_eq!(change.validate().unwrap(), date);
    }
}
