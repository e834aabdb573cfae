//! The staff record entity and its mutation inputs.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use forgehr_core::{StaffError, StaffId, StaffResult, TenantId, UserId};

use crate::code::EmployeeCode;
use crate::status::StaffStatus;

/// A tenant-scoped HR staff record.
///
/// The record is the unit of optimistic concurrency: `version` starts at 1
/// and increases by exactly 1 on every successful mutation. The employee code
/// is minted once at creation and unique within the tenant. Records are never
/// hard-deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffRecord {
    pub id: StaffId,
    pub tenant_id: TenantId,
    pub employee_code: EmployeeCode,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub department: Option<String>,
    pub job_title: Option<String>,
    pub status: StaffStatus,
    pub version: u64,
    /// Stamped when the record transitions to `Terminated`; not cleared on
    /// reactivation.
    pub termination_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: UserId,
    pub updated_by: UserId,
}

impl StaffRecord {
    /// Build a freshly created record at version 1 with status `Active`.
    pub fn create(
        id: StaffId,
        tenant_id: TenantId,
        employee_code: EmployeeCode,
        fields: NewStaffRecord,
        actor: UserId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            tenant_id,
            employee_code,
            first_name: fields.first_name,
            last_name: fields.last_name,
            email: fields.email,
            department: fields.department,
            job_title: fields.job_title,
            status: StaffStatus::Active,
            version: 1,
            termination_date: None,
            created_at: now,
            updated_at: now,
            created_by: actor,
            updated_by: actor,
        }
    }

    /// Apply a partial field update in memory: absent fields keep their
    /// current value, version bumps by exactly 1.
    ///
    /// The Postgres store expresses the same semantics as a single
    /// conditional `UPDATE`; the in-memory store goes through here.
    pub fn apply_update(&mut self, changes: &StaffUpdate, actor: UserId, now: DateTime<Utc>) {
        if let Some(first_name) = &changes.first_name {
            self.first_name = first_name.clone();
        }
        if let Some(last_name) = &changes.last_name {
            self.last_name = last_name.clone();
        }
        if let Some(email) = &changes.email {
            self.email = Some(email.clone());
        }
        if let Some(department) = &changes.department {
            self.department = Some(department.clone());
        }
        if let Some(job_title) = &changes.job_title {
            self.job_title = Some(job_title.clone());
        }
        self.version += 1;
        self.updated_at = now;
        self.updated_by = actor;
    }

    /// Apply a status change in memory: status field, termination stamp for
    /// terminal statuses, version bump.
    pub fn apply_status(
        &mut self,
        new_status: StaffStatus,
        effective_date: NaiveDate,
        actor: UserId,
        now: DateTime<Utc>,
    ) {
        self.status = new_status;
        if new_status.is_terminal() {
            self.termination_date = Some(effective_date);
        }
        self.version += 1;
        self.updated_at = now;
        self.updated_by = actor;
    }
}

/// Input fields for record creation (no identifier, no code — both minted by
/// the creation flow).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStaffRecord {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub department: Option<String>,
    pub job_title: Option<String>,
}

impl NewStaffRecord {
    /// Validate before any transaction opens; validation failures never
    /// cause partial writes.
    pub fn validate(&self) -> StaffResult<()> {
        if self.first_name.trim().is_empty() {
            return Err(StaffError::validation("first name cannot be empty"));
        }
        if self.last_name.trim().is_empty() {
            return Err(StaffError::validation("last name cannot be empty"));
        }
        if let Some(email) = &self.email {
            if !email.contains('@') {
                return Err(StaffError::validation(format!("invalid email: {email}")));
            }
        }
        Ok(())
    }
}

/// Partial field update (if a field is `None`, keep the existing value).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub department: Option<String>,
    pub job_title: Option<String>,
}

impl StaffUpdate {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.email.is_none()
            && self.department.is_none()
            && self.job_title.is_none()
    }

    pub fn validate(&self) -> StaffResult<()> {
        if let Some(first_name) = &self.first_name {
            if first_name.trim().is_empty() {
                return Err(StaffError::validation("first name cannot be empty"));
            }
        }
        if let Some(last_name) = &self.last_name {
            if last_name.trim().is_empty() {
                return Err(StaffError::validation("last name cannot be empty"));
            }
        }
        if let Some(email) = &self.email {
            if !email.contains('@') {
                return Err(StaffError::validation(format!("invalid email: {email}")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> NewStaffRecord {
        NewStaffRecord {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: Some("ada@example.com".to_string()),
            department: Some("Engineering".to_string()),
            job_title: None,
        }
    }

    fn record() -> StaffRecord {
        StaffRecord::create(
            StaffId::new(),
            TenantId::new(),
            EmployeeCode::format("EMP", 1),
            fields(),
            UserId::new(),
            Utc::now(),
        )
    }

    #[test]
    fn create_starts_active_at_version_one() {
        let record = record();
        assert_eq!(record.version, 1);
        assert_eq!(record.status, StaffStatus::Active);
        assert_eq!(record.termination_date, None);
        assert_eq!(record.employee_code.as_str(), "EMP00001");
    }

    #[test]
    fn validate_rejects_blank_names() {
        let mut bad = fields();
        bad.first_name = "  ".to_string();
        assert!(matches!(bad.validate(), Err(StaffError::Validation(_))));

        let mut bad = fields();
        bad.last_name = String::new();
        assert!(matches!(bad.validate(), Err(StaffError::Validation(_))));
    }

    #[test]
    fn validate_rejects_malformed_email() {
        let mut bad = fields();
        bad.email = Some("not-an-email".to_string());
        assert!(matches!(bad.validate(), Err(StaffError::Validation(_))));
    }

    #[test]
    fn apply_update_keeps_absent_fields_and_bumps_version() {
        let mut record = record();
        let actor = UserId::new();
        let changes = StaffUpdate {
            last_name: Some("King".to_string()),
            ..StaffUpdate::default()
        };

        record.apply_update(&changes, actor, Utc::now());

        assert_eq!(record.last_name, "King");
        assert_eq!(record.first_name, "Ada");
        assert_eq!(record.email.as_deref(), Some("ada@example.com"));
        assert_eq!(record.version, 2);
        assert_eq!(record.updated_by, actor);
    }

    #[test]
    fn apply_status_stamps_termination_date_only_for_terminated() {
        let mut record = record();
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();

        record.apply_status(StaffStatus::OnLeave, date, UserId::new(), Utc::now());
        assert_eq!(record.status, StaffStatus::OnLeave);
        assert_eq!(record.termination_date, None);
        assert_eq!(record.version, 2);

        record.apply_status(StaffStatus::Terminated, date, UserId::new(), Utc::now());
        assert_eq!(record.termination_date, Some(date));
        assert_eq!(record.version, 3);

        // Reactivation does not clear the stamp.
        record.apply_status(StaffStatus::Active, date, UserId::new(), Utc::now());
        assert_eq!(record.status, StaffStatus::Active);
        assert_eq!(record.termination_date, Some(date));
        assert_eq!(record.version, 4);
    }

    #[test]
    fn empty_update_is_detectable() {
        assert!(StaffUpdate::default().is_empty());
        let changes = StaffUpdate {
            email: Some("x@example.com".to_string()),
            ..StaffUpdate::default()
        };
        assert!(!changes.is_empty());
    }
}
