//! `forgehr-staff` — the HR staff domain model.
//!
//! Pure domain types and transition logic; all IO lives in `forgehr-store`.

pub mod code;
pub mod record;
pub mod status;

pub use code::{EmployeeCode, SEQUENCE_PAD, validate_prefix};
pub use record::{NewStaffRecord, StaffRecord, StaffUpdate};
pub use status::{StaffStatus, StatusChange, StatusHistoryEntry};
