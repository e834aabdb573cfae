//! Domain error model.

use thiserror::Error;

/// Result type used across the staff domain.
pub type StaffResult<T> = Result<T, StaffError>;

/// Staff-domain error taxonomy.
///
/// Every operation in the core is individually transactional: any of these
/// errors means the whole unit of work was rolled back, never a partial
/// commit. Conflicts are surfaced verbatim to the caller — there is no
/// automatic retry anywhere in the core.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StaffError {
    /// A value failed validation (e.g. malformed or missing input).
    /// Detected before any transaction opens.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The tenant identifier was unset.
    #[error("tenant is required")]
    TenantRequired,

    /// The referenced staff record does not exist for the given tenant.
    #[error("staff record not found")]
    NotFound,

    /// Optimistic concurrency failure: the stored version did not match the
    /// caller's expected version. Zero side effects occurred; the caller
    /// should re-read and resubmit.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The generated employee code already exists within the tenant.
    ///
    /// Kept distinct from [`StaffError::Storage`] so callers do not blindly
    /// resubmit an unrecoverable operation.
    #[error("duplicate employee code: {0}")]
    DuplicateCode(String),

    /// The requested status is not one of the recognized statuses.
    #[error("invalid status: {0}")]
    InvalidStatus(String),

    /// A status change was submitted without a reason.
    #[error("reason is required")]
    ReasonRequired,

    /// A status change was submitted without an effective date.
    #[error("effective date is required")]
    EffectiveDateRequired,

    /// Underlying storage/transaction failure. Retryable by the caller, but
    /// never retried automatically.
    #[error("storage error: {0}")]
    Storage(String),
}

impl StaffError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn duplicate_code(code: impl Into<String>) -> Self {
        Self::DuplicateCode(code.into())
    }

    pub fn invalid_status(value: impl Into<String>) -> Self {
        Self::InvalidStatus(value.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }
}
