//! Employee code value object.

use serde::{Deserialize, Serialize};

use forgehr_core::{StaffError, StaffResult};

/// Width of the zero-padded sequence portion of an employee code.
pub const SEQUENCE_PAD: usize = 5;

/// Human-readable, tenant-unique employee code: `prefix || zero-pad(seq, 5)`.
///
/// Formatting is pure; allocation of the underlying sequence number is the
/// store's concern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmployeeCode(String);

impl EmployeeCode {
    /// Format a code from a prefix and an issued sequence number.
    ///
    /// Sequences wider than the pad width keep all their digits
    /// (`format("EMP", 123456)` is `EMP123456`).
    pub fn format(prefix: &str, sequence: u64) -> Self {
        Self(format!("{prefix}{sequence:0pad$}", pad = SEQUENCE_PAD))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Wrap a code read back from storage.
    pub fn from_stored(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Extract the sequence number, given the prefix the code was minted with.
    pub fn sequence(&self, prefix: &str) -> StaffResult<u64> {
        let digits = self.0.strip_prefix(prefix).ok_or_else(|| {
            StaffError::validation(format!("code '{}' does not start with '{prefix}'", self.0))
        })?;
        digits
            .parse::<u64>()
            .map_err(|e| StaffError::validation(format!("code '{}': {e}", self.0)))
    }
}

impl core::fmt::Display for EmployeeCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validate a caller-supplied code prefix.
///
/// Prefixes are short uppercase alphanumeric tags (`EMP`, `CTR`); storage
/// keys them together with the tenant, so an empty prefix would collapse
/// distinct sequences.
pub fn validate_prefix(prefix: &str) -> StaffResult<()> {
    if prefix.trim().is_empty() {
        return Err(StaffError::validation("code prefix cannot be empty"));
    }
    if !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(StaffError::validation(format!(
            "code prefix '{prefix}' must be ASCII alphanumeric"
        )));
    }
    Ok(())
}
