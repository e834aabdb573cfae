//! `forgehr-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod version;

pub use error::{StaffError, StaffResult};
pub use id::{HistoryId, StaffId, TenantId, UserId};
pub use version::ExpectedVersion;
