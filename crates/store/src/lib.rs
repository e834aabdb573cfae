//! Storage and transaction engine for tenant-scoped staff records.
//!
//! The pieces with real invariants live here:
//!
//! - [`sequence::SequenceAllocator`] — collision-free, gap-free (for
//!   committed callers) employee-number allocation per `(tenant, prefix)`.
//! - [`guard::ConcurrencyGuard`] — lost-update detection via a version
//!   counter and a single conditional write, no row locks.
//! - [`ledger::StatusLedger`] — append-only status history, written
//!   atomically with the status field.
//! - [`uow::StaffStore::run_atomic`] — the transaction boundary wrapping all
//!   multi-row writes, rollback on any error.
//!
//! [`service::StaffService`] composes these into the operation surface the
//! request layer calls. Two store backends are provided: in-memory
//! (tests/dev) and Postgres.

pub mod guard;
pub mod in_memory;
pub mod ledger;
pub mod postgres;
pub mod retry;
pub mod sequence;
pub mod service;
pub mod uow;

#[cfg(test)]
mod integration_tests;

pub use guard::ConcurrencyGuard;
pub use in_memory::InMemoryStaffStore;
pub use ledger::StatusLedger;
pub use postgres::PostgresStaffStore;
pub use retry::retry_on_conflict;
pub use sequence::SequenceAllocator;
pub use service::StaffService;
pub use uow::{StaffStore, UnitOfWork};
