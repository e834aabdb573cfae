//! Integration tests for the full staff pipeline over the in-memory store.
//!
//! Exercises: Create → SequenceAllocator → insert, Update →
//! ConcurrencyGuard, UpdateStatus → StatusLedger, all through
//! `StaffService` and `run_atomic`.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;

use chrono::{NaiveDate, Utc};
use proptest::prelude::*;

use forgehr_core::{ExpectedVersion, StaffError, StaffId, TenantId, UserId};
use forgehr_staff::{NewStaffRecord, StaffRecord, StaffStatus, StaffUpdate, StatusChange};

use crate::in_memory::InMemoryStaffStore;
use crate::service::StaffService;
use crate::uow::{StaffStore, UnitOfWork};

fn service() -> StaffService<InMemoryStaffStore> {
    StaffService::new(InMemoryStaffStore::new())
}

fn fields(first: &str, last: &str) -> NewStaffRecord {
    NewStaffRecord {
        first_name: first.to_string(),
        last_name: last.to_string(),
        email: Some(format!("{}@example.com", first.to_lowercase())),
        department: Some("Engineering".to_string()),
        job_title: None,
    }
}

fn change(status: StaffStatus, reason: &str) -> StatusChange {
    StatusChange {
        new_status: status,
        reason: reason.to_string(),
        effective_date: Some(NaiveDate::from_ymd_opt(2026, 2, 1).unwrap()),
    }
}

#[test]
fn sequential_creates_issue_consecutive_codes() {
    let service = service();
    let tenant = TenantId::new();
    let actor = UserId::new();

    let a = service.create(tenant, "EMP", fields("Ada", "Lovelace"), actor).unwrap();
    let b = service.create(tenant, "EMP", fields("Grace", "Hopper"), actor).unwrap();
    let c = service.create(tenant, "EMP", fields("Edsger", "Dijkstra"), actor).unwrap();

    assert_eq!(a.employee_code.as_str(), "EMP00001");
    assert_eq!(b.employee_code.as_str(), "EMP00002");
    assert_eq!(c.employee_code.as_str(), "EMP00003");
    assert_eq!(a.version, 1);
    assert_eq!(a.status, StaffStatus::Active);
}

#[test]
fn codes_are_scoped_per_tenant_and_prefix() {
    let service = service();
    let tenant_a = TenantId::new();
    let tenant_b = TenantId::new();
    let actor = UserId::new();

    let a = service.create(tenant_a, "EMP", fields("Ada", "Lovelace"), actor).unwrap();
    let b = service.create(tenant_b, "EMP", fields("Grace", "Hopper"), actor).unwrap();
    let c = service.create(tenant_a, "CTR", fields("Alan", "Turing"), actor).unwrap();

    assert_eq!(a.employee_code.as_str(), "EMP00001");
    assert_eq!(b.employee_code.as_str(), "EMP00001");
    assert_eq!(c.employee_code.as_str(), "CTR00001");
}

#[test]
fn concurrent_creates_issue_distinct_gap_free_codes() {
    let service = Arc::new(service());
    let tenant = TenantId::new();
    let n = 8;

    let handles: Vec<_> = (0..n)
        .map(|i| {
            let service = Arc::clone(&service);
            thread::spawn(move || {
                service
                    .create(
                        tenant,
                        "EMP",
                        fields(&format!("First{i}"), &format!("Last{i}")),
                        UserId::new(),
                    )
                    .unwrap()
            })
        })
        .collect();

    let codes: BTreeSet<String> = handles
        .into_iter()
        .map(|h| h.join().unwrap().employee_code.into_string())
        .collect();

    let expected: BTreeSet<String> = (1..=n)
        .map(|seq| format!("EMP{seq:05}"))
        .collect();
    assert_eq!(codes, expected);
}

#[test]
fn failed_insert_rolls_back_the_allocation() {
    let service = service();
    let tenant = TenantId::new();
    let actor = UserId::new();

    // Occupy EMP00001 without going through the allocator, so the next
    // create collides on the unique code.
    service
        .store()
        .run_atomic(|uow| {
            let record = StaffRecord::create(
                StaffId::new(),
                tenant,
                forgehr_staff::EmployeeCode::format("EMP", 1),
                fields("Squat", "Ter"),
                actor,
                Utc::now(),
            );
            uow.insert_staff(&record)
        })
        .unwrap();

    let err = service
        .create(tenant, "EMP", fields("Ada", "Lovelace"), actor)
        .unwrap_err();
    assert!(matches!(err, StaffError::DuplicateCode(_)));

    // The counter increment was rolled back with the insert.
    assert_eq!(service.store().peek_last_sequence(tenant, "EMP").unwrap(), 0);
}

#[test]
fn create_validates_before_any_write() {
    let service = service();
    let tenant = TenantId::new();
    let actor = UserId::new();

    let mut bad = fields("Ada", "Lovelace");
    bad.first_name = " ".to_string();
    assert!(matches!(
        service.create(tenant, "EMP", bad, actor),
        Err(StaffError::Validation(_))
    ));

    let nil = TenantId::from_uuid(uuid::Uuid::nil());
    assert_eq!(
        service
            .create(nil, "EMP", fields("Ada", "Lovelace"), actor)
            .unwrap_err(),
        StaffError::TenantRequired
    );

    assert_eq!(service.store().peek_last_sequence(tenant, "EMP").unwrap(), 0);
}

#[test]
fn stale_update_conflicts_and_applies_nothing() {
    let service = service();
    let tenant = TenantId::new();
    let actor = UserId::new();
    let record = service.create(tenant, "EMP", fields("Ada", "Lovelace"), actor).unwrap();

    let winner = service
        .update(
            tenant,
            record.id,
            StaffUpdate {
                last_name: Some("King".to_string()),
                ..StaffUpdate::default()
            },
            ExpectedVersion::Exact(1),
            actor,
        )
        .unwrap();
    assert_eq!(winner.version, 2);
    assert_eq!(winner.last_name, "King");

    // Same expected version again: the stored version moved on, so this is
    // a lost update attempt and must conflict without applying fields.
    let err = service
        .update(
            tenant,
            record.id,
            StaffUpdate {
                last_name: Some("Byron".to_string()),
                ..StaffUpdate::default()
            },
            ExpectedVersion::Exact(1),
            actor,
        )
        .unwrap_err();
    assert!(matches!(err, StaffError::Conflict(_)));

    let current = service.get(tenant, record.id).unwrap();
    assert_eq!(current.last_name, "King");
    assert_eq!(current.version, 2);
}

#[test]
fn concurrent_updates_have_exactly_one_winner() {
    let service = Arc::new(service());
    let tenant = TenantId::new();
    let actor = UserId::new();
    let record = service.create(tenant, "EMP", fields("Ada", "Lovelace"), actor).unwrap();
    let staff_id = record.id;

    let handles: Vec<_> = (0..2)
        .map(|i| {
            let service = Arc::clone(&service);
            thread::spawn(move || {
                service.update(
                    tenant,
                    staff_id,
                    StaffUpdate {
                        department: Some(format!("Dept{i}")),
                        ..StaffUpdate::default()
                    },
                    ExpectedVersion::Exact(1),
                    UserId::new(),
                )
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let wins = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(StaffError::Conflict(_))))
        .count();

    assert_eq!(wins, 1);
    assert_eq!(conflicts, 1);
    assert_eq!(service.get(tenant, staff_id).unwrap().version, 2);
}

#[test]
fn version_bypass_sentinel_always_succeeds_and_still_bumps() {
    let service = service();
    let tenant = TenantId::new();
    let actor = UserId::new();
    let record = service.create(tenant, "EMP", fields("Ada", "Lovelace"), actor).unwrap();

    // Move the record past version 1.
    service
        .update(
            tenant,
            record.id,
            StaffUpdate {
                job_title: Some("Analyst".to_string()),
                ..StaffUpdate::default()
            },
            ExpectedVersion::Exact(1),
            actor,
        )
        .unwrap();

    // The unset sentinel (raw 0) skips the check regardless of the stored
    // version, and still increments it.
    let updated = service
        .update(
            tenant,
            record.id,
            StaffUpdate {
                job_title: Some("Principal Analyst".to_string()),
                ..StaffUpdate::default()
            },
            ExpectedVersion::from_raw(0),
            actor,
        )
        .unwrap();
    assert_eq!(updated.version, 3);
    assert_eq!(updated.job_title.as_deref(), Some("Principal Analyst"));
}

#[test]
fn update_of_missing_record_is_not_found() {
    let service = service();
    let err = service
        .update(
            TenantId::new(),
            StaffId::new(),
            StaffUpdate::default(),
            ExpectedVersion::Any,
            UserId::new(),
        )
        .unwrap_err();
    assert_eq!(err, StaffError::NotFound);
}

#[test]
fn update_is_tenant_isolated() {
    let service = service();
    let tenant = TenantId::new();
    let actor = UserId::new();
    let record = service.create(tenant, "EMP", fields("Ada", "Lovelace"), actor).unwrap();

    let err = service
        .update(
            TenantId::new(),
            record.id,
            StaffUpdate::default(),
            ExpectedVersion::Any,
            actor,
        )
        .unwrap_err();
    assert_eq!(err, StaffError::NotFound);
}

#[test]
fn status_change_writes_record_and_ledger_atomically() {
    let service = service();
    let tenant = TenantId::new();
    let actor = UserId::new();
    let record = service.create(tenant, "EMP", fields("Ada", "Lovelace"), actor).unwrap();

    let (updated, entry) = service
        .update_status(tenant, record.id, change(StaffStatus::OnLeave, "Medical"), actor)
        .unwrap();

    assert_eq!(updated.status, StaffStatus::OnLeave);
    assert_eq!(updated.version, 2);
    assert_eq!(entry.old_status, Some(StaffStatus::Active));
    assert_eq!(entry.new_status, StaffStatus::OnLeave);
    assert_eq!(entry.reason, "Medical");

    let history = service.history(tenant, record.id).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0], entry);
    // The record's status equals the newest entry's new_status.
    assert_eq!(service.get(tenant, record.id).unwrap().status, history[0].new_status);
}

#[test]
fn failed_status_change_leaves_no_ledger_entry() {
    let service = service();
    let tenant = TenantId::new();
    let actor = UserId::new();
    let record = service.create(tenant, "EMP", fields("Ada", "Lovelace"), actor).unwrap();

    let err = service
        .update_status(
            tenant,
            record.id,
            StatusChange {
                new_status: StaffStatus::Inactive,
                reason: "  ".to_string(),
                effective_date: Some(NaiveDate::from_ymd_opt(2026, 2, 1).unwrap()),
            },
            actor,
        )
        .unwrap_err();
    assert_eq!(err, StaffError::ReasonRequired);

    let err = service
        .update_status(
            tenant,
            record.id,
            StatusChange {
                new_status: StaffStatus::Inactive,
                reason: "Restructure".to_string(),
                effective_date: None,
            },
            actor,
        )
        .unwrap_err();
    assert_eq!(err, StaffError::EffectiveDateRequired);

    assert!(service.history(tenant, record.id).unwrap().is_empty());
    let current = service.get(tenant, record.id).unwrap();
    assert_eq!(current.status, StaffStatus::Active);
    assert_eq!(current.version, 1);
}

#[test]
fn status_change_for_missing_record_is_not_found() {
    let service = service();
    let err = service
        .update_status(
            TenantId::new(),
            StaffId::new(),
            change(StaffStatus::Inactive, "Restructure"),
            UserId::new(),
        )
        .unwrap_err();
    assert_eq!(err, StaffError::NotFound);
}

#[test]
fn terminated_records_can_be_reactivated() {
    let service = service();
    let tenant = TenantId::new();
    let actor = UserId::new();
    let record = service.create(tenant, "EMP", fields("Ada", "Lovelace"), actor).unwrap();
    let date = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();

    let (terminated, _) = service
        .update_status(tenant, record.id, change(StaffStatus::Terminated, "Contract end"), actor)
        .unwrap();
    assert_eq!(terminated.status, StaffStatus::Terminated);
    assert_eq!(terminated.termination_date, Some(date));

    // No terminal state blocks further transitions.
    let (reactivated, entry) = service
        .update_status(tenant, record.id, change(StaffStatus::Active, "Reinstated"), actor)
        .unwrap();
    assert_eq!(reactivated.status, StaffStatus::Active);
    assert_eq!(entry.old_status, Some(StaffStatus::Terminated));
    // The termination stamp is not cleared by reactivation.
    assert_eq!(reactivated.termination_date, Some(date));
}

#[test]
fn self_transitions_are_permitted() {
    let service = service();
    let tenant = TenantId::new();
    let actor = UserId::new();
    let record = service.create(tenant, "EMP", fields("Ada", "Lovelace"), actor).unwrap();

    let (updated, entry) = service
        .update_status(tenant, record.id, change(StaffStatus::Active, "Annual review"), actor)
        .unwrap();
    assert_eq!(updated.status, StaffStatus::Active);
    assert_eq!(entry.old_status, Some(StaffStatus::Active));
    assert_eq!(entry.new_status, StaffStatus::Active);
}

#[test]
fn ledger_orders_entries_and_chains_old_status() {
    let service = service();
    let tenant = TenantId::new();
    let actor = UserId::new();
    let record = service.create(tenant, "EMP", fields("Ada", "Lovelace"), actor).unwrap();

    for (status, reason) in [
        (StaffStatus::OnLeave, "Medical"),
        (StaffStatus::Active, "Returned"),
        (StaffStatus::Terminated, "Contract end"),
    ] {
        service
            .update_status(tenant, record.id, change(status, reason), actor)
            .unwrap();
    }

    let history = service.history(tenant, record.id).unwrap();
    assert_eq!(history.len(), 3);
    // Each entry's old_status is the previous entry's new_status.
    for pair in history.windows(2) {
        assert_eq!(pair[1].old_status, Some(pair[0].new_status));
    }
    assert_eq!(
        service.get(tenant, record.id).unwrap().status,
        history.last().unwrap().new_status
    );
}

#[test]
fn concurrent_status_changes_keep_ledger_chain_intact() {
    let service = Arc::new(service());
    let tenant = TenantId::new();
    let actor = UserId::new();
    let record = service.create(tenant, "EMP", fields("Ada", "Lovelace"), actor).unwrap();
    let staff_id = record.id;

    // Two transitions race; each must read the old status under the record
    // lock, so the later one sees the earlier one's result, never a stale
    // snapshot.
    let handles: Vec<_> = [StaffStatus::OnLeave, StaffStatus::Inactive]
        .into_iter()
        .map(|status| {
            let service = Arc::clone(&service);
            thread::spawn(move || {
                service
                    .update_status(tenant, staff_id, change(status, "Shift change"), UserId::new())
                    .unwrap()
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let history = service.history(tenant, staff_id).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].old_status, Some(StaffStatus::Active));
    for pair in history.windows(2) {
        assert_eq!(pair[1].old_status, Some(pair[0].new_status));
    }
    assert_eq!(
        service.get(tenant, staff_id).unwrap().status,
        history.last().unwrap().new_status
    );
}

#[test]
fn preview_does_not_allocate() {
    let service = service();
    let tenant = TenantId::new();
    let actor = UserId::new();

    let first = service.preview_next_code(tenant, "EMP").unwrap();
    let second = service.preview_next_code(tenant, "EMP").unwrap();
    assert_eq!(first, second);
    assert_eq!(first.as_str(), "EMP00001");

    // A create consumes exactly the previewed value.
    let record = service.create(tenant, "EMP", fields("Ada", "Lovelace"), actor).unwrap();
    assert_eq!(record.employee_code, first);
    assert_eq!(service.preview_next_code(tenant, "EMP").unwrap().as_str(), "EMP00002");
}

proptest! {
    #[test]
    fn any_number_of_committed_creates_is_gap_free(n in 1usize..20) {
        let service = service();
        let tenant = TenantId::new();
        let actor = UserId::new();

        let mut sequences = BTreeSet::new();
        for i in 0..n {
            let record = service
                .create(tenant, "EMP", fields(&format!("F{i}"), &format!("L{i}")), actor)
                .unwrap();
            sequences.insert(record.employee_code.sequence("EMP").unwrap());
        }

        let expected: BTreeSet<u64> = (1..=n as u64).collect();
        prop_assert_eq!(sequences, expected);
    }
}
