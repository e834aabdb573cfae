//! Postgres-backed staff store.
//!
//! Real transactions over a SQLx connection pool. The sequence counter is
//! incremented with a single insert-or-increment upsert that locks the row
//! (and serializes its first-ever creation), so concurrent allocators for the
//! same `(tenant, prefix)` queue up and committed callers observe gap-free
//! sequences. Staff updates are a single conditional `UPDATE ... WHERE
//! version = $expected`; zero rows affected is the conflict signal. Status
//! transitions lock the staff row (`FOR UPDATE`) before reading the old
//! status.
//!
//! ## Tenant isolation
//!
//! Every query includes `tenant_id` in the WHERE clause or as part of the
//! primary key, so cross-tenant access is structurally impossible.
//!
//! ## Threading
//!
//! The store exposes the synchronous [`StaffStore`] surface and drives SQLx
//! through the current tokio runtime handle, as the rest of the storage
//! layer does.

use chrono::{DateTime, NaiveDate, Utc};
use std::str::FromStr;
use std::sync::Arc;
use tokio::runtime::Handle;

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};

use forgehr_core::{
    ExpectedVersion, HistoryId, StaffError, StaffId, StaffResult, TenantId, UserId,
};
use forgehr_staff::{EmployeeCode, StaffRecord, StaffStatus, StaffUpdate, StatusHistoryEntry};

use crate::uow::{StaffStore, UnitOfWork};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS sequence_counters (
    tenant_id     UUID NOT NULL,
    prefix        TEXT NOT NULL,
    last_sequence BIGINT NOT NULL,
    updated_at    TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (tenant_id, prefix)
);

CREATE TABLE IF NOT EXISTS staff (
    id               UUID PRIMARY KEY,
    tenant_id        UUID NOT NULL,
    employee_code    TEXT NOT NULL,
    first_name       TEXT NOT NULL,
    last_name        TEXT NOT NULL,
    email            TEXT,
    department       TEXT,
    job_title        TEXT,
    status           TEXT NOT NULL,
    version          BIGINT NOT NULL,
    termination_date DATE,
    created_at       TIMESTAMPTZ NOT NULL,
    updated_at       TIMESTAMPTZ NOT NULL,
    created_by       UUID NOT NULL,
    updated_by       UUID NOT NULL,
    UNIQUE (tenant_id, employee_code)
);

CREATE TABLE IF NOT EXISTS status_history (
    id             UUID PRIMARY KEY,
    tenant_id      UUID NOT NULL,
    staff_id       UUID NOT NULL REFERENCES staff(id),
    old_status     TEXT,
    new_status     TEXT NOT NULL,
    reason         TEXT NOT NULL,
    effective_date DATE NOT NULL,
    changed_by     UUID NOT NULL,
    changed_at     TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS status_history_staff
    ON status_history (tenant_id, staff_id, changed_at);
"#;

const STAFF_COLUMNS: &str = "id, tenant_id, employee_code, first_name, last_name, email, \
     department, job_title, status, version, termination_date, \
     created_at, updated_at, created_by, updated_by";

/// Postgres implementation of [`StaffStore`].
pub struct PostgresStaffStore {
    pool: Arc<PgPool>,
}

impl PostgresStaffStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Create the staff-core tables if they do not exist. Idempotent.
    pub fn ensure_schema(&self) -> StaffResult<()> {
        let handle = runtime_handle()?;
        let pool = self.pool.clone();
        handle.block_on(async move {
            let mut conn = pool.acquire().await.map_err(storage_err)?;
            for statement in SCHEMA.split(';').filter(|s| !s.trim().is_empty()) {
                sqlx::query(statement)
                    .execute(&mut *conn)
                    .await
                    .map_err(storage_err)?;
            }
            Ok(())
        })
    }
}

/// One open Postgres transaction.
pub struct PostgresUow {
    tx: Transaction<'static, Postgres>,
    handle: Handle,
}

impl UnitOfWork for PostgresUow {
    fn increment_counter(&mut self, tenant_id: TenantId, prefix: &str) -> StaffResult<u64> {
        // Insert-or-increment in one statement. A plain SELECT ... FOR UPDATE
        // has nothing to lock when the row is absent, so two first-ever
        // allocators would both mint 1; the upsert makes the absent-row case
        // serialize on the unique key as well, and the row lock it takes is
        // held until the transaction ends.
        let row = self
            .handle
            .clone()
            .block_on(
                sqlx::query(
                    "INSERT INTO sequence_counters (tenant_id, prefix, last_sequence, updated_at) \
                     VALUES ($1, $2, 1, NOW()) \
                     ON CONFLICT (tenant_id, prefix) \
                     DO UPDATE SET last_sequence = sequence_counters.last_sequence + 1, \
                                   updated_at = NOW() \
                     RETURNING last_sequence",
                )
                .bind(tenant_id.as_uuid())
                .bind(prefix)
                .fetch_one(&mut *self.tx),
            )
            .map_err(storage_err)?;

        row.try_get::<i64, _>("last_sequence")
            .map_err(storage_err)
            .map(|v| v as u64)
    }

    fn insert_staff(&mut self, record: &StaffRecord) -> StaffResult<()> {
        let result = self.handle.clone().block_on(
            sqlx::query(
                "INSERT INTO staff (id, tenant_id, employee_code, first_name, last_name, \
                     email, department, job_title, status, version, termination_date, \
                     created_at, updated_at, created_by, updated_by) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
            )
            .bind(record.id.as_uuid())
            .bind(record.tenant_id.as_uuid())
            .bind(record.employee_code.as_str())
            .bind(&record.first_name)
            .bind(&record.last_name)
            .bind(record.email.as_deref())
            .bind(record.department.as_deref())
            .bind(record.job_title.as_deref())
            .bind(record.status.as_str())
            .bind(record.version as i64)
            .bind(record.termination_date)
            .bind(record.created_at)
            .bind(record.updated_at)
            .bind(record.created_by.as_uuid())
            .bind(record.updated_by.as_uuid())
            .execute(&mut *self.tx),
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) => Err(insert_err(&record.employee_code, e)),
        }
    }

    fn load_staff(
        &mut self,
        tenant_id: TenantId,
        staff_id: StaffId,
    ) -> StaffResult<Option<StaffRecord>> {
        let row = self
            .handle
            .clone()
            .block_on(
                sqlx::query(&format!(
                    "SELECT {STAFF_COLUMNS} FROM staff WHERE tenant_id = $1 AND id = $2"
                ))
                .bind(tenant_id.as_uuid())
                .bind(staff_id.as_uuid())
                .fetch_optional(&mut *self.tx),
            )
            .map_err(storage_err)?;

        row.map(|r| record_from_row(&r)).transpose()
    }

    fn load_staff_for_update(
        &mut self,
        tenant_id: TenantId,
        staff_id: StaffId,
    ) -> StaffResult<Option<StaffRecord>> {
        // The row lock pins the record for read-then-write sequences (the
        // status ledger); a concurrent transition blocks here until this
        // transaction ends, so its old-status read can never go stale.
        let row = self
            .handle
            .clone()
            .block_on(
                sqlx::query(&format!(
                    "SELECT {STAFF_COLUMNS} FROM staff \
                     WHERE tenant_id = $1 AND id = $2 \
                     FOR UPDATE"
                ))
                .bind(tenant_id.as_uuid())
                .bind(staff_id.as_uuid())
                .fetch_optional(&mut *self.tx),
            )
            .map_err(storage_err)?;

        row.map(|r| record_from_row(&r)).transpose()
    }

    fn update_staff_checked(
        &mut self,
        tenant_id: TenantId,
        staff_id: StaffId,
        changes: &StaffUpdate,
        expected: ExpectedVersion,
        actor: UserId,
        now: DateTime<Utc>,
    ) -> StaffResult<Option<StaffRecord>> {
        let expected_version: Option<i64> = match expected {
            ExpectedVersion::Any => None,
            ExpectedVersion::Exact(v) => Some(v as i64),
        };

        // One conditional write; the version predicate is the optimistic
        // check and "zero rows affected" is the conflict signal.
        let row = self
            .handle
            .clone()
            .block_on(
                sqlx::query(&format!(
                    "UPDATE staff SET \
                         first_name = COALESCE($4, first_name), \
                         last_name  = COALESCE($5, last_name), \
                         email      = COALESCE($6, email), \
                         department = COALESCE($7, department), \
                         job_title  = COALESCE($8, job_title), \
                         version    = version + 1, \
                         updated_at = $9, \
                         updated_by = $10 \
                     WHERE tenant_id = $1 AND id = $2 \
                       AND ($3::BIGINT IS NULL OR version = $3) \
                     RETURNING {STAFF_COLUMNS}"
                ))
                .bind(tenant_id.as_uuid())
                .bind(staff_id.as_uuid())
                .bind(expected_version)
                .bind(changes.first_name.as_deref())
                .bind(changes.last_name.as_deref())
                .bind(changes.email.as_deref())
                .bind(changes.department.as_deref())
                .bind(changes.job_title.as_deref())
                .bind(now)
                .bind(actor.as_uuid())
                .fetch_optional(&mut *self.tx),
            )
            .map_err(storage_err)?;

        row.map(|r| record_from_row(&r)).transpose()
    }

    fn update_status(
        &mut self,
        tenant_id: TenantId,
        staff_id: StaffId,
        new_status: StaffStatus,
        effective_date: NaiveDate,
        actor: UserId,
        now: DateTime<Utc>,
    ) -> StaffResult<Option<StaffRecord>> {
        // Terminal statuses stamp the termination date; reactivation keeps
        // the old stamp (COALESCE with NULL leaves the column untouched).
        let termination: Option<NaiveDate> = new_status.is_terminal().then_some(effective_date);

        let row = self
            .handle
            .clone()
            .block_on(
                sqlx::query(&format!(
                    "UPDATE staff SET \
                         status = $3, \
                         termination_date = COALESCE($4, termination_date), \
                         version = version + 1, \
                         updated_at = $5, \
                         updated_by = $6 \
                     WHERE tenant_id = $1 AND id = $2 \
                     RETURNING {STAFF_COLUMNS}"
                ))
                .bind(tenant_id.as_uuid())
                .bind(staff_id.as_uuid())
                .bind(new_status.as_str())
                .bind(termination)
                .bind(now)
                .bind(actor.as_uuid())
                .fetch_optional(&mut *self.tx),
            )
            .map_err(storage_err)?;

        row.map(|r| record_from_row(&r)).transpose()
    }

    fn append_history(&mut self, entry: &StatusHistoryEntry) -> StaffResult<()> {
        self.handle
            .clone()
            .block_on(
                sqlx::query(
                    "INSERT INTO status_history (id, tenant_id, staff_id, old_status, \
                         new_status, reason, effective_date, changed_by, changed_at) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
                )
                .bind(entry.id.as_uuid())
                .bind(entry.tenant_id.as_uuid())
                .bind(entry.staff_id.as_uuid())
                .bind(entry.old_status.map(|s| s.as_str()))
                .bind(entry.new_status.as_str())
                .bind(&entry.reason)
                .bind(entry.effective_date)
                .bind(entry.changed_by.as_uuid())
                .bind(entry.changed_at)
                .execute(&mut *self.tx),
            )
            .map_err(storage_err)?;
        Ok(())
    }
}

impl StaffStore for PostgresStaffStore {
    type Uow<'a> = PostgresUow;

    fn run_atomic<T>(
        &self,
        work: impl FnOnce(&mut Self::Uow<'_>) -> StaffResult<T>,
    ) -> StaffResult<T> {
        let handle = runtime_handle()?;
        let tx = handle
            .block_on(self.pool.begin())
            .map_err(storage_err)?;

        let mut uow = PostgresUow {
            tx,
            handle: handle.clone(),
        };
        let outcome = work(&mut uow);
        let PostgresUow { tx, handle } = uow;

        match outcome {
            Ok(value) => {
                handle.block_on(tx.commit()).map_err(storage_err)?;
                Ok(value)
            }
            Err(err) => {
                // Best-effort explicit rollback; dropping the transaction
                // rolls back as well.
                if let Err(rollback_err) = handle.block_on(tx.rollback()) {
                    tracing::warn!(error = %rollback_err, "transaction rollback failed");
                }
                Err(err)
            }
        }
    }

    fn peek_last_sequence(&self, tenant_id: TenantId, prefix: &str) -> StaffResult<u64> {
        let handle = runtime_handle()?;
        let pool = self.pool.clone();

        let row = handle
            .block_on(
                sqlx::query(
                    "SELECT last_sequence FROM sequence_counters \
                     WHERE tenant_id = $1 AND prefix = $2",
                )
                .bind(tenant_id.as_uuid())
                .bind(prefix)
                .fetch_optional(&*pool),
            )
            .map_err(storage_err)?;

        row.map(|r| r.try_get::<i64, _>("last_sequence"))
            .transpose()
            .map_err(storage_err)
            .map(|seq| seq.map(|v| v as u64).unwrap_or(0))
    }

    fn get_staff(
        &self,
        tenant_id: TenantId,
        staff_id: StaffId,
    ) -> StaffResult<Option<StaffRecord>> {
        let handle = runtime_handle()?;
        let pool = self.pool.clone();

        let row = handle
            .block_on(
                sqlx::query(&format!(
                    "SELECT {STAFF_COLUMNS} FROM staff WHERE tenant_id = $1 AND id = $2"
                ))
                .bind(tenant_id.as_uuid())
                .bind(staff_id.as_uuid())
                .fetch_optional(&*pool),
            )
            .map_err(storage_err)?;

        row.map(|r| record_from_row(&r)).transpose()
    }

    fn history_for(
        &self,
        tenant_id: TenantId,
        staff_id: StaffId,
    ) -> StaffResult<Vec<StatusHistoryEntry>> {
        let handle = runtime_handle()?;
        let pool = self.pool.clone();

        let rows = handle
            .block_on(
                sqlx::query(
                    "SELECT id, tenant_id, staff_id, old_status, new_status, reason, \
                         effective_date, changed_by, changed_at \
                     FROM status_history \
                     WHERE tenant_id = $1 AND staff_id = $2 \
                     ORDER BY changed_at, id",
                )
                .bind(tenant_id.as_uuid())
                .bind(staff_id.as_uuid())
                .fetch_all(&*pool),
            )
            .map_err(storage_err)?;

        rows.iter().map(history_from_row).collect()
    }
}

fn runtime_handle() -> StaffResult<Handle> {
    Handle::try_current().map_err(|_| StaffError::storage("no tokio runtime available"))
}

fn storage_err(e: sqlx::Error) -> StaffError {
    StaffError::storage(e.to_string())
}

fn insert_err(code: &EmployeeCode, e: sqlx::Error) -> StaffError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return StaffError::duplicate_code(code.as_str());
        }
    }
    storage_err(e)
}

fn record_from_row(row: &PgRow) -> StaffResult<StaffRecord> {
    let status: String = row.try_get("status").map_err(storage_err)?;
    Ok(StaffRecord {
        id: StaffId::from_uuid(row.try_get("id").map_err(storage_err)?),
        tenant_id: TenantId::from_uuid(row.try_get("tenant_id").map_err(storage_err)?),
        employee_code: EmployeeCode::from_stored(
            row.try_get::<String, _>("employee_code").map_err(storage_err)?,
        ),
        first_name: row.try_get("first_name").map_err(storage_err)?,
        last_name: row.try_get("last_name").map_err(storage_err)?,
        email: row.try_get("email").map_err(storage_err)?,
        department: row.try_get("department").map_err(storage_err)?,
        job_title: row.try_get("job_title").map_err(storage_err)?,
        status: StaffStatus::from_str(&status)?,
        version: row.try_get::<i64, _>("version").map_err(storage_err)? as u64,
        termination_date: row.try_get("termination_date").map_err(storage_err)?,
        created_at: row.try_get("created_at").map_err(storage_err)?,
        updated_at: row.try_get("updated_at").map_err(storage_err)?,
        created_by: UserId::from_uuid(row.try_get("created_by").map_err(storage_err)?),
        updated_by: UserId::from_uuid(row.try_get("updated_by").map_err(storage_err)?),
    })
}

fn history_from_row(row: &PgRow) -> StaffResult<StatusHistoryEntry> {
    let old_status: Option<String> = row.try_get("old_status").map_err(storage_err)?;
    let new_status: String = row.try_get("new_status").map_err(storage_err)?;
    Ok(StatusHistoryEntry {
        id: HistoryId::from_uuid(row.try_get("id").map_err(storage_err)?),
        tenant_id: TenantId::from_uuid(row.try_get("tenant_id").map_err(storage_err)?),
        staff_id: StaffId::from_uuid(row.try_get("staff_id").map_err(storage_err)?),
        old_status: old_status.as_deref().map(StaffStatus::from_str).transpose()?,
        new_status: StaffStatus::from_str(&new_status)?,
        reason: row.try_get("reason").map_err(storage_err)?,
        effective_date: row.try_get("effective_date").map_err(storage_err)?,
        changed_by: UserId::from_uuid(row.try_get("changed_by").map_err(storage_err)?),
        changed_at: row.try_get("changed_at").map_err(storage_err)?,
    })
}
