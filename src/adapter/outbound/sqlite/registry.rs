//! SQLite workload registry implementation.
//!
//! Every mutation runs in an immediate transaction, so concurrent
//! read-modify-write updates of the same record serialize on the database
//! write lock instead of overwriting each other.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::adapter::outbound::sqlite::database::connection::DbPool;
use crate::adapter::outbound::sqlite::database::model::WorkloadRow;
use crate::adapter::outbound::sqlite::database::schema::workloads;
use crate::domain::{
    EnvVar, ReviewState, RuntimeHandle, RuntimeVersion, TenantId, ValidationError, Workload,
    WorkloadKey, WorkloadName,
};
use crate::error::{Error, Result};
use crate::port::outbound::registry::{WorkloadRegistry, WorkloadUpdate};

/// SQLite-backed workload registry.
pub struct SqliteRegistry {
    pool: DbPool,
}

impl SqliteRegistry {
    /// Create a new registry over the given connection pool.
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(
        &self,
    ) -> Result<diesel::r2d2::PooledConnection<diesel::r2d2::ConnectionManager<SqliteConnection>>>
    {
        self.pool.get().map_err(|e| Error::Connection(e.to_string()))
    }

    fn to_row(workload: &Workload) -> Result<WorkloadRow> {
        Ok(WorkloadRow {
            tenant: workload.tenant.to_string(),
            name: workload.name.to_string(),
            runtime_version: workload.runtime_version.to_string(),
            environment: serde_json::to_string(&workload.environment)?,
            state: workload.state.as_str().to_string(),
            running: i32::from(workload.running),
            runtime_handle: workload
                .runtime_handle
                .as_ref()
                .map(|h| h.as_str().to_string()),
            archive_path: workload
                .archive_path
                .as_ref()
                .map(|p| p.display().to_string()),
            created_at: workload.created_at.to_rfc3339(),
            updated_at: workload.updated_at.to_rfc3339(),
        })
    }

    fn from_row(row: WorkloadRow) -> Result<Workload> {
        let invalid = |e: ValidationError| Error::Parse(e.to_string());
        let environment: Vec<EnvVar> = serde_json::from_str(&row.environment)?;
        let state: ReviewState = row.state.parse().map_err(Error::Parse)?;

        Ok(Workload {
            tenant: TenantId::parse(&row.tenant).map_err(invalid)?,
            name: WorkloadName::parse(&row.name).map_err(invalid)?,
            runtime_version: RuntimeVersion::parse(Some(&row.runtime_version)).map_err(invalid)?,
            environment,
            state,
            running: row.running != 0,
            runtime_handle: row
                .runtime_handle
                .as_deref()
                .and_then(RuntimeHandle::from_persisted),
            archive_path: row.archive_path.map(PathBuf::from),
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }

    fn find(conn: &mut SqliteConnection, key: &WorkloadKey) -> Result<Option<WorkloadRow>> {
        let row = workloads::table
            .find((key.tenant.as_str(), key.name.as_str()))
            .select(WorkloadRow::as_select())
            .first(conn)
            .optional()?;
        Ok(row)
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .map_err(|e| Error::Parse(e.to_string()))?
        .with_timezone(&Utc))
}

#[async_trait]
impl WorkloadRegistry for SqliteRegistry {
    async fn get(&self, key: &WorkloadKey) -> Result<Option<Workload>> {
        let mut conn = self.conn()?;
        Self::find(&mut conn, key)?.map(Self::from_row).transpose()
    }

    async fn list(&self, tenant: &TenantId) -> Result<Vec<Workload>> {
        let mut conn = self.conn()?;
        let rows: Vec<WorkloadRow> = workloads::table
            .filter(workloads::tenant.eq(tenant.as_str()))
            .order(workloads::name.asc())
            .select(WorkloadRow::as_select())
            .load(&mut conn)?;
        rows.into_iter().map(Self::from_row).collect()
    }

    async fn list_pending(&self) -> Result<Vec<WorkloadKey>> {
        let mut conn = self.conn()?;
        let rows: Vec<(String, String)> = workloads::table
            .filter(workloads::state.eq(ReviewState::AwaitingReview.as_str()))
            .order(workloads::created_at.asc())
            .select((workloads::tenant, workloads::name))
            .load(&mut conn)?;
        rows.iter()
            .map(|(tenant, name)| {
                WorkloadKey::parse(tenant, name).map_err(|e| Error::Parse(e.to_string()))
            })
            .collect()
    }

    async fn count(&self, tenant: &TenantId) -> Result<u64> {
        let mut conn = self.conn()?;
        let count: i64 = workloads::table
            .filter(workloads::tenant.eq(tenant.as_str()))
            .count()
            .get_result(&mut conn)?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn insert(&self, workload: Workload) -> Result<Workload> {
        let row = Self::to_row(&workload)?;
        let key = workload.key();
        let mut conn = self.conn()?;

        conn.immediate_transaction(|conn| -> Result<()> {
            if Self::find(conn, &key)?.is_some() {
                return Err(ValidationError::Duplicate {
                    tenant: key.tenant.to_string(),
                    name: key.name.to_string(),
                }
                .into());
            }
            diesel::insert_into(workloads::table)
                .values(&row)
                .execute(conn)?;
            Ok(())
        })?;

        Ok(workload)
    }

    async fn upsert(&self, key: &WorkloadKey, update: WorkloadUpdate) -> Result<Workload> {
        let mut conn = self.conn()?;

        conn.immediate_transaction(|conn| -> Result<Workload> {
            let workload = match update {
                WorkloadUpdate::Replace(mut workload) => {
                    workload.updated_at = Utc::now();
                    workload
                }
                WorkloadUpdate::Patch(patch) => {
                    let row = Self::find(conn, key)?.ok_or_else(|| Error::not_found(key))?;
                    let mut workload = Self::from_row(row)?;
                    if !patch.admits(&workload) {
                        return Ok(workload);
                    }
                    patch.apply(&mut workload);
                    workload.updated_at = Utc::now();
                    workload
                }
            };

            diesel::replace_into(workloads::table)
                .values(&Self::to_row(&workload)?)
                .execute(conn)?;
            Ok(workload)
        })
    }

    async fn remove(&self, key: &WorkloadKey) -> Result<bool> {
        let mut conn = self.conn()?;
        let deleted = diesel::delete(
            workloads::table.find((key.tenant.as_str(), key.name.as_str())),
        )
        .execute(&mut conn)?;
        Ok(deleted > 0)
    }
}
