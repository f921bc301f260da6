//! Database model types for Diesel ORM.

use diesel::prelude::*;

use super::schema::{messages, workloads};

/// Database row for a workload.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = workloads)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct WorkloadRow {
    pub tenant: String,
    pub name: String,
    pub runtime_version: String,
    /// JSON array of `{key, value}` objects.
    pub environment: String,
    pub state: String,
    pub running: i32,
    pub runtime_handle: Option<String>,
    pub archive_path: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Database row for an inbox message (insertable).
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = messages)]
pub struct NewMessageRow {
    pub id: String,
    pub tenant: String,
    pub author: String,
    pub body: String,
    pub created_at: String,
}

/// Database row for an inbox message (queryable).
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = messages)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct MessageRow {
    pub seq: i32,
    pub id: String,
    pub tenant: String,
    pub author: String,
    pub body: String,
    pub created_at: String,
}
