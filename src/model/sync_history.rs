use crate::schema::sync_history;
use crate::time::DateTime;
use diesel::prelude::*;
use strum::Display;

/// Append-only record of each sync attempt (spec §3 "SyncHistory").
#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = sync_history, check_for_backend(diesel::pg::Pg), primary_key(id))]
pub struct SyncHistory {
    pub id: i64,
    pub repository_id: String,
    pub started_at: DateTime,
    pub finished_at: Option<DateTime>,
    pub status: String,
    pub discovered_count: i64,
    pub downloaded_count: i64,
    pub skipped_count: i64,
    pub failed_count: i64,
    pub bytes_downloaded: i64,
    pub error_summary: Option<String>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = sync_history, check_for_backend(diesel::pg::Pg))]
pub struct NewSyncHistory<'a> {
    pub repository_id: &'a str,
    pub started_at: DateTime,
    pub finished_at: Option<DateTime>,
    pub status: &'a str,
    pub discovered_count: i64,
    pub downloaded_count: i64,
    pub skipped_count: i64,
    pub failed_count: i64,
    pub bytes_downloaded: i64,
    pub error_summary: Option<&'a str>,
}

/// Exit-status partition a sync/publish summary reports (spec §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum SyncStatus {
    Success,
    PartialFailure,
    Failed,
}
