use super::Store;
use crate::error::StoreError;
use crate::model::{NewSyncHistory, SyncHistory};
use crate::schema::sync_history;
use crate::time::DateTime;
use diesel::prelude::*;

/// Accumulates item-level counts during one sync pipeline run, then becomes a
/// [`SyncHistory`] row (spec §4.E step 7, §7 "User-visible reporting").
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub discovered_count: i64,
    pub downloaded_count: i64,
    pub skipped_count: i64,
    pub failed_count: i64,
    pub bytes_downloaded: i64,
    pub errors: Vec<String>,
}

impl SyncReport {
    pub fn status(&self) -> &'static str {
        if self.failed_count == 0 {
            "success"
        } else if self.downloaded_count > 0 || self.skipped_count > 0 {
            "partial_failure"
        } else {
            "failed"
        }
    }
}

impl Store {
    pub fn record_sync_history(
        &self,
        repository_id: &str,
        started_at: DateTime,
        finished_at: DateTime,
        report: &SyncReport,
    ) -> Result<SyncHistory, StoreError> {
        let mut conn = self.conn()?;
        let error_summary = (!report.errors.is_empty()).then(|| report.errors.join("; "));
        diesel::insert_into(sync_history::table)
            .values(NewSyncHistory {
                repository_id,
                started_at,
                finished_at: Some(finished_at),
                status: report.status(),
                discovered_count: report.discovered_count,
                downloaded_count: report.downloaded_count,
                skipped_count: report.skipped_count,
                failed_count: report.failed_count,
                bytes_downloaded: report.bytes_downloaded,
                error_summary: error_summary.as_deref(),
            })
            .get_result(&mut conn)
            .map_err(Into::into)
    }

    pub fn sync_history_for_repository(&self, repository_id: &str) -> Result<Vec<SyncHistory>, StoreError> {
        let mut conn = self.conn()?;
        sync_history::table
            .filter(sync_history::repository_id.eq(repository_id))
            .order(sync_history::started_at.desc())
            .load(&mut conn)
            .map_err(Into::into)
    }
}
