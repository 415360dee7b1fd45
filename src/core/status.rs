use crate::core::sync::DEFAULT_WINDOW_DAYS;
use crate::db::{sync_log, sync_state};
use crate::errors::AppResult;
use crate::models::sync::{SyncLogSummary, SyncRunLog, SyncStatus};
use rusqlite::Connection;

pub const DEFAULT_LOG_LIMIT: i64 = 20;
pub const MAX_LOG_LIMIT: i64 = 100;

pub fn clamp_log_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LOG_LIMIT).clamp(1, MAX_LOG_LIMIT)
}

/// Run state of a tenant plus a summary of its latest run. A tenant that
/// never synced gets the defaults.
pub fn sync_status(conn: &Connection, tenant_id: &str) -> AppResult<SyncStatus> {
    let state = sync_state::load(conn, tenant_id)?;
    let last = sync_log::latest(conn, tenant_id)?;

    Ok(SyncStatus {
        tenant_id: tenant_id.to_string(),
        company_id: state.as_ref().and_then(|s| s.company_id.clone()),
        last_sync_at: state.as_ref().and_then(|s| s.last_sync_at.clone()),
        last_successful_sync_at: state.as_ref().and_then(|s| s.last_successful_sync_at.clone()),
        window_days: state.as_ref().map_or(DEFAULT_WINDOW_DAYS, |s| s.window_days),
        last_log: last.as_ref().map(SyncLogSummary::from),
    })
}

/// Newest first; `limit` clamped to `[1, 100]`, default 20.
pub fn list_sync_logs(conn: &Connection, tenant_id: &str, limit: Option<i64>) -> AppResult<Vec<SyncRunLog>> {
    sync_log::list(conn, tenant_id, clamp_log_limit(limit))
}
