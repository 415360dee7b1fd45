use crate::errors::{AppError, AppResult};
use crate::models::sync::{RunStatus, SyncRunLog, SyncStats};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde_json::{Value, json};

pub const STALE_RUN_MESSAGE: &str = "Sync timeout: previous run did not finish.";

fn map_row(row: &Row) -> rusqlite::Result<SyncRunLog> {
    let status_str: String = row.get("status")?;
    let status = RunStatus::from_db_str(&status_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            Box::new(AppError::Other(format!("Invalid run status: {status_str}"))),
        )
    })?;

    let errors: Option<String> = row.get("errors")?;
    let errors = match errors {
        Some(s) => Some(serde_json::from_str::<Value>(&s).unwrap_or(Value::String(s))),
        None => None,
    };

    Ok(SyncRunLog {
        id: row.get("id")?,
        tenant_id: row.get("tenant_id")?,
        company_id: row.get("company_id")?,
        status,
        triggered_by: row.get("triggered_by")?,
        range_from: row.get("range_from")?,
        range_to: row.get("range_to")?,
        started_at: row.get("started_at")?,
        finished_at: row.get("finished_at")?,
        records_fetched: row.get("records_fetched")?,
        records_inserted: row.get("records_inserted")?,
        records_updated: row.get("records_updated")?,
        records_skipped: row.get("records_skipped")?,
        dirty_days: row.get("dirty_days")?,
        errors,
    })
}

/// Mark as failed every run of the tenant still `running` that started
/// before `cutoff`. Returns how many were swept.
pub fn sweep_stale(conn: &Connection, tenant_id: &str, cutoff: &str, now: &str) -> AppResult<usize> {
    let errors = json!({ "message": STALE_RUN_MESSAGE }).to_string();
    let n = conn.execute(
        "UPDATE sync_log SET status = 'failed', finished_at = ?1, errors = ?2
         WHERE tenant_id = ?3 AND status = 'running' AND started_at < ?4",
        params![now, errors, tenant_id, cutoff],
    )?;
    Ok(n)
}

pub fn create_running(
    conn: &Connection,
    tenant_id: &str,
    company_id: Option<&str>,
    triggered_by: &str,
    range_from: &str,
    range_to: &str,
    started_at: &str,
) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO sync_log (tenant_id, company_id, status, triggered_by, range_from, range_to, started_at)
         VALUES (?1, ?2, 'running', ?3, ?4, ?5, ?6)",
        params![tenant_id, company_id, triggered_by, range_from, range_to, started_at],
    )?;
    Ok(conn.last_insert_rowid())
}

fn finish(
    conn: &Connection,
    id: i64,
    status: RunStatus,
    stats: &SyncStats,
    errors: Option<&Value>,
    finished_at: &str,
) -> AppResult<()> {
    let errors = errors.map(Value::to_string);
    conn.execute(
        "UPDATE sync_log SET
            status = ?1, finished_at = ?2, records_fetched = ?3, records_inserted = ?4,
            records_updated = ?5, records_skipped = ?6, dirty_days = ?7, errors = ?8
         WHERE id = ?9",
        params![
            status.to_db_str(),
            finished_at,
            stats.fetched,
            stats.inserted,
            stats.updated,
            stats.skipped,
            stats.dirty_days,
            errors,
            id
        ],
    )?;
    Ok(())
}

pub fn finish_success(
    conn: &Connection,
    id: i64,
    stats: &SyncStats,
    errors: Option<&Value>,
    finished_at: &str,
) -> AppResult<()> {
    finish(conn, id, RunStatus::Success, stats, errors, finished_at)
}

pub fn finish_failed(
    conn: &Connection,
    id: i64,
    stats: &SyncStats,
    errors: &Value,
    finished_at: &str,
) -> AppResult<()> {
    finish(conn, id, RunStatus::Failed, stats, Some(errors), finished_at)
}

pub fn find(conn: &Connection, id: i64) -> AppResult<Option<SyncRunLog>> {
    let log = conn
        .query_row("SELECT * FROM sync_log WHERE id = ?1", [id], map_row)
        .optional()?;
    Ok(log)
}

pub fn latest(conn: &Connection, tenant_id: &str) -> AppResult<Option<SyncRunLog>> {
    let log = conn
        .query_row(
            "SELECT * FROM sync_log WHERE tenant_id = ?1
             ORDER BY started_at DESC, id DESC LIMIT 1",
            [tenant_id],
            map_row,
        )
        .optional()?;
    Ok(log)
}

/// Most recent runs first.
pub fn list(conn: &Connection, tenant_id: &str, limit: i64) -> AppResult<Vec<SyncRunLog>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM sync_log WHERE tenant_id = ?1
         ORDER BY started_at DESC, id DESC LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![tenant_id, limit], map_row)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}
