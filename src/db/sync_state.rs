use crate::errors::AppResult;
use crate::models::sync::SyncRunState;
use rusqlite::{Connection, OptionalExtension, params};

pub fn load(conn: &Connection, tenant_id: &str) -> AppResult<Option<SyncRunState>> {
    let state = conn
        .query_row(
            "SELECT tenant_id, company_id, window_days, last_sync_at, last_successful_sync_at
             FROM sync_state WHERE tenant_id = ?1",
            [tenant_id],
            |row| {
                Ok(SyncRunState {
                    tenant_id: row.get(0)?,
                    company_id: row.get(1)?,
                    window_days: row.get(2)?,
                    last_sync_at: row.get(3)?,
                    last_successful_sync_at: row.get(4)?,
                })
            },
        )
        .optional()?;
    Ok(state)
}

/// Record the start of a run: company, window and `last_sync_at`.
/// `last_successful_sync_at` is only ever moved by [`mark_success`].
pub fn touch_run_start(
    conn: &Connection,
    tenant_id: &str,
    company_id: Option<&str>,
    window_days: i64,
    now: &str,
) -> AppResult<()> {
    conn.execute(
        "INSERT INTO sync_state (tenant_id, company_id, window_days, last_sync_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(tenant_id) DO UPDATE SET
            company_id = excluded.company_id,
            window_days = excluded.window_days,
            last_sync_at = excluded.last_sync_at",
        params![tenant_id, company_id, window_days, now],
    )?;
    Ok(())
}

pub fn mark_success(conn: &Connection, tenant_id: &str, finished_at: &str) -> AppResult<()> {
    conn.execute(
        "UPDATE sync_state SET last_successful_sync_at = ?1 WHERE tenant_id = ?2",
        params![finished_at, tenant_id],
    )?;
    Ok(())
}

/// Persist a preferred window without touching run timestamps.
pub fn save_window_days(conn: &Connection, tenant_id: &str, window_days: i64) -> AppResult<()> {
    conn.execute(
        "INSERT INTO sync_state (tenant_id, window_days) VALUES (?1, ?2)
         ON CONFLICT(tenant_id) DO UPDATE SET window_days = excluded.window_days",
        params![tenant_id, window_days],
    )?;
    Ok(())
}
