use crate::errors::AppResult;
use crate::models::change_log::ChangeLogEntry;
use rusqlite::{Connection, Row, params};
use serde_json::Value;

fn json_col(row: &Row, name: &str) -> rusqlite::Result<Value> {
    let s: String = row.get(name)?;
    serde_json::from_str(&s).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn map_row(row: &Row) -> rusqlite::Result<ChangeLogEntry> {
    let fields = json_col(row, "changed_fields")?;
    let changed_fields = fields
        .as_array()
        .map(|a| {
            a.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    Ok(ChangeLogEntry {
        id: row.get("id")?,
        tenant_id: row.get("tenant_id")?,
        stamping_id: row.get("stamping_id")?,
        external_id: row.get("external_id")?,
        changed_by: row.get("changed_by")?,
        change_reason: row.get("change_reason")?,
        before: json_col(row, "before_json")?,
        after: json_col(row, "after_json")?,
        diff: json_col(row, "diff_json")?,
        changed_fields,
        created_at: row.get("created_at")?,
    })
}

pub fn insert(conn: &Connection, e: &ChangeLogEntry) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO stamping_change_log (
            tenant_id, stamping_id, external_id, changed_by, change_reason,
            before_json, after_json, diff_json, changed_fields, created_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            e.tenant_id,
            e.stamping_id,
            e.external_id,
            e.changed_by,
            e.change_reason,
            serde_json::to_string(&e.before)?,
            serde_json::to_string(&e.after)?,
            serde_json::to_string(&e.diff)?,
            serde_json::to_string(&e.changed_fields)?,
            e.created_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Audit trail of one punch, oldest first.
pub fn list_for_stamping(conn: &Connection, stamping_id: i64) -> AppResult<Vec<ChangeLogEntry>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM stamping_change_log
         WHERE stamping_id = ?1
         ORDER BY id ASC",
    )?;
    let rows = stmt.query_map([stamping_id], map_row)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn count(conn: &Connection, tenant_id: &str) -> AppResult<i64> {
    let n = conn.query_row(
        "SELECT COUNT(*) FROM stamping_change_log WHERE tenant_id = ?1",
        [tenant_id],
        |row| row.get(0),
    )?;
    Ok(n)
}
