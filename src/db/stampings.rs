use crate::errors::{AppError, AppResult};
use crate::models::stamping::Stamping;
use crate::utils::date::{parse_instant_str, to_db_ts};
use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, Result, Row, params};
use serde_json::Value;

const COLUMNS: &str = "id, tenant_id, external_id, company_id, subject_id, user_id, stamped_at, \
                       direction, device_id, device_type, location_id, note, raw_payload, day_summary_id";

fn conversion_error(err: AppError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(err))
}

pub fn map_row(row: &Row) -> Result<Stamping> {
    let stamped_at: String = row.get("stamped_at")?;
    let timestamp = parse_instant_str(&stamped_at)
        .ok_or_else(|| conversion_error(AppError::InvalidDate(stamped_at.clone())))?;

    let raw: String = row.get("raw_payload")?;
    let raw_payload: Value =
        serde_json::from_str(&raw).map_err(|e| conversion_error(AppError::Json(e)))?;

    Ok(Stamping {
        id: row.get("id")?,
        tenant_id: row.get("tenant_id")?,
        external_id: row.get("external_id")?,
        company_id: row.get("company_id")?,
        subject_id: row.get("subject_id")?,
        user_id: row.get("user_id")?,
        timestamp,
        direction: row.get("direction")?,
        device_id: row.get("device_id")?,
        device_type: row.get("device_type")?,
        location_id: row.get("location_id")?,
        note: row.get("note")?,
        raw_payload,
        day_summary_id: row.get("day_summary_id")?,
    })
}

pub fn find_by_external_id(
    conn: &Connection,
    tenant_id: &str,
    external_id: &str,
) -> AppResult<Option<Stamping>> {
    let sql = format!("SELECT {COLUMNS} FROM stampings WHERE tenant_id = ?1 AND external_id = ?2");
    let found = conn
        .query_row(&sql, params![tenant_id, external_id], map_row)
        .optional()?;
    Ok(found)
}

/// Insert a new punch and return its row id.
pub fn insert(conn: &Connection, s: &Stamping) -> AppResult<i64> {
    let now = to_db_ts(Utc::now());
    conn.execute(
        "INSERT INTO stampings (
            tenant_id, external_id, company_id, subject_id, user_id,
            stamped_at, stamped_at_ms, day_key, direction, device_id,
            device_type, location_id, note, raw_payload, created_at, updated_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?15)",
        params![
            s.tenant_id,
            s.external_id,
            s.company_id,
            s.subject_id,
            s.user_id,
            s.timestamp_str(),
            s.timestamp_ms(),
            s.day_key_str(),
            s.direction,
            s.device_id,
            s.device_type,
            s.location_id,
            s.note,
            serde_json::to_string(&s.raw_payload)?,
            now,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Overwrite the normalized fields of an existing punch (by id).
/// `day_summary_id` is owned by the day rebuild and left untouched.
pub fn update(conn: &Connection, id: i64, s: &Stamping) -> AppResult<()> {
    conn.execute(
        "UPDATE stampings SET
            company_id = ?1, subject_id = ?2, user_id = ?3, stamped_at = ?4,
            stamped_at_ms = ?5, day_key = ?6, direction = ?7, device_id = ?8,
            device_type = ?9, location_id = ?10, note = ?11, raw_payload = ?12,
            updated_at = ?13
         WHERE id = ?14",
        params![
            s.company_id,
            s.subject_id,
            s.user_id,
            s.timestamp_str(),
            s.timestamp_ms(),
            s.day_key_str(),
            s.direction,
            s.device_id,
            s.device_type,
            s.location_id,
            s.note,
            serde_json::to_string(&s.raw_payload)?,
            to_db_ts(Utc::now()),
            id,
        ],
    )?;
    Ok(())
}

/// All punches of one subject on one day, ordered by instant.
pub fn load_day(
    conn: &Connection,
    tenant_id: &str,
    subject_id: &str,
    day: NaiveDate,
) -> AppResult<Vec<Stamping>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM stampings
         WHERE tenant_id = ?1 AND subject_id = ?2 AND day_key = ?3
         ORDER BY stamped_at_ms ASC, id ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        params![tenant_id, subject_id, day.format("%Y-%m-%d").to_string()],
        map_row,
    )?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

/// Distinct `(subject, day)` pairs with at least one punch in `[from, to]`.
pub fn distinct_days_in_range(
    conn: &Connection,
    tenant_id: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> AppResult<Vec<(String, NaiveDate)>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT subject_id, day_key FROM stampings
         WHERE tenant_id = ?1
           AND subject_id IS NOT NULL
           AND day_key BETWEEN ?2 AND ?3
         ORDER BY subject_id, day_key",
    )?;
    let rows = stmt.query_map(
        params![
            tenant_id,
            from.format("%Y-%m-%d").to_string(),
            to.format("%Y-%m-%d").to_string()
        ],
        |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
    )?;

    let mut out = Vec::new();
    for r in rows {
        let (subject, day_str) = r?;
        let day = NaiveDate::parse_from_str(&day_str, "%Y-%m-%d")
            .map_err(|_| AppError::InvalidDate(day_str.clone()))?;
        out.push((subject, day));
    }
    Ok(out)
}

/// Point every punch of the day at its summary row.
pub fn link_day_summary(
    conn: &Connection,
    tenant_id: &str,
    subject_id: &str,
    day: NaiveDate,
    summary_id: i64,
) -> AppResult<usize> {
    let n = conn.execute(
        "UPDATE stampings SET day_summary_id = ?1
         WHERE tenant_id = ?2 AND subject_id = ?3 AND day_key = ?4",
        params![
            summary_id,
            tenant_id,
            subject_id,
            day.format("%Y-%m-%d").to_string()
        ],
    )?;
    Ok(n)
}

pub fn count(conn: &Connection, tenant_id: &str) -> AppResult<i64> {
    let n = conn.query_row(
        "SELECT COUNT(*) FROM stampings WHERE tenant_id = ?1",
        [tenant_id],
        |row| row.get(0),
    )?;
    Ok(n)
}
