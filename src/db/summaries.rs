use crate::errors::{AppError, AppResult};
use crate::models::day_summary::DaySummary;
use crate::utils::date::to_db_ts;
use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

fn map_row(row: &Row) -> rusqlite::Result<DaySummary> {
    let day_str: String = row.get("day")?;
    let day = NaiveDate::parse_from_str(&day_str, "%Y-%m-%d").map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            Box::new(AppError::InvalidDate(day_str.clone())),
        )
    })?;

    Ok(DaySummary {
        id: row.get("id")?,
        tenant_id: row.get("tenant_id")?,
        company_id: row.get("company_id")?,
        subject_id: row.get("subject_id")?,
        day,
        minutes_worked: row.get("minutes_worked")?,
        planned_shift: row.get("planned_shift")?,
        planned_location: row.get("planned_location")?,
        source: row.get("source")?,
    })
}

fn day_str(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

/// Lookup by natural key. A missing company only matches a missing company.
pub fn find(
    conn: &Connection,
    tenant_id: &str,
    company_id: Option<&str>,
    subject_id: &str,
    day: NaiveDate,
) -> AppResult<Option<DaySummary>> {
    let found = conn
        .query_row(
            "SELECT * FROM stamping_day_summaries
             WHERE tenant_id = ?1 AND company_id IS ?2 AND subject_id = ?3 AND day = ?4",
            params![tenant_id, company_id, subject_id, day_str(day)],
            map_row,
        )
        .optional()?;
    Ok(found)
}

/// Create or overwrite the row for the summary's natural key; returns its id.
pub fn upsert(conn: &Connection, s: &DaySummary) -> AppResult<i64> {
    let now = to_db_ts(Utc::now());

    if let Some(existing) = find(
        conn,
        &s.tenant_id,
        s.company_id.as_deref(),
        &s.subject_id,
        s.day,
    )? {
        conn.execute(
            "UPDATE stamping_day_summaries SET
                minutes_worked = ?1, planned_shift = ?2, planned_location = ?3,
                source = ?4, updated_at = ?5
             WHERE id = ?6",
            params![
                s.minutes_worked,
                s.planned_shift,
                s.planned_location,
                s.source,
                now,
                existing.id
            ],
        )?;
        return Ok(existing.id);
    }

    conn.execute(
        "INSERT INTO stamping_day_summaries (
            tenant_id, company_id, subject_id, day, minutes_worked,
            planned_shift, planned_location, source, updated_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            s.tenant_id,
            s.company_id,
            s.subject_id,
            day_str(s.day),
            s.minutes_worked,
            s.planned_shift,
            s.planned_location,
            s.source,
            now
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn delete(
    conn: &Connection,
    tenant_id: &str,
    company_id: Option<&str>,
    subject_id: &str,
    day: NaiveDate,
) -> AppResult<usize> {
    let n = conn.execute(
        "DELETE FROM stamping_day_summaries
         WHERE tenant_id = ?1 AND company_id IS ?2 AND subject_id = ?3 AND day = ?4",
        params![tenant_id, company_id, subject_id, day_str(day)],
    )?;
    Ok(n)
}

/// Every summary of a tenant between two days, for reporting.
pub fn list_range(
    conn: &Connection,
    tenant_id: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> AppResult<Vec<DaySummary>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM stamping_day_summaries
         WHERE tenant_id = ?1 AND day BETWEEN ?2 AND ?3
         ORDER BY day ASC, subject_id ASC",
    )?;
    let rows = stmt.query_map(params![tenant_id, day_str(from), day_str(to)], map_row)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}
