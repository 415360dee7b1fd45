//! Date/time helpers: parsing heterogeneous upstream instants, window
//! boundaries and the timestamp format stored in the database.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use serde_json::Value;

/// Naive layouts accepted from upstream; read as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Offset-carrying layouts that are not strict RFC 3339.
const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z", "%Y-%m-%dT%H:%M:%S%.f%z"];

/// Epoch values at or above this are milliseconds, below are seconds.
const EPOCH_MILLIS_THRESHOLD: i64 = 100_000_000_000;

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

fn from_epoch(n: i64) -> Option<DateTime<FixedOffset>> {
    let ms = if n.unsigned_abs() >= EPOCH_MILLIS_THRESHOLD as u64 {
        n
    } else {
        n.checked_mul(1000)?
    };
    DateTime::from_timestamp_millis(ms).map(|dt| dt.fixed_offset())
}

/// Fractional epochs are truncated; non-finite or out-of-range values are rejected.
fn float_epoch(f: f64) -> Option<i64> {
    if !f.is_finite() || f < i64::MIN as f64 || f >= i64::MAX as f64 {
        return None;
    }
    Some(f as i64)
}

/// Parse an instant keeping the offset it was written with.
pub fn parse_instant_str(s: &str) -> Option<DateTime<FixedOffset>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }

    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }

    for fmt in NAIVE_FORMATS {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ndt.and_utc().fixed_offset());
        }
    }

    if let Some(d) = parse_date(s) {
        return Some(d.and_time(NaiveTime::MIN).and_utc().fixed_offset());
    }

    if s.chars().all(|c| c.is_ascii_digit()) {
        return s.parse::<i64>().ok().and_then(from_epoch);
    }

    None
}

/// Strings and epoch numbers; anything else is not an instant.
pub fn parse_instant(value: &Value) -> Option<DateTime<FixedOffset>> {
    match value {
        Value::String(s) => parse_instant_str(s),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().and_then(float_epoch))
            .and_then(from_epoch),
        _ => None,
    }
}

/// Uniform UTC format for run bookkeeping columns; sorts lexically.
pub fn to_db_ts(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn start_of_day(d: NaiveDate) -> DateTime<Utc> {
    d.and_time(NaiveTime::MIN).and_utc()
}

pub fn end_of_day(d: NaiveDate) -> DateTime<Utc> {
    let last = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
    d.and_time(last).and_utc()
}
