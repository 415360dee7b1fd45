use chrono::NaiveDate;
use serde::Serialize;

pub const SUMMARY_SOURCE: &str = "upstream";

/// Per-subject, per-day aggregate keyed by `(tenant, company, subject, day)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySummary {
    pub id: i64,
    pub tenant_id: String,
    pub company_id: Option<String>,
    pub subject_id: String,
    pub day: NaiveDate,
    pub minutes_worked: Option<i64>,
    pub planned_shift: Option<String>,
    pub planned_location: Option<String>,
    pub source: String,
}
