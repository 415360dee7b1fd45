use chrono::{DateTime, FixedOffset, NaiveDate, SecondsFormat};
use serde::Serialize;
use serde_json::{Map, Value, json};

/// One clock-in/out event for a subject, normalized from the upstream payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stamping {
    pub id: i64,                           // ⇔ stampings.id (0 = not stored yet)
    pub tenant_id: String,                 // ⇔ stampings.tenant_id
    pub external_id: String,               // ⇔ stampings.external_id (unique per tenant)
    pub company_id: Option<String>,        // ⇔ stampings.company_id
    pub subject_id: Option<String>,        // ⇔ stampings.subject_id (contract)
    pub user_id: Option<String>,           // ⇔ stampings.user_id
    pub timestamp: DateTime<FixedOffset>,  // ⇔ stampings.stamped_at + stamped_at_ms
    pub direction: Option<String>,         // ⇔ stampings.direction (IN/OUT, free-form)
    pub device_id: Option<String>,         // ⇔ stampings.device_id
    pub device_type: Option<String>,       // ⇔ stampings.device_type
    pub location_id: Option<String>,       // ⇔ stampings.location_id
    pub note: Option<String>,              // ⇔ stampings.note
    pub raw_payload: Value,                // ⇔ stampings.raw_payload (JSON, verbatim)
    pub day_summary_id: Option<i64>,       // ⇔ stampings.day_summary_id
}

impl Stamping {
    /// Calendar day of the timestamp in its own offset. Never stored apart
    /// from the timestamp it comes from.
    pub fn day_key(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    pub fn day_key_str(&self) -> String {
        self.day_key().format("%Y-%m-%d").to_string()
    }

    pub fn timestamp_str(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, false)
    }

    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }

    /// Normalized fields used for change detection and audit snapshots.
    /// Storage-only columns (`id`, `day_summary_id`) are left out.
    pub fn snapshot(&self) -> Map<String, Value> {
        let mut m = Map::new();
        m.insert("externalId".into(), json!(self.external_id));
        m.insert("companyId".into(), json!(self.company_id));
        m.insert("subjectId".into(), json!(self.subject_id));
        m.insert("userId".into(), json!(self.user_id));
        m.insert("timestamp".into(), json!(self.timestamp_str()));
        m.insert("dayKey".into(), json!(self.day_key_str()));
        m.insert("direction".into(), json!(self.direction));
        m.insert("deviceId".into(), json!(self.device_id));
        m.insert("deviceType".into(), json!(self.device_type));
        m.insert("locationId".into(), json!(self.location_id));
        m.insert("note".into(), json!(self.note));
        m.insert("rawPayload".into(), self.raw_payload.clone());
        m
    }
}
