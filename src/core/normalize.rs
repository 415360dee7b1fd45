//! Raw upstream punch → [`Stamping`], driven by per-field alias tables.

use crate::models::stamping::Stamping;
use crate::utils::date::parse_instant;
use crate::utils::json::pick_first_string;
use chrono::{DateTime, FixedOffset};
use serde_json::Value;

pub const EXTERNAL_ID_ALIASES: &[&str] = &["id", "stamping_id", "stampingId", "uuid", "_id"];
pub const TIMESTAMP_ALIASES: &[&str] = &[
    "timestamp",
    "time",
    "server_clock_at",
    "clock_at",
    "stamping_at",
    "date_time",
];
pub const SUBJECT_ALIASES: &[&str] = &["contract_id", "contractId", "contract"];
pub const USER_ALIASES: &[&str] = &["user_id", "userId", "user"];
pub const DIRECTION_ALIASES: &[&str] = &["direction", "clock_type", "type"];
pub const DEVICE_ID_ALIASES: &[&str] = &["device_id", "deviceId", "clock_id"];
pub const DEVICE_TYPE_ALIASES: &[&str] = &["stamping_device_type", "device_type"];
pub const LOCATION_ALIASES: &[&str] = &["subsidiary_id", "subsidiaryId", "workplace_id"];
pub const NOTE_ALIASES: &[&str] = &["note", "notes"];

/// First alias that parses to an instant; unparseable values fall through.
fn pick_first_instant(raw: &Value, aliases: &[&str]) -> Option<DateTime<FixedOffset>> {
    let obj = raw.as_object()?;
    aliases
        .iter()
        .find_map(|key| obj.get(*key).and_then(parse_instant))
}

/// `None` means skip: no external id, or no parseable timestamp.
pub fn normalize(raw: &Value, tenant_id: &str, company_id: Option<&str>) -> Option<Stamping> {
    let external_id = pick_first_string(raw, EXTERNAL_ID_ALIASES)?;
    let timestamp = pick_first_instant(raw, TIMESTAMP_ALIASES)?;

    Some(Stamping {
        id: 0,
        tenant_id: tenant_id.to_string(),
        external_id,
        company_id: company_id.map(str::to_string),
        subject_id: pick_first_string(raw, SUBJECT_ALIASES),
        user_id: pick_first_string(raw, USER_ALIASES),
        timestamp,
        direction: pick_first_string(raw, DIRECTION_ALIASES),
        device_id: pick_first_string(raw, DEVICE_ID_ALIASES),
        device_type: pick_first_string(raw, DEVICE_TYPE_ALIASES),
        location_id: pick_first_string(raw, LOCATION_ALIASES),
        note: pick_first_string(raw, NOTE_ALIASES),
        raw_payload: raw.clone(),
        day_summary_id: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_aliases_and_keeps_payload() {
        let raw = json!({
            "stampingId": "s-1",
            "clock_at": "2025-03-10T08:58:00+01:00",
            "contractId": "K1",
            "user": 77,
            "clock_type": "IN",
            "clock_id": "dev-9",
            "workplace_id": "SUB-1",
            "notes": ""
        });

        let s = normalize(&raw, "acme", Some("C1")).unwrap();
        assert_eq!(s.external_id, "s-1");
        assert_eq!(s.subject_id.as_deref(), Some("K1"));
        assert_eq!(s.user_id.as_deref(), Some("77"));
        assert_eq!(s.direction.as_deref(), Some("IN"));
        assert_eq!(s.device_id.as_deref(), Some("dev-9"));
        assert_eq!(s.location_id.as_deref(), Some("SUB-1"));
        assert_eq!(s.note, None);
        assert_eq!(s.company_id.as_deref(), Some("C1"));
        assert_eq!(s.day_key_str(), "2025-03-10");
        assert_eq!(s.raw_payload, raw);
    }

    #[test]
    fn day_key_follows_the_timestamp_offset() {
        let raw = json!({"id": 1, "timestamp": "2025-03-10T23:30:00-05:00"});
        assert_eq!(normalize(&raw, "t", None).unwrap().day_key_str(), "2025-03-10");
    }

    #[test]
    fn later_timestamp_alias_is_used_when_earlier_is_garbage() {
        let raw = json!({"id": "a", "timestamp": "n/a", "date_time": "2025-01-02 10:00:00"});
        let s = normalize(&raw, "t", None).unwrap();
        assert_eq!(s.timestamp_str(), "2025-01-02T10:00:00+00:00");
    }

    #[test]
    fn missing_id_or_timestamp_skips() {
        assert!(normalize(&json!({"timestamp": "2025-01-02T10:00:00Z"}), "t", None).is_none());
        assert!(normalize(&json!({"id": "x"}), "t", None).is_none());
        assert!(normalize(&json!({"id": "x", "time": "soon"}), "t", None).is_none());
        assert!(normalize(&json!("not an object"), "t", None).is_none());
    }

    #[test]
    fn out_of_range_epoch_skips() {
        assert!(normalize(&json!({"id": "a", "timestamp": i64::MIN}), "t", None).is_none());
        assert!(normalize(&json!({"id": "a", "timestamp": -1e30}), "t", None).is_none());
        assert!(normalize(&json!({"id": "a", "timestamp": f64::MAX}), "t", None).is_none());
    }
}
