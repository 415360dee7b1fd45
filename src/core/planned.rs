//! Planned shift / location extraction from calendar payloads.
//!
//! Calendar responses come in two families: per-contract entries holding a
//! nested `days` list, and flat per-contract-per-day entries whose location
//! hides inside workplace references. The rules below are evaluated in
//! priority order and the first entry yielding a shift or a location wins.

use crate::core::normalize::SUBJECT_ALIASES;
use crate::upstream::unwrap_list;
use crate::utils::json::{pick_first_string, pick_first_trimmed};
use serde_json::Value;
use std::collections::HashMap;

const CALENDAR_ENVELOPE_KEYS: &[&str] = &["data", "items"];

const NAME_KEYS: &[&str] = &["name", "full_name", "fullName", "label", "description"];
const LOCATION_NAME_KEYS: &[&str] = &[
    "subsidiary_name",
    "location",
    "site_name",
    "site",
    "location_name",
    "workplace",
    "place",
    "location_description",
];
const DAY_SHIFT_KEYS: &[&str] = &[
    "plan_name",
    "shift_name",
    "planned_name",
    "schedule",
    "type",
    "notes",
    "summary",
    "plan",
];
const ENTRY_SHIFT_KEYS: &[&str] = &["overrided_shift_name", "shift_name", "shift", "schedule", "type"];
const ENTRY_USER_KEYS: &[&str] = &["user_id", "userId"];
const DAY_KEYS: &[&str] = &["day", "date"];
const DIRECTORY_ID_KEYS: &[&str] = &["id", "subsidiary_id"];
/// Lists whose first element may carry a `workplace {id, label}` reference.
const WORKPLACE_LISTS: &[&str] = &["flexible_schedule", "actual_calendar", "schedule"];

/// Label some deployments return instead of the real location name.
const PLACEHOLDER_LOCATION: &str = "subsidiary";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlannedInfo {
    pub shift: String,
    pub location: String,
}

impl PlannedInfo {
    fn from_parts(shift: Option<String>, location: Option<String>) -> Option<Self> {
        let shift = shift.map(|s| s.trim().to_string()).unwrap_or_default();
        let location = location.map(|s| s.trim().to_string()).unwrap_or_default();
        if shift.is_empty() && location.is_empty() {
            None
        } else {
            Some(Self { shift, location })
        }
    }

    pub fn is_empty(&self) -> bool {
        self.shift.is_empty() && self.location.is_empty()
    }

    pub fn shift(&self) -> Option<String> {
        Some(self.shift.clone()).filter(|s| !s.is_empty())
    }

    pub fn location(&self) -> Option<String> {
        Some(self.location.clone()).filter(|s| !s.is_empty())
    }
}

/// Location id → display name.
#[derive(Debug, Clone, Default)]
pub struct LocationDirectory {
    names: HashMap<String, String>,
}

impl LocationDirectory {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from a raw directory payload (bare array or `items`/`data`).
    pub fn from_payload(payload: Value) -> Self {
        let items = unwrap_list(payload, crate::upstream::LIST_ENVELOPE_KEYS).unwrap_or_default();
        Self::from_items(&items)
    }

    pub fn from_items(items: &[Value]) -> Self {
        let mut names = HashMap::new();
        for it in items {
            let Some(id) = pick_first_string(it, DIRECTORY_ID_KEYS) else {
                continue;
            };
            let name = pick_first_trimmed(it, NAME_KEYS)
                .or_else(|| pick_first_trimmed(it, &["subsidiary_name"]));
            if let Some(name) = name {
                names.insert(id, name);
            }
        }
        Self { names }
    }

    pub fn name_of(&self, id: &str) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

fn location_name(obj: &Value) -> Option<String> {
    pick_first_trimmed(obj, LOCATION_NAME_KEYS).or_else(|| pick_first_trimmed(obj, NAME_KEYS))
}

/// Swap an empty or placeholder label for the directory name of `sub_id`.
fn resolve_location(
    location: Option<String>,
    sub_id: Option<String>,
    directory: &LocationDirectory,
) -> Option<String> {
    let needs_lookup = location
        .as_deref()
        .is_none_or(|l| l.eq_ignore_ascii_case(PLACEHOLDER_LOCATION));

    if needs_lookup
        && let Some(name) = sub_id.as_deref().and_then(|id| directory.name_of(id))
    {
        return Some(name.to_string());
    }
    location
}

/// Dates are compared on their `YYYY-MM-DD` prefix.
fn same_day(value: &str, day_key: &str) -> bool {
    value.get(..10).unwrap_or(value) == day_key
}

fn first_workplace<'a>(entry: &'a Value, list: &str) -> Option<&'a Value> {
    entry.get(list)?.as_array()?.first()
}

fn workplace_field(entry: &Value, field: &str) -> Option<String> {
    WORKPLACE_LISTS.iter().find_map(|list| {
        first_workplace(entry, list)
            .and_then(|w| w.get("workplace"))
            .and_then(|w| pick_first_trimmed(w, &[field]))
    })
}

fn entry_matches(entry: &Value, subject_id: &str, user_id: Option<&str>) -> bool {
    let entry_subject = pick_first_string(entry, SUBJECT_ALIASES);
    let entry_user = pick_first_string(entry, ENTRY_USER_KEYS);
    let matches_user = match (user_id, entry_user.as_deref()) {
        (Some(u), Some(eu)) => u == eu,
        _ => false,
    };

    match entry_subject.as_deref() {
        Some(s) => s == subject_id || matches_user,
        None => matches_user || user_id.is_none(),
    }
}

fn from_days_list(
    days: &[Value],
    day_key: &str,
    directory: &LocationDirectory,
) -> Option<PlannedInfo> {
    for d in days {
        if let Some(v) = pick_first_string(d, DAY_KEYS)
            && !same_day(&v, day_key)
        {
            continue;
        }

        let shift = pick_first_trimmed(d, DAY_SHIFT_KEYS);
        let location = resolve_location(
            location_name(d),
            pick_first_string(d, &["subsidiary_id"]),
            directory,
        );
        if let Some(info) = PlannedInfo::from_parts(shift, location) {
            return Some(info);
        }
    }
    None
}

fn from_flat_entry(entry: &Value, directory: &LocationDirectory) -> Option<PlannedInfo> {
    let shift = pick_first_trimmed(entry, ENTRY_SHIFT_KEYS);

    let sub_id = pick_first_string(entry, &["subsidiary_id"])
        .or_else(|| {
            entry
                .get("subsidiary_ids")
                .and_then(Value::as_array)
                .and_then(|ids| ids.first())
                .and_then(crate::utils::json::value_as_string)
        })
        .or_else(|| workplace_field(entry, "id"))
        .or_else(|| {
            first_workplace(entry, "actual_calendar")
                .and_then(|w| pick_first_string(w, &["subsidiary_id"]))
        });

    let location = pick_first_trimmed(entry, &["subsidiary_name"])
        .or_else(|| workplace_field(entry, "label"));

    PlannedInfo::from_parts(shift, resolve_location(location, sub_id, directory))
}

/// Planned shift/location for `subject_id` on `day_key` from a calendar
/// payload. Entries match by contract id, or by user id when the entry's
/// contract differs or is absent.
pub fn extract_planned_info(
    calendar: &Value,
    subject_id: &str,
    day_key: &str,
    directory: &LocationDirectory,
    user_id: Option<&str>,
) -> Option<PlannedInfo> {
    let entries = unwrap_list(calendar.clone(), CALENDAR_ENVELOPE_KEYS)?;

    for entry in &entries {
        if !entry_matches(entry, subject_id, user_id) {
            continue;
        }

        let days = entry
            .get("days")
            .and_then(Value::as_array)
            .filter(|d| !d.is_empty());
        let has_subject = pick_first_string(entry, SUBJECT_ALIASES).is_some();

        if let (Some(days), true) = (days, has_subject) {
            if let Some(info) = from_days_list(days, day_key, directory) {
                return Some(info);
            }
        } else if let Some(entry_day) = pick_first_string(entry, DAY_KEYS) {
            if !same_day(&entry_day, day_key) {
                continue;
            }
            if let Some(info) = from_flat_entry(entry, directory) {
                return Some(info);
            }
        }
    }
    None
}

/// Merge a planned-location answer over what the calendar produced:
/// its values win only when non-empty.
pub fn merge_planned_location(current: Option<PlannedInfo>, response: &Value) -> PlannedInfo {
    let nested = response.get("subsidiary");
    let location = pick_first_trimmed(response, &["subsidiary_name", "name"])
        .or_else(|| nested.and_then(|s| pick_first_trimmed(s, &["name", "label"])));
    let shift = pick_first_trimmed(response, &["shift_name", "shift"]);

    let current = current.unwrap_or_default();
    PlannedInfo {
        shift: shift.unwrap_or(current.shift),
        location: location.unwrap_or(current.location),
    }
}
