use serde::Serialize;
use serde_json::Value;

/// Audit row written when an update changes at least one normalized field.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeLogEntry {
    pub id: i64,
    pub tenant_id: String,
    pub stamping_id: i64,
    pub external_id: String,
    pub changed_by: String,
    pub change_reason: String,
    pub before: Value,
    pub after: Value,
    /// `{field: {before, after}}` for every changed field.
    pub diff: Value,
    pub changed_fields: Vec<String>,
    pub created_at: String,
}
