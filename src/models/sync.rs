use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Success,
    Failed,
}

impl RunStatus {
    /// Convert enum → DB string
    pub fn to_db_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Success => "success",
            RunStatus::Failed => "failed",
        }
    }

    /// Convert DB string → enum
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "running" => Some(RunStatus::Running),
            "success" => Some(RunStatus::Success),
            "failed" => Some(RunStatus::Failed),
            _ => None,
        }
    }
}

/// One row per tenant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRunState {
    pub tenant_id: String,
    pub company_id: Option<String>,
    pub window_days: i64,
    pub last_sync_at: Option<String>,
    pub last_successful_sync_at: Option<String>,
}

/// One row per run attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRunLog {
    pub id: i64,
    pub tenant_id: String,
    pub company_id: Option<String>,
    pub status: RunStatus,
    pub triggered_by: String,
    pub range_from: String,
    pub range_to: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub records_fetched: i64,
    pub records_inserted: i64,
    pub records_updated: i64,
    pub records_skipped: i64,
    pub dirty_days: i64,
    pub errors: Option<Value>,
}

/// Compact view of the latest run, without the error payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncLogSummary {
    pub id: i64,
    pub status: RunStatus,
    pub range_from: String,
    pub range_to: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub records_fetched: i64,
    pub records_inserted: i64,
    pub records_updated: i64,
    pub records_skipped: i64,
}

impl From<&SyncRunLog> for SyncLogSummary {
    fn from(log: &SyncRunLog) -> Self {
        Self {
            id: log.id,
            status: log.status,
            range_from: log.range_from.clone(),
            range_to: log.range_to.clone(),
            started_at: log.started_at.clone(),
            finished_at: log.finished_at.clone(),
            records_fetched: log.records_fetched,
            records_inserted: log.records_inserted,
            records_updated: log.records_updated,
            records_skipped: log.records_skipped,
        }
    }
}

/// Answer of `sync_status`: run state (or defaults) plus the latest run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub tenant_id: String,
    pub company_id: Option<String>,
    pub last_sync_at: Option<String>,
    pub last_successful_sync_at: Option<String>,
    pub window_days: i64,
    pub last_log: Option<SyncLogSummary>,
}

/// Counters collected while a run progresses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStats {
    pub fetched: i64,
    pub inserted: i64,
    pub updated: i64,
    pub skipped: i64,
    pub dirty_days: i64,
    pub rebuilt_days: i64,
}
