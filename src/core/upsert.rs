use crate::core::dirty::DirtyDays;
use crate::core::normalize::normalize;
use crate::db::{change_log, stampings};
use crate::errors::AppResult;
use crate::models::change_log::ChangeLogEntry;
use crate::models::stamping::Stamping;
use crate::utils::date::to_db_ts;
use crate::utils::json::diff_snapshots;
use chrono::Utc;
use rusqlite::Connection;
use serde_json::Value;

pub const CHANGE_REASON: &str = "upstream_sync";

/// Actor tag written into every change-log row of a sync run.
pub fn change_actor(triggered_by: &str) -> String {
    format!("system:sync:{triggered_by}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    Skipped,
}

/// Totals of one upsert pass plus the pairs it touched.
#[derive(Debug, Default)]
pub struct UpsertReport {
    pub inserted: i64,
    pub updated: i64,
    pub skipped: i64,
    pub dirty: DirtyDays,
}

/// High-level logic for the change-aware punch upsert.
pub struct UpsertLogic;

impl UpsertLogic {
    /// Insert, update-with-audit or no-op for one normalized punch.
    /// Every write runs in its own transaction.
    pub fn apply_one(
        conn: &mut Connection,
        incoming: &Stamping,
        actor: &str,
        dirty: &mut DirtyDays,
    ) -> AppResult<UpsertOutcome> {
        let tx = conn.transaction()?;

        let Some(existing) =
            stampings::find_by_external_id(&tx, &incoming.tenant_id, &incoming.external_id)?
        else {
            stampings::insert(&tx, incoming)?;
            tx.commit()?;
            dirty.mark(incoming.subject_id.as_deref(), incoming.day_key());
            return Ok(UpsertOutcome::Inserted);
        };

        let before = existing.snapshot();
        let after = incoming.snapshot();
        let diff = diff_snapshots(&before, &after);

        if diff.is_empty() {
            // nothing written, the transaction is simply dropped
            return Ok(UpsertOutcome::Skipped);
        }

        let changed_fields: Vec<String> = diff.keys().cloned().collect();
        let entry = ChangeLogEntry {
            id: 0,
            tenant_id: existing.tenant_id.clone(),
            stamping_id: existing.id,
            external_id: existing.external_id.clone(),
            changed_by: actor.to_string(),
            change_reason: CHANGE_REASON.to_string(),
            before: Value::Object(before),
            after: Value::Object(after),
            diff: Value::Object(diff),
            changed_fields,
            created_at: to_db_ts(Utc::now()),
        };

        change_log::insert(&tx, &entry)?;
        stampings::update(&tx, existing.id, incoming)?;
        tx.commit()?;

        dirty.mark(incoming.subject_id.as_deref(), incoming.day_key());
        // the punch left its old (subject, day): that aggregate must go too
        dirty.mark(existing.subject_id.as_deref(), existing.day_key());

        Ok(UpsertOutcome::Updated)
    }

    /// Normalize and upsert a raw batch. Unusable items count as skipped.
    pub fn apply(
        conn: &mut Connection,
        tenant_id: &str,
        company_id: Option<&str>,
        items: &[Value],
        triggered_by: &str,
    ) -> AppResult<UpsertReport> {
        let actor = change_actor(triggered_by);
        let mut report = UpsertReport::default();

        for raw in items {
            let Some(stamping) = normalize(raw, tenant_id, company_id) else {
                log::debug!("skipping unusable stamping payload: {raw}");
                report.skipped += 1;
                continue;
            };

            match Self::apply_one(conn, &stamping, &actor, &mut report.dirty)? {
                UpsertOutcome::Inserted => report.inserted += 1,
                UpsertOutcome::Updated => report.updated += 1,
                UpsertOutcome::Skipped => report.skipped += 1,
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::pool::DbPool;
    use serde_json::json;

    fn punch(id: &str, ts: &str, direction: &str) -> Value {
        json!({"id": id, "timestamp": ts, "contract_id": "K1", "direction": direction})
    }

    #[test]
    fn replayed_batch_is_a_no_op() {
        let mut pool = DbPool::in_memory().unwrap();
        let batch = vec![
            punch("a", "2025-03-10T09:00:00Z", "IN"),
            punch("a", "2025-03-10T09:00:00Z", "IN"),
        ];

        let r = UpsertLogic::apply(&mut pool.conn, "acme", None, &batch, "test").unwrap();
        assert_eq!((r.inserted, r.updated, r.skipped), (1, 0, 1));
        assert_eq!(r.dirty.len(), 1);

        let r = UpsertLogic::apply(&mut pool.conn, "acme", None, &batch, "test").unwrap();
        assert_eq!((r.inserted, r.updated, r.skipped), (0, 0, 2));
        assert!(r.dirty.is_empty());

        assert_eq!(stampings::count(&pool.conn, "acme").unwrap(), 1);
        assert_eq!(change_log::count(&pool.conn, "acme").unwrap(), 0);
    }

    #[test]
    fn direction_change_is_audited() {
        let mut pool = DbPool::in_memory().unwrap();
        let first = vec![json!({"id": "a", "timestamp": "2025-03-10T09:00:00Z", "contract_id": "K1", "direction": "IN"})];
        UpsertLogic::apply(&mut pool.conn, "acme", None, &first, "test").unwrap();

        // the raw payload changes together with the normalized field
        let second = vec![json!({"id": "a", "timestamp": "2025-03-10T09:00:00Z", "contract_id": "K1", "direction": "OUT"})];
        let r = UpsertLogic::apply(&mut pool.conn, "acme", None, &second, "cli").unwrap();
        assert_eq!(r.updated, 1);

        let stored = stampings::find_by_external_id(&pool.conn, "acme", "a")
            .unwrap()
            .unwrap();
        assert_eq!(stored.direction.as_deref(), Some("OUT"));

        let entries = change_log::list_for_stamping(&pool.conn, stored.id).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].changed_fields, vec!["direction", "rawPayload"]);
        assert_eq!(entries[0].diff["direction"], json!({"before": "IN", "after": "OUT"}));
        assert_eq!(entries[0].changed_by, "system:sync:cli");
        assert_eq!(entries[0].change_reason, CHANGE_REASON);
    }
}
