mod common;
use common::FakeTransport;

use chrono::{Duration, NaiveDate, Utc};
use rtimesync::core::dirty::DirtyDays;
use rtimesync::core::normalize::normalize;
use rtimesync::core::settings::{SettingsInput, SettingsLogic};
use rtimesync::core::status::{list_sync_logs, sync_status};
use rtimesync::core::sync::{EngineOptions, SyncEngine, SyncRunResult, clamp_window_days};
use rtimesync::core::upsert::{UpsertLogic, UpsertOutcome, change_actor};
use rtimesync::db::pool::DbPool;
use rtimesync::db::{change_log, stampings, summaries, sync_log};
use rtimesync::errors::{AppError, AppResult};
use rtimesync::models::sync::{RunStatus, SyncStats};
use rtimesync::utils::date::{start_of_day, to_db_ts, today};
use serde_json::{Value, json};

const TENANT: &str = "acme";
const BASE: &str = "https://api.test";

fn day_str(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

fn stampings_prefix() -> String {
    format!("{BASE}/api/v1/stampings/list/C1?from_date=")
}

fn calendar_prefix(d: NaiveDate) -> String {
    format!("{BASE}/api/v1/calendar/company/C1?date={}", day_str(d))
}

fn directory_prefix() -> String {
    format!("{BASE}/api/v1/subsidiaries/company/C1?page_size=200")
}

fn punch(id: &str, day: NaiveDate, time: &str, contract: &str, direction: &str) -> Value {
    json!({
        "id": id,
        "timestamp": format!("{}T{}Z", day_str(day), time),
        "contract_id": contract,
        "user_id": "U1",
        "direction": direction
    })
}

fn pool_with_settings() -> DbPool {
    let mut pool = DbPool::in_memory().unwrap();
    let input = SettingsInput {
        api_url: Some(BASE.into()),
        company_id: Some("C1".into()),
        api_key: Some("secret".into()),
        ..Default::default()
    };
    SettingsLogic::save(&mut pool, TENANT, &input).unwrap();
    pool
}

fn run(pool: &mut DbPool, fake: &FakeTransport, window: Option<i64>) -> AppResult<SyncRunResult> {
    SyncEngine::new(pool, fake, EngineOptions::default())
        .with_env_lookup(|_| None)
        .run_sync(TENANT, "test", window)
}

fn serve_stampings(fake: &FakeTransport, items: &[Value]) {
    fake.get(&stampings_prefix(), 200, &Value::Array(items.to_vec()).to_string());
}

fn serve_planned(fake: &FakeTransport, d: NaiveDate, contract: &str) {
    let calendar = json!([{
        "contract_id": contract,
        "date": day_str(d),
        "shift_name": "Turno standard",
        "subsidiary_id": "SUB-1"
    }]);
    fake.get(&calendar_prefix(d), 200, &calendar.to_string());
    fake.get(
        &directory_prefix(),
        200,
        &json!({"items": [{"id": "SUB-1", "name": "Cantiere Nord"}]}).to_string(),
    );
}

#[test]
fn test_sync_builds_day_summary_with_planned_info() {
    let mut pool = pool_with_settings();
    let fake = FakeTransport::new();
    let d = today();

    serve_stampings(
        &fake,
        &[punch("p1", d, "08:58:00", "K1", "IN"), punch("p2", d, "17:02:00", "K1", "OUT")],
    );
    serve_planned(&fake, d, "K1");

    let res = run(&mut pool, &fake, Some(1)).unwrap();
    assert_eq!(
        res.stats,
        SyncStats {
            fetched: 2,
            inserted: 2,
            updated: 0,
            skipped: 0,
            dirty_days: 1,
            rebuilt_days: 1
        }
    );
    assert!(res.planned_errors.is_empty(), "{:?}", res.planned_errors);

    let summary = summaries::find(&pool.conn, TENANT, Some("C1"), "K1", d)
        .unwrap()
        .expect("summary for K1");
    assert_eq!(summary.minutes_worked, Some(484));
    assert_eq!(summary.planned_shift.as_deref(), Some("Turno standard"));
    assert_eq!(summary.planned_location.as_deref(), Some("Cantiere Nord"));

    // every punch of the day points at its aggregate
    let punches = stampings::load_day(&pool.conn, TENANT, "K1", d).unwrap();
    assert_eq!(punches.len(), 2);
    assert!(punches.iter().all(|p| p.day_summary_id == Some(summary.id)));

    // calendar answered with a location: no planned-location lookup
    assert!(!fake.called("planned_subsidiary"));
    assert_eq!(fake.count("/subsidiaries/"), 1);

    // auth header goes out on every call
    let calls = fake.calls();
    let first = &calls[0];
    assert!(
        first
            .headers
            .iter()
            .any(|(k, v)| k == "x-fluida-app-uuid" && v == "secret")
    );

    let log = sync_log::find(&pool.conn, res.run_id).unwrap().unwrap();
    assert_eq!(log.status, RunStatus::Success);
    assert_eq!(log.triggered_by, "test");
    assert_eq!(log.records_inserted, 2);
    assert_eq!(log.errors, None);
    assert!(log.finished_at.is_some());

    let status = sync_status(&pool.conn, TENANT).unwrap();
    assert!(status.last_sync_at.is_some());
    assert!(status.last_successful_sync_at.is_some());
    assert_eq!(status.window_days, 1);
    assert_eq!(status.company_id.as_deref(), Some("C1"));
}

#[test]
fn test_replayed_batch_changes_nothing() {
    let mut pool = pool_with_settings();
    let fake = FakeTransport::new();
    let d = today();
    serve_stampings(
        &fake,
        &[punch("p1", d, "09:00:00", "K1", "IN"), punch("p2", d, "17:30:00", "K1", "OUT")],
    );

    run(&mut pool, &fake, Some(1)).unwrap();
    let second = run(&mut pool, &fake, Some(1)).unwrap();

    assert_eq!(second.stats.fetched, 2);
    assert_eq!(second.stats.inserted, 0);
    assert_eq!(second.stats.updated, 0);
    assert_eq!(second.stats.skipped, 2);
    assert_eq!(second.stats.dirty_days, 0);
    // the window pass still refreshes every stored day
    assert_eq!(second.stats.rebuilt_days, 1);

    assert_eq!(stampings::count(&pool.conn, TENANT).unwrap(), 2);
    assert_eq!(change_log::count(&pool.conn, TENANT).unwrap(), 0);

    let summary = summaries::find(&pool.conn, TENANT, Some("C1"), "K1", d)
        .unwrap()
        .unwrap();
    assert_eq!(summary.minutes_worked, Some(510));
}

#[test]
fn test_single_field_change_is_audited_alone() {
    let mut pool = DbPool::in_memory().unwrap();
    let raw = json!({
        "id": "p1",
        "timestamp": "2025-03-10T09:00:00Z",
        "contract_id": "K1",
        "direction": "IN"
    });
    let original = normalize(&raw, TENANT, Some("C1")).unwrap();
    let mut dirty = DirtyDays::new();
    let actor = change_actor("test");

    assert_eq!(
        UpsertLogic::apply_one(&mut pool.conn, &original, &actor, &mut dirty).unwrap(),
        UpsertOutcome::Inserted
    );

    let mut changed = original.clone();
    changed.direction = Some("OUT".into());
    assert_eq!(
        UpsertLogic::apply_one(&mut pool.conn, &changed, &actor, &mut dirty).unwrap(),
        UpsertOutcome::Updated
    );

    let stored = stampings::find_by_external_id(&pool.conn, TENANT, "p1")
        .unwrap()
        .unwrap();
    assert_eq!(stored.direction.as_deref(), Some("OUT"));

    let entries = change_log::list_for_stamping(&pool.conn, stored.id).unwrap();
    assert_eq!(entries.len(), 1);
    let e = &entries[0];
    assert_eq!(e.changed_fields, vec!["direction".to_string()]);
    assert_eq!(e.diff, json!({"direction": {"before": "IN", "after": "OUT"}}));
    assert_eq!(e.before["direction"], "IN");
    assert_eq!(e.after["direction"], "OUT");
    assert_eq!(e.changed_by, "system:sync:test");
    assert_eq!(e.change_reason, "upstream_sync");

    // same punch again: no new audit row
    assert_eq!(
        UpsertLogic::apply_one(&mut pool.conn, &changed, &actor, &mut dirty).unwrap(),
        UpsertOutcome::Skipped
    );
    assert_eq!(change_log::count(&pool.conn, TENANT).unwrap(), 1);
}

#[test]
fn test_single_punch_day_has_no_minutes() {
    let mut pool = pool_with_settings();
    let fake = FakeTransport::new();
    let d = today();
    serve_stampings(&fake, &[punch("p1", d, "09:00:00", "K1", "IN")]);

    run(&mut pool, &fake, Some(1)).unwrap();

    let summary = summaries::find(&pool.conn, TENANT, Some("C1"), "K1", d)
        .unwrap()
        .unwrap();
    assert_eq!(summary.minutes_worked, None);
}

#[test]
fn test_moved_punches_remove_the_old_aggregate() {
    let mut pool = pool_with_settings();
    let fake = FakeTransport::new();
    let d = today();

    serve_stampings(
        &fake,
        &[punch("p1", d, "09:00:00", "K1", "IN"), punch("p2", d, "17:30:00", "K1", "OUT")],
    );
    run(&mut pool, &fake, Some(1)).unwrap();
    assert!(summaries::find(&pool.conn, TENANT, Some("C1"), "K1", d).unwrap().is_some());

    // upstream reassigns both punches to another contract
    serve_stampings(
        &fake,
        &[punch("p1", d, "09:00:00", "K2", "IN"), punch("p2", d, "17:30:00", "K2", "OUT")],
    );
    let res = run(&mut pool, &fake, Some(1)).unwrap();
    assert_eq!(res.stats.updated, 2);
    assert_eq!(res.stats.dirty_days, 2);

    assert!(summaries::find(&pool.conn, TENANT, Some("C1"), "K1", d).unwrap().is_none());
    let moved = summaries::find(&pool.conn, TENANT, Some("C1"), "K2", d)
        .unwrap()
        .unwrap();
    assert_eq!(moved.minutes_worked, Some(510));
    assert_eq!(change_log::count(&pool.conn, TENANT).unwrap(), 2);
}

#[test]
fn test_stampings_fall_back_to_second_candidate() {
    let mut pool = pool_with_settings();
    let fake = FakeTransport::new();
    let d = today();

    fake.get(&stampings_prefix(), 500, "boom");
    fake.get(
        &format!("{BASE}/api/v1/stampings/list/C1?start_date="),
        200,
        &json!({"data": [punch("p1", d, "09:00:00", "K1", "IN")]}).to_string(),
    );

    let res = run(&mut pool, &fake, Some(1)).unwrap();
    assert_eq!(res.stats.fetched, 1);
    assert_eq!(res.stats.inserted, 1);
    assert_eq!(fake.count("/stampings/list/"), 2);
}

#[test]
fn test_window_is_clamped_and_persisted() {
    assert_eq!(clamp_window_days(Some(200), 14), 60);
    assert_eq!(clamp_window_days(Some(0), 14), 14);
    assert_eq!(clamp_window_days(Some(-3), 14), 14);
    assert_eq!(clamp_window_days(None, 14), 14);
    assert_eq!(clamp_window_days(Some(7), 14), 7);

    let mut pool = pool_with_settings();
    let fake = FakeTransport::new();
    serve_stampings(&fake, &[]);

    let res = run(&mut pool, &fake, Some(200)).unwrap();
    let log = sync_log::find(&pool.conn, res.run_id).unwrap().unwrap();
    let expected_from = to_db_ts(start_of_day(today() - Duration::days(59)));
    assert_eq!(log.range_from, expected_from);
    assert_eq!(sync_status(&pool.conn, TENANT).unwrap().window_days, 60);

    // no explicit window: the stored one is reused
    let res = run(&mut pool, &fake, None).unwrap();
    let log = sync_log::find(&pool.conn, res.run_id).unwrap().unwrap();
    assert_eq!(log.range_from, expected_from);

    let res = run(&mut pool, &fake, Some(0)).unwrap();
    let log = sync_log::find(&pool.conn, res.run_id).unwrap().unwrap();
    assert_eq!(log.range_from, to_db_ts(start_of_day(today() - Duration::days(13))));
}

#[test]
fn test_stale_running_row_is_swept() {
    let mut pool = pool_with_settings();
    let fake = FakeTransport::new();
    serve_stampings(&fake, &[]);

    let old = to_db_ts(Utc::now() - Duration::hours(1));
    let stale_id = sync_log::create_running(&pool.conn, TENANT, Some("C1"), "cron", &old, &old, &old)
        .unwrap();
    // another tenant's abandoned run is not ours to sweep
    let foreign_id = sync_log::create_running(&pool.conn, "other", None, "cron", &old, &old, &old)
        .unwrap();
    // started inside the staleness threshold: still considered alive
    let recent = to_db_ts(Utc::now() - Duration::minutes(1));
    let recent_id =
        sync_log::create_running(&pool.conn, TENANT, Some("C1"), "cron", &recent, &recent, &recent)
            .unwrap();

    let res = run(&mut pool, &fake, Some(1)).unwrap();
    assert_ne!(res.run_id, stale_id);

    let stale = sync_log::find(&pool.conn, stale_id).unwrap().unwrap();
    assert_eq!(stale.status, RunStatus::Failed);
    assert_eq!(
        stale.errors,
        Some(json!({"message": sync_log::STALE_RUN_MESSAGE}))
    );
    assert!(stale.finished_at.is_some());

    let foreign = sync_log::find(&pool.conn, foreign_id).unwrap().unwrap();
    assert_eq!(foreign.status, RunStatus::Running);

    let alive = sync_log::find(&pool.conn, recent_id).unwrap().unwrap();
    assert_eq!(alive.status, RunStatus::Running);
    assert_eq!(alive.finished_at, None);

    let current = sync_log::find(&pool.conn, res.run_id).unwrap().unwrap();
    assert_eq!(current.status, RunStatus::Success);
}

#[test]
fn test_calendar_failure_is_not_fatal() {
    let mut pool = pool_with_settings();
    let fake = FakeTransport::new();
    let d = today();
    serve_stampings(
        &fake,
        &[punch("p1", d, "08:00:00", "K1", "IN"), punch("p2", d, "16:00:00", "K1", "OUT")],
    );
    fake.fail(&calendar_prefix(d), "connection reset");

    let res = run(&mut pool, &fake, Some(1)).unwrap();

    let stages: Vec<&str> = res.planned_errors.iter().map(|f| f.stage.as_str()).collect();
    assert_eq!(stages, vec!["calendar", "planned-location", "none-resolved"]);
    assert!(res.planned_errors.iter().all(|f| f.subject_id == "K1"));

    // planned-location tried with the first punch time and direction
    assert!(fake.called(&format!(
        "{BASE}/contracts/K1/planned_subsidiary/date/{}/time/08:00:00/direction/IN",
        day_str(d)
    )));

    let summary = summaries::find(&pool.conn, TENANT, Some("C1"), "K1", d)
        .unwrap()
        .unwrap();
    assert_eq!(summary.minutes_worked, Some(480));
    assert_eq!(summary.planned_shift, None);
    assert_eq!(summary.planned_location, None);

    let log = sync_log::find(&pool.conn, res.run_id).unwrap().unwrap();
    assert_eq!(log.status, RunStatus::Success);
    let errors = log.errors.expect("planned errors recorded");
    assert_eq!(errors["plannedErrors"].as_array().unwrap().len(), 3);
    assert_eq!(errors["plannedErrors"][0]["stage"], "calendar");
}

#[test]
fn test_planned_location_fills_missing_location() {
    let mut pool = pool_with_settings();
    let fake = FakeTransport::new();
    let d = today();
    serve_stampings(
        &fake,
        &[punch("p1", d, "07:30:00", "K1", "in"), punch("p2", d, "15:30:00", "K1", "out")],
    );
    fake.get(
        &calendar_prefix(d),
        200,
        &json!([{"contract_id": "K1", "date": day_str(d), "shift_name": "Mattina"}]).to_string(),
    );
    fake.get(
        &format!("{BASE}/contracts/K1/planned_subsidiary/"),
        200,
        &json!({"subsidiary": {"name": "Ufficio"}}).to_string(),
    );

    let res = run(&mut pool, &fake, Some(1)).unwrap();
    assert!(res.planned_errors.is_empty(), "{:?}", res.planned_errors);
    assert!(fake.called("/time/07:30:00/direction/IN"));

    let summary = summaries::find(&pool.conn, TENANT, Some("C1"), "K1", d)
        .unwrap()
        .unwrap();
    assert_eq!(summary.planned_shift.as_deref(), Some("Mattina"));
    assert_eq!(summary.planned_location.as_deref(), Some("Ufficio"));
}

#[test]
fn test_missing_credentials_fail_the_run() {
    let mut pool = DbPool::in_memory().unwrap();
    let fake = FakeTransport::new();

    let err = run(&mut pool, &fake, None).unwrap_err();
    assert!(matches!(err, AppError::Configuration(_)));
    assert!(fake.calls().is_empty());

    let logs = list_sync_logs(&pool.conn, TENANT, None).unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, RunStatus::Failed);
    let message = logs[0].errors.as_ref().unwrap()["message"].as_str().unwrap();
    assert!(message.contains("provider settings missing"));

    let status = sync_status(&pool.conn, TENANT).unwrap();
    assert!(status.last_sync_at.is_some());
    assert_eq!(status.last_successful_sync_at, None);
}

#[test]
fn test_exhausted_fetch_records_every_attempt() {
    let mut pool = pool_with_settings();
    let fake = FakeTransport::new();

    let err = run(&mut pool, &fake, Some(3)).unwrap_err();
    assert!(matches!(err, AppError::Upstream(_)));

    let log = sync_log::latest(&pool.conn, TENANT).unwrap().unwrap();
    assert_eq!(log.status, RunStatus::Failed);
    let errors = log.errors.unwrap();
    assert_eq!(errors["details"]["context"], "stampings");
    let attempts = errors["details"]["attempts"].as_array().unwrap();
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[0]["status"], 404);
    assert!(attempts[1]["url"].as_str().unwrap().contains("start_date="));
}

#[test]
fn test_environment_credentials_are_used_without_settings() {
    let mut pool = DbPool::in_memory().unwrap();
    let fake = FakeTransport::new();
    serve_stampings(&fake, &[punch("p1", today(), "09:00:00", "K1", "IN")]);

    let res = SyncEngine::new(&mut pool, &fake, EngineOptions::default())
        .with_env_lookup(|key| match key {
            "TIMESYNC_API_URL" => Some(BASE.to_string()),
            "TIMESYNC_COMPANY_ID" => Some("C1".to_string()),
            "TIMESYNC_API_KEY" => Some("from-env".to_string()),
            _ => None,
        })
        .run_sync(TENANT, "test", Some(1))
        .unwrap();

    assert_eq!(res.stats.inserted, 1);
    assert!(
        fake.calls()[0]
            .headers
            .iter()
            .any(|(_, v)| v == "from-env")
    );
}

#[test]
fn test_sync_logs_are_newest_first() {
    let mut pool = pool_with_settings();
    let fake = FakeTransport::new();
    serve_stampings(&fake, &[]);

    let a = run(&mut pool, &fake, Some(1)).unwrap().run_id;
    let b = run(&mut pool, &fake, Some(1)).unwrap().run_id;
    let c = run(&mut pool, &fake, Some(1)).unwrap().run_id;

    let ids: Vec<i64> = list_sync_logs(&pool.conn, TENANT, None)
        .unwrap()
        .iter()
        .map(|l| l.id)
        .collect();
    assert_eq!(ids, vec![c, b, a]);

    let limited = list_sync_logs(&pool.conn, TENANT, Some(2)).unwrap();
    assert_eq!(limited.len(), 2);

    let status = sync_status(&pool.conn, TENANT).unwrap();
    assert_eq!(status.last_log.map(|l| l.id), Some(c));
}

#[test]
fn test_empty_tenant_is_rejected() {
    let mut pool = pool_with_settings();
    let fake = FakeTransport::new();
    let err = SyncEngine::new(&mut pool, &fake, EngineOptions::default())
        .with_env_lookup(|_| None)
        .run_sync("   ", "test", None)
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTenant(_)));
    assert!(sync_log::latest(&pool.conn, "").unwrap().is_none());
}

#[test]
fn test_calendar_is_fetched_once_per_day() {
    let mut pool = pool_with_settings();
    let fake = FakeTransport::new();
    let d = today();
    serve_stampings(
        &fake,
        &[
            punch("a1", d, "08:00:00", "K1", "IN"),
            punch("b1", d, "08:30:00", "K2", "IN"),
            punch("c1", d, "09:00:00", "K3", "IN"),
        ],
    );
    let calendar = json!([
        {"contract_id": "K1", "date": day_str(d), "shift_name": "A", "subsidiary_id": "SUB-1"},
        {"contract_id": "K2", "date": day_str(d), "shift_name": "B", "subsidiary_id": "SUB-1"},
        {"contract_id": "K3", "date": day_str(d), "shift_name": "C", "subsidiary_id": "SUB-1"}
    ]);
    fake.get(&calendar_prefix(d), 200, &calendar.to_string());
    fake.get(
        &directory_prefix(),
        200,
        &json!([{"id": "SUB-1", "name": "Cantiere Nord"}]).to_string(),
    );

    let res = run(&mut pool, &fake, Some(1)).unwrap();
    assert_eq!(res.stats.rebuilt_days, 3);
    assert_eq!(fake.count("/api/v1/calendar/company/C1"), 1);
    assert_eq!(fake.count("/subsidiaries/"), 1);

    for (subject, shift) in [("K1", "A"), ("K2", "B"), ("K3", "C")] {
        let s = summaries::find(&pool.conn, TENANT, Some("C1"), subject, d)
            .unwrap()
            .unwrap();
        assert_eq!(s.planned_shift.as_deref(), Some(shift));
        assert_eq!(s.planned_location.as_deref(), Some("Cantiere Nord"));
    }
}

#[test]
fn test_failed_calendar_is_not_retried_for_each_subject() {
    let mut pool = pool_with_settings();
    let fake = FakeTransport::new();
    let d = today();
    serve_stampings(
        &fake,
        &[punch("a1", d, "08:00:00", "K1", "IN"), punch("b1", d, "08:30:00", "K2", "IN")],
    );

    let res = run(&mut pool, &fake, Some(1)).unwrap();

    // one chain: GET ?date, GET range, POST on the first calendar path
    assert_eq!(fake.count("/api/v1/calendar/company/C1"), 3);
    let calendar_failures: Vec<&str> = res
        .planned_errors
        .iter()
        .filter(|f| f.stage.as_str() == "calendar")
        .map(|f| f.subject_id.as_str())
        .collect();
    assert_eq!(calendar_failures, vec!["K1", "K2"]);
}

#[test]
fn test_unwritable_audit_log_does_not_strand_the_run() {
    let mut pool = pool_with_settings();
    let fake = FakeTransport::new();
    serve_stampings(&fake, &[punch("p1", today(), "09:00:00", "K1", "IN")]);
    pool.conn.execute_batch("DROP TABLE log;").unwrap();

    let res = run(&mut pool, &fake, Some(1)).unwrap();
    assert_eq!(res.stats.inserted, 1);

    let log = sync_log::find(&pool.conn, res.run_id).unwrap().unwrap();
    assert_eq!(log.status, RunStatus::Success);
    assert!(log.finished_at.is_some());
    assert!(
        sync_status(&pool.conn, TENANT)
            .unwrap()
            .last_successful_sync_at
            .is_some()
    );
}

#[test]
fn test_failed_state_update_marks_run_failed() {
    let mut pool = pool_with_settings();
    let fake = FakeTransport::new();
    serve_stampings(&fake, &[]);
    pool.conn
        .execute_batch(
            "CREATE TRIGGER block_success BEFORE UPDATE OF last_successful_sync_at ON sync_state
             BEGIN SELECT RAISE(ABORT, 'state locked'); END;",
        )
        .unwrap();

    let err = run(&mut pool, &fake, Some(1)).unwrap_err();
    assert!(matches!(err, AppError::Db(_)));

    let log = sync_log::latest(&pool.conn, TENANT).unwrap().unwrap();
    assert_eq!(log.status, RunStatus::Failed);
    assert!(log.finished_at.is_some());
    let message = log.errors.unwrap()["message"].as_str().unwrap().to_string();
    assert!(message.contains("state locked"), "{message}");

    assert_eq!(
        sync_status(&pool.conn, TENANT).unwrap().last_successful_sync_at,
        None
    );
}
