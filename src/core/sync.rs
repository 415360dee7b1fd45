//! Sync orchestrator: run bookkeeping around fetch → upsert → rebuild.

use crate::config::Config;
use crate::core::credentials::{Credentials, env_credentials, process_env, resolve_credentials};
use crate::core::dirty::DirtyDays;
use crate::core::rebuild::{LookupTimeouts, PlannedFailure, PlannedLookup, RebuildLogic};
use crate::core::upsert::UpsertLogic;
use crate::db::log::{ttlog, ttlog_quiet};
use crate::db::pool::DbPool;
use crate::db::{settings, stampings, sync_log, sync_state};
use crate::errors::{AppError, AppResult};
use crate::models::settings::DEFAULT_API_KEY_HEADER;
use crate::models::sync::SyncStats;
use crate::upstream::Transport;
use crate::upstream::stampings::fetch_stampings;
use crate::utils::date::{end_of_day, start_of_day, to_db_ts, today};
use chrono::{Duration, NaiveDate, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use std::time::Duration as StdDuration;

pub const DEFAULT_WINDOW_DAYS: i64 = 14;
pub const MAX_WINDOW_DAYS: i64 = 60;
pub const DEFAULT_STALE_RUN_MINUTES: i64 = 10;

/// Unset or non-positive → `default`; anything above the maximum → maximum.
pub fn clamp_window_days(value: Option<i64>, default: i64) -> i64 {
    match value {
        Some(v) if v > 0 => v.min(MAX_WINDOW_DAYS),
        _ => default.clamp(1, MAX_WINDOW_DAYS),
    }
}

/// Inclusive day range ending on `today` and spanning `window_days` days.
pub fn compute_window(today: NaiveDate, window_days: i64) -> (NaiveDate, NaiveDate) {
    (today - Duration::days(window_days - 1), today)
}

#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub default_window_days: i64,
    pub stale_run_minutes: i64,
    pub stampings_timeout: StdDuration,
    pub lookups: LookupTimeouts,
    pub api_key_header: String,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            default_window_days: DEFAULT_WINDOW_DAYS,
            stale_run_minutes: DEFAULT_STALE_RUN_MINUTES,
            stampings_timeout: StdDuration::from_secs(30),
            lookups: LookupTimeouts::default(),
            api_key_header: DEFAULT_API_KEY_HEADER.to_string(),
        }
    }
}

impl From<&Config> for EngineOptions {
    fn from(cfg: &Config) -> Self {
        Self {
            default_window_days: cfg.default_window_days,
            stale_run_minutes: cfg.stale_run_minutes,
            stampings_timeout: StdDuration::from_secs(cfg.stampings_timeout_secs),
            lookups: LookupTimeouts {
                calendar: StdDuration::from_secs(cfg.lookup_timeout_secs),
                directory: StdDuration::from_secs(cfg.directory_timeout_secs),
                planned: StdDuration::from_secs(cfg.lookup_timeout_secs),
            },
            api_key_header: cfg.api_key_header.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRunResult {
    pub run_id: i64,
    pub stats: SyncStats,
    pub planned_errors: Vec<PlannedFailure>,
}

/// Runs syncs against one database through one transport.
pub struct SyncEngine<'a> {
    pool: &'a mut DbPool,
    transport: &'a dyn Transport,
    options: EngineOptions,
    env: Option<Credentials>,
}

impl<'a> SyncEngine<'a> {
    /// Environment credentials are read from the process environment.
    pub fn new(pool: &'a mut DbPool, transport: &'a dyn Transport, options: EngineOptions) -> Self {
        let env = env_credentials(process_env, &options.api_key_header);
        Self {
            pool,
            transport,
            options,
            env,
        }
    }

    /// Replace the environment tier with another variable source.
    pub fn with_env_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        self.env = env_credentials(lookup, &self.options.api_key_header);
        self
    }

    pub fn run_sync(
        &mut self,
        tenant_id: &str,
        triggered_by: &str,
        window_days: Option<i64>,
    ) -> AppResult<SyncRunResult> {
        let tenant_id = tenant_id.trim();
        if tenant_id.is_empty() {
            return Err(AppError::InvalidTenant("tenant id must not be empty".into()));
        }

        // 1) credentials and window
        let stored = settings::load(&self.pool.conn, tenant_id)?;
        let creds = resolve_credentials(stored, self.env.clone());
        let company_id = creds.as_ref().and_then(|c| c.company_id.clone());

        let state = sync_state::load(&self.pool.conn, tenant_id)?;
        let requested = window_days.or(state.map(|s| s.window_days));
        let window = clamp_window_days(requested, self.options.default_window_days);
        let (from, to) = compute_window(today(), window);
        let range_from = to_db_ts(start_of_day(from));
        let range_to = to_db_ts(end_of_day(to));

        // 2) run state, stale sweep, log row
        let now = Utc::now();
        sync_state::touch_run_start(
            &self.pool.conn,
            tenant_id,
            company_id.as_deref(),
            window,
            &to_db_ts(now),
        )?;

        let cutoff = to_db_ts(now - Duration::minutes(self.options.stale_run_minutes));
        let swept = sync_log::sweep_stale(&self.pool.conn, tenant_id, &cutoff, &to_db_ts(now))?;
        if swept > 0 {
            log::warn!("{swept} abandoned run(s) of {tenant_id} marked as failed");
            ttlog(
                &self.pool.conn,
                "stale_sweep",
                tenant_id,
                &format!("{swept} stale run(s) marked failed"),
            )?;
        }

        let run_id = sync_log::create_running(
            &self.pool.conn,
            tenant_id,
            company_id.as_deref(),
            triggered_by,
            &range_from,
            &range_to,
            &to_db_ts(now),
        )?;
        // from here on every exit path must close the log row
        ttlog_quiet(
            &self.pool.conn,
            "sync_start",
            tenant_id,
            &format!("run {run_id}: {from} → {to} ({window} days), by {triggered_by}"),
        );
        log::info!("sync run {run_id} started for {tenant_id}: {from} → {to}");

        // 3) the actual work
        let mut stats = SyncStats::default();
        let mut planned_errors = Vec::new();
        let outcome = self.execute(
            tenant_id,
            company_id.as_deref(),
            creds.as_ref(),
            triggered_by,
            (from, to),
            &mut stats,
            &mut planned_errors,
        );

        // 4) finalize
        let finished_at = to_db_ts(Utc::now());
        let outcome = outcome.and_then(|()| {
            let errors = if planned_errors.is_empty() {
                None
            } else {
                Some(json!({ "plannedErrors": planned_errors }))
            };
            self.close_success(run_id, tenant_id, &stats, errors.as_ref(), &finished_at)
        });

        match outcome {
            Ok(()) => {
                ttlog_quiet(
                    &self.pool.conn,
                    "sync_success",
                    tenant_id,
                    &format!(
                        "run {run_id}: fetched {}, inserted {}, updated {}, skipped {}, dirty days {}",
                        stats.fetched, stats.inserted, stats.updated, stats.skipped, stats.dirty_days
                    ),
                );
                log::info!("sync run {run_id} finished: {stats:?}");

                Ok(SyncRunResult {
                    run_id,
                    stats,
                    planned_errors,
                })
            }
            Err(e) => {
                let details: Value = e.details();
                if let Err(log_err) =
                    sync_log::finish_failed(&self.pool.conn, run_id, &stats, &details, &finished_at)
                {
                    log::error!("could not mark run {run_id} as failed: {log_err}");
                }
                ttlog_quiet(&self.pool.conn, "sync_failed", tenant_id, &format!("run {run_id}: {e}"));
                log::error!("sync run {run_id} failed: {e}");
                Err(e)
            }
        }
    }

    /// Log row and run state flip to success together or not at all.
    fn close_success(
        &mut self,
        run_id: i64,
        tenant_id: &str,
        stats: &SyncStats,
        errors: Option<&Value>,
        finished_at: &str,
    ) -> AppResult<()> {
        let tx = self.pool.conn.transaction()?;
        sync_log::finish_success(&tx, run_id, stats, errors, finished_at)?;
        sync_state::mark_success(&tx, tenant_id, finished_at)?;
        tx.commit()?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn execute(
        &mut self,
        tenant_id: &str,
        company_id: Option<&str>,
        creds: Option<&Credentials>,
        triggered_by: &str,
        (from, to): (NaiveDate, NaiveDate),
        stats: &mut SyncStats,
        planned_errors: &mut Vec<PlannedFailure>,
    ) -> AppResult<()> {
        let creds = creds.ok_or_else(|| {
            AppError::Configuration(
                "provider settings missing: save tenant settings or set TIMESYNC_* variables".into(),
            )
        })?;

        // fetch + upsert
        let items = fetch_stampings(
            self.transport,
            creds,
            Some(from),
            Some(to),
            self.options.stampings_timeout,
        )?;
        stats.fetched = items.len() as i64;

        let report = UpsertLogic::apply(&mut self.pool.conn, tenant_id, company_id, &items, triggered_by)?;
        stats.inserted = report.inserted;
        stats.updated = report.updated;
        stats.skipped = report.skipped;
        stats.dirty_days = report.dirty.len() as i64;

        // window-complete dirty set
        let mut days = DirtyDays::new();
        days.union(&report.dirty);
        days.extend(stampings::distinct_days_in_range(&self.pool.conn, tenant_id, from, to)?);

        // rebuild
        let mut lookup = PlannedLookup::new(self.transport, creds, self.options.lookups);
        for pair in days.iter() {
            RebuildLogic::rebuild_day(
                &mut self.pool.conn,
                tenant_id,
                company_id,
                pair,
                Some(&mut lookup),
                planned_errors,
            )?;
            stats.rebuilt_days += 1;
        }

        Ok(())
    }
}
