use crate::core::credentials::Credentials;
use crate::core::dirty::DirtyDay;
use crate::core::planned::{
    LocationDirectory, PlannedInfo, extract_planned_info, merge_planned_location,
};
use crate::db::{stampings, summaries};
use crate::errors::AppResult;
use crate::models::day_summary::{DaySummary, SUMMARY_SOURCE};
use crate::models::stamping::Stamping;
use crate::upstream::Transport;
use crate::upstream::lookups::{fetch_calendar, fetch_location_directory, fetch_planned_location};
use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureStage {
    Calendar,
    PlannedLocation,
    NoneResolved,
}

impl FailureStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureStage::Calendar => "calendar",
            FailureStage::PlannedLocation => "planned-location",
            FailureStage::NoneResolved => "none-resolved",
        }
    }
}

/// Per-day enrichment failure; collected into the run log, never fatal.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedFailure {
    pub subject_id: String,
    pub day: String,
    pub stage: FailureStage,
    pub message: String,
}

impl PlannedFailure {
    fn new(subject_id: &str, day: NaiveDate, stage: FailureStage, message: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.to_string(),
            day: day.format("%Y-%m-%d").to_string(),
            stage,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LookupTimeouts {
    pub calendar: Duration,
    pub directory: Duration,
    pub planned: Duration,
}

impl Default for LookupTimeouts {
    fn default() -> Self {
        Self {
            calendar: Duration::from_secs(20),
            directory: Duration::from_secs(15),
            planned: Duration::from_secs(20),
        }
    }
}

/// Planned shift/location resolution for one run. The location directory is
/// fetched at most once, the company calendar at most once per day.
pub struct PlannedLookup<'a> {
    transport: &'a dyn Transport,
    creds: &'a Credentials,
    timeouts: LookupTimeouts,
    directory: Option<LocationDirectory>,
    calendars: HashMap<NaiveDate, Result<Value, String>>,
}

impl<'a> PlannedLookup<'a> {
    pub fn new(transport: &'a dyn Transport, creds: &'a Credentials, timeouts: LookupTimeouts) -> Self {
        Self {
            transport,
            creds,
            timeouts,
            directory: None,
            calendars: HashMap::new(),
        }
    }

    /// Calendar payload of `day`; a failed chain is remembered as well.
    fn calendar(&mut self, day: NaiveDate) -> Result<Value, String> {
        if let Some(cached) = self.calendars.get(&day) {
            return cached.clone();
        }
        let fetched = fetch_calendar(self.transport, self.creds, day, self.timeouts.calendar)
            .map_err(|e| e.to_string());
        self.calendars.insert(day, fetched.clone());
        fetched
    }

    fn directory(&mut self) -> &LocationDirectory {
        if self.directory.is_none() {
            let dir = match fetch_location_directory(self.transport, self.creds, self.timeouts.directory) {
                Ok(payload) => LocationDirectory::from_payload(payload),
                Err(e) => {
                    log::warn!("location directory unavailable, continuing without it: {e}");
                    LocationDirectory::empty()
                }
            };
            self.directory = Some(dir);
        }
        self.directory.get_or_insert_with(LocationDirectory::empty)
    }

    /// Calendar first; the planned-location lookup only when no location
    /// came out of it. Failures are appended to `failures`.
    pub fn resolve(
        &mut self,
        subject_id: &str,
        day: NaiveDate,
        punches: &[Stamping],
        failures: &mut Vec<PlannedFailure>,
    ) -> Option<PlannedInfo> {
        let day_key = day.format("%Y-%m-%d").to_string();
        let user_id = punches.iter().find_map(|p| p.user_id.as_deref());
        let mut planned = None;

        match self.calendar(day) {
            Ok(calendar) => {
                let directory = self.directory();
                planned = extract_planned_info(&calendar, subject_id, &day_key, directory, user_id);
            }
            Err(e) => {
                log::warn!("calendar lookup failed for {subject_id} on {day_key}: {e}");
                failures.push(PlannedFailure::new(subject_id, day, FailureStage::Calendar, e));
            }
        }

        let missing_location = planned.as_ref().is_none_or(|p: &PlannedInfo| p.location.is_empty());
        if missing_location && let Some(first) = punches.first() {
            let time = first.timestamp.naive_utc().format("%H:%M:%S").to_string();
            let direction = first
                .direction
                .as_deref()
                .map(|d| d.trim().to_uppercase())
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| "IN".to_string());

            match fetch_planned_location(
                self.transport,
                self.creds,
                subject_id,
                day,
                &time,
                &direction,
                self.timeouts.planned,
            ) {
                Ok(resp) => planned = Some(merge_planned_location(planned, &resp)),
                Err(e) => {
                    log::warn!("planned location lookup failed for {subject_id} on {day_key}: {e}");
                    failures.push(PlannedFailure::new(
                        subject_id,
                        day,
                        FailureStage::PlannedLocation,
                        e.to_string(),
                    ));
                }
            }
        }

        if planned.as_ref().is_none_or(PlannedInfo::is_empty) {
            failures.push(PlannedFailure::new(
                subject_id,
                day,
                FailureStage::NoneResolved,
                "planned shift/location not found",
            ));
        }

        planned
    }
}

/// Elapsed span between first and last punch, in whole minutes.
/// `None` with fewer than two punches. Breaks are not modelled.
pub fn minutes_worked(punches: &[Stamping]) -> Option<i64> {
    if punches.len() < 2 {
        return None;
    }
    let first = punches.first()?.timestamp_ms();
    let last = punches.last()?.timestamp_ms();
    let minutes = ((last - first) as f64 / 60_000.0).round() as i64;
    Some(minutes.max(0))
}

#[derive(Debug, Clone, PartialEq)]
pub enum RebuildOutcome {
    Upserted(DaySummary),
    Deleted,
}

pub struct RebuildLogic;

impl RebuildLogic {
    /// Recompute the aggregate of one dirty pair. Without a lookup the
    /// planned fields are left empty and no failure is recorded.
    pub fn rebuild_day(
        conn: &mut Connection,
        tenant_id: &str,
        company_id: Option<&str>,
        pair: &DirtyDay,
        lookup: Option<&mut PlannedLookup<'_>>,
        failures: &mut Vec<PlannedFailure>,
    ) -> AppResult<RebuildOutcome> {
        let punches = stampings::load_day(conn, tenant_id, &pair.subject_id, pair.day)?;

        if punches.is_empty() {
            summaries::delete(conn, tenant_id, company_id, &pair.subject_id, pair.day)?;
            log::debug!("no punches left for {} on {}, summary removed", pair.subject_id, pair.day);
            return Ok(RebuildOutcome::Deleted);
        }

        let planned = match lookup {
            Some(l) => l.resolve(&pair.subject_id, pair.day, &punches, failures),
            None => None,
        };

        let mut summary = DaySummary {
            id: 0,
            tenant_id: tenant_id.to_string(),
            company_id: company_id.map(str::to_string),
            subject_id: pair.subject_id.clone(),
            day: pair.day,
            minutes_worked: minutes_worked(&punches),
            planned_shift: planned.as_ref().and_then(PlannedInfo::shift),
            planned_location: planned.as_ref().and_then(PlannedInfo::location),
            source: SUMMARY_SOURCE.to_string(),
        };

        let tx = conn.transaction()?;
        summary.id = summaries::upsert(&tx, &summary)?;
        stampings::link_day_summary(&tx, tenant_id, &pair.subject_id, pair.day, summary.id)?;
        tx.commit()?;

        Ok(RebuildOutcome::Upserted(summary))
    }
}
