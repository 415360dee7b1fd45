use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::sync::{EngineOptions, SyncEngine};
use crate::db::pool::DbPool;
use crate::db::{summaries, sync_log};
use crate::errors::AppResult;
use crate::models::sync::SyncRunLog;
use crate::upstream::UreqTransport;
use crate::ui::messages::{header, success, warning};
use crate::utils::date::parse_date;
use crate::utils::formatting::or_dash;
use crate::utils::mins2readable;
use crate::utils::table::{Column, Table};
use chrono::NaiveDate;

/// Day range covered by a run, from its stored boundaries.
fn run_days(log: &SyncRunLog) -> Option<(NaiveDate, NaiveDate)> {
    let from = parse_date(log.range_from.get(..10)?)?;
    let to = parse_date(log.range_to.get(..10)?)?;
    Some((from, to))
}

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Sync {
        tenant,
        window_days,
        by,
    } = cmd
    {
        let mut pool = DbPool::open(&cfg.database)?;
        let transport = UreqTransport::default();

        let result = {
            let mut engine = SyncEngine::new(&mut pool, &transport, EngineOptions::from(cfg));
            engine.run_sync(tenant, by, *window_days)?
        };

        let s = &result.stats;
        success(format!(
            "Run #{} completed: fetched {}, inserted {}, updated {}, skipped {}, dirty days {}, rebuilt days {}",
            result.run_id, s.fetched, s.inserted, s.updated, s.skipped, s.dirty_days, s.rebuilt_days
        ));

        for f in &result.planned_errors {
            warning(format!(
                "{} {} [{}]: {}",
                f.subject_id,
                f.day,
                f.stage.as_str(),
                f.message
            ));
        }

        // Summary of the window just synced
        let window = sync_log::find(&pool.conn, result.run_id)?
            .as_ref()
            .and_then(run_days);

        if let Some((from, to)) = window {
            let rows = summaries::list_range(&pool.conn, tenant, from, to)?;
            if rows.is_empty() {
                return Ok(());
            }

            println!();
            header(format!("Day summaries {} → {}", from, to));
            let mut table = Table::new(vec![
                Column::new("Subject"),
                Column::new("Day"),
                Column::new("Worked"),
                Column::new("Planned shift"),
                Column::new("Planned location"),
            ]);
            for r in rows {
                table.add_row(vec![
                    r.subject_id,
                    r.day.to_string(),
                    r.minutes_worked
                        .map(|m| mins2readable(m, false, true))
                        .unwrap_or_else(|| "--".into()),
                    or_dash(r.planned_shift.as_deref()),
                    or_dash(r.planned_location.as_deref()),
                ]);
            }
            print!("{}", table.render());
        }
    }

    Ok(())
}
