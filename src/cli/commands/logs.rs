use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::status::list_sync_logs;
use crate::db::pool::DbPool;
use crate::errors::AppResult;
use crate::models::sync::SyncRunLog;
use crate::ui::messages::info;
use crate::utils::table::{Column, Table};
use serde_json::Value;

const ERROR_WRAP: usize = 70;

/// Short human form of the stored error payload.
fn error_summary(errors: &Option<Value>) -> String {
    let Some(v) = errors else {
        return String::new();
    };
    if let Some(msg) = v.get("message").and_then(Value::as_str) {
        return msg.to_string();
    }
    match v.get("plannedErrors").and_then(Value::as_array) {
        Some(list) => format!("{} planned lookup issue(s)", list.len()),
        None => v.to_string(),
    }
}

fn print_table(logs: &[SyncRunLog]) {
    let mut table = Table::new(vec![
        Column::new("ID"),
        Column::new("Status"),
        Column::new("By"),
        Column::new("Started"),
        Column::new("Finished"),
        Column::new("Fetched"),
        Column::new("Ins"),
        Column::new("Upd"),
        Column::new("Skip"),
        Column::new("Dirty"),
    ]);

    for l in logs {
        table.add_row(vec![
            l.id.to_string(),
            l.status.to_db_str().to_string(),
            l.triggered_by.clone(),
            l.started_at.clone(),
            l.finished_at.clone().unwrap_or_else(|| "--".into()),
            l.records_fetched.to_string(),
            l.records_inserted.to_string(),
            l.records_updated.to_string(),
            l.records_skipped.to_string(),
            l.dirty_days.to_string(),
        ]);
    }
    print!("{}", table.render());

    // errors below the table, wrapped
    for l in logs {
        let summary = error_summary(&l.errors);
        if summary.is_empty() {
            continue;
        }
        let wrapped = textwrap::wrap(&summary, ERROR_WRAP);
        println!("\n#{}:", l.id);
        for line in wrapped {
            println!("    {}", line);
        }
    }
}

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Logs {
        tenant,
        limit,
        json,
    } = cmd
    {
        let pool = DbPool::open(&cfg.database)?;
        let logs = list_sync_logs(&pool.conn, tenant, *limit)?;

        if *json {
            println!("{}", serde_json::to_string_pretty(&logs)?);
            return Ok(());
        }

        if logs.is_empty() {
            info(format!("No sync runs recorded for tenant '{}'.", tenant));
            return Ok(());
        }

        print_table(&logs);
    }

    Ok(())
}
