use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::status::sync_status;
use crate::db::pool::DbPool;
use crate::errors::AppResult;
use crate::ui::messages::{field, header, info};
use crate::utils::colors::{RESET, color_for_status, colorize_optional};
use crate::utils::formatting::{bold, or_dash};

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Status { tenant, json } = cmd {
        let pool = DbPool::open(&cfg.database)?;
        let st = sync_status(&pool.conn, tenant)?;

        if *json {
            println!("{}", serde_json::to_string_pretty(&st)?);
            return Ok(());
        }

        header(format!("Sync status for {}", bold(&st.tenant_id)));
        field("Company id", colorize_optional(&or_dash(st.company_id.as_deref())));
        field("Window days", st.window_days);
        field("Last sync", colorize_optional(&or_dash(st.last_sync_at.as_deref())));
        field(
            "Last successful sync",
            colorize_optional(&or_dash(st.last_successful_sync_at.as_deref())),
        );

        match &st.last_log {
            Some(l) => {
                let status = l.status.to_db_str();
                println!();
                field("Last run", format!("#{}", l.id));
                field("Status", format!("{}{}{}", color_for_status(status), status, RESET));
                field("Range", format!("{} → {}", l.range_from, l.range_to));
                field("Started", &l.started_at);
                field("Finished", colorize_optional(&or_dash(l.finished_at.as_deref())));
                field(
                    "Records",
                    format!(
                        "fetched {}, inserted {}, updated {}, skipped {}",
                        l.records_fetched, l.records_inserted, l.records_updated, l.records_skipped
                    ),
                );
            }
            None => info("No sync run recorded yet."),
        }
    }

    Ok(())
}
