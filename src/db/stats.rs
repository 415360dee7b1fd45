use crate::db::pool::DbPool;
use crate::utils::colors::{CYAN, GREEN, GREY, RESET, YELLOW};
use rusqlite::OptionalExtension;
use std::fs;

fn count(pool: &DbPool, table: &str) -> rusqlite::Result<i64> {
    pool.conn
        .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
}

pub fn print_db_info(pool: &DbPool, db_path: &str) -> rusqlite::Result<()> {
    println!();

    //
    // 1) FILE SIZE
    //
    let file_size = fs::metadata(db_path).map(|m| m.len()).unwrap_or(0);
    let file_mb = (file_size as f64) / (1024.0 * 1024.0);

    println!("{}• File:{} {}{}{}", CYAN, RESET, YELLOW, db_path, RESET);
    println!("{}• Size:{} {:.2} MB", CYAN, RESET, file_mb);

    //
    // 2) ROW COUNTS
    //
    let tenants: i64 = pool.conn.query_row(
        "SELECT COUNT(DISTINCT tenant_id) FROM stampings",
        [],
        |row| row.get(0),
    )?;
    println!("{}• Tenants:{} {}{}{}", CYAN, RESET, GREEN, tenants, RESET);

    for (label, table) in [
        ("Stampings", "stampings"),
        ("Day summaries", "stamping_day_summaries"),
        ("Change log entries", "stamping_change_log"),
        ("Sync runs", "sync_log"),
    ] {
        println!(
            "{}• {}:{} {}{}{}",
            CYAN,
            label,
            RESET,
            GREEN,
            count(pool, table)?,
            RESET
        );
    }

    //
    // 3) DAY RANGE
    //
    let first_day: Option<String> = pool
        .conn
        .query_row("SELECT MIN(day_key) FROM stampings", [], |row| row.get(0))
        .optional()?
        .flatten();
    let last_day: Option<String> = pool
        .conn
        .query_row("SELECT MAX(day_key) FROM stampings", [], |row| row.get(0))
        .optional()?
        .flatten();

    let dash = || format!("{GREY}--{RESET}");
    println!("{}• Day range:{}", CYAN, RESET);
    println!("    from: {}", first_day.unwrap_or_else(dash));
    println!("    to:   {}", last_day.unwrap_or_else(dash));

    println!();
    Ok(())
}
