use rusqlite::{Connection, OptionalExtension, Result};

/// Ensure that the `log` table exists with the modern schema.
fn ensure_log_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS log (
            id        INTEGER PRIMARY KEY AUTOINCREMENT,
            date      TEXT NOT NULL,
            operation TEXT NOT NULL,
            target    TEXT DEFAULT '',
            message   TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type='table' AND name=?1")?;
    let exists: Option<String> = stmt.query_row([name], |row| row.get(0)).optional()?;
    Ok(exists.is_some())
}

fn column_exists(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info('{table}')"))?;
    let cols = stmt.query_map([], |row| row.get::<_, String>(1))?;

    for c in cols {
        if c? == column {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Tenant settings handed over (already decrypted) by the secrets layer.
fn create_settings_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS integration_settings (
            tenant_id      TEXT PRIMARY KEY,
            api_url        TEXT NOT NULL,
            auth_method    TEXT NOT NULL DEFAULT 'apikey' CHECK(auth_method IN ('apikey','oauth')),
            api_key_header TEXT NOT NULL DEFAULT 'x-fluida-app-uuid',
            company_id     TEXT,
            api_key        TEXT,
            oauth_token    TEXT,
            updated_at     TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

fn create_stamping_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS stamping_day_summaries (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_id        TEXT NOT NULL,
            company_id       TEXT,
            subject_id       TEXT NOT NULL,
            day              TEXT NOT NULL,
            minutes_worked   INTEGER,
            planned_shift    TEXT,
            planned_location TEXT,
            source           TEXT NOT NULL DEFAULT 'upstream',
            updated_at       TEXT NOT NULL
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_summaries_key
            ON stamping_day_summaries(tenant_id, IFNULL(company_id, ''), subject_id, day);

        CREATE TABLE IF NOT EXISTS stampings (
            id             INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_id      TEXT NOT NULL,
            external_id    TEXT NOT NULL,
            company_id     TEXT,
            subject_id     TEXT,
            user_id        TEXT,
            stamped_at     TEXT NOT NULL,
            stamped_at_ms  INTEGER NOT NULL,
            day_key        TEXT NOT NULL,
            direction      TEXT,
            device_id      TEXT,
            device_type    TEXT,
            location_id    TEXT,
            note           TEXT,
            raw_payload    TEXT NOT NULL DEFAULT 'null',
            day_summary_id INTEGER REFERENCES stamping_day_summaries(id) ON DELETE SET NULL,
            created_at     TEXT NOT NULL,
            updated_at     TEXT NOT NULL
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_stampings_tenant_external
            ON stampings(tenant_id, external_id);
        CREATE INDEX IF NOT EXISTS idx_stampings_subject_day
            ON stampings(tenant_id, subject_id, day_key);

        CREATE TABLE IF NOT EXISTS stamping_change_log (
            id             INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_id      TEXT NOT NULL,
            stamping_id    INTEGER NOT NULL REFERENCES stampings(id) ON DELETE CASCADE,
            external_id    TEXT NOT NULL,
            changed_by     TEXT NOT NULL,
            change_reason  TEXT NOT NULL,
            before_json    TEXT NOT NULL,
            after_json     TEXT NOT NULL,
            diff_json      TEXT NOT NULL,
            changed_fields TEXT NOT NULL,
            created_at     TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_change_log_stamping
            ON stamping_change_log(stamping_id);
        "#,
    )?;
    Ok(())
}

fn create_sync_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS sync_state (
            tenant_id               TEXT PRIMARY KEY,
            company_id              TEXT,
            window_days             INTEGER NOT NULL DEFAULT 14 CHECK(window_days BETWEEN 1 AND 60),
            last_sync_at            TEXT,
            last_successful_sync_at TEXT
        );

        CREATE TABLE IF NOT EXISTS sync_log (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_id        TEXT NOT NULL,
            company_id       TEXT,
            status           TEXT NOT NULL CHECK(status IN ('running','success','failed')),
            range_from       TEXT NOT NULL,
            range_to         TEXT NOT NULL,
            started_at       TEXT NOT NULL,
            finished_at      TEXT,
            records_fetched  INTEGER NOT NULL DEFAULT 0,
            records_inserted INTEGER NOT NULL DEFAULT 0,
            records_updated  INTEGER NOT NULL DEFAULT 0,
            records_skipped  INTEGER NOT NULL DEFAULT 0,
            errors           TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_sync_log_tenant_started
            ON sync_log(tenant_id, started_at);
        "#,
    )?;
    Ok(())
}

fn migration_applied(conn: &Connection, version: &str) -> Result<bool> {
    let mut chk = conn.prepare(
        "SELECT 1 FROM log
         WHERE operation = 'migration_applied' AND target = ?1
         LIMIT 1",
    )?;
    Ok(chk.query_row([version], |_| Ok(())).optional()?.is_some())
}

fn mark_applied(conn: &Connection, version: &str, message: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO log (date, operation, target, message)
         VALUES (datetime('now'), 'migration_applied', ?1, ?2)",
        [version, message],
    )?;
    Ok(())
}

/// Add a column unless it is already there, then record the migration.
fn migrate_add_column(
    conn: &Connection,
    version: &str,
    table: &str,
    column: &str,
    ddl: &str,
) -> Result<()> {
    if migration_applied(conn, version)? {
        return Ok(());
    }

    if !column_exists(conn, table, column)? {
        conn.execute(&format!("ALTER TABLE {table} ADD COLUMN {column} {ddl};"), [])?;
        ::log::info!("Migration applied: {version} → added '{column}' to {table}");
    }

    mark_applied(conn, version, &format!("Added {column} to {table}"))
}

/// Public entry point: run all pending migrations.
///
/// Invocata da db::init_db().
pub fn run_pending_migrations(conn: &Connection) -> Result<()> {
    // 1) Ensure log table
    ensure_log_table(conn)?;

    // 2) Base tables
    let fresh = !table_exists(conn, "stampings")?;
    create_settings_table(conn)?;
    create_stamping_tables(conn)?;
    create_sync_tables(conn)?;
    if fresh {
        ::log::info!("Created stamping and sync tables");
    }

    // 3) Columns introduced after the first schema
    migrate_add_column(
        conn,
        "20250410_0002_sync_log_triggered_by",
        "sync_log",
        "triggered_by",
        "TEXT NOT NULL DEFAULT ''",
    )?;
    migrate_add_column(
        conn,
        "20250522_0003_sync_log_dirty_days",
        "sync_log",
        "dirty_days",
        "INTEGER NOT NULL DEFAULT 0",
    )?;

    Ok(())
}
