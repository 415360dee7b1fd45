use clap::{Parser, Subcommand};

/// Command-line interface definition for rTimesync
/// CLI application to sync time-clock stampings into SQLite
#[derive(Parser)]
#[command(
    name = "rtimesync",
    version = env!("CARGO_PKG_VERSION"),
    about = "Sync time-clock stampings from an upstream provider and rebuild per-day summaries in SQLite",
    long_about = None
)]
pub struct Cli {
    /// Override database path (useful for tests or custom DB)
    #[arg(global = true, long = "db")]
    pub db: Option<String>,

    /// Run in test mode (no config file update)
    #[arg(global = true, long = "test", hide = true)]
    pub test: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database and configuration
    Init,

    /// Manage the configuration file (view or edit)
    Config {
        #[arg(long = "print", help = "Print the current configuration file")]
        print_config: bool,

        #[arg(
            long = "edit",
            help = "Edit the configuration file (default editor: $EDITOR, or nano/notepad)"
        )]
        edit_config: bool,

        #[arg(
            long = "editor",
            help = "Specify the editor to use (vim, nano, or custom path)"
        )]
        editor: Option<String>,
    },

    /// Manage the database (migrations, integrity checks, etc.)
    Db {
        #[arg(long = "migrate", help = "Run pending database migrations")]
        migrate: bool,

        #[arg(long = "check", help = "Check database integrity")]
        check: bool,

        #[arg(long = "vacuum", help = "Optimize the database using VACUUM")]
        vacuum: bool,

        #[arg(long = "info", help = "Show database information")]
        info: bool,
    },

    /// Print the internal log table
    Log {
        #[arg(long = "print", help = "Print rows from the internal log table")]
        print: bool,

        #[arg(long = "tail", help = "Only the last N rows")]
        tail: Option<usize>,
    },

    /// Store or show the provider settings of a tenant
    Settings {
        #[arg(long = "tenant", help = "Tenant id")]
        tenant: String,

        #[arg(long = "api-url", help = "Provider API URL (bare domain or full stampings URL)")]
        api_url: Option<String>,

        #[arg(long = "auth-method", help = "Authentication: apikey or oauth")]
        auth_method: Option<String>,

        #[arg(long = "api-key-header", help = "Header carrying the API key")]
        api_key_header: Option<String>,

        #[arg(long = "company-id", help = "Company id on the provider side")]
        company_id: Option<String>,

        #[arg(long = "api-key", help = "API key (kept if omitted)")]
        api_key: Option<String>,

        #[arg(long = "oauth-token", help = "OAuth bearer token (kept if omitted)")]
        oauth_token: Option<String>,

        #[arg(long = "window-days", help = "Default sync window in days (1-60)")]
        window_days: Option<i64>,

        #[arg(long = "show", help = "Show the stored settings (secrets masked)")]
        show: bool,
    },

    /// Run a sync for a tenant
    Sync {
        #[arg(long = "tenant", help = "Tenant id")]
        tenant: String,

        #[arg(long = "window-days", help = "Days to re-sync, ending today (1-60)")]
        window_days: Option<i64>,

        #[arg(long = "by", default_value = "cli", help = "Who triggered the run")]
        by: String,
    },

    /// Show the sync status of a tenant
    Status {
        #[arg(long = "tenant", help = "Tenant id")]
        tenant: String,

        #[arg(long = "json", help = "Print as JSON")]
        json: bool,
    },

    /// List the latest sync runs of a tenant
    Logs {
        #[arg(long = "tenant", help = "Tenant id")]
        tenant: String,

        #[arg(long = "limit", help = "How many runs (1-100, default 20)")]
        limit: Option<i64>,

        #[arg(long = "json", help = "Print as JSON")]
        json: bool,
    },
}
