use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::config::ConfigLogic;
use crate::errors::{AppError, AppResult};
use crate::ui::messages::{success, warning};

/// Handle the `config` subcommand
pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Config {
        print_config,
        edit_config,
        editor,
    } = cmd
    {
        let path = Config::config_file();

        // ---- PRINT CONFIG ----
        if *print_config {
            println!("📄 Current configuration:\n");
            if path.exists() {
                ConfigLogic::print(&path.to_string_lossy())?;
            } else {
                // no file yet: show the defaults in effect
                let yaml =
                    serde_yaml::to_string(cfg).map_err(|e| AppError::ConfigFile(e.to_string()))?;
                println!("{}", yaml);
            }
        }

        // ---- EDIT CONFIG ----
        if *edit_config {
            if !path.exists() {
                warning(format!(
                    "No configuration file at {}. Run `rtimesync init` first.",
                    path.display()
                ));
                return Ok(());
            }

            let fallback = if cfg!(target_os = "windows") {
                Some("notepad".to_string())
            } else {
                None
            };
            let chosen = editor.clone().or(fallback);

            ConfigLogic::edit(&path.to_string_lossy(), &chosen)?;
            success("Configuration file edited.");
        }
    }

    Ok(())
}
