use crate::errors::{AppError, AppResult};
use std::fs;
use std::process::Command;

pub struct ConfigLogic;

impl ConfigLogic {
    pub fn print(path: &str) -> AppResult<()> {
        let content = fs::read_to_string(path).map_err(|_| AppError::ConfigLoad)?;
        println!("{}", content);
        Ok(())
    }

    /// Open the config file in `$EDITOR` (or the given editor, `nano` by default).
    pub fn edit(path: &str, editor: &Option<String>) -> AppResult<()> {
        let ed = editor
            .clone()
            .or_else(|| std::env::var("EDITOR").ok())
            .unwrap_or_else(|| "nano".into());

        let status = Command::new(&ed)
            .arg(path)
            .status()
            .map_err(|e| AppError::ConfigFile(format!("cannot launch {ed}: {e}")))?;

        if !status.success() {
            return Err(AppError::ConfigFile(format!("{ed} exited with {status}")));
        }
        Ok(())
    }
}
