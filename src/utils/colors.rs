/// ANSI color helper utilities for terminal output.
pub const RESET: &str = "\x1b[0m";

pub const GREY: &str = "\x1b[90m";

pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";

pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";

/// Run status color: success → green, failed → red, running → yellow.
pub fn color_for_status(status: &str) -> &'static str {
    match status {
        "success" => GREEN,
        "failed" => RED,
        "running" => YELLOW,
        _ => RESET,
    }
}

/// Returns the value wrapped in GREY when empty or `--`.
pub fn colorize_optional(value: &str) -> String {
    if value.trim().is_empty() || value.trim() == "--" {
        format!("{GREY}{value}{RESET}")
    } else {
        value.to_string()
    }
}
