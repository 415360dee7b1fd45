pub mod change_log;
pub mod day_summary;
pub mod settings;
pub mod stamping;
pub mod sync;
