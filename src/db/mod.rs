pub mod change_log;
pub mod initialize;
pub mod log;
pub mod migrate;
pub mod pool;
pub mod settings;
pub mod stampings;
pub mod stats;
pub mod summaries;
pub mod sync_log;
pub mod sync_state;
