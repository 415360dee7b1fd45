pub mod config;
pub mod db;
pub mod init;
pub mod log;
pub mod logs;
pub mod settings;
pub mod status;
pub mod sync;
