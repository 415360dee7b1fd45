pub mod config;
pub mod credentials;
pub mod dirty;
pub mod log;
pub mod normalize;
pub mod planned;
pub mod rebuild;
pub mod settings;
pub mod status;
pub mod sync;
pub mod upsert;
