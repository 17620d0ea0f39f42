//! CLI command handlers, one per file.

mod once;
mod run;
mod show_config;

pub use once::run_once;
pub use run::run_daemon;
pub use show_config::show_config;
