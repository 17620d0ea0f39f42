pub mod config;
pub mod logging;

pub mod discovery;
pub mod refresh;
pub mod retry;
pub mod scheduler;
