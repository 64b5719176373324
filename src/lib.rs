// Statbar Library - Public API

// Re-export error types
pub mod error;
pub use error::{Result, StatbarError};

// Module declarations
pub mod commands;
pub mod core;
pub mod platform;
pub mod ui;

// Re-export commonly used types
pub use crate::core::config::Config;
pub use crate::core::sampler::{MetricSnapshot, SchedulerRuntime, SystemSample};

// Info unless RUST_LOG says otherwise
fn logging_builder(env: env_logger::Env) -> env_logger::Builder {
    env_logger::Builder::from_env(env.default_filter_or("info"))
}

// Initialize logging
pub fn init_logging() {
    logging_builder(env_logger::Env::default()).init();
}
