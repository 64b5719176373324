// Core business logic module

pub mod config;
pub mod sampler;

// Re-export commonly used items
pub use config::Config;
pub use sampler::{MetricSnapshot, SampleAggregator, SchedulerRuntime, SystemSample};
