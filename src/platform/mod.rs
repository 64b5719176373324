// Platform-specific code module

pub mod counters;
pub mod elevation;
pub mod gpu;
pub mod power;
pub mod process;
pub mod sensors;

// Re-exports para imports limpios
pub use counters::{default_reader, RawCounterReader};
pub use elevation::is_elevated;
pub use gpu::{get_gpu_provider, GpuProvider};
pub use power::{select_internal_battery, BatteryDescription};
