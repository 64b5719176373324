//! Raw OS counters behind one trait.
//!
//! Every query answers `Some(reading)` or `None` for "no data this tick".
//! OS and driver errors are never propagated; there are no retries.

pub mod procfs;

#[cfg(target_os = "linux")]
mod linux;
mod fallback;

#[cfg(target_os = "linux")]
pub use linux::LinuxCounterReader;
pub use fallback::SysinfoCounterReader;

use serde::{Deserialize, Serialize};

use crate::platform::power::BatteryDescription;

/// Cumulative CPU time, in clock ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuTicks {
    pub user: u64,
    pub system: u64,
    pub idle: u64,
    pub nice: u64,
}

impl CpuTicks {
    pub fn busy(&self) -> u64 {
        self.user + self.system + self.nice
    }

    pub fn total(&self) -> u64 {
        self.busy() + self.idle
    }

    /// Busy share of the ticks elapsed since `previous`, in percent.
    pub fn usage_since(&self, previous: &CpuTicks) -> Option<f64> {
        let total = self.total().checked_sub(previous.total())?;
        if total == 0 {
            return None;
        }
        let busy = self.busy().saturating_sub(previous.busy()).min(total);
        Some(busy as f64 / total as f64 * 100.0)
    }
}

/// Memory page accounting, in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmStats {
    pub active_bytes: u64,
    pub wired_bytes: u64,
    pub compressed_bytes: u64,
    pub total_bytes: u64,
}

impl VmStats {
    pub fn used_bytes(&self) -> u64 {
        self.active_bytes + self.wired_bytes + self.compressed_bytes
    }

    pub fn used_gb(&self) -> f64 {
        self.used_bytes() as f64 / (1u64 << 30) as f64
    }

    pub fn used_percent(&self) -> Option<f64> {
        if self.total_bytes == 0 {
            return None;
        }
        Some((self.used_bytes() as f64 / self.total_bytes as f64 * 100.0).min(100.0))
    }
}

/// Bytes read and written across all block devices since boot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskCounters {
    pub read_bytes: u64,
    pub write_bytes: u64,
}

/// Bytes received and sent across all up interfaces since boot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetCounters {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

/// Source of raw, per-tick hardware counters.
pub trait RawCounterReader: Send {
    fn cpu_ticks(&mut self) -> Option<CpuTicks>;

    /// Direct usage figure for platforms without tick counters.
    fn cpu_usage_percent(&mut self) -> Option<f64> {
        None
    }

    fn vm_stats(&mut self) -> Option<VmStats>;

    fn disk_byte_counters(&mut self) -> Option<DiskCounters>;

    fn network_byte_counters(&mut self) -> Option<NetCounters>;

    /// The internal battery only, never a peripheral or the AC adapter.
    fn battery_description(&mut self) -> Option<BatteryDescription>;

    fn accelerator_busy_percent(&mut self) -> Option<f64>;

    /// Unprivileged fan readings, RPM.
    fn fan_speeds(&mut self) -> Vec<f64> {
        Vec::new()
    }

    /// System thermal pressure, 0-100.
    fn thermal_pressure_percent(&mut self) -> Option<f64> {
        None
    }
}

/// Best reader for the current platform.
pub fn default_reader() -> Box<dyn RawCounterReader> {
    #[cfg(target_os = "linux")]
    {
        Box::new(LinuxCounterReader::new())
    }
    #[cfg(not(target_os = "linux"))]
    {
        Box::new(SysinfoCounterReader::new())
    }
}
