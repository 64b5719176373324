//! Counters through sysinfo, for platforms without procfs.

use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use regex::Regex;
use sysinfo::{CpuRefreshKind, Disks, MemoryRefreshKind, Networks, RefreshKind, System};

use super::{CpuTicks, DiskCounters, NetCounters, RawCounterReader, VmStats};
use crate::platform::gpu::{get_gpu_provider, GpuProvider};
use crate::platform::power::{battery_crate_description, BatteryDescription};
use crate::platform::process::run_checked;

const PMSET_TIMEOUT: Duration = Duration::from_millis(1500);

/// `pmset -g therm` changes slowly; avoid a process spawn every tick.
const PMSET_REFRESH: Duration = Duration::from_secs(10);

static CPU_SPEED_LIMIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"CPU_Speed_Limit\s*=\s*(\d+)").expect("speed limit pattern is valid"));

pub struct SysinfoCounterReader {
    system: System,
    disks: Disks,
    networks: Networks,
    gpu: Option<Box<dyn GpuProvider>>,
    pressure: Option<(Instant, Option<f64>)>,
}

impl SysinfoCounterReader {
    pub fn new() -> Self {
        let refresh_kind = RefreshKind::nothing()
            .with_cpu(CpuRefreshKind::nothing().with_cpu_usage())
            .with_memory(MemoryRefreshKind::nothing().with_ram());

        Self {
            system: System::new_with_specifics(refresh_kind),
            disks: Disks::new_with_refreshed_list(),
            networks: Networks::new_with_refreshed_list(),
            gpu: get_gpu_provider(),
            pressure: None,
        }
    }
}

impl Default for SysinfoCounterReader {
    fn default() -> Self {
        Self::new()
    }
}

impl RawCounterReader for SysinfoCounterReader {
    fn cpu_ticks(&mut self) -> Option<CpuTicks> {
        None
    }

    fn cpu_usage_percent(&mut self) -> Option<f64> {
        self.system.refresh_cpu_usage();
        Some(self.system.global_cpu_usage() as f64)
    }

    fn vm_stats(&mut self) -> Option<VmStats> {
        self.system.refresh_memory();
        let total = self.system.total_memory();
        if total == 0 {
            return None;
        }
        Some(VmStats {
            active_bytes: self.system.used_memory(),
            wired_bytes: 0,
            compressed_bytes: 0,
            total_bytes: total,
        })
    }

    fn disk_byte_counters(&mut self) -> Option<DiskCounters> {
        self.disks.refresh(true);
        if self.disks.list().is_empty() {
            return None;
        }
        Some(self.disks.list().iter().fold(DiskCounters::default(), |acc, disk| {
            let usage = disk.usage();
            DiskCounters {
                read_bytes: acc.read_bytes + usage.total_read_bytes,
                write_bytes: acc.write_bytes + usage.total_written_bytes,
            }
        }))
    }

    fn network_byte_counters(&mut self) -> Option<NetCounters> {
        self.networks.refresh(true);
        Some(
            self.networks
                .iter()
                .filter(|(name, _)| !name.starts_with("lo"))
                .fold(NetCounters::default(), |acc, (_, data)| NetCounters {
                    rx_bytes: acc.rx_bytes + data.total_received(),
                    tx_bytes: acc.tx_bytes + data.total_transmitted(),
                }),
        )
    }

    fn battery_description(&mut self) -> Option<BatteryDescription> {
        battery_crate_description()
    }

    fn accelerator_busy_percent(&mut self) -> Option<f64> {
        let gpu = self.gpu.as_mut()?;
        match gpu.busy_percent() {
            Ok(percent) => Some(percent),
            Err(e) => {
                log::debug!("GPU busy read from {} failed: {}", gpu.name(), e);
                None
            }
        }
    }

    fn thermal_pressure_percent(&mut self) -> Option<f64> {
        if !cfg!(target_os = "macos") {
            return None;
        }
        if let Some((at, value)) = self.pressure {
            if at.elapsed() < PMSET_REFRESH {
                return value;
            }
        }

        let args = vec!["-g".to_string(), "therm".to_string()];
        let value = match run_checked("pmset", &args, PMSET_TIMEOUT) {
            Ok(text) => parse_pmset_therm(&text),
            Err(e) => {
                log::debug!("pmset -g therm failed: {}", e);
                None
            }
        };
        self.pressure = Some((Instant::now(), value));
        value
    }
}

/// Thermal pressure from `pmset -g therm`: `100 - CPU_Speed_Limit`.
pub fn parse_pmset_therm(text: &str) -> Option<f64> {
    let limit: f64 = CPU_SPEED_LIMIT.captures(text)?.get(1)?.as_str().parse().ok()?;
    Some((100.0 - limit).clamp(0.0, 100.0))
}
