use std::path::{Path, PathBuf};

use super::procfs::{
    cooling_ratio, is_operstate_up, is_processor_cooling, parse_diskstats, parse_meminfo,
    parse_net_dev, parse_proc_stat,
};
use super::{CpuTicks, DiskCounters, NetCounters, RawCounterReader, VmStats};
use crate::platform::gpu::{get_gpu_provider, GpuProvider};
use crate::platform::power::{read_power_supplies, select_internal_battery, BatteryDescription};

/// Counters read straight from procfs and sysfs.
pub struct LinuxCounterReader {
    proc_root: PathBuf,
    sys_root: PathBuf,
    gpu: Option<Box<dyn GpuProvider>>,
}

impl LinuxCounterReader {
    pub fn new() -> Self {
        let gpu = get_gpu_provider();
        if let Some(provider) = &gpu {
            log::debug!("GPU busy source: {}", provider.name());
        }
        Self::with_roots("/proc", "/sys", gpu)
    }

    /// Reader over alternate `/proc` and `/sys` trees.
    pub fn with_roots(
        proc_root: impl Into<PathBuf>,
        sys_root: impl Into<PathBuf>,
        gpu: Option<Box<dyn GpuProvider>>,
    ) -> Self {
        Self {
            proc_root: proc_root.into(),
            sys_root: sys_root.into(),
            gpu,
        }
    }

    fn read_proc(&self, relative: &str) -> Option<String> {
        std::fs::read_to_string(self.proc_root.join(relative)).ok()
    }

    fn sys_entries(&self, class: &str) -> Vec<PathBuf> {
        let Ok(dir) = std::fs::read_dir(self.sys_root.join("class").join(class)) else {
            return Vec::new();
        };
        let mut paths: Vec<PathBuf> = dir.filter_map(|e| e.ok()).map(|e| e.path()).collect();
        paths.sort();
        paths
    }
}

impl Default for LinuxCounterReader {
    fn default() -> Self {
        Self::new()
    }
}

fn read_trimmed(path: &Path) -> Option<String> {
    std::fs::read_to_string(path).ok().map(|s| s.trim().to_string())
}

impl RawCounterReader for LinuxCounterReader {
    fn cpu_ticks(&mut self) -> Option<CpuTicks> {
        parse_proc_stat(&self.read_proc("stat")?)
    }

    fn vm_stats(&mut self) -> Option<VmStats> {
        parse_meminfo(&self.read_proc("meminfo")?)
    }

    fn disk_byte_counters(&mut self) -> Option<DiskCounters> {
        parse_diskstats(&self.read_proc("diskstats")?)
    }

    fn network_byte_counters(&mut self) -> Option<NetCounters> {
        let text = self.read_proc("net/dev")?;
        let net_class = self.sys_root.join("class").join("net");
        parse_net_dev(&text, |name| {
            read_trimmed(&net_class.join(name).join("operstate"))
                .map(|s| is_operstate_up(&s))
                .unwrap_or(false)
        })
    }

    fn battery_description(&mut self) -> Option<BatteryDescription> {
        let entries = read_power_supplies(&self.sys_root.join("class").join("power_supply"));
        select_internal_battery(&entries)
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

    /// `fan*_input` from every hwmon chip.
    fn fan_speeds(&mut self) -> Vec<f64> {
        let mut fans = Vec::new();
        for chip in self.sys_entries("hwmon") {
            let Ok(dir) = std::fs::read_dir(&chip) else {
                continue;
            };
            let mut inputs: Vec<PathBuf> = dir
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| {
                    p.file_name()
                        .and_then(|n| n.to_str())
                        .map(|n| n.starts_with("fan") && n.ends_with("_input"))
                        .unwrap_or(false)
                })
                .collect();
            inputs.sort();
            fans.extend(
                inputs
                    .iter()
                    .filter_map(|p| read_trimmed(p)?.parse::<f64>().ok())
                    .filter(|rpm| *rpm >= 0.0),
            );
        }
        fans
    }

    /// Highest throttling ratio among processor cooling devices.
    fn thermal_pressure_percent(&mut self) -> Option<f64> {
        self.sys_entries("thermal")
            .into_iter()
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with("cooling_device"))
                    .unwrap_or(false)
            })
            .filter(|p| {
                read_trimmed(&p.join("type"))
                    .map(|t| is_processor_cooling(&t))
                    .unwrap_or(false)
            })
            .filter_map(|p| {
                cooling_ratio(
                    &read_trimmed(&p.join("cur_state"))?,
                    &read_trimmed(&p.join("max_state"))?,
                )
            })
            .reduce(f64::max)
    }
}
