//! Pure parsers for Linux `/proc` and `/sys` text.
//!
//! Kept free of I/O so they can be tested against captured files.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{CpuTicks, DiskCounters, NetCounters, VmStats};

/// `/proc/diskstats` always counts 512-byte sectors
pub const DISKSTATS_SECTOR_BYTES: u64 = 512;

/// Virtual or non-storage block devices
const SKIPPED_DEVICE_PREFIXES: &[&str] = &["loop", "ram", "zram", "dm-", "md", "sr", "fd", "nbd"];

/// Partition names: `sda1`, `vdb2`, `nvme0n1p3`, `mmcblk0p1`
static PARTITION_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(?:nvme\d+n\d+|mmcblk\d+)p\d+|(?:[shv]d|xvd)[a-z]+\d+)$")
        .expect("partition pattern is valid")
});

/// Aggregate `cpu ` line of `/proc/stat`.
///
/// iowait counts as idle; irq, softirq and steal count as system.
pub fn parse_proc_stat(text: &str) -> Option<CpuTicks> {
    let line = text.lines().find(|l| l.starts_with("cpu "))?;
    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .map(|f| f.parse().ok())
        .collect::<Option<Vec<u64>>>()?;
    if fields.len() < 4 {
        return None;
    }

    let at = |i: usize| fields.get(i).copied().unwrap_or(0);
    Some(CpuTicks {
        user: at(0),
        nice: at(1),
        system: at(2) + at(5) + at(6) + at(7),
        idle: at(3) + at(4),
    })
}

/// `/proc/meminfo`, split into the three used-memory buckets.
///
/// Used memory is `MemTotal - MemAvailable`. Kernel-pinned pages are the
/// wired share, zswap pool pages the compressed share, the rest active.
pub fn parse_meminfo(text: &str) -> Option<VmStats> {
    let field = |name: &str| -> Option<u64> {
        text.lines()
            .find(|l| l.split(':').next() == Some(name))
            .and_then(|l| l.split_whitespace().nth(1))
            .and_then(|v| v.parse::<u64>().ok())
            .map(|kb| kb * 1024)
    };

    let total = field("MemTotal")?;
    let available = field("MemAvailable").or_else(|| {
        Some(field("MemFree")? + field("Buffers").unwrap_or(0) + field("Cached").unwrap_or(0))
    })?;
    let used = total.saturating_sub(available);

    let wired = ["SUnreclaim", "KernelStack", "PageTables", "Unevictable"]
        .iter()
        .filter_map(|name| field(name))
        .sum::<u64>()
        .min(used);
    let compressed = field("Zswap").unwrap_or(0).min(used - wired);

    Some(VmStats {
        active_bytes: used - wired - compressed,
        wired_bytes: wired,
        compressed_bytes: compressed,
        total_bytes: total,
    })
}

/// Whole physical disks only, so partition traffic is not counted twice.
pub fn is_whole_disk(name: &str) -> bool {
    !SKIPPED_DEVICE_PREFIXES.iter().any(|p| name.starts_with(p)) && !PARTITION_NAME.is_match(name)
}

/// Sum of sectors read and written across whole disks in `/proc/diskstats`.
pub fn parse_diskstats(text: &str) -> Option<DiskCounters> {
    let mut counters = DiskCounters::default();
    let mut seen = false;

    for line in text.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 14 || !is_whole_disk(fields[2]) {
            continue;
        }
        let (Ok(read), Ok(written)) = (fields[5].parse::<u64>(), fields[9].parse::<u64>()) else {
            continue;
        };
        counters.read_bytes += read * DISKSTATS_SECTOR_BYTES;
        counters.write_bytes += written * DISKSTATS_SECTOR_BYTES;
        seen = true;
    }

    seen.then_some(counters)
}

/// Sum of rx/tx bytes in `/proc/net/dev` over interfaces where `is_up` holds.
/// Loopback is always skipped.
pub fn parse_net_dev<F>(text: &str, is_up: F) -> Option<NetCounters>
where
    F: Fn(&str) -> bool,
{
    let mut counters = NetCounters::default();
    let mut parsed_any = false;

    for line in text.lines() {
        let Some((name, rest)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim();
        let values: Vec<u64> = rest.split_whitespace().filter_map(|s| s.parse().ok()).collect();
        if values.len() < 16 {
            continue;
        }
        parsed_any = true;

        if name == "lo" || !is_up(name) {
            continue;
        }
        counters.rx_bytes += values[0];
        counters.tx_bytes += values[8];
    }

    parsed_any.then_some(counters)
}

/// `up` in `/sys/class/net/<if>/operstate`.
pub fn is_operstate_up(operstate: &str) -> bool {
    operstate.trim() == "up"
}

/// Throttling ratio of one cooling device, percent.
pub fn cooling_ratio(cur_state: &str, max_state: &str) -> Option<f64> {
    let cur: f64 = cur_state.trim().parse().ok()?;
    let max: f64 = max_state.trim().parse().ok()?;
    if max <= 0.0 {
        return None;
    }
    Some((cur / max * 100.0).clamp(0.0, 100.0))
}

/// Cooling devices that throttle the CPU, identified by their `type`.
pub fn is_processor_cooling(device_type: &str) -> bool {
    let t = device_type.trim().to_lowercase();
    t == "processor" || t.contains("intel_powerclamp") || t.starts_with("cpufreq")
}
