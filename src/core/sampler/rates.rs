//! Conversion of cumulative byte counters into per-second rates.
//!
//! Counters are sampled once per tick. A counter that goes backwards was
//! reset (interface re-enumerated, device replugged); the new cumulative
//! value is taken as the tick's delta so no traffic is silently dropped.
//! Deltas above the implausibility ceiling are driver misreads and are
//! reported as zero.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Largest believable delta for one tick (10 GB).
pub const NETWORK_DELTA_CEILING_BYTES: u64 = 10 * 1024 * 1024 * 1024;

/// Disk counters share the network ceiling.
pub const DISK_DELTA_CEILING_BYTES: u64 = NETWORK_DELTA_CEILING_BYTES;

/// Rates at or above this many KB/s are displayed in MB/s.
pub const MB_RESCALE_THRESHOLD_KBPS: f64 = 1024.0;

/// Ticks shorter than this are treated as this long.
const MIN_ELAPSED_SECS: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RateUnit {
    #[serde(rename = "KB/s")]
    KiloBytesPerSec,
    #[serde(rename = "MB/s")]
    MegaBytesPerSec,
}

impl RateUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            RateUnit::KiloBytesPerSec => "KB/s",
            RateUnit::MegaBytesPerSec => "MB/s",
        }
    }
}

/// Delta between two cumulative readings, with reset handling and the
/// implausibility clamp applied.
pub fn counter_delta(previous: u64, current: u64, ceiling: u64) -> u64 {
    let delta = if current >= previous {
        current - previous
    } else {
        current
    };

    if delta > ceiling {
        0
    } else {
        delta
    }
}

/// KB per second for `delta_bytes` observed over `elapsed`.
pub fn kbps(delta_bytes: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64().max(MIN_ELAPSED_SECS);
    delta_bytes as f64 / 1024.0 / secs
}

/// Pick the display unit for a KB/s rate.
pub fn rescale_kbps(kbps: f64) -> (f64, RateUnit) {
    if kbps >= MB_RESCALE_THRESHOLD_KBPS {
        (kbps / 1024.0, RateUnit::MegaBytesPerSec)
    } else {
        (kbps, RateUnit::KiloBytesPerSec)
    }
}

/// Rolling state for one cumulative counter.
///
/// The first observation only seeds the state: there is no previous sample
/// to diff against, so no rate is reported for it.
#[derive(Debug, Clone)]
pub struct CounterTracker {
    previous: Option<u64>,
    ceiling: u64,
}

impl CounterTracker {
    pub fn new(ceiling: u64) -> Self {
        Self {
            previous: None,
            ceiling,
        }
    }

    /// Feed the current cumulative value and get this tick's rate in KB/s.
    pub fn observe(&mut self, current: u64, elapsed: Duration) -> Option<f64> {
        let previous = self.previous.replace(current)?;
        Some(kbps(counter_delta(previous, current, self.ceiling), elapsed))
    }

    /// Forget the previous value after the source could not be read.
    pub fn reset(&mut self) {
        self.previous = None;
    }
}

/// Read/write or rx/tx pair of counters.
#[derive(Debug, Clone)]
pub struct PairTracker {
    first: CounterTracker,
    second: CounterTracker,
}

impl PairTracker {
    pub fn new(ceiling: u64) -> Self {
        Self {
            first: CounterTracker::new(ceiling),
            second: CounterTracker::new(ceiling),
        }
    }

    pub fn observe(&mut self, first: u64, second: u64, elapsed: Duration) -> Option<(f64, f64)> {
        let a = self.first.observe(first, elapsed);
        let b = self.second.observe(second, elapsed);
        Some((a?, b?))
    }

    pub fn reset(&mut self) {
        self.first.reset();
        self.second.reset();
    }
}
