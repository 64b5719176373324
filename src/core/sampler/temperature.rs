//! Tiered temperature estimation.
//!
//! Tiers are tried in priority order until one yields a plausible value:
//!
//! 1. real sensors: the privileged peer's die temperature, then a direct
//!    scan of hardware sensor entries
//! 2. the unprivileged external probe
//! 3. the thermal-pressure heuristic
//! 4. the usage curve, which always answers for CPU and GPU
//!
//! Results are cached per [`TempKind`] for a fixed TTL. The expensive tiers
//! (device tree walk, external process) also keep their raw output for the
//! same TTL, so one run answers every kind.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::clock::Clock;
use super::model::{TempSource, TemperatureReading};
use crate::platform::sensors::parser::{find_temperature, parse_labeled_values, BridgeReading, LabeledValue};
use crate::platform::sensors::probe::SensorProbe;

/// Upper bound (exclusive) of a believable temperature.
pub const MAX_PLAUSIBLE_TEMP_C: f64 = 150.0;

/// Default lifetime of a cached temperature.
pub const DEFAULT_TEMP_CACHE_TTL: Duration = Duration::from_secs(3);

// ── Usage curve ──────────────────────────────────────────────────
pub const CPU_IDLE_TEMP_C: f64 = 45.0;
pub const CPU_MAX_TEMP_C: f64 = 85.0;
pub const CPU_CURVE_EXPONENT: f64 = 1.5;
pub const GPU_IDLE_TEMP_C: f64 = 42.0;
pub const GPU_MAX_TEMP_C: f64 = 88.0;
pub const GPU_CURVE_EXPONENT: f64 = 1.3;

// ── Thermal pressure heuristic ───────────────────────────────────
pub const PRESSURE_BASE_TEMP_C: f64 = 50.0;
/// °C added per percent of thermal pressure
pub const PRESSURE_WEIGHT: f64 = 0.35;
/// °C added per percent of usage
pub const PRESSURE_USAGE_WEIGHT: f64 = 0.15;

/// `0 < celsius < 150`
pub fn is_plausible_temp(celsius: f64) -> bool {
    celsius.is_finite() && celsius > 0.0 && celsius < MAX_PLAUSIBLE_TEMP_C
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TempKind {
    Cpu,
    Gpu,
    Disk,
}

impl TempKind {
    /// Substrings identifying sensors of this kind, matched on lowercased labels.
    pub fn label_keywords(self) -> &'static [&'static str] {
        match self {
            TempKind::Cpu => &[
                "cpu", "package", "tctl", "tdie", "core", "coretemp", "k10temp", "soc",
            ],
            TempKind::Gpu => &["gpu", "edge", "junction", "amdgpu", "nouveau", "radeon"],
            TempKind::Disk => &["nvme", "composite", "ssd", "drive", "disk", "sata"],
        }
    }

    pub fn matches_label(self, label: &str) -> bool {
        let lower = label.to_lowercase();
        // GPU "core" sensors would otherwise read as CPU
        if self == TempKind::Cpu && TempKind::Gpu.label_keywords().iter().any(|k| lower.contains(k)) {
            return false;
        }
        self.label_keywords().iter().any(|k| lower.contains(k))
    }
}

/// Inputs every tier may consult.
#[derive(Debug, Clone, Default)]
pub struct TierContext {
    /// Current load of the component, percent
    pub usage_percent: f64,
    /// Latest privileged-peer reading, if the bridge is up
    pub bridge: Option<BridgeReading>,
    /// System thermal pressure, percent
    pub thermal_pressure: Option<f64>,
}

/// One fallback strategy in the estimation chain.
pub trait TemperatureTier: Send {
    fn source(&self) -> TempSource;

    /// A plausible reading, or `None` to fall through to the next tier.
    fn attempt(&mut self, kind: TempKind, ctx: &TierContext) -> Option<f64>;
}

/// Die temperatures already fetched through the privileged bridge.
#[derive(Debug, Default)]
pub struct BridgeTier;

impl TemperatureTier for BridgeTier {
    fn source(&self) -> TempSource {
        TempSource::Bridge
    }

    fn attempt(&mut self, kind: TempKind, ctx: &TierContext) -> Option<f64> {
        ctx.bridge.as_ref()?.die_temp(kind)
    }
}

/// Source of `(label, celsius)` hardware sensor entries.
pub trait SensorScan: Send {
    fn scan(&mut self) -> Vec<(String, f64)>;
}

/// Hardware sensor entries enumerated through sysinfo.
pub struct ComponentScan {
    components: sysinfo::Components,
}

impl ComponentScan {
    pub fn new() -> Self {
        Self {
            components: sysinfo::Components::new_with_refreshed_list(),
        }
    }
}

impl Default for ComponentScan {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorScan for ComponentScan {
    fn scan(&mut self) -> Vec<(String, f64)> {
        self.components.refresh(true);
        self.components
            .iter()
            .filter_map(|c| Some((c.label().to_string(), c.temperature()? as f64)))
            .collect()
    }
}

/// Last output of an expensive source, reused until the TTL lapses.
struct TimedSlot<T> {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    value: Option<(Instant, T)>,
}

impl<T> TimedSlot<T> {
    fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            value: None,
        }
    }

    fn get_or_refresh(&mut self, refresh: impl FnOnce() -> T) -> &T {
        let now = self.clock.now();
        if self
            .value
            .as_ref()
            .is_some_and(|(stored_at, _)| now.saturating_duration_since(*stored_at) >= self.ttl)
        {
            self.value = None;
        }
        &self.value.get_or_insert_with(|| (now, refresh())).1
    }
}

/// Direct scan of hardware sensor entries by location label.
pub struct SensorTier {
    scan: Box<dyn SensorScan>,
    entries: TimedSlot<Vec<(String, f64)>>,
}

impl SensorTier {
    pub fn new(scan: Box<dyn SensorScan>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            scan,
            entries: TimedSlot::new(ttl, clock),
        }
    }
}

impl TemperatureTier for SensorTier {
    fn source(&self) -> TempSource {
        TempSource::Sensor
    }

    fn attempt(&mut self, kind: TempKind, _ctx: &TierContext) -> Option<f64> {
        let scan = &mut self.scan;
        self.entries
            .get_or_refresh(|| scan.scan())
            .iter()
            .filter(|(label, _)| kind.matches_label(label))
            .map(|(_, celsius)| *celsius)
            .find(|c| is_plausible_temp(*c))
    }
}

/// Unprivileged external probe, bounded by its own timeout.
///
/// A failed run is remembered as empty output for the TTL, so a broken tool
/// is not respawned for every kind.
pub struct ProbeTier {
    probe: Box<dyn SensorProbe>,
    values: TimedSlot<Vec<LabeledValue>>,
}

impl ProbeTier {
    pub fn new(probe: Box<dyn SensorProbe>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            probe,
            values: TimedSlot::new(ttl, clock),
        }
    }
}

impl TemperatureTier for ProbeTier {
    fn source(&self) -> TempSource {
        TempSource::Probe
    }

    fn attempt(&mut self, kind: TempKind, _ctx: &TierContext) -> Option<f64> {
        let probe = &mut self.probe;
        let values = self.values.get_or_refresh(|| match probe.run() {
            Ok(text) => parse_labeled_values(&text),
            Err(e) => {
                log::debug!("temperature probe failed: {}", e);
                Vec::new()
            }
        });
        find_temperature(values, kind)
    }
}

/// Blend of a base temperature with pressure and usage terms.
#[derive(Debug, Default)]
pub struct ThermalPressureTier;

impl TemperatureTier for ThermalPressureTier {
    fn source(&self) -> TempSource {
        TempSource::ThermalPressure
    }

    fn attempt(&mut self, kind: TempKind, ctx: &TierContext) -> Option<f64> {
        if kind == TempKind::Disk {
            return None;
        }
        let pressure = ctx.thermal_pressure.filter(|p| *p > 0.0)?;
        let usage = ctx.usage_percent.clamp(0.0, 100.0);
        Some(
            PRESSURE_BASE_TEMP_C
                + pressure.clamp(0.0, 100.0) * PRESSURE_WEIGHT
                + usage * PRESSURE_USAGE_WEIGHT,
        )
    }
}

/// `idle + (usage/100)^exponent * (max - idle)`.
pub fn usage_curve(kind: TempKind, usage_percent: f64) -> Option<f64> {
    let (idle, max, exponent) = match kind {
        TempKind::Cpu => (CPU_IDLE_TEMP_C, CPU_MAX_TEMP_C, CPU_CURVE_EXPONENT),
        TempKind::Gpu => (GPU_IDLE_TEMP_C, GPU_MAX_TEMP_C, GPU_CURVE_EXPONENT),
        TempKind::Disk => return None,
    };
    let usage = (usage_percent / 100.0).clamp(0.0, 1.0);
    Some(idle + usage.powf(exponent) * (max - idle))
}

/// Terminal tier; always answers for CPU and GPU.
#[derive(Debug, Default)]
pub struct UsageCurveTier;

impl TemperatureTier for UsageCurveTier {
    fn source(&self) -> TempSource {
        TempSource::UsageCurve
    }

    fn attempt(&mut self, kind: TempKind, ctx: &TierContext) -> Option<f64> {
        usage_curve(kind, ctx.usage_percent)
    }
}

/// Read-through cache keyed by [`TempKind`] with TTL expiry only.
#[derive(Debug)]
pub struct TemperatureCache {
    ttl: Duration,
    entries: HashMap<TempKind, (Instant, Option<TemperatureReading>)>,
}

impl TemperatureCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// `Some(..)` on a hit; the inner option is the cached result itself.
    pub fn get(&self, kind: TempKind, now: Instant) -> Option<Option<TemperatureReading>> {
        let (stored_at, reading) = self.entries.get(&kind)?;
        if now.saturating_duration_since(*stored_at) < self.ttl {
            Some(*reading)
        } else {
            None
        }
    }

    pub fn put(&mut self, kind: TempKind, reading: Option<TemperatureReading>, now: Instant) {
        self.entries.insert(kind, (now, reading));
    }
}

/// Walks the tier chain with caching.
pub struct TemperatureEstimator {
    tiers: Vec<Box<dyn TemperatureTier>>,
    cache: TemperatureCache,
    clock: Arc<dyn Clock>,
}

impl TemperatureEstimator {
    pub fn new(tiers: Vec<Box<dyn TemperatureTier>>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            tiers,
            cache: TemperatureCache::new(ttl),
            clock,
        }
    }

    /// The standard chain: bridge, sensor scan, probe (if any), thermal
    /// pressure, usage curve.
    pub fn standard(
        scan: Box<dyn SensorScan>,
        probe: Option<Box<dyn SensorProbe>>,
        ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let mut tiers: Vec<Box<dyn TemperatureTier>> = vec![
            Box::new(BridgeTier),
            Box::new(SensorTier::new(scan, ttl, clock.clone())),
        ];
        if let Some(probe) = probe {
            tiers.push(Box::new(ProbeTier::new(probe, ttl, clock.clone())));
        }
        tiers.push(Box::new(ThermalPressureTier));
        tiers.push(Box::new(UsageCurveTier));
        Self::new(tiers, ttl, clock)
    }

    pub fn tier_sources(&self) -> Vec<TempSource> {
        self.tiers.iter().map(|t| t.source()).collect()
    }

    /// Cached reading for `kind`, re-running the whole chain on a miss.
    pub fn estimate(&mut self, kind: TempKind, ctx: &TierContext) -> Option<TemperatureReading> {
        let now = self.clock.now();
        if let Some(cached) = self.cache.get(kind, now) {
            return cached;
        }

        let reading = self.run_chain(kind, ctx);
        self.cache.put(kind, reading, now);
        reading
    }

    fn run_chain(&mut self, kind: TempKind, ctx: &TierContext) -> Option<TemperatureReading> {
        for tier in self.tiers.iter_mut() {
            match tier.attempt(kind, ctx) {
                Some(celsius) if is_plausible_temp(celsius) => {
                    return Some(TemperatureReading::new(celsius, tier.source()));
                }
                Some(celsius) => {
                    log::debug!("{:?} tier gave implausible {:.1}°C for {:?}", tier.source(), celsius, kind);
                }
                None => {}
            }
        }
        None
    }
}
