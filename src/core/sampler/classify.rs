//! Secondary text and accent classification for metric series.
//!
//! Every threshold is a named constant. A value equal to a boundary belongs
//! to the upper tier: `< 40 °C` is cool, `40 °C` is already nominal.

use serde::{Deserialize, Serialize};

use super::model::MetricKind;

// ── Temperature (°C) ─────────────────────────────────────────────
pub const TEMP_COOL_BELOW_C: f64 = 40.0;
pub const TEMP_NOMINAL_BELOW_C: f64 = 70.0;
pub const TEMP_ELEVATED_BELOW_C: f64 = 85.0;

// ── Fans (RPM) ───────────────────────────────────────────────────
pub const FAN_HIGH_FROM_RPM: f64 = 3500.0;
pub const FAN_MAX_FROM_RPM: f64 = 4500.0;

// ── Memory (percent of physical) ─────────────────────────────────
pub const MEMORY_WARNING_ABOVE_PCT: f64 = 80.0;
pub const MEMORY_CRITICAL_ABOVE_PCT: f64 = 90.0;

// ── CPU / GPU load (percent) ─────────────────────────────────────
pub const LOAD_MODERATE_FROM_PCT: f64 = 40.0;
pub const LOAD_HEAVY_FROM_PCT: f64 = 70.0;
pub const LOAD_SATURATED_FROM_PCT: f64 = 90.0;

// ── Battery charge (percent) ─────────────────────────────────────
pub const BATTERY_CRITICAL_AT_PCT: f64 = 10.0;
pub const BATTERY_LOW_AT_PCT: f64 = 20.0;

/// Accent colour the presentation layer paints a series with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Accent {
    #[default]
    Neutral,
    Teal,
    Blue,
    Green,
    Orange,
    Red,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub text: String,
    pub accent: Accent,
}

impl Classification {
    fn new(text: impl Into<String>, accent: Accent) -> Self {
        Self {
            text: text.into(),
            accent,
        }
    }
}

/// Classify `value` for `kind`.
///
/// The value is what the kind is judged on: °C for temperatures, RPM for
/// fans, percent of physical memory for memory, percent charge for the
/// battery, KB/s for rates and watts for power.
pub fn reclassify(kind: MetricKind, value: f64) -> Classification {
    match kind {
        MetricKind::Temps => classify_temperature(value),
        MetricKind::Fans => classify_fan(value),
        MetricKind::Memory => classify_memory(value),
        MetricKind::Cpu | MetricKind::Gpu => classify_load(value),
        MetricKind::Battery => classify_battery(value),
        MetricKind::Disk | MetricKind::Network | MetricKind::NetworkIn | MetricKind::NetworkOut => {
            classify_rate(value)
        }
        MetricKind::Power => Classification::new(format!("{:.1} W", value), Accent::Neutral),
    }
}

pub fn classify_temperature(celsius: f64) -> Classification {
    if celsius < TEMP_COOL_BELOW_C {
        Classification::new("cool", Accent::Teal)
    } else if celsius < TEMP_NOMINAL_BELOW_C {
        Classification::new("nominal", Accent::Blue)
    } else if celsius < TEMP_ELEVATED_BELOW_C {
        Classification::new("elevated", Accent::Orange)
    } else {
        Classification::new("critical", Accent::Red)
    }
}

pub fn classify_fan(rpm: f64) -> Classification {
    if rpm <= 0.0 {
        Classification::new("idle", Accent::Neutral)
    } else if rpm < FAN_HIGH_FROM_RPM {
        Classification::new("normal", Accent::Blue)
    } else if rpm < FAN_MAX_FROM_RPM {
        Classification::new("high", Accent::Orange)
    } else {
        Classification::new("max", Accent::Red)
    }
}

pub fn classify_memory(percent: f64) -> Classification {
    let text = format!("{:.0}% used", percent);
    if percent > MEMORY_CRITICAL_ABOVE_PCT {
        Classification::new(text, Accent::Red)
    } else if percent > MEMORY_WARNING_ABOVE_PCT {
        Classification::new(text, Accent::Orange)
    } else {
        Classification::new(text, Accent::Green)
    }
}

/// Used memory when the physical total is unknown; there is no percentage
/// to judge it on.
pub fn classify_memory_gb(gb: f64) -> Classification {
    Classification::new(format!("{:.1} GB used", gb), Accent::Neutral)
}

pub fn classify_load(percent: f64) -> Classification {
    if percent < LOAD_MODERATE_FROM_PCT {
        Classification::new("light", Accent::Green)
    } else if percent < LOAD_HEAVY_FROM_PCT {
        Classification::new("moderate", Accent::Blue)
    } else if percent < LOAD_SATURATED_FROM_PCT {
        Classification::new("heavy", Accent::Orange)
    } else {
        Classification::new("saturated", Accent::Red)
    }
}

pub fn classify_battery(percent: f64) -> Classification {
    if percent <= BATTERY_CRITICAL_AT_PCT {
        Classification::new("critical", Accent::Red)
    } else if percent <= BATTERY_LOW_AT_PCT {
        Classification::new("low", Accent::Orange)
    } else {
        Classification::new("ok", Accent::Green)
    }
}

pub fn classify_rate(kbps: f64) -> Classification {
    if kbps <= 0.0 {
        Classification::new("idle", Accent::Neutral)
    } else {
        Classification::new("active", Accent::Blue)
    }
}
