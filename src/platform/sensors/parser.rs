//! Parsing of free-text sensor tool output.
//!
//! Both the privileged sampler and the unprivileged probe print
//! line-oriented reports where interesting lines look like
//! `<label> ... <number> <unit>`:
//!
//! ```text
//! CPU die temperature: 48.21 C
//! Fan: 1843 rpm
//! Package id 0:  +52.0°C  (high = +80.0°C, crit = +100.0°C)
//! ```
//!
//! The format is not a stable contract, so everything here is tolerant: a
//! line that does not match is skipped and a missing field is `None`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::sampler::temperature::{is_plausible_temp, TempKind};

/// `<label>[:|=] [+]<number> <unit>` anchored at line start. Only the first
/// reading on a line is taken, which skips the `(high = ..., crit = ...)`
/// limits lm-sensors appends.
static LABELED_VALUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*(?P<label>.*?[a-z].*?)\s*[:=]?\s+\+?(?P<value>-?\d+(?:[.,]\d+)?)\s*(?P<unit>°\s?C|C|RPM|mW|W|%)(?:\s|\(|,|$)",
    )
    .expect("labeled value pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueUnit {
    Celsius,
    Rpm,
    Milliwatts,
    Watts,
    Percent,
}

impl ValueUnit {
    fn parse(s: &str) -> Option<Self> {
        let lower = s.to_ascii_lowercase();
        let trimmed = lower.trim_start_matches('°').trim();
        match trimmed {
            "c" => Some(ValueUnit::Celsius),
            "rpm" => Some(ValueUnit::Rpm),
            "mw" => Some(ValueUnit::Milliwatts),
            "w" => Some(ValueUnit::Watts),
            "%" => Some(ValueUnit::Percent),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledValue {
    /// Lowercased label text
    pub label: String,
    pub value: f64,
    pub unit: ValueUnit,
}

/// Extract every labeled reading from `text`, in line order.
pub fn parse_labeled_values(text: &str) -> Vec<LabeledValue> {
    text.lines().filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<LabeledValue> {
    let caps = LABELED_VALUE.captures(line)?;
    let label = caps.name("label")?.as_str().trim().to_lowercase();
    let value = caps
        .name("value")?
        .as_str()
        .replace(',', ".")
        .parse::<f64>()
        .ok()?;
    let unit = ValueUnit::parse(caps.name("unit")?.as_str())?;

    Some(LabeledValue { label, value, unit })
}

/// Readings obtained from one privileged sampler run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BridgeReading {
    pub fans_rpm: Vec<f64>,
    pub cpu_die_c: Option<f64>,
    pub gpu_die_c: Option<f64>,
}

impl BridgeReading {
    /// Mean speed over fans that are spinning.
    pub fn fan_rpm(&self) -> Option<f64> {
        let spinning: Vec<f64> = self.fans_rpm.iter().copied().filter(|r| *r > 0.0).collect();
        if spinning.is_empty() {
            None
        } else {
            Some(spinning.iter().sum::<f64>() / spinning.len() as f64)
        }
    }

    pub fn die_temp(&self, kind: TempKind) -> Option<f64> {
        match kind {
            TempKind::Cpu => self.cpu_die_c,
            TempKind::Gpu => self.gpu_die_c,
            TempKind::Disk => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fans_rpm.is_empty() && self.cpu_die_c.is_none() && self.gpu_die_c.is_none()
    }
}

/// Parse privileged sampler output into fan speeds and die temperatures.
///
/// Implausible temperatures are dropped here, so a garbled line cannot
/// masquerade as a real sensor reading further up.
pub fn parse_bridge_output(text: &str) -> BridgeReading {
    let mut reading = BridgeReading::default();

    for item in parse_labeled_values(text) {
        match item.unit {
            ValueUnit::Rpm if item.label.contains("fan") && item.value >= 0.0 => {
                reading.fans_rpm.push(item.value);
            }
            ValueUnit::Celsius if is_plausible_temp(item.value) => {
                if reading.cpu_die_c.is_none() && item.label.contains("cpu") {
                    reading.cpu_die_c = Some(item.value);
                } else if reading.gpu_die_c.is_none() && item.label.contains("gpu") {
                    reading.gpu_die_c = Some(item.value);
                }
            }
            _ => {}
        }
    }

    reading
}

/// First plausible temperature whose label matches `kind`.
pub fn find_temperature(values: &[LabeledValue], kind: TempKind) -> Option<f64> {
    values
        .iter()
        .filter(|v| v.unit == ValueUnit::Celsius && is_plausible_temp(v.value))
        .find(|v| kind.matches_label(&v.label))
        .map(|v| v.value)
}
