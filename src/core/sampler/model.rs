use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which fallback tier produced a temperature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TempSource {
    /// Die temperature reported by the privileged peer
    Bridge,
    /// Hardware sensor enumerated directly
    Sensor,
    /// Unprivileged external probe
    Probe,
    /// Derived from the system thermal-pressure level
    ThermalPressure,
    /// Usage curve, always available
    UsageCurve,
}

impl TempSource {
    pub fn is_estimated(self) -> bool {
        matches!(self, TempSource::ThermalPressure | TempSource::UsageCurve)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureReading {
    pub celsius: f64,
    pub source: TempSource,
}

impl TemperatureReading {
    pub fn new(celsius: f64, source: TempSource) -> Self {
        Self { celsius, source }
    }

    pub fn is_estimated(&self) -> bool {
        self.source.is_estimated()
    }
}

/// Direction of battery power flow, used to segment the power series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerDirection {
    Charging,
    Discharging,
}

/// One tick's worth of readings. `None` means the reading was unavailable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemSample {
    pub cpu_percent: Option<f64>,
    pub gpu_percent: Option<f64>,
    pub memory_gb: Option<f64>,
    pub memory_percent: Option<f64>,
    pub disk_kbps: Option<f64>,
    pub disk_read_kbps: Option<f64>,
    pub disk_write_kbps: Option<f64>,
    pub network_in_kbps: Option<f64>,
    pub network_out_kbps: Option<f64>,
    pub battery_percent: Option<f64>,
    pub battery_cycle_count: Option<u32>,
    pub power_direction: Option<PowerDirection>,
    pub fan_rpm: Option<f64>,
    pub cpu_temp: Option<TemperatureReading>,
    pub gpu_temp: Option<TemperatureReading>,
    pub disk_temp: Option<TemperatureReading>,
    pub power_in_w: Option<f64>,
    pub power_out_w: Option<f64>,
}

impl SystemSample {
    /// Outgoing power when discharging, otherwise incoming power.
    pub fn power_w(&self) -> Option<f64> {
        match (self.power_out_w, self.power_in_w) {
            (Some(out), _) if out > 0.0 => Some(out),
            (_, Some(inp)) => Some(inp),
            (out, None) => out,
        }
    }

    /// Mean of the positive temperatures, `None` if none are positive.
    pub fn avg_temp(&self) -> Option<f64> {
        let temps: Vec<f64> = [self.cpu_temp, self.gpu_temp, self.disk_temp]
            .iter()
            .flatten()
            .map(|t| t.celsius)
            .filter(|c| *c > 0.0)
            .collect();

        if temps.is_empty() {
            None
        } else {
            Some(temps.iter().sum::<f64>() / temps.len() as f64)
        }
    }

    /// Combined network throughput.
    pub fn network_kbps(&self) -> Option<f64> {
        match (self.network_in_kbps, self.network_out_kbps) {
            (None, None) => None,
            (rx, tx) => Some(rx.unwrap_or(0.0) + tx.unwrap_or(0.0)),
        }
    }
}

/// A single point of a metric series. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplePoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub direction: Option<PowerDirection>,
}

impl SamplePoint {
    pub fn new(timestamp: DateTime<Utc>, value: f64, direction: Option<PowerDirection>) -> Self {
        Self {
            timestamp,
            value,
            direction,
        }
    }
}

/// Retained history window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeRange {
    #[default]
    Now,
    Hour1,
    Hour24,
}

impl TimeRange {
    pub fn window(self) -> Duration {
        match self {
            TimeRange::Now => Duration::from_secs(5 * 60),
            TimeRange::Hour1 => Duration::from_secs(60 * 60),
            TimeRange::Hour24 => Duration::from_secs(24 * 60 * 60),
        }
    }

    pub fn chrono_window(self) -> chrono::Duration {
        chrono::Duration::seconds(self.window().as_secs() as i64)
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "now" | "5m" => Some(TimeRange::Now),
            "hour1" | "1h" => Some(TimeRange::Hour1),
            "hour24" | "24h" => Some(TimeRange::Hour24),
            _ => None,
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TimeRange::Now => "5m",
            TimeRange::Hour1 => "1h",
            TimeRange::Hour24 => "24h",
        };
        f.write_str(label)
    }
}

/// The tracked metric series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MetricKind {
    Cpu,
    Gpu,
    Memory,
    Disk,
    Network,
    NetworkIn,
    NetworkOut,
    Battery,
    Fans,
    Power,
    Temps,
}

impl MetricKind {
    pub const ALL: [MetricKind; 11] = [
        MetricKind::Cpu,
        MetricKind::Gpu,
        MetricKind::Memory,
        MetricKind::Disk,
        MetricKind::Network,
        MetricKind::NetworkIn,
        MetricKind::NetworkOut,
        MetricKind::Battery,
        MetricKind::Fans,
        MetricKind::Power,
        MetricKind::Temps,
    ];

    pub fn title(self) -> &'static str {
        match self {
            MetricKind::Cpu => "CPU",
            MetricKind::Gpu => "GPU",
            MetricKind::Memory => "Memory",
            MetricKind::Disk => "Disk",
            MetricKind::Network => "Network",
            MetricKind::NetworkIn => "Network In",
            MetricKind::NetworkOut => "Network Out",
            MetricKind::Battery => "Battery",
            MetricKind::Fans => "Fans",
            MetricKind::Power => "Power",
            MetricKind::Temps => "Temperatures",
        }
    }

    pub fn icon_key(self) -> &'static str {
        match self {
            MetricKind::Cpu => "cpu",
            MetricKind::Gpu => "gpu",
            MetricKind::Memory => "memorychip",
            MetricKind::Disk => "internaldrive",
            MetricKind::Network => "network",
            MetricKind::NetworkIn => "arrow.down.circle",
            MetricKind::NetworkOut => "arrow.up.circle",
            MetricKind::Battery => "battery.100",
            MetricKind::Fans => "fan",
            MetricKind::Power => "bolt",
            MetricKind::Temps => "thermometer",
        }
    }

    /// Unit shown before any rescaling.
    pub fn base_unit(self) -> &'static str {
        match self {
            MetricKind::Cpu | MetricKind::Gpu | MetricKind::Battery => "%",
            MetricKind::Memory => "GB",
            MetricKind::Disk
            | MetricKind::Network
            | MetricKind::NetworkIn
            | MetricKind::NetworkOut => "KB/s",
            MetricKind::Fans => "RPM",
            MetricKind::Power => "W",
            MetricKind::Temps => "°C",
        }
    }

    /// Rate metrics rescale between KB/s and MB/s.
    pub fn is_rate(self) -> bool {
        matches!(
            self,
            MetricKind::Disk | MetricKind::Network | MetricKind::NetworkIn | MetricKind::NetworkOut
        )
    }
}
