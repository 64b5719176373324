use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

use super::GpuProvider;
use crate::error::{Result, StatbarError};
use crate::platform::process::{is_available, run_checked};

const IOREG_TIMEOUT: Duration = Duration::from_millis(1500);

static DEVICE_UTILIZATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""Device Utilization %"\s*=\s*(\d+)"#).expect("device utilization pattern is valid")
});

/// Accelerator statistics from the IOKit registry.
pub struct IoregGpuProvider {
    args: Vec<String>,
}

impl IoregGpuProvider {
    pub fn detect() -> Option<Self> {
        if !cfg!(target_os = "macos") || !is_available("ioreg") {
            return None;
        }
        Some(Self {
            args: ["-r", "-d", "1", "-w", "0", "-c", "IOAccelerator"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        })
    }
}

impl GpuProvider for IoregGpuProvider {
    fn name(&self) -> &str {
        "IOAccelerator"
    }

    fn busy_percent(&mut self) -> Result<f64> {
        let text = run_checked("ioreg", &self.args, IOREG_TIMEOUT)?;
        parse_device_utilization(&text)
            .ok_or_else(|| StatbarError::parse("no Device Utilization % in ioreg output"))
    }
}

/// Highest `"Device Utilization %"` across accelerators.
pub fn parse_device_utilization(text: &str) -> Option<f64> {
    DEVICE_UTILIZATION
        .captures_iter(text)
        .filter_map(|c| c.get(1)?.as_str().parse::<f64>().ok())
        .filter(|v| *v <= 100.0)
        .reduce(f64::max)
}
