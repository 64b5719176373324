//! Power-source enumeration and internal-battery selection.
//!
//! The OS lists every power source it knows about: the internal battery,
//! the AC adapter, USB-C supplies, and peripheral batteries (mice,
//! headsets). Only the internal battery may feed the battery metrics.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::sampler::model::PowerDirection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerSourceKind {
    InternalBattery,
    /// Battery in a connected device (scope `Device`)
    PeripheralBattery,
    /// AC adapter or USB supply
    Mains,
    Unknown,
}

/// Battery state as the power-source API reports it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BatteryDescription {
    pub current_capacity: f64,
    pub max_capacity: f64,
    pub cycle_count: Option<u32>,
    pub is_charging: bool,
    pub ac_connected: bool,
    /// Positive into the battery, negative out of it
    pub milliamps: Option<f64>,
    pub millivolts: Option<f64>,
}

impl BatteryDescription {
    pub fn percent(&self) -> Option<f64> {
        if self.max_capacity <= 0.0 {
            return None;
        }
        Some((self.current_capacity / self.max_capacity * 100.0).clamp(0.0, 100.0))
    }

    /// Flow direction: sign of the current, with the AC flag deciding only
    /// when the current is exactly zero or unknown.
    pub fn direction(&self) -> PowerDirection {
        match self.milliamps {
            Some(ma) if ma > 0.0 => PowerDirection::Charging,
            Some(ma) if ma < 0.0 => PowerDirection::Discharging,
            _ if self.ac_connected => PowerDirection::Charging,
            _ => PowerDirection::Discharging,
        }
    }

    /// Magnitude of the flow, watts.
    pub fn watts(&self) -> Option<f64> {
        let ma = self.milliamps?;
        let mv = self.millivolts?;
        Some((ma * mv).abs() / 1_000_000.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerSourceEntry {
    pub name: String,
    pub kind: PowerSourceKind,
    pub online: bool,
    pub battery: Option<BatteryDescription>,
}

/// The internal battery, with `ac_connected` filled in from any online
/// mains entry. Peripheral batteries and adapters are never selected.
pub fn select_internal_battery(entries: &[PowerSourceEntry]) -> Option<BatteryDescription> {
    let mains_online = entries
        .iter()
        .any(|e| e.kind == PowerSourceKind::Mains && e.online);

    let mut battery = entries
        .iter()
        .filter(|e| e.kind == PowerSourceKind::InternalBattery)
        .find_map(|e| e.battery)?;
    battery.ac_connected |= mains_online;
    Some(battery)
}

/// One `/sys/class/power_supply/<name>/uevent` file.
pub fn parse_power_supply_uevent(name: &str, uevent: &str) -> PowerSourceEntry {
    let get = |key: &str| uevent_field(uevent, key);
    let num = |key: &str| uevent_field(uevent, key).and_then(|v| v.parse::<f64>().ok());

    let kind = match get("TYPE") {
        Some("Battery") if get("SCOPE") == Some("Device") => PowerSourceKind::PeripheralBattery,
        Some("Battery") => PowerSourceKind::InternalBattery,
        Some("Mains") | Some("USB") | Some("USB_C") | Some("USB_PD") => PowerSourceKind::Mains,
        _ => PowerSourceKind::Unknown,
    };
    let online = num("ONLINE").map(|v| v > 0.0).unwrap_or(false);

    let battery = if matches!(kind, PowerSourceKind::InternalBattery | PowerSourceKind::PeripheralBattery) {
        let status = get("STATUS").unwrap_or("Unknown");
        let (current, max) = match (num("ENERGY_NOW"), num("ENERGY_FULL")) {
            (Some(now), Some(full)) => (now, full),
            _ => match (num("CHARGE_NOW"), num("CHARGE_FULL")) {
                (Some(now), Some(full)) => (now, full),
                _ => (num("CAPACITY").unwrap_or(0.0), 100.0),
            },
        };

        // µA, or derived from µW / µV
        let microamps = num("CURRENT_NOW").or_else(|| {
            let power = num("POWER_NOW")?;
            let volts = num("VOLTAGE_NOW")? / 1_000_000.0;
            (volts > 0.0).then(|| power / volts)
        });
        let milliamps = microamps.map(|ua| {
            let magnitude = (ua / 1000.0).abs();
            match status {
                "Charging" => magnitude,
                "Discharging" => -magnitude,
                "Full" | "Not charging" => 0.0,
                _ => ua / 1000.0,
            }
        });

        Some(BatteryDescription {
            current_capacity: current,
            max_capacity: max,
            cycle_count: num("CYCLE_COUNT").filter(|c| *c > 0.0).map(|c| c as u32),
            is_charging: status == "Charging",
            ac_connected: false,
            milliamps,
            millivolts: num("VOLTAGE_NOW").map(|uv| uv / 1000.0),
        })
    } else {
        None
    };

    PowerSourceEntry {
        name: name.to_string(),
        kind,
        online,
        battery,
    }
}

fn uevent_field<'a>(uevent: &'a str, key: &str) -> Option<&'a str> {
    uevent.lines().find_map(|line| {
        let (k, v) = line.split_once('=')?;
        (k.trim().strip_prefix("POWER_SUPPLY_")? == key).then(|| v.trim())
    })
}

/// Every entry under a `power_supply` class directory.
pub fn read_power_supplies(root: &Path) -> Vec<PowerSourceEntry> {
    let Ok(dir) = std::fs::read_dir(root) else {
        return Vec::new();
    };

    let mut entries: Vec<PowerSourceEntry> = dir
        .filter_map(|e| e.ok())
        .filter_map(|e| {
            let name = e.file_name().to_string_lossy().into_owned();
            let uevent = std::fs::read_to_string(e.path().join("uevent")).ok()?;
            Some(parse_power_supply_uevent(&name, &uevent))
        })
        .collect();
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    entries
}

/// Internal battery through the `battery` crate, which only lists system
/// batteries.
pub fn battery_crate_description() -> Option<BatteryDescription> {
    use battery::units::electric_potential::volt;
    use battery::units::energy::watt_hour;
    use battery::units::power::watt;

    let manager = battery::Manager::new().ok()?;
    let mut batteries = manager.batteries().ok()?;
    let battery = batteries.find_map(|b| b.ok())?;

    let state = battery.state();
    let is_charging = state == battery::State::Charging;
    let volts = battery.voltage().get::<volt>() as f64;
    let watts = battery.energy_rate().get::<watt>() as f64;
    let milliamps = if volts > 0.0 {
        let magnitude = watts / volts * 1000.0;
        Some(match state {
            battery::State::Charging => magnitude,
            battery::State::Discharging | battery::State::Empty => -magnitude,
            _ => 0.0,
        })
    } else {
        None
    };

    Some(BatteryDescription {
        current_capacity: battery.energy().get::<watt_hour>() as f64,
        max_capacity: battery.energy_full().get::<watt_hour>() as f64,
        cycle_count: battery.cycle_count(),
        is_charging,
        ac_connected: matches!(state, battery::State::Charging | battery::State::Full),
        milliamps,
        millivolts: (volts > 0.0).then_some(volts * 1000.0),
    })
}
