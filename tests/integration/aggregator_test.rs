use std::sync::Arc;
use std::time::Duration;

use statbar::core::sampler::aggregator::SampleAggregator;
use statbar::core::sampler::clock::{Clock, ManualClock};
use statbar::core::sampler::model::{PowerDirection, TempSource};
use statbar::core::sampler::temperature::{TemperatureEstimator, UsageCurveTier};
use statbar::platform::counters::{CpuTicks, DiskCounters, NetCounters, RawCounterReader, VmStats};
use statbar::platform::power::{parse_power_supply_uevent, select_internal_battery, BatteryDescription};
use statbar::platform::sensors::SensorBridgeClient;

/// Replays one scripted reading per tick.
#[derive(Default)]
struct ScriptedReader {
    tick: usize,
    cpu: Vec<CpuTicks>,
    net: Vec<NetCounters>,
    disk: Vec<DiskCounters>,
    battery: Option<BatteryDescription>,
}

impl ScriptedReader {
    fn at<T: Copy>(list: &[T], tick: usize) -> Option<T> {
        list.get(tick).copied()
    }
}

impl RawCounterReader for ScriptedReader {
    fn cpu_ticks(&mut self) -> Option<CpuTicks> {
        // Called first each tick, so it advances the script
        let ticks = Self::at(&self.cpu, self.tick);
        self.tick += 1;
        ticks
    }

    fn vm_stats(&mut self) -> Option<VmStats> {
        Some(VmStats {
            active_bytes: 6 << 30,
            wired_bytes: 2 << 30,
            compressed_bytes: 0,
            total_bytes: 16 << 30,
        })
    }

    fn disk_byte_counters(&mut self) -> Option<DiskCounters> {
        Self::at(&self.disk, self.tick - 1)
    }

    fn network_byte_counters(&mut self) -> Option<NetCounters> {
        Self::at(&self.net, self.tick - 1)
    }

    fn battery_description(&mut self) -> Option<BatteryDescription> {
        self.battery
    }

    fn accelerator_busy_percent(&mut self) -> Option<f64> {
        None
    }
}

fn cpu(busy: u64, idle: u64) -> CpuTicks {
    CpuTicks {
        user: busy,
        system: 0,
        idle,
        nice: 0,
    }
}

fn aggregator(reader: ScriptedReader, clock: &ManualClock) -> SampleAggregator {
    let clock: Arc<dyn Clock> = Arc::new(clock.clone());
    let estimator = TemperatureEstimator::new(vec![Box::new(UsageCurveTier)], Duration::ZERO, clock.clone());
    SampleAggregator::new(
        Box::new(reader),
        SensorBridgeClient::disabled(clock.clone()).unwrap(),
        estimator,
        clock,
    )
}

#[test]
fn test_rates_across_ticks_and_reset() {
    let clock = ManualClock::new();
    let reader = ScriptedReader {
        cpu: vec![cpu(100, 900), cpu(150, 950), cpu(250, 1050)],
        net: vec![
            NetCounters { rx_bytes: 10_000, tx_bytes: 5_000 },
            NetCounters { rx_bytes: 10_000 + 2048 * 1024, tx_bytes: 5_000 + 1024 },
            // Interface restart: counters start over
            NetCounters { rx_bytes: 4096, tx_bytes: 0 },
        ],
        disk: vec![
            DiskCounters { read_bytes: 0, write_bytes: 0 },
            DiskCounters { read_bytes: 1024, write_bytes: 3072 },
        ],
        ..Default::default()
    };
    let mut agg = aggregator(reader, &clock);

    let first = agg.tick();
    assert!(first.cpu_percent.is_none());
    assert!(first.network_in_kbps.is_none());
    assert!(first.disk_kbps.is_none());
    assert_eq!(first.memory_gb, Some(8.0));
    assert_eq!(first.memory_percent, Some(50.0));

    clock.advance(Duration::from_secs(1));
    let second = agg.tick();
    assert_eq!(second.cpu_percent, Some(50.0));
    assert_eq!(second.network_in_kbps, Some(2048.0));
    assert_eq!(second.network_out_kbps, Some(1.0));
    assert_eq!(second.disk_kbps, Some(4.0));

    clock.advance(Duration::from_secs(2));
    let third = agg.tick();
    // Reset: the new value itself is the delta
    assert_eq!(third.network_in_kbps, Some(2.0));
    assert_eq!(third.network_out_kbps, Some(0.0));
    // Disk reader went quiet this tick
    assert!(third.disk_kbps.is_none());
}

#[test]
fn test_peripheral_battery_never_feeds_metrics() {
    let mouse = "POWER_SUPPLY_TYPE=Battery\nPOWER_SUPPLY_SCOPE=Device\nPOWER_SUPPLY_CAPACITY=40\n";
    let entries = vec![parse_power_supply_uevent("hidpp_battery_0", mouse)];
    let clock = ManualClock::new();
    let reader = ScriptedReader {
        battery: select_internal_battery(&entries),
        ..Default::default()
    };
    let sample = aggregator(reader, &clock).tick();

    assert!(sample.battery_percent.is_none());
    assert!(sample.power_direction.is_none());
}

#[test]
fn test_battery_power_split_by_direction() {
    let clock = ManualClock::new();
    let reader = ScriptedReader {
        battery: Some(BatteryDescription {
            current_capacity: 45.0,
            max_capacity: 60.0,
            cycle_count: Some(88),
            is_charging: true,
            ac_connected: true,
            milliamps: Some(2000.0),
            millivolts: Some(12_000.0),
        }),
        ..Default::default()
    };
    let sample = aggregator(reader, &clock).tick();

    assert_eq!(sample.battery_percent, Some(75.0));
    assert_eq!(sample.battery_cycle_count, Some(88));
    assert_eq!(sample.power_direction, Some(PowerDirection::Charging));
    assert_eq!(sample.power_in_w, Some(24.0));
    assert!(sample.power_out_w.is_none());
    assert_eq!(sample.power_w(), Some(24.0));
}

#[test]
fn test_temperatures_estimated_without_sensors() {
    let clock = ManualClock::new();
    let reader = ScriptedReader {
        cpu: vec![cpu(0, 100), cpu(100, 100)],
        ..Default::default()
    };
    let mut agg = aggregator(reader, &clock);

    agg.tick();
    clock.advance(Duration::from_secs(1));
    let sample = agg.tick();

    let cpu_temp = sample.cpu_temp.unwrap();
    assert_eq!(cpu_temp.source, TempSource::UsageCurve);
    assert_eq!(cpu_temp.celsius, 85.0);
    // No GPU busy figure: CPU load stands in
    assert_eq!(sample.gpu_temp.unwrap().celsius, 88.0);
    assert!(sample.disk_temp.is_none());
    assert!(sample.fan_rpm.is_none());
}
