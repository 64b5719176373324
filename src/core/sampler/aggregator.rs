//! One [`SystemSample`] per tick.
//!
//! Readers are queried in a fixed order: CPU, GPU, memory, disk, network,
//! battery, privileged bridge, fans, temperatures. Rolling counter state
//! lives here and is only touched from `tick`, which takes `&mut self`, so
//! two ticks can never interleave.

use std::sync::Arc;
use std::time::{Duration, Instant};

use super::clock::Clock;
use super::model::{PowerDirection, SystemSample, TemperatureReading};
use super::rates::{PairTracker, DISK_DELTA_CEILING_BYTES, NETWORK_DELTA_CEILING_BYTES};
use super::temperature::{ComponentScan, TempKind, TemperatureEstimator, TierContext};
use crate::core::config::Config;
use crate::error::Result;
use crate::platform::counters::{default_reader, CpuTicks, RawCounterReader};
use crate::platform::sensors::{
    connect_default, BridgeArgs, BridgeReading, BridgeStatus, CommandProbe, SensorBridgeClient,
    SensorProbe,
};

pub struct SampleAggregator {
    reader: Box<dyn RawCounterReader>,
    bridge: SensorBridgeClient,
    estimator: TemperatureEstimator,
    clock: Arc<dyn Clock>,
    previous_cpu: Option<CpuTicks>,
    disk: PairTracker,
    net: PairTracker,
    last_tick: Option<Instant>,
}

impl SampleAggregator {
    pub fn new(
        reader: Box<dyn RawCounterReader>,
        bridge: SensorBridgeClient,
        estimator: TemperatureEstimator,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            reader,
            bridge,
            estimator,
            clock,
            previous_cpu: None,
            disk: PairTracker::new(DISK_DELTA_CEILING_BYTES),
            net: PairTracker::new(NETWORK_DELTA_CEILING_BYTES),
            last_tick: None,
        }
    }

    /// Platform reader, bridge and tier chain wired from `config`.
    pub fn from_config(config: &Config, clock: Arc<dyn Clock>) -> Result<Self> {
        let ttl = config.cache_ttl();

        let transport = if config.bridge.enabled {
            connect_default(config.bridge.socket_path.clone(), config.bridge.timeout())
        } else {
            None
        };
        let samplers: Vec<&str> = config.bridge.samplers.iter().map(String::as_str).collect();
        let args = BridgeArgs::sample(
            &samplers,
            config.bridge.sample_count,
            config.bridge.sample_interval_ms,
        )?;
        let bridge = SensorBridgeClient::new(transport, args, ttl, clock.clone());

        let probe: Option<Box<dyn SensorProbe>> = if config.probe.enabled {
            CommandProbe::detect(&config.probe.command, config.probe.args.clone(), config.probe.timeout())
                .map(|p| Box::new(p) as Box<dyn SensorProbe>)
        } else {
            None
        };
        let estimator = TemperatureEstimator::standard(Box::new(ComponentScan::new()), probe, ttl, clock.clone());

        Ok(Self::new(default_reader(), bridge, estimator, clock))
    }

    pub fn bridge_status(&self) -> &BridgeStatus {
        self.bridge.status()
    }

    pub fn retry_bridge(&mut self) {
        self.bridge.retry();
    }

    pub fn estimator(&self) -> &TemperatureEstimator {
        &self.estimator
    }

    /// Sample every source once.
    pub fn tick(&mut self) -> SystemSample {
        let now = self.clock.now();
        let elapsed = self
            .last_tick
            .map(|prev| now.saturating_duration_since(prev))
            .unwrap_or(Duration::ZERO);
        self.last_tick = Some(now);

        let mut sample = SystemSample {
            cpu_percent: self.cpu_percent(),
            gpu_percent: self.reader.accelerator_busy_percent(),
            ..Default::default()
        };

        if let Some(vm) = self.reader.vm_stats() {
            sample.memory_gb = Some(vm.used_gb());
            sample.memory_percent = vm.used_percent();
        }

        // A missed read drops the rolling state; diffing across the gap
        // would divide a multi-tick delta by one tick's duration
        match self.reader.disk_byte_counters() {
            Some(disk) => {
                if let Some((read, write)) = self.disk.observe(disk.read_bytes, disk.write_bytes, elapsed) {
                    sample.disk_read_kbps = Some(read);
                    sample.disk_write_kbps = Some(write);
                    sample.disk_kbps = Some(read + write);
                }
            }
            None => self.disk.reset(),
        }

        match self.reader.network_byte_counters() {
            Some(net) => {
                if let Some((rx, tx)) = self.net.observe(net.rx_bytes, net.tx_bytes, elapsed) {
                    sample.network_in_kbps = Some(rx);
                    sample.network_out_kbps = Some(tx);
                }
            }
            None => self.net.reset(),
        }

        if let Some(battery) = self.reader.battery_description() {
            sample.battery_percent = battery.percent();
            sample.battery_cycle_count = battery.cycle_count;
            let direction = battery.direction();
            sample.power_direction = Some(direction);
            match direction {
                PowerDirection::Charging => sample.power_in_w = battery.watts(),
                PowerDirection::Discharging => sample.power_out_w = battery.watts(),
            }
        }

        let bridge = self.bridge.read();
        sample.fan_rpm = bridge
            .as_ref()
            .and_then(|b| b.fan_rpm())
            .or_else(|| mean_spinning(&self.reader.fan_speeds()));

        let pressure = self.reader.thermal_pressure_percent();
        let cpu_usage = sample.cpu_percent.unwrap_or(0.0);
        // Integrated GPUs share the package, so CPU load stands in when
        // there is no busy figure of its own
        let gpu_usage = sample.gpu_percent.unwrap_or(cpu_usage);

        sample.cpu_temp = self.temperature(TempKind::Cpu, cpu_usage, bridge.as_ref(), pressure);
        sample.gpu_temp = self.temperature(TempKind::Gpu, gpu_usage, bridge.as_ref(), pressure);
        sample.disk_temp = self.temperature(TempKind::Disk, 0.0, bridge.as_ref(), pressure);

        sample
    }

    fn cpu_percent(&mut self) -> Option<f64> {
        match self.reader.cpu_ticks() {
            Some(ticks) => {
                let usage = self
                    .previous_cpu
                    .and_then(|prev| ticks.usage_since(&prev));
                self.previous_cpu = Some(ticks);
                usage
            }
            None => self.reader.cpu_usage_percent(),
        }
    }

    fn temperature(
        &mut self,
        kind: TempKind,
        usage_percent: f64,
        bridge: Option<&BridgeReading>,
        thermal_pressure: Option<f64>,
    ) -> Option<TemperatureReading> {
        let ctx = TierContext {
            usage_percent,
            bridge: bridge.cloned(),
            thermal_pressure,
        };
        self.estimator.estimate(kind, &ctx)
    }
}

fn mean_spinning(rpms: &[f64]) -> Option<f64> {
    let spinning: Vec<f64> = rpms.iter().copied().filter(|r| *r > 0.0).collect();
    if spinning.is_empty() {
        None
    } else {
        Some(spinning.iter().sum::<f64>() / spinning.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sampler::clock::ManualClock;
    use crate::core::sampler::model::TempSource;
    use crate::core::sampler::temperature::{UsageCurveTier, CPU_IDLE_TEMP_C};
    use crate::platform::counters::{DiskCounters, NetCounters, VmStats};
    use crate::platform::power::BatteryDescription;

    #[derive(Default)]
    struct FakeReader {
        cpu: Vec<CpuTicks>,
        disk: Vec<Option<DiskCounters>>,
        net: Vec<Option<NetCounters>>,
        battery: Option<BatteryDescription>,
        fans: Vec<f64>,
    }

    impl RawCounterReader for FakeReader {
        fn cpu_ticks(&mut self) -> Option<CpuTicks> {
            (!self.cpu.is_empty()).then(|| self.cpu.remove(0))
        }

        fn vm_stats(&mut self) -> Option<VmStats> {
            Some(VmStats {
                active_bytes: 3 << 30,
                wired_bytes: 1 << 30,
                compressed_bytes: 0,
                total_bytes: 8 << 30,
            })
        }

        fn disk_byte_counters(&mut self) -> Option<DiskCounters> {
            (!self.disk.is_empty()).then(|| self.disk.remove(0)).flatten()
        }

        fn network_byte_counters(&mut self) -> Option<NetCounters> {
            (!self.net.is_empty()).then(|| self.net.remove(0)).flatten()
        }

        fn battery_description(&mut self) -> Option<BatteryDescription> {
            self.battery
        }

        fn accelerator_busy_percent(&mut self) -> Option<f64> {
            None
        }

        fn fan_speeds(&mut self) -> Vec<f64> {
            self.fans.clone()
        }
    }

    fn aggregator(reader: FakeReader, clock: &ManualClock) -> SampleAggregator {
        let clock: Arc<dyn Clock> = Arc::new(clock.clone());
        let estimator = TemperatureEstimator::new(
            vec![Box::new(UsageCurveTier)],
            Duration::from_secs(3),
            clock.clone(),
        );
        let bridge = SensorBridgeClient::disabled(clock.clone()).unwrap();
        SampleAggregator::new(Box::new(reader), bridge, estimator, clock)
    }

    fn ticks(busy: u64, idle: u64) -> CpuTicks {
        CpuTicks {
            user: busy,
            system: 0,
            idle,
            nice: 0,
        }
    }

    #[test]
    fn test_first_tick_suppresses_rates() {
        let clock = ManualClock::new();
        let reader = FakeReader {
            cpu: vec![ticks(100, 900), ticks(150, 950)],
            disk: vec![
                Some(DiskCounters {
                    read_bytes: 1 << 20,
                    write_bytes: 0,
                }),
                Some(DiskCounters {
                    read_bytes: (1 << 20) + 2048,
                    write_bytes: 1024,
                }),
            ],
            net: vec![
                Some(NetCounters {
                    rx_bytes: 5000,
                    tx_bytes: 5000,
                }),
                Some(NetCounters {
                    rx_bytes: 5000 + 10240,
                    tx_bytes: 5000,
                }),
            ],
            ..Default::default()
        };
        let mut agg = aggregator(reader, &clock);

        let first = agg.tick();
        assert_eq!(first.cpu_percent, None);
        assert_eq!(first.disk_kbps, None);
        assert_eq!(first.network_in_kbps, None);
        assert_eq!(first.network_out_kbps, None);
        assert_eq!(first.memory_gb, Some(4.0));
        assert_eq!(first.memory_percent, Some(50.0));

        clock.advance(Duration::from_secs(1));
        let second = agg.tick();
        assert_eq!(second.cpu_percent, Some(50.0));
        assert_eq!(second.disk_read_kbps, Some(2.0));
        assert_eq!(second.disk_write_kbps, Some(1.0));
        assert_eq!(second.disk_kbps, Some(3.0));
        assert_eq!(second.network_in_kbps, Some(10.0));
        assert_eq!(second.network_out_kbps, Some(0.0));
    }

    #[test]
    fn test_counter_reset_reports_current_value() {
        let clock = ManualClock::new();
        let reader = FakeReader {
            net: vec![
                Some(NetCounters {
                    rx_bytes: 1_000_000,
                    tx_bytes: 0,
                }),
                Some(NetCounters {
                    rx_bytes: 2048,
                    tx_bytes: 0,
                }),
            ],
            ..Default::default()
        };
        let mut agg = aggregator(reader, &clock);

        agg.tick();
        clock.advance(Duration::from_secs(1));
        assert_eq!(agg.tick().network_in_kbps, Some(2.0));
    }

    #[test]
    fn test_missed_counter_read_restarts_rates() {
        let clock = ManualClock::new();
        let net = |rx| {
            Some(NetCounters {
                rx_bytes: rx,
                tx_bytes: 0,
            })
        };
        let disk = |read| {
            Some(DiskCounters {
                read_bytes: read,
                write_bytes: 0,
            })
        };
        // Steady 1 KB/s, unreadable for three ticks in the middle
        let reader = FakeReader {
            net: vec![net(0), net(1024), None, None, None, net(5 * 1024), net(6 * 1024)],
            disk: vec![disk(0), disk(1024), None, None, None, disk(5 * 1024), disk(6 * 1024)],
            ..Default::default()
        };
        let mut agg = aggregator(reader, &clock);

        let mut rates = Vec::new();
        for _ in 0..7 {
            let sample = agg.tick();
            rates.push((sample.network_in_kbps, sample.disk_read_kbps));
            clock.advance(Duration::from_secs(1));
        }

        assert_eq!(rates[1], (Some(1.0), Some(1.0)));
        assert_eq!(rates[2], (None, None));
        // First read after the gap only seeds the counters
        assert_eq!(rates[5], (None, None));
        assert_eq!(rates[6], (Some(1.0), Some(1.0)));
    }

    #[test]
    fn test_battery_power_split() {
        let clock = ManualClock::new();
        let reader = FakeReader {
            battery: Some(BatteryDescription {
                current_capacity: 50.0,
                max_capacity: 100.0,
                cycle_count: Some(87),
                milliamps: Some(-1000.0),
                millivolts: Some(11000.0),
                ..Default::default()
            }),
            ..Default::default()
        };
        let mut agg = aggregator(reader, &clock);

        let sample = agg.tick();
        assert_eq!(sample.battery_percent, Some(50.0));
        assert_eq!(sample.battery_cycle_count, Some(87));
        assert_eq!(sample.power_direction, Some(PowerDirection::Discharging));
        assert_eq!(sample.power_out_w, Some(11.0));
        assert_eq!(sample.power_in_w, None);
        assert_eq!(sample.power_w(), Some(11.0));
    }

    #[test]
    fn test_fans_fall_back_to_reader() {
        let clock = ManualClock::new();
        let reader = FakeReader {
            fans: vec![0.0, 2000.0, 1000.0],
            ..Default::default()
        };
        let mut agg = aggregator(reader, &clock);
        assert_eq!(agg.tick().fan_rpm, Some(1500.0));
        assert_eq!(agg.bridge_status(), &BridgeStatus::Disabled);
    }

    #[test]
    fn test_temperatures_estimated_without_sensors() {
        let clock = ManualClock::new();
        let mut agg = aggregator(FakeReader::default(), &clock);

        let sample = agg.tick();
        let cpu = sample.cpu_temp.unwrap();
        assert_eq!(cpu.source, TempSource::UsageCurve);
        assert_eq!(cpu.celsius, CPU_IDLE_TEMP_C);
        assert!(sample.gpu_temp.unwrap().is_estimated());
        assert_eq!(sample.disk_temp, None);
        assert!(sample.avg_temp().is_some());
    }
}
