use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use statbar::core::sampler::aggregator::SampleAggregator;
use statbar::core::sampler::clock::{Clock, SystemClock};
use statbar::core::sampler::model::TimeRange;
use statbar::core::sampler::scheduler::{Control, SamplingEngine, SchedulerRuntime};
use statbar::core::sampler::temperature::{TemperatureEstimator, UsageCurveTier};
use statbar::platform::counters::{CpuTicks, DiskCounters, NetCounters, RawCounterReader, VmStats};
use statbar::platform::power::BatteryDescription;
use statbar::platform::sensors::SensorBridgeClient;

/// Reader whose CPU query is slower than the sampling interval.
struct SlowReader {
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    reads: u64,
}

impl RawCounterReader for SlowReader {
    fn cpu_ticks(&mut self) -> Option<CpuTicks> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(30));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.reads += 1;
        Some(CpuTicks {
            user: self.reads * 10,
            system: 0,
            idle: self.reads * 90,
            nice: 0,
        })
    }

    fn vm_stats(&mut self) -> Option<VmStats> {
        None
    }

    fn disk_byte_counters(&mut self) -> Option<DiskCounters> {
        None
    }

    fn network_byte_counters(&mut self) -> Option<NetCounters> {
        None
    }

    fn battery_description(&mut self) -> Option<BatteryDescription> {
        None
    }

    fn accelerator_busy_percent(&mut self) -> Option<f64> {
        None
    }
}

#[test]
fn test_ticks_never_overlap() {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let max_in_flight = Arc::new(AtomicUsize::new(0));
    let reader = SlowReader {
        in_flight: in_flight.clone(),
        max_in_flight: max_in_flight.clone(),
        reads: 0,
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let estimator = TemperatureEstimator::new(vec![Box::new(UsageCurveTier)], Duration::ZERO, clock.clone());
    let aggregator = SampleAggregator::new(
        Box::new(reader),
        SensorBridgeClient::disabled(clock.clone()).unwrap(),
        estimator,
        clock,
    );
    // Interval well below the tick duration
    let engine = SamplingEngine::new(aggregator, TimeRange::Now, Duration::from_millis(5), 50);
    let mut runtime = SchedulerRuntime::start(engine).unwrap();

    let mut latest = runtime.wait_for_snapshot().unwrap();
    while latest.tick < 4 {
        latest = runtime.wait_for_snapshot().unwrap();
    }
    assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
    assert_eq!(latest.sample.cpu_percent, Some(10.0));

    runtime.send(Control::SetInterval(Duration::from_millis(250))).unwrap();
    while runtime.wait_for_snapshot().unwrap().interval_ms != 250 {}
    assert_eq!(runtime.latest().interval_ms, 250);

    runtime.shutdown();
}
