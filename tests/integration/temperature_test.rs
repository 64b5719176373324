use std::sync::Arc;
use std::time::Duration;

use statbar::core::sampler::clock::ManualClock;
use statbar::core::sampler::model::TempSource;
use statbar::core::sampler::temperature::{
    usage_curve, BridgeTier, ProbeTier, SensorScan, SensorTier, TempKind, TemperatureEstimator,
    TemperatureTier, ThermalPressureTier, TierContext, UsageCurveTier,
};
use statbar::platform::sensors::{parse_bridge_output, SensorProbe};
use statbar::Result;

struct FixedScan(Vec<(String, f64)>);

impl SensorScan for FixedScan {
    fn scan(&mut self) -> Vec<(String, f64)> {
        self.0.clone()
    }
}

struct CannedProbe(&'static str);

impl SensorProbe for CannedProbe {
    fn run(&mut self) -> Result<String> {
        Ok(self.0.to_string())
    }
}

const TTL: Duration = Duration::from_secs(3);

fn estimator(tiers: Vec<Box<dyn TemperatureTier>>) -> TemperatureEstimator {
    TemperatureEstimator::new(tiers, TTL, Arc::new(ManualClock::new()))
}

fn sensors(entries: Vec<(String, f64)>) -> Box<SensorTier> {
    Box::new(SensorTier::new(Box::new(FixedScan(entries)), TTL, Arc::new(ManualClock::new())))
}

#[test]
fn test_bridge_wins_over_everything() {
    let mut est = estimator(vec![
        Box::new(BridgeTier),
        sensors(vec![("CPU Package".into(), 61.0)]),
        Box::new(UsageCurveTier),
    ]);
    let ctx = TierContext {
        usage_percent: 50.0,
        bridge: Some(parse_bridge_output("CPU die temperature: 48.5 C\nFan: 1800 rpm\n")),
        thermal_pressure: None,
    };

    let reading = est.estimate(TempKind::Cpu, &ctx).unwrap();
    assert_eq!(reading.celsius, 48.5);
    assert_eq!(reading.source, TempSource::Bridge);
    assert!(!reading.is_estimated());
}

#[test]
fn test_implausible_sensor_falls_through_to_probe() {
    let mut est = estimator(vec![
        sensors(vec![("cpu".into(), 200.0)]),
        Box::new(ProbeTier::new(
            Box::new(CannedProbe("Package id 0:  +52.0°C  (high = +80.0°C)\n")),
            TTL,
            Arc::new(ManualClock::new()),
        )),
        Box::new(UsageCurveTier),
    ]);

    let reading = est.estimate(TempKind::Cpu, &TierContext::default()).unwrap();
    assert_eq!(reading.source, TempSource::Probe);
    assert_eq!(reading.celsius, 52.0);
}

#[test]
fn test_usage_curve_always_answers() {
    let mut est = estimator(vec![Box::new(ThermalPressureTier), Box::new(UsageCurveTier)]);
    let ctx = TierContext {
        usage_percent: 100.0,
        ..Default::default()
    };

    let cpu = est.estimate(TempKind::Cpu, &ctx).unwrap();
    assert_eq!(cpu.source, TempSource::UsageCurve);
    assert_eq!(cpu.celsius, 85.0);
    assert!(cpu.is_estimated());

    assert_eq!(usage_curve(TempKind::Gpu, 0.0), Some(42.0));
    assert_eq!(usage_curve(TempKind::Gpu, 100.0), Some(88.0));
}
