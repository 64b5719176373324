use chrono::{Duration, TimeZone, Utc};
use statbar::core::sampler::classify::Accent;
use statbar::core::sampler::model::{MetricKind, PowerDirection, SystemSample, TimeRange};
use statbar::core::sampler::series::MetricSeriesStore;

fn t0() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

#[test]
fn test_points_stay_inside_window() {
    let mut store = MetricSeriesStore::new(TimeRange::Now);
    for i in 0..600 {
        store.push(MetricKind::Cpu, i as f64, t0() + Duration::seconds(i), None);
    }

    let now = t0() + Duration::seconds(599);
    let cpu = store.get(MetricKind::Cpu).unwrap();
    assert!(cpu.samples().iter().all(|p| now - p.timestamp <= Duration::minutes(5)));
    // Boundary point exactly five minutes old is kept
    assert_eq!(cpu.samples().front().unwrap().timestamp, now - Duration::minutes(5));
    assert_eq!(cpu.len(), 301);
}

#[test]
fn test_shrinking_range_discards_for_good() {
    let mut store = MetricSeriesStore::new(TimeRange::Hour1);
    for i in 0..60 {
        store.push(MetricKind::Memory, 4.0, t0() + Duration::minutes(i), None);
    }
    let now = t0() + Duration::minutes(59);
    assert_eq!(store.get(MetricKind::Memory).unwrap().len(), 60);

    store.set_range(TimeRange::Now, now);
    assert_eq!(store.get(MetricKind::Memory).unwrap().len(), 6);

    store.set_range(TimeRange::Hour24, now);
    assert_eq!(store.get(MetricKind::Memory).unwrap().len(), 6);
}

#[test]
fn test_ingest_populates_series() {
    let mut store = MetricSeriesStore::new(TimeRange::Now);
    let sample = SystemSample {
        cpu_percent: Some(93.0),
        memory_gb: Some(14.2),
        memory_percent: Some(91.0),
        network_in_kbps: Some(3072.0),
        network_out_kbps: Some(0.0),
        power_out_w: Some(12.5),
        power_direction: Some(PowerDirection::Discharging),
        ..Default::default()
    };
    store.ingest(&sample, t0());

    let cpu = store.get(MetricKind::Cpu).unwrap();
    assert_eq!(cpu.current(), Some(93.0));
    assert_eq!(cpu.accent(), Accent::Red);

    let memory = store.get(MetricKind::Memory).unwrap();
    assert_eq!(memory.current(), Some(14.2));
    assert_eq!(memory.accent(), Accent::Red);

    let net_in = store.get(MetricKind::NetworkIn).unwrap();
    assert_eq!(net_in.current(), Some(3.0));
    assert_eq!(net_in.unit(), "MB/s");
    assert_eq!(net_in.samples()[0].value, 3072.0);

    let power = store.get(MetricKind::Power).unwrap();
    assert_eq!(power.samples()[0].direction, Some(PowerDirection::Discharging));
    assert!(power.secondary_text().starts_with("discharging"));

    // Nothing reported, nothing recorded
    assert!(store.get(MetricKind::Fans).unwrap().is_empty());
    assert!(store.get(MetricKind::Temps).unwrap().is_empty());
}

#[test]
fn test_views_are_downsampled() {
    let mut store = MetricSeriesStore::new(TimeRange::Hour1);
    for i in 0..1000 {
        store.push(MetricKind::Disk, (i % 10) as f64, t0() + Duration::seconds(i), None);
    }

    let views = store.views(100);
    assert_eq!(views.len(), MetricKind::ALL.len());
    let disk = views.iter().find(|v| v.kind == MetricKind::Disk).unwrap();
    assert_eq!(disk.points.len(), 100);
    assert!(disk.points.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
}
