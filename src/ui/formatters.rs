use colored::*;

use crate::core::sampler::classify::Accent;
use crate::core::sampler::model::{MetricKind, SamplePoint, TemperatureReading};
use crate::core::sampler::rates::rescale_kbps;
use crate::core::sampler::scheduler::MetricSnapshot;
use crate::core::sampler::series::SeriesView;
use crate::platform::sensors::BridgeStatus;

const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Default sparkline width in the terminal view
pub const SPARKLINE_WIDTH: usize = 32;

/// Value with its display unit; rates are rescaled to MB/s past 1024 KB/s.
pub fn format_metric_value(kind: MetricKind, value: f64) -> String {
    if kind.is_rate() {
        let (scaled, unit) = rescale_kbps(value);
        return format!("{:.1} {}", scaled, unit.as_str());
    }

    match kind {
        MetricKind::Cpu | MetricKind::Gpu | MetricKind::Battery => format!("{:.0}%", value),
        MetricKind::Memory => format!("{:.1} GB", value),
        MetricKind::Fans => format!("{:.0} RPM", value),
        MetricKind::Power => format!("{:.1} W", value),
        MetricKind::Temps => format!("{:.0}°C", value),
        _ => format!("{:.1} {}", value, kind.base_unit()),
    }
}

/// Estimated temperatures are marked so they are never mistaken for sensor
/// readings.
pub fn format_temperature(reading: &TemperatureReading) -> String {
    if reading.is_estimated() {
        format!("~{:.0}°C (est.)", reading.celsius)
    } else {
        format!("{:.0}°C", reading.celsius)
    }
}

pub fn paint(text: &str, accent: Accent) -> ColoredString {
    match accent {
        Accent::Neutral => text.normal(),
        Accent::Teal => text.cyan(),
        Accent::Blue => text.bright_blue(),
        Accent::Green => text.green(),
        Accent::Orange => text.yellow(),
        Accent::Red => text.red().bold(),
    }
}

/// Block-character sparkline of the last `width` points, scaled to their
/// own min/max.
pub fn sparkline(points: &[SamplePoint], width: usize) -> String {
    if points.is_empty() || width == 0 {
        return String::new();
    }

    let tail = &points[points.len().saturating_sub(width)..];
    let (min, max) = tail.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
        (lo.min(p.value), hi.max(p.value))
    });
    let span = max - min;

    tail.iter()
        .map(|p| {
            if span <= f64::EPSILON {
                return SPARK_LEVELS[0];
            }
            let level = ((p.value - min) / span * (SPARK_LEVELS.len() - 1) as f64).round() as usize;
            SPARK_LEVELS[level.min(SPARK_LEVELS.len() - 1)]
        })
        .collect()
}

pub fn format_bridge_status(status: &BridgeStatus) -> ColoredString {
    let text = status.to_string();
    match status {
        BridgeStatus::Connected => text.green(),
        BridgeStatus::Pending => text.dimmed(),
        BridgeStatus::Disabled => text.dimmed(),
        BridgeStatus::NoPrivilegedAccess(_) => text.yellow(),
    }
}

fn print_series_row(view: &SeriesView) {
    let value = match view.current {
        Some(v) => format_metric_value(view.kind, v),
        None => "--".to_string(),
    };

    println!(
        "  {:<13} {:>12}  {:<14} {}",
        view.title.bold(),
        paint(&value, view.accent),
        paint(&view.secondary_text, view.accent),
        sparkline(&view.points, SPARKLINE_WIDTH).dimmed()
    );
}

/// Human view of one snapshot.
pub fn print_snapshot(snapshot: &MetricSnapshot) {
    println!(
        "\n{} {}  {}",
        "STATBAR".bold().bright_cyan(),
        snapshot.timestamp.format("%H:%M:%S").to_string().dimmed(),
        format!(
            "tick {} | range {} | every {} ms",
            snapshot.tick, snapshot.range, snapshot.interval_ms
        )
        .dimmed()
    );
    println!("{}", "-".repeat(72));

    for view in &snapshot.series {
        print_series_row(view);
    }

    let sample = &snapshot.sample;
    let temps: Vec<String> = [
        ("CPU", sample.cpu_temp.as_ref()),
        ("GPU", sample.gpu_temp.as_ref()),
        ("Disk", sample.disk_temp.as_ref()),
    ]
    .iter()
    .filter_map(|(label, reading)| reading.map(|r| format!("{} {}", label, format_temperature(r))))
    .collect();
    if !temps.is_empty() {
        println!("  {:<13} {}", "Sensors".bold(), temps.join("  "));
    }

    println!("  {:<13} {}", "Bridge".bold(), format_bridge_status(&snapshot.bridge_status));
}
