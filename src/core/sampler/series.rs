//! Rolling time-windowed buffers, one per tracked metric.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::classify::{classify_memory, classify_memory_gb, reclassify, Accent, Classification};
use super::model::{MetricKind, PowerDirection, SamplePoint, SystemSample, TimeRange};
use super::rates::rescale_kbps;

/// History of a single metric.
///
/// Points are kept in insertion order, which is time order. Rate metrics
/// store KB/s; `current` and `unit` carry the rescaled display form.
#[derive(Debug, Clone)]
pub struct MetricSeries {
    pub kind: MetricKind,
    pub title: &'static str,
    pub icon_key: &'static str,
    unit: &'static str,
    samples: VecDeque<SamplePoint>,
    current: Option<f64>,
    classification: Classification,
}

impl MetricSeries {
    pub fn new(kind: MetricKind) -> Self {
        Self {
            kind,
            title: kind.title(),
            icon_key: kind.icon_key(),
            unit: kind.base_unit(),
            samples: VecDeque::new(),
            current: None,
            classification: Classification {
                text: "--".to_string(),
                accent: Accent::Neutral,
            },
        }
    }

    pub fn unit(&self) -> &'static str {
        self.unit
    }

    pub fn current(&self) -> Option<f64> {
        self.current
    }

    pub fn secondary_text(&self) -> &str {
        &self.classification.text
    }

    pub fn accent(&self) -> Accent {
        self.classification.accent
    }

    pub fn samples(&self) -> &VecDeque<SamplePoint> {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    fn push(&mut self, point: SamplePoint) {
        if self.kind.is_rate() {
            let (display, unit) = rescale_kbps(point.value);
            self.current = Some(display);
            self.unit = unit.as_str();
        } else {
            self.current = Some(point.value);
        }

        // A point stamped before the newest one would break time order
        if let Some(last) = self.samples.back() {
            if point.timestamp < last.timestamp {
                log::debug!("{}: dropping out-of-order point", self.title);
                return;
            }
        }
        self.samples.push_back(point);
    }

    /// Drop every point older than `now - window`.
    fn trim(&mut self, now: DateTime<Utc>, window: chrono::Duration) {
        let cutoff = now - window;
        while self
            .samples
            .front()
            .is_some_and(|p| p.timestamp < cutoff)
        {
            self.samples.pop_front();
        }
    }

    /// Bucket-averaged copy holding at most `max_points` points.
    ///
    /// Each bucket takes the timestamp and direction of its last point.
    pub fn downsampled(&self, max_points: usize) -> Vec<SamplePoint> {
        let len = self.samples.len();
        if max_points == 0 {
            return Vec::new();
        }
        if len <= max_points {
            return self.samples.iter().copied().collect();
        }

        let bucket = len.div_ceil(max_points);
        let points: Vec<&SamplePoint> = self.samples.iter().collect();
        points
            .chunks(bucket)
            .filter_map(|chunk| {
                let last = chunk.last()?;
                let mean = chunk.iter().map(|p| p.value).sum::<f64>() / chunk.len() as f64;
                Some(SamplePoint::new(last.timestamp, mean, last.direction))
            })
            .collect()
    }

    pub fn view(&self, max_points: usize) -> SeriesView {
        SeriesView {
            kind: self.kind,
            title: self.title.to_string(),
            icon_key: self.icon_key.to_string(),
            unit: self.unit.to_string(),
            current: self.current,
            secondary_text: self.classification.text.clone(),
            accent: self.classification.accent,
            points: self.downsampled(max_points),
        }
    }
}

/// Read-only copy of a series handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesView {
    pub kind: MetricKind,
    pub title: String,
    pub icon_key: String,
    pub unit: String,
    pub current: Option<f64>,
    pub secondary_text: String,
    pub accent: Accent,
    pub points: Vec<SamplePoint>,
}

/// Owns one [`MetricSeries`] per [`MetricKind`].
#[derive(Debug, Clone)]
pub struct MetricSeriesStore {
    range: TimeRange,
    series: BTreeMap<MetricKind, MetricSeries>,
}

impl MetricSeriesStore {
    pub fn new(range: TimeRange) -> Self {
        let series = MetricKind::ALL
            .iter()
            .map(|&kind| (kind, MetricSeries::new(kind)))
            .collect();
        Self { range, series }
    }

    pub fn range(&self) -> TimeRange {
        self.range
    }

    pub fn get(&self, kind: MetricKind) -> Option<&MetricSeries> {
        self.series.get(&kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetricSeries> {
        self.series.values()
    }

    /// Record a value: set the primary value, append, then trim.
    pub fn push(
        &mut self,
        kind: MetricKind,
        value: f64,
        timestamp: DateTime<Utc>,
        direction: Option<PowerDirection>,
    ) {
        let window = self.range.chrono_window();
        if let Some(series) = self.series.get_mut(&kind) {
            series.push(SamplePoint::new(timestamp, value, direction));
            series.trim(timestamp, window);
        }
    }

    /// Recompute a series' secondary text and accent.
    pub fn reclassify(&mut self, kind: MetricKind, value: f64) -> Classification {
        let classification = reclassify(kind, value);
        if let Some(series) = self.series.get_mut(&kind) {
            series.classification = classification.clone();
        }
        classification
    }

    /// Change the window and immediately re-trim every series.
    ///
    /// Shrinking discards points for good; widening again does not bring
    /// them back.
    pub fn set_range(&mut self, range: TimeRange, now: DateTime<Utc>) {
        self.range = range;
        self.trim_all(now);
    }

    pub fn trim_all(&mut self, now: DateTime<Utc>) {
        let window = self.range.chrono_window();
        for series in self.series.values_mut() {
            series.trim(now, window);
        }
    }

    /// Fold one tick's sample into every series it has a value for.
    pub fn ingest(&mut self, sample: &SystemSample, now: DateTime<Utc>) {
        let record = |store: &mut Self, kind: MetricKind, value: Option<f64>| {
            if let Some(v) = value {
                store.push(kind, v, now, None);
                store.reclassify(kind, v);
            }
        };

        record(self, MetricKind::Cpu, sample.cpu_percent);
        record(self, MetricKind::Gpu, sample.gpu_percent);
        record(self, MetricKind::Disk, sample.disk_kbps);
        record(self, MetricKind::Network, sample.network_kbps());
        record(self, MetricKind::NetworkIn, sample.network_in_kbps);
        record(self, MetricKind::NetworkOut, sample.network_out_kbps);
        record(self, MetricKind::Battery, sample.battery_percent);
        record(self, MetricKind::Fans, sample.fan_rpm);
        record(self, MetricKind::Temps, sample.avg_temp());

        // Memory is stored in GB but judged on percent of the total
        if let Some(gb) = sample.memory_gb {
            self.push(MetricKind::Memory, gb, now, None);
            let classification = match sample.memory_percent {
                Some(percent) => classify_memory(percent),
                None => classify_memory_gb(gb),
            };
            if let Some(series) = self.series.get_mut(&MetricKind::Memory) {
                series.classification = classification;
            }
        }

        if let Some(watts) = sample.power_w() {
            self.push(MetricKind::Power, watts, now, sample.power_direction);
            let mut classification = reclassify(MetricKind::Power, watts);
            if let Some(direction) = sample.power_direction {
                let label = match direction {
                    PowerDirection::Charging => "charging",
                    PowerDirection::Discharging => "discharging",
                };
                classification.text = format!("{} · {}", label, classification.text);
            }
            if let Some(series) = self.series.get_mut(&MetricKind::Power) {
                series.classification = classification;
            }
        }

        self.trim_all(now);
    }

    pub fn views(&self, max_points: usize) -> Vec<SeriesView> {
        self.series.values().map(|s| s.view(max_points)).collect()
    }
}

impl Default for MetricSeriesStore {
    fn default() -> Self {
        Self::new(TimeRange::default())
    }
}
