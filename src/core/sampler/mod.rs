//! Sampling & metric aggregation engine.
//!
//! `aggregator` turns raw OS counters into one `SystemSample` per tick,
//! `series` keeps the time-windowed history, `scheduler` drives both on a
//! background runtime and publishes snapshots.

pub mod aggregator;
pub mod classify;
pub mod clock;
pub mod model;
pub mod rates;
pub mod scheduler;
pub mod series;
pub mod temperature;

pub use aggregator::SampleAggregator;
pub use classify::{Accent, Classification};
pub use clock::{Clock, ManualClock, SystemClock};
pub use model::{
    MetricKind, PowerDirection, SamplePoint, SystemSample, TempSource, TemperatureReading,
    TimeRange,
};
pub use scheduler::{Control, MetricSnapshot, Profile, SamplingEngine, SchedulerRuntime};
pub use series::{MetricSeries, MetricSeriesStore, SeriesView};
pub use temperature::{TempKind, TemperatureEstimator, TierContext};
