//! Tokio runtime driving the tick loop.
//!
//! One periodic timer; each tick runs the whole aggregation on the blocking
//! pool and is awaited before the loop looks at anything else, so ticks never
//! overlap and controls are applied strictly between them. Missed deadlines
//! are skipped, not queued. Results reach consumers as an
//! `Arc<MetricSnapshot>` through a watch channel.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{interval, Interval, MissedTickBehavior};

use super::aggregator::SampleAggregator;
use super::model::{SystemSample, TimeRange};
use super::series::{MetricSeriesStore, SeriesView};
use crate::error::{Result, StatbarError};
use crate::platform::sensors::BridgeStatus;

/// Sampling cadence preset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    Eco,
    #[default]
    Balanced,
    Performance,
}

impl Profile {
    pub fn interval(self) -> Duration {
        match self {
            Profile::Eco => Duration::from_secs(2),
            Profile::Balanced => Duration::from_secs(1),
            Profile::Performance => Duration::from_millis(500),
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "eco" => Some(Profile::Eco),
            "balanced" => Some(Profile::Balanced),
            "performance" | "perf" => Some(Profile::Performance),
            _ => None,
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Profile::Eco => "eco",
            Profile::Balanced => "balanced",
            Profile::Performance => "performance",
        };
        f.write_str(label)
    }
}

/// Requests from the consumer, applied between ticks.
#[derive(Debug, Clone, PartialEq)]
pub enum Control {
    SetRange(TimeRange),
    SetProfile(Profile),
    SetInterval(Duration),
    /// Explicit user action to leave the no-privileged-access state
    RetryBridge,
}

/// Everything a consumer needs to render one tick.
#[derive(Debug, Clone, Serialize)]
pub struct MetricSnapshot {
    pub tick: u64,
    pub timestamp: DateTime<Utc>,
    pub sample: SystemSample,
    pub range: TimeRange,
    pub interval_ms: u64,
    pub bridge_status: BridgeStatus,
    pub series: Vec<SeriesView>,
}

impl Default for MetricSnapshot {
    fn default() -> Self {
        Self {
            tick: 0,
            timestamp: Utc::now(),
            sample: SystemSample::default(),
            range: TimeRange::default(),
            interval_ms: Profile::default().interval().as_millis() as u64,
            bridge_status: BridgeStatus::Disabled,
            series: Vec::new(),
        }
    }
}

/// Aggregator plus series store: the state one tick mutates.
pub struct SamplingEngine {
    aggregator: SampleAggregator,
    store: MetricSeriesStore,
    tick: u64,
    interval: Duration,
    published_points: usize,
    last_sample: SystemSample,
    last_timestamp: DateTime<Utc>,
}

impl SamplingEngine {
    pub fn new(aggregator: SampleAggregator, range: TimeRange, interval: Duration, published_points: usize) -> Self {
        Self {
            aggregator,
            store: MetricSeriesStore::new(range),
            tick: 0,
            interval,
            published_points,
            last_sample: SystemSample::default(),
            last_timestamp: Utc::now(),
        }
    }

    pub fn store(&self) -> &MetricSeriesStore {
        &self.store
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Sample, fold into the series, and describe the result.
    pub fn tick(&mut self, now: DateTime<Utc>) -> MetricSnapshot {
        let sample = self.aggregator.tick();
        self.store.ingest(&sample, now);
        self.tick += 1;
        self.last_sample = sample;
        self.last_timestamp = now;
        self.snapshot()
    }

    pub fn apply(&mut self, control: &Control, now: DateTime<Utc>) {
        match control {
            Control::SetRange(range) => {
                log::info!("Time range set to {}", range);
                self.store.set_range(*range, now);
            }
            Control::SetProfile(profile) => {
                log::info!("Sampling profile set to {} ({:?})", profile, profile.interval());
                self.interval = profile.interval();
            }
            Control::SetInterval(interval) => {
                log::info!("Sampling interval set to {:?}", interval);
                self.interval = *interval;
            }
            Control::RetryBridge => self.aggregator.retry_bridge(),
        }
    }

    pub fn snapshot(&self) -> MetricSnapshot {
        MetricSnapshot {
            tick: self.tick,
            timestamp: self.last_timestamp,
            sample: self.last_sample.clone(),
            range: self.store.range(),
            interval_ms: self.interval.as_millis() as u64,
            bridge_status: self.aggregator.bridge_status().clone(),
            series: self.store.views(self.published_points),
        }
    }
}

/// Handle to the background sampling loop.
pub struct SchedulerRuntime {
    /// Receiver for published snapshots
    pub snapshot_rx: watch::Receiver<Arc<MetricSnapshot>>,

    control_tx: mpsc::Sender<Control>,

    /// Shutdown signal sender
    shutdown_tx: broadcast::Sender<()>,

    /// Dropping the runtime stops the loop
    runtime: tokio::runtime::Runtime,
}

impl SchedulerRuntime {
    /// Start ticking `engine` on a dedicated runtime.
    pub fn start(engine: SamplingEngine) -> anyhow::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_time()
            .thread_name("statbar-sampler")
            .build()?;

        let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(engine.snapshot()));
        let (control_tx, control_rx) = mpsc::channel::<Control>(16);
        let (shutdown_tx, _) = broadcast::channel::<()>(1);

        let shutdown = shutdown_tx.subscribe();
        runtime.spawn(run_scheduler(engine, snapshot_tx, control_rx, shutdown));

        Ok(Self {
            snapshot_rx,
            control_tx,
            shutdown_tx,
            runtime,
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<MetricSnapshot>> {
        self.snapshot_rx.clone()
    }

    pub fn latest(&self) -> Arc<MetricSnapshot> {
        self.snapshot_rx.borrow().clone()
    }

    pub fn send(&self, control: Control) -> Result<()> {
        self.control_tx
            .try_send(control)
            .map_err(|e| StatbarError::runtime(format!("control not delivered: {}", e)))
    }

    /// A sender that can outlive borrows of the runtime, e.g. in a signal handler.
    pub fn shutdown_sender(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Block the calling thread until the next snapshot is published.
    pub fn wait_for_snapshot(&mut self) -> Option<Arc<MetricSnapshot>> {
        let rx = &mut self.snapshot_rx;
        self.runtime.block_on(async {
            rx.changed().await.ok()?;
            let snapshot = rx.borrow_and_update().clone();
            Some(snapshot)
        })
    }

    pub fn shutdown(self) {
        log::info!("Shutting down sampler");
        let _ = self.shutdown_tx.send(());
        // Runtime will shutdown when dropped
    }
}

fn ticker_for(period: Duration) -> Interval {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

/// The tick loop. Returns on shutdown, when every snapshot receiver is
/// gone, or if a tick panics.
pub async fn run_scheduler(
    engine: SamplingEngine,
    snapshot_tx: watch::Sender<Arc<MetricSnapshot>>,
    mut control_rx: mpsc::Receiver<Control>,
    mut shutdown: broadcast::Receiver<()>,
) {
    log::info!("Sampler started ({:?} interval)", engine.interval());

    let mut ticker = ticker_for(engine.interval());
    let mut engine = Some(engine);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let Some(mut current) = engine.take() else { break };
                let joined = tokio::task::spawn_blocking(move || {
                    let snapshot = current.tick(Utc::now());
                    (current, snapshot)
                })
                .await;

                match joined {
                    Ok((returned, snapshot)) => {
                        engine = Some(returned);
                        snapshot_tx.send_replace(Arc::new(snapshot));
                        if snapshot_tx.is_closed() {
                            log::debug!("No snapshot receivers left");
                            break;
                        }
                    }
                    Err(e) => {
                        log::error!("Sampling tick failed: {}", e);
                        break;
                    }
                }
            }
            Some(control) = control_rx.recv() => {
                let Some(current) = engine.as_mut() else { break };
                let previous_interval = current.interval();
                current.apply(&control, Utc::now());
                if current.interval() != previous_interval {
                    ticker = ticker_for(current.interval());
                }
                snapshot_tx.send_replace(Arc::new(current.snapshot()));
            }
            _ = shutdown.recv() => {
                break;
            }
        }
    }

    log::info!("Sampler stopped");
}
