//! Timing metrics collected during a simulation run.

use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Collects metrics during a simulation run.
#[derive(Default)]
pub struct MetricsCollector {
    timing: RwLock<TimingMetrics>,
    steps: RwLock<StepMetrics>,
}

impl MetricsCollector {
    /// Create a new metrics collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the start of a run.
    pub fn record_start(&self) {
        self.timing.write().start_time = Some(Instant::now());
    }

    /// Record the end of a run.
    pub fn record_end(&self) {
        let mut timing = self.timing.write();
        timing.end_time = Some(Instant::now());
        if let (Some(start), Some(end)) = (timing.start_time, timing.end_time) {
            timing.run_time += end.duration_since(start);
        }
        timing.start_time = None;
    }

    /// Record the time spent observing the initial state.
    pub fn record_initialization(&self, duration: Duration) {
        self.timing.write().initialization_time = duration;
    }

    /// Record one completed step.
    pub fn record_step(&self, timestep: u64, recommender: Duration, measurement: Duration) {
        let mut steps = self.steps.write();
        steps.steps_completed += 1;
        steps.recommender_time += recommender;
        steps.measurement_time += measurement;

        let total = recommender + measurement;
        if steps.slowest_step.is_none_or(|(_, slowest)| total > slowest) {
            steps.slowest_step = Some((timestep, total));
        }
    }

    /// Record a failed step.
    pub fn record_failure(&self) {
        self.steps.write().failures += 1;
    }

    /// Get a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timing: self.timing.read().clone(),
            steps: self.steps.read().clone(),
        }
    }

    /// Reset all metrics.
    pub fn reset(&self) {
        *self.timing.write() = TimingMetrics::default();
        *self.steps.write() = StepMetrics::default();
    }
}

impl std::fmt::Debug for MetricsCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsCollector")
            .field("timing", &*self.timing.read())
            .field("steps", &*self.steps.read())
            .finish()
    }
}

/// Snapshot of collected metrics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Run timing.
    pub timing: TimingMetrics,
    /// Per-step totals.
    pub steps: StepMetrics,
}

impl MetricsSnapshot {
    /// Mean wall time per completed step.
    pub fn mean_step_time(&self) -> Option<Duration> {
        if self.steps.steps_completed == 0 {
            return None;
        }
        let total = self.steps.recommender_time + self.steps.measurement_time;
        let mean = total.as_nanos() / u128::from(self.steps.steps_completed);
        Some(Duration::from_nanos(u64::try_from(mean).unwrap_or(u64::MAX)))
    }
}

/// Run-level timing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimingMetrics {
    /// When the current run started.
    #[serde(skip)]
    pub start_time: Option<Instant>,
    /// When the last run ended.
    #[serde(skip)]
    pub end_time: Option<Instant>,
    /// Accumulated wall time across runs.
    #[serde(with = "duration_serde")]
    pub run_time: Duration,
    /// Time spent observing the initial state.
    #[serde(with = "duration_serde")]
    pub initialization_time: Duration,
}

/// Step-level totals.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepMetrics {
    /// Steps that completed, including measurement.
    pub steps_completed: u64,
    /// Steps that failed.
    pub failures: u64,
    /// Time spent inside the recommender.
    #[serde(with = "duration_serde")]
    pub recommender_time: Duration,
    /// Time spent inside measurements.
    #[serde(with = "duration_serde")]
    pub measurement_time: Duration,
    /// Timestep and duration of the slowest step.
    #[serde(skip)]
    pub slowest_step: Option<(u64, Duration)>,
}

/// Durations as integer nanoseconds.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_nanos() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let nanos = u64::deserialize(deserializer)?;
        Ok(Duration::from_nanos(nanos))
    }
}
