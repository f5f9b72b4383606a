//! # recsim - Recommender System Simulation Measurements
//!
//! recsim drives a recommender simulation one timestep at a time and lets
//! pluggable measurements observe the system state after every step.
//!
//! ## Features
//!
//! - **Aligned series**: Every measurement records exactly one sample per
//!   timestep, including the initial state at timestep 0
//! - **No-value sentinel**: Metrics that are undefined at a timestep record
//!   `None` instead of a placeholder number
//! - **Built-in metrics**: Mean cosine similarity, RMSE, interaction
//!   similarity, profile snapshots and more
//! - **Observability**: Step timing, event subscription and run reports
//!
//! ## Quick Start
//!
//! ```ignore
//! use recsim::prelude::*;
//!
//! let mut simulation = Simulation::builder(my_recommender)
//!     .with_measurement(MeanCosineSimilarity::new())
//!     .with_measurement(InteractionTracker::new())
//!     .build()?;
//!
//! simulation.run(10)?;
//!
//! let results = simulation.get_measurements()?;
//! assert_eq!(results.len(), 11);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    Your Recommender                     │
//! ├─────────────────────────────────────────────────────────┤
//! │                     recsim (facade)                     │
//! │                  ┌───────────────────┐                  │
//! │                  │ Simulation Builder│                  │
//! │                  └─────────┬─────────┘                  │
//! │                            │                            │
//! │  ┌──────────────┬──────────┴───────┬────────────────┐   │
//! │  │ recsim-core  │ recsim-measure   │ recsim-observe │   │
//! │  │ (state,      │ (measurements,   │ (events,       │   │
//! │  │  config)     │  module)         │  reports)      │   │
//! │  └──────────────┴──────────────────┴────────────────┘   │
//! ├─────────────────────────────────────────────────────────┤
//! │                        ndarray                          │
//! └─────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use recsim_core::{
    ConfigError, ErrorPolicy, RecommenderError, SimulationConfig, StateError, StateView,
};
use recsim_measure::{
    BoxedMeasurement, MeasureError, Measurement, MeasurementModule, MeasurementModuleBuilder,
    MeasurementResults,
};
use recsim_observe::{
    EventDispatcher, EventSubscriber, FailureStage, MetricsCollector, MetricsSnapshot,
    RecommenderInfo, RunOutcome, SimulationEvent, SimulationReport,
};

// Re-export from sub-crates
pub use recsim_core;
pub use recsim_measure;
pub use recsim_observe;

/// A recommender system that can be simulated.
///
/// Implementors own their matrices; [`state`](Recommender::state) hands out
/// a borrowed snapshot that measurements read but cannot keep.
pub trait Recommender {
    /// Human-readable name used in logs and reports.
    fn name(&self) -> &str;

    /// Snapshot of the current state.
    fn state(&self) -> StateView<'_>;

    /// Advance the simulation by one timestep.
    fn step(&mut self) -> Result<(), RecommenderError>;
}

/// Builder for configuring a [`Simulation`].
pub struct SimulationBuilder<R> {
    recommender: R,
    config: SimulationConfig,
    measurements: Vec<BoxedMeasurement>,
    event_subscribers: Vec<Arc<dyn EventSubscriber>>,
}

impl<R: Recommender> SimulationBuilder<R> {
    /// Create a new builder with default configuration.
    pub fn new(recommender: R) -> Self {
        Self {
            recommender,
            config: SimulationConfig::default(),
            measurements: Vec::new(),
            event_subscribers: Vec::new(),
        }
    }

    /// Add a measurement.
    pub fn with_measurement<M: Measurement + 'static>(mut self, measurement: M) -> Self {
        self.measurements.push(Box::new(measurement));
        self
    }

    /// Add boxed measurements, e.g. built from configuration.
    pub fn with_measurements(mut self, measurements: Vec<BoxedMeasurement>) -> Self {
        self.measurements.extend(measurements);
        self
    }

    /// Set the simulation configuration.
    pub fn with_config(mut self, config: SimulationConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the policy applied when a measurement fails.
    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.config.on_error = policy;
        self
    }

    /// Add an event subscriber.
    pub fn with_event_subscriber(mut self, subscriber: Arc<dyn EventSubscriber>) -> Self {
        self.event_subscribers.push(subscriber);
        self
    }

    /// Build the simulation.
    ///
    /// # Errors
    ///
    /// Fails on an invalid configuration or on duplicate measurement names.
    pub fn build(self) -> SimulationResult<Simulation<R>> {
        self.config.validate()?;

        let measurements = self
            .measurements
            .into_iter()
            .fold(
                MeasurementModuleBuilder::new().with_policy(self.config.on_error),
                |builder, m| builder.with_boxed(m),
            )
            .build()?;

        let events = EventDispatcher::new();
        for subscriber in self.event_subscribers {
            events.subscribe(subscriber);
        }

        info!(
            recommender = self.recommender.name(),
            measurements = measurements.len(),
            on_error = %self.config.on_error,
            "Simulation configured"
        );

        Ok(Simulation {
            recommender: self.recommender,
            measurements,
            config: self.config,
            events: Arc::new(events),
            metrics: MetricsCollector::new(),
            failure: None,
        })
    }
}

/// A recommender paired with the measurements observing it.
pub struct Simulation<R> {
    recommender: R,
    measurements: MeasurementModule,
    config: SimulationConfig,
    events: Arc<EventDispatcher>,
    metrics: MetricsCollector,
    failure: Option<String>,
}

impl<R: Recommender> Simulation<R> {
    /// Create a simulation builder.
    pub fn builder(recommender: R) -> SimulationBuilder<R> {
        SimulationBuilder::new(recommender)
    }

    /// Observe the initial state, if that has not happened yet.
    ///
    /// Called implicitly by [`run`](Self::run).
    pub fn startup(&mut self) -> SimulationResult<()> {
        self.ensure_running()?;
        if self.measurements.is_initialized() {
            return Ok(());
        }

        let started = Instant::now();
        let state = self.recommender.state();
        let result = self.check_state(&state).and_then(|()| {
            self.measurements
                .initialize(&state)
                .map_err(SimulationError::from)
        });
        if let Err(err) = result {
            return Err(self.fail(0, err));
        }

        self.metrics.record_initialization(started.elapsed());
        self.events.emit(SimulationEvent::Initialized {
            measurements: self.measurements.names(),
        });
        info!(
            recommender = self.recommender.name(),
            measurements = self.measurements.len(),
            "Initial state measured"
        );
        Ok(())
    }

    /// Run `timesteps` steps, measuring after each one.
    ///
    /// Repeated calls continue from the current timestep.
    pub fn run(&mut self, timesteps: u64) -> SimulationResult<()> {
        self.startup()?;

        let started = Instant::now();
        self.metrics.record_start();
        let mut result = Ok(());
        for _ in 0..timesteps {
            result = self.run_step();
            if result.is_err() {
                break;
            }
        }
        self.metrics.record_end();
        result?;

        self.events.emit(SimulationEvent::Finished {
            timesteps,
            duration: started.elapsed(),
        });
        info!(
            recommender = self.recommender.name(),
            timestep = self.timestep(),
            duration_ms = started.elapsed().as_millis(),
            "Run finished"
        );
        Ok(())
    }

    /// Run the number of steps given by the configuration.
    pub fn run_configured(&mut self) -> SimulationResult<()> {
        self.run(self.config.timesteps)
    }

    fn run_step(&mut self) -> SimulationResult<()> {
        let timestep = self.measurements.timestep() + 1;

        let started = Instant::now();
        if let Err(err) = self.recommender.step() {
            return Err(self.fail(timestep, err.into()));
        }
        let recommender_time = started.elapsed();

        let state = self.recommender.state();
        let interactions = state.interactions().len();
        let measured = Instant::now();
        let result = self.check_state(&state).and_then(|()| {
            self.measurements
                .step(&state)
                .map_err(SimulationError::from)
        });
        if let Err(err) = result {
            return Err(self.fail(timestep, err));
        }
        let measurement_time = measured.elapsed();

        self.metrics
            .record_step(timestep, recommender_time, measurement_time);
        self.events.emit(SimulationEvent::StepCompleted {
            timestep,
            interactions,
            duration: recommender_time + measurement_time,
        });
        debug!(timestep = timestep, interactions = interactions, "Step measured");
        Ok(())
    }

    fn check_state(&self, state: &StateView<'_>) -> SimulationResult<()> {
        if self.config.validate_state {
            state.validate()?;
        }
        Ok(())
    }

    fn ensure_running(&self) -> SimulationResult<()> {
        match &self.failure {
            Some(message) => Err(SimulationError::Halted(message.clone())),
            None => Ok(()),
        }
    }

    // The recommender may have advanced past the measurements, so the run
    // cannot resume after this.
    fn fail(&mut self, timestep: u64, err: SimulationError) -> SimulationError {
        let message = err.to_string();
        let stage = match &err {
            SimulationError::Recommender(_) => FailureStage::Recommender,
            SimulationError::State(_) => FailureStage::State,
            _ => FailureStage::Measurement,
        };
        let poisoned = matches!(&err, SimulationError::Measure(e) if e.is_fatal());
        warn!(
            timestep = timestep,
            stage = %stage,
            error = %message,
            poisoned = poisoned,
            "Simulation halted"
        );
        self.metrics.record_failure();
        self.events.emit(SimulationEvent::StepFailed {
            timestep,
            stage,
            message: message.clone(),
        });
        self.failure = Some(message);
        err
    }

    /// Merged measurement series, keyed by name plus `"timesteps"`.
    ///
    /// After a failure the series end at the last timestep every
    /// measurement completed.
    pub fn get_measurements(&self) -> SimulationResult<MeasurementResults> {
        Ok(self.measurements.get_results()?)
    }

    /// Number of completed steps.
    pub fn timestep(&self) -> u64 {
        self.measurements.timestep()
    }

    /// The simulated recommender.
    pub fn recommender(&self) -> &R {
        &self.recommender
    }

    /// The measurement module.
    pub fn measurements(&self) -> &MeasurementModule {
        &self.measurements
    }

    /// The simulation configuration.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// The event dispatcher.
    pub fn events(&self) -> &Arc<EventDispatcher> {
        &self.events
    }

    /// Snapshot of the collected timing metrics.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Whether an earlier failure halted the simulation.
    pub fn is_halted(&self) -> bool {
        self.failure.is_some()
    }

    /// Build a report of the run so far.
    pub fn report(&self) -> SimulationReport {
        let state = self.recommender.state();
        let info = RecommenderInfo {
            name: self.recommender.name().to_string(),
            num_users: state.num_users(),
            num_items: state.num_items(),
            num_attributes: state.num_attributes(),
        };

        let outcome = match &self.failure {
            Some(message) => RunOutcome::Failed {
                message: message.clone(),
            },
            None => RunOutcome::Completed {
                timesteps: self.timestep(),
            },
        };

        let results = self.measurements.get_results().ok();
        let mut report = SimulationReport::new(info, outcome, results, self.metrics.snapshot());

        if let Some(message) = &self.failure {
            report.add_error(message.clone());
        }
        if !self.measurements.is_initialized() {
            report.add_warning("Measurements were never initialized");
        }
        for measurement in self.measurements.iter() {
            let log = measurement.log();
            let missing = log.history().iter().filter(|s| s.is_none()).count();
            if missing > 0 {
                report.add_info(format!(
                    "'{}' recorded no value at {} of {} timesteps",
                    log.name(),
                    missing,
                    log.len()
                ));
            }
        }
        report
    }
}

impl<R> std::fmt::Debug for Simulation<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("measurements", &self.measurements.names())
            .field("timestep", &self.measurements.timestep())
            .field("config", &self.config)
            .field("failure", &self.failure)
            .finish()
    }
}

/// Errors from running a simulation.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    /// Measurement error.
    #[error("Measurement error: {0}")]
    Measure(#[from] MeasureError),

    /// The recommender produced an inconsistent state.
    #[error("Invalid state: {0}")]
    State(#[from] StateError),

    /// The recommender failed to step.
    #[error(transparent)]
    Recommender(#[from] RecommenderError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An earlier failure halted the simulation.
    #[error("Simulation halted after failure: {0}")]
    Halted(String),
}

/// Result type for simulation operations.
pub type SimulationResult<T> = std::result::Result<T, SimulationError>;

/// Prelude module for convenient imports.
pub mod prelude {
    // Main types
    pub use crate::{Recommender, Simulation, SimulationBuilder, SimulationError, SimulationResult};

    // Core types
    pub use recsim_core::{
        ErrorPolicy, Interaction, RecommenderError, SimulationConfig, StateView,
    };

    // Measurement types
    pub use recsim_measure::{
        AverageFeatureScoreRange, InteractionSimilarity, InteractionSpread, InteractionTracker,
        ItemHomogenization, MeanCosineSimilarity, Measurement, MeasurementExt, MeasurementName,
        MeasurementResults, MeasurementSpec, Observation, ObservationLog, ProfileSource,
        RmseMeasurement, Sample, TargetSimilarity, UserProfileSnapshot, standard_names,
    };

    // Observability types
    pub use recsim_observe::{
        EventDispatcher, EventSubscriber, FailureStage, LoggingSubscriber, ResultsTable,
        SimulationEvent, SimulationReport,
    };

    // Common std types
    pub use std::sync::Arc;
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, array};
    use recsim_core::Interaction;
    use recsim_measure::{
        InteractionTracker, MeanCosineSimilarity, MeasurementName, Observation, RmseMeasurement,
        standard_names,
    };
    use recsim_observe::CollectingSubscriber;

    /// Each user interacts with item `(user + t) % items`.
    struct Rotating {
        users: Array2<f64>,
        items: Array2<f64>,
        interactions: Vec<Interaction>,
        timestep: u64,
        fail_at: Option<u64>,
        bad_item_at: Option<u64>,
        actuals_until: u64,
    }

    impl Rotating {
        fn new() -> Self {
            Self {
                users: array![[1.0, 0.0], [0.0, 1.0]],
                items: array![[1.0, 0.0], [0.0, 1.0]],
                interactions: Vec::new(),
                timestep: 0,
                fail_at: None,
                bad_item_at: None,
                actuals_until: 0,
            }
        }
    }

    impl Recommender for Rotating {
        fn name(&self) -> &str {
            "rotating"
        }

        fn state(&self) -> StateView<'_> {
            let state = StateView::new(
                self.timestep,
                &self.interactions,
                self.users.view(),
                self.items.view(),
            );
            if self.timestep < self.actuals_until {
                state
                    .with_actual_user_profiles(self.users.view())
                    .with_actual_item_attributes(self.items.view())
            } else {
                state
            }
        }

        fn step(&mut self) -> Result<(), RecommenderError> {
            let t = self.timestep + 1;
            if self.fail_at == Some(t) {
                return Err(RecommenderError::new(self.name(), "out of items"));
            }
            let num_items = self.items.nrows();
            self.interactions = (0..self.users.nrows())
                .map(|u| Interaction::new(u, (u + t as usize) % num_items))
                .collect();
            if self.bad_item_at == Some(t) {
                self.interactions.push(Interaction::new(0, num_items));
            }
            self.timestep = t;
            Ok(())
        }
    }

    #[test]
    fn test_run_records_initial_state_and_every_step() {
        let mut sim = Simulation::builder(Rotating::new())
            .with_measurement(MeanCosineSimilarity::new())
            .with_measurement(InteractionTracker::new())
            .build()
            .unwrap();

        sim.run(3).unwrap();
        assert_eq!(sim.timestep(), 3);

        let results = sim.get_measurements().unwrap();
        assert_eq!(results.timesteps(), &[0, 1, 2, 3]);
        assert_eq!(
            results.scalar_series(&standard_names::MEAN_COSINE_SIMILARITY),
            Some(vec![None, Some(0.0), Some(1.0), Some(0.0)])
        );
        assert_eq!(
            results.get(&standard_names::INTERACTION_HISTORY).unwrap()[2],
            Some(Observation::Indices(vec![0, 1]))
        );
    }

    #[test]
    fn test_runs_continue() {
        let mut sim = Simulation::builder(Rotating::new())
            .with_measurement(MeanCosineSimilarity::new())
            .build()
            .unwrap();

        sim.startup().unwrap();
        sim.startup().unwrap();
        sim.run(2).unwrap();
        sim.run(3).unwrap();

        assert_eq!(sim.recommender().timestep, 5);
        assert_eq!(sim.get_measurements().unwrap().len(), 6);
    }

    #[test]
    fn test_run_configured() {
        let mut sim = Simulation::builder(Rotating::new())
            .with_config(SimulationConfig::new().with_timesteps(4))
            .with_measurement(MeanCosineSimilarity::new())
            .build()
            .unwrap();

        sim.run_configured().unwrap();
        assert_eq!(sim.get_measurements().unwrap().len(), 5);
        assert_eq!(sim.metrics().steps.steps_completed, 4);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let result = Simulation::builder(Rotating::new())
            .with_measurement(MeanCosineSimilarity::new())
            .with_measurement(InteractionTracker::new().with_name("mean_cosine_similarity"))
            .build();

        assert!(matches!(
            result,
            Err(SimulationError::Measure(MeasureError::AlreadyRegistered(_)))
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = Simulation::builder(Rotating::new())
            .with_config(SimulationConfig::new().with_timesteps(0))
            .build();

        assert!(matches!(result, Err(SimulationError::Config(_))));
    }

    #[test]
    fn test_recommender_failure_halts() {
        let mut recommender = Rotating::new();
        recommender.fail_at = Some(2);

        let collector = Arc::new(CollectingSubscriber::new(100));
        let mut sim = Simulation::builder(recommender)
            .with_measurement(MeanCosineSimilarity::new())
            .with_event_subscriber(Arc::clone(&collector) as Arc<dyn EventSubscriber>)
            .build()
            .unwrap();

        let err = sim.run(5).unwrap_err();
        assert!(matches!(err, SimulationError::Recommender(_)));
        assert!(sim.is_halted());
        assert_eq!(
            collector.event_types(),
            vec!["initialized", "step_completed", "step_failed"]
        );

        // Series stay aligned with the last completed step.
        assert_eq!(sim.get_measurements().unwrap().len(), 2);
        assert!(matches!(sim.run(1), Err(SimulationError::Halted(_))));

        let report = sim.report();
        assert!(!report.is_success());
        assert!(report.to_text().contains("out of items"));
    }

    #[test]
    fn test_invalid_state_rejected() {
        let mut recommender = Rotating::new();
        recommender.bad_item_at = Some(1);

        let mut sim = Simulation::builder(recommender)
            .with_measurement(MeanCosineSimilarity::new())
            .build()
            .unwrap();

        let err = sim.run(1).unwrap_err();
        assert!(matches!(
            err,
            SimulationError::State(StateError::ItemOutOfRange { item: 2, .. })
        ));
    }

    #[test]
    fn test_skip_policy_keeps_running() {
        // No actual profiles, so RMSE fails every time.
        let mut sim = Simulation::builder(Rotating::new())
            .with_error_policy(ErrorPolicy::SkipAndRecordNone)
            .with_measurement(RmseMeasurement::new())
            .build()
            .unwrap();

        sim.run(2).unwrap();
        let results = sim.get_measurements().unwrap();
        assert_eq!(
            results.get(&standard_names::RMSE).unwrap(),
            &[None, None, None]
        );
    }

    #[test]
    fn test_fatal_policy_halts_on_measurement_error() {
        let mut sim = Simulation::builder(Rotating::new())
            .with_measurement(RmseMeasurement::new())
            .build()
            .unwrap();

        assert!(matches!(
            sim.run(2),
            Err(SimulationError::Measure(MeasureError::Computation { timestep: 0, .. }))
        ));
        assert!(sim.is_halted());
    }

    #[test]
    fn test_failed_round_keeps_completed_results() {
        // Actual profiles disappear after the initial state, so RMSE fails
        // at timestep 1 after the cosine metric already observed it.
        let mut recommender = Rotating::new();
        recommender.actuals_until = 1;

        let collector = Arc::new(CollectingSubscriber::new(100));
        let mut sim = Simulation::builder(recommender)
            .with_measurement(MeanCosineSimilarity::new())
            .with_measurement(RmseMeasurement::new())
            .with_event_subscriber(Arc::clone(&collector) as Arc<dyn EventSubscriber>)
            .build()
            .unwrap();

        match sim.run(3) {
            Err(SimulationError::Measure(MeasureError::Computation { name, timestep, .. })) => {
                assert_eq!(name, "rmse");
                assert_eq!(timestep, 1);
            }
            other => panic!("expected computation error, got {:?}", other),
        }
        assert_eq!(collector.event_types(), vec!["initialized", "step_failed"]);

        let results = sim.get_measurements().unwrap();
        assert_eq!(results.timesteps(), &[0]);
        assert_eq!(
            results.scalar_series(&standard_names::MEAN_COSINE_SIMILARITY),
            Some(vec![None])
        );
        assert_eq!(
            results.scalar_series(&standard_names::RMSE),
            Some(vec![Some(0.0)])
        );

        let report = sim.report();
        assert!(!report.is_success());
        assert_eq!(report.results.map(|r| r.len()), Some(1));
    }

    #[test]
    fn test_report() {
        let mut sim = Simulation::builder(Rotating::new())
            .with_measurement(MeanCosineSimilarity::new())
            .build()
            .unwrap();
        sim.run(2).unwrap();

        let report = sim.report();
        assert!(report.is_success());
        assert_eq!(report.recommender.num_users, 2);

        let text = report.to_text();
        assert!(text.contains("rotating"));
        assert!(text.contains("mean_cosine_similarity"));
        assert!(text.contains("recorded no value at 1 of 3 timesteps"));

        let json = report.to_json();
        assert_eq!(json["results"]["timesteps"], serde_json::json!([0, 1, 2]));
    }

    #[test]
    fn test_prelude_imports() {
        use crate::prelude::*;

        let sim = Simulation::builder(Rotating::new())
            .with_measurement(MeanCosineSimilarity::new())
            .build()
            .unwrap();
        assert!(
            sim.measurements()
                .contains(&MeasurementName::new("mean_cosine_similarity"))
        );
    }
}
