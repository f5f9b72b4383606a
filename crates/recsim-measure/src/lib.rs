//! recsim Measurement System
//!
//! This crate provides the measurement layer of the recsim recommender
//! simulation toolkit. Measurements are named, stateful metric collectors
//! that observe the simulation state once per timestep.
//!
//! # Measurement Lifecycle
//!
//! - Measurements are registered with a [`MeasurementModule`] before the
//!   simulation starts; names must be unique
//! - [`MeasurementModule::initialize`] observes the initial state (timestep 0)
//! - [`MeasurementModule::step`] observes the state after every step
//! - Every measurement records exactly one sample per invocation, so all
//!   series stay aligned with the timestep index
//! - [`MeasurementModule::get_results`] merges the series
//!
//! # Built-in Measurements
//!
//! - [`MeanCosineSimilarity`]: Similarity of interacting users and items
//! - [`InteractionTracker`]: Which items were interacted with
//! - [`InteractionSimilarity`]: Overlap of user interaction histories
//! - [`RmseMeasurement`]: Score prediction error
//! - [`UserProfileSnapshot`]: Copies of user profiles
//! - [`ItemHomogenization`]: Spread of the item catalog
//!
//! # Custom Measurements
//!
//! You can define custom measurements by implementing the [`Measurement`]
//! trait around an embedded [`ObservationLog`]:
//!
//! ```
//! use recsim_core::StateView;
//! use recsim_measure::{Measurement, MeasurementExt, MeasureResult, Observation, ObservationLog};
//!
//! #[derive(Debug)]
//! struct NumInteractions {
//!     log: ObservationLog,
//! }
//!
//! impl Measurement for NumInteractions {
//!     fn log(&self) -> &ObservationLog {
//!         &self.log
//!     }
//!
//!     fn log_mut(&mut self) -> &mut ObservationLog {
//!         &mut self.log
//!     }
//!
//!     fn measure(&mut self, state: &StateView<'_>) -> MeasureResult<()> {
//!         let n = state.interactions().len();
//!         // No interactions yet: record the "no value" sentinel.
//!         let sample = (n > 0).then(|| Observation::Scalar(n as f64));
//!         self.observe(sample);
//!         Ok(())
//!     }
//! }
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use recsim_measure::{MeasurementModuleBuilder, MeanCosineSimilarity, InteractionTracker};
//!
//! let mut measurements = MeasurementModuleBuilder::new()
//!     .with(MeanCosineSimilarity::new())
//!     .with(InteractionTracker::new())
//!     .build()?;
//!
//! measurements.initialize(&state)?;
//! let results = measurements.get_results()?;
//! ```

pub mod builtin;
pub mod error;
pub mod measurement;
pub mod module;
pub mod results;

// Re-export main types
pub use error::{MeasureError, MeasureResult};
pub use measurement::{
    BoxedMeasurement, Measurement, MeasurementExt, MeasurementName, Observation, ObservationLog,
    Sample, describe_sample, standard_names,
};
pub use module::{MeasurementModule, MeasurementModuleBuilder};
pub use results::MeasurementResults;

// Re-export built-in measurements
pub use builtin::{
    AverageFeatureScoreRange, InteractionSimilarity, InteractionSpread, InteractionTracker,
    ItemHomogenization, MeanCosineSimilarity, MeasurementSpec, ProfileSource, RmseMeasurement,
    TargetSimilarity, UserProfileSnapshot,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{MeasureError, MeasureResult};
    pub use crate::measurement::{
        Measurement, MeasurementExt, MeasurementName, Observation, ObservationLog, Sample,
    };
    pub use crate::module::{MeasurementModule, MeasurementModuleBuilder};
    pub use crate::results::MeasurementResults;

    // Built-in measurements
    pub use crate::builtin::{
        AverageFeatureScoreRange, InteractionSimilarity, InteractionSpread, InteractionTracker,
        ItemHomogenization, MeanCosineSimilarity, MeasurementSpec, RmseMeasurement,
        TargetSimilarity, UserProfileSnapshot,
    };
}
