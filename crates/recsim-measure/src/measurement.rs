//! Core measurement trait and types.
//!
//! This module defines the extension point for metrics in recsim. A
//! measurement is a named, stateful collector that looks at the simulation
//! state once per timestep and records exactly one sample into its own
//! series.

use std::borrow::Cow;
use std::fmt;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize, Serializer};
use tracing::info;

use recsim_core::StateView;

use crate::error::MeasureResult;

/// Name of a measurement.
///
/// Names are unique within a [`MeasurementModule`](crate::MeasurementModule)
/// and key the merged results.
///
/// # Example
///
/// ```
/// use recsim_measure::MeasurementName;
///
/// let a = MeasurementName::new("rmse");
/// let b = MeasurementName::from(String::from("rmse"));
///
/// assert_eq!(a, b);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MeasurementName(Cow<'static, str>);

impl MeasurementName {
    /// Create a new measurement name.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Get the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MeasurementName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&'static str> for MeasurementName {
    fn from(s: &'static str) -> Self {
        Self::new(s)
    }
}

impl From<String> for MeasurementName {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl PartialEq<str> for MeasurementName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for MeasurementName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// A value recorded by a measurement at one timestep.
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    /// A single number.
    Scalar(f64),
    /// A vector of numbers.
    Vector(Array1<f64>),
    /// A matrix, such as a copy of all user profiles.
    Matrix(Array2<f64>),
    /// A list of indices, such as the item each user interacted with.
    Indices(Vec<usize>),
}

impl Observation {
    /// The scalar value, if this is a scalar observation.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Observation::Scalar(v) => Some(*v),
            _ => None,
        }
    }

    /// Short type name used in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Observation::Scalar(_) => "scalar",
            Observation::Vector(_) => "vector",
            Observation::Matrix(_) => "matrix",
            Observation::Indices(_) => "indices",
        }
    }
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Observation::Scalar(v) => write!(f, "{:.6}", v),
            Observation::Vector(v) => write!(f, "vector[{}]", v.len()),
            Observation::Matrix(m) => write!(f, "matrix[{}x{}]", m.nrows(), m.ncols()),
            Observation::Indices(i) => write!(f, "indices[{}]", i.len()),
        }
    }
}

impl Serialize for Observation {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Observation::Scalar(v) => serializer.serialize_f64(*v),
            Observation::Vector(v) => serializer.collect_seq(v.iter()),
            Observation::Matrix(m) => serializer.collect_seq(m.rows().into_iter().map(|r| r.to_vec())),
            Observation::Indices(i) => serializer.collect_seq(i.iter()),
        }
    }
}

impl From<f64> for Observation {
    fn from(v: f64) -> Self {
        Observation::Scalar(v)
    }
}

impl From<Array1<f64>> for Observation {
    fn from(v: Array1<f64>) -> Self {
        Observation::Vector(v)
    }
}

impl From<Array2<f64>> for Observation {
    fn from(m: Array2<f64>) -> Self {
        Observation::Matrix(m)
    }
}

impl From<Vec<usize>> for Observation {
    fn from(i: Vec<usize>) -> Self {
        Observation::Indices(i)
    }
}

/// One entry of a measurement series. `None` means the metric had no
/// meaningful value at that timestep.
pub type Sample = Option<Observation>;

/// Render a sample for logs and tables.
pub fn describe_sample(sample: &Sample) -> String {
    match sample {
        Some(observation) => observation.to_string(),
        None => "None".to_string(),
    }
}

/// Append-only series owned by a measurement.
///
/// Every concrete measurement embeds one of these. The log only allows
/// appending, so once a sample is recorded it stays at its timestep.
#[derive(Debug, Clone)]
pub struct ObservationLog {
    name: MeasurementName,
    verbose: bool,
    history: Vec<Sample>,
}

impl ObservationLog {
    /// Create an empty log for the named measurement.
    pub fn new(name: impl Into<MeasurementName>) -> Self {
        Self {
            name: name.into(),
            verbose: false,
            history: Vec::new(),
        }
    }

    /// Rename the log before anything has been observed.
    pub fn with_name(mut self, name: impl Into<MeasurementName>) -> Self {
        self.name = name.into();
        self
    }

    /// Log every observation at info level.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Record one sample.
    pub fn observe(&mut self, sample: Sample) {
        if self.verbose {
            info!(
                measurement = %self.name,
                index = self.history.len(),
                value = %describe_sample(&sample),
                "Observed"
            );
        }
        self.history.push(sample);
    }

    /// The measurement name.
    pub fn name(&self) -> &MeasurementName {
        &self.name
    }

    /// Recorded series in invocation order.
    pub fn history(&self) -> &[Sample] {
        &self.history
    }

    /// The most recent sample.
    pub fn last(&self) -> Option<&Sample> {
        self.history.last()
    }

    /// Number of recorded samples.
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// Whether nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Whether observations are logged.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Core trait for all measurements.
///
/// An implementation embeds an [`ObservationLog`] and exposes it through
/// [`log`](Measurement::log) and [`log_mut`](Measurement::log_mut). Recording,
/// naming and history access come from [`MeasurementExt`], which every
/// measurement gets automatically.
///
/// # Contract
///
/// `measure` must call `observe` exactly once. When the metric is not
/// defined for the given state (for example, nothing has been interacted with
/// yet) it observes `None` instead of returning an error. Errors are reserved
/// for genuine failures such as malformed input.
///
/// # Implementing a Measurement
///
/// ```
/// use recsim_core::StateView;
/// use recsim_measure::{Measurement, MeasurementExt, MeasureResult, Observation, ObservationLog};
///
/// #[derive(Debug)]
/// struct InteractionCount {
///     log: ObservationLog,
/// }
///
/// impl Measurement for InteractionCount {
///     fn log(&self) -> &ObservationLog {
///         &self.log
///     }
///
///     fn log_mut(&mut self) -> &mut ObservationLog {
///         &mut self.log
///     }
///
///     fn measure(&mut self, state: &StateView<'_>) -> MeasureResult<()> {
///         let count = state.interactions().len() as f64;
///         self.observe(Some(Observation::Scalar(count)));
///         Ok(())
///     }
/// }
/// ```
pub trait Measurement: Send + fmt::Debug {
    /// The embedded observation log.
    fn log(&self) -> &ObservationLog;

    /// Mutable access to the embedded observation log.
    fn log_mut(&mut self) -> &mut ObservationLog;

    /// Compute this timestep's value and observe it.
    fn measure(&mut self, state: &StateView<'_>) -> MeasureResult<()>;

    /// Get a description of what this measurement records.
    fn description(&self) -> &str {
        ""
    }
}

/// Behavior shared by every measurement.
///
/// Implemented for all [`Measurement`] types and not implementable by hand.
pub trait MeasurementExt: Measurement {
    /// Record a sample for the current invocation.
    fn observe(&mut self, sample: Sample) {
        self.log_mut().observe(sample);
    }

    /// The name assigned at construction.
    fn name(&self) -> &MeasurementName {
        self.log().name()
    }

    /// Everything recorded so far, in invocation order.
    fn history(&self) -> &[Sample] {
        self.log().history()
    }
}

impl<M: Measurement + ?Sized> MeasurementExt for M {}

/// A boxed measurement trait object.
pub type BoxedMeasurement = Box<dyn Measurement>;

/// Default names for built-in measurements.
pub mod standard_names {
    use super::MeasurementName;
    use std::borrow::Cow;

    /// Key of the synthetic timestep series in merged results.
    pub const TIMESTEPS: MeasurementName = MeasurementName(Cow::Borrowed("timesteps"));

    /// Mean cosine similarity between interacting users and items.
    pub const MEAN_COSINE_SIMILARITY: MeasurementName =
        MeasurementName(Cow::Borrowed("mean_cosine_similarity"));

    /// Per-step interaction record.
    pub const INTERACTION_HISTORY: MeasurementName =
        MeasurementName(Cow::Borrowed("interaction_history"));

    /// Jaccard similarity of interaction histories.
    pub const INTERACTION_SIMILARITY: MeasurementName =
        MeasurementName(Cow::Borrowed("interaction_similarity"));

    /// Root-mean-square error of predicted scores.
    pub const RMSE: MeasurementName = MeasurementName(Cow::Borrowed("rmse"));

    /// Copy of the true user profiles.
    pub const ACTUAL_USER_PROFILES: MeasurementName =
        MeasurementName(Cow::Borrowed("actual_user_profiles"));

    /// Mean pairwise distance between items.
    pub const ITEM_HOMOGENIZATION: MeasurementName =
        MeasurementName(Cow::Borrowed("item_homogenization"));

    /// Copy of the target user profiles.
    pub const TARGET_USER_PROFILES: MeasurementName =
        MeasurementName(Cow::Borrowed("target_user_profiles"));

    /// Similarity of predicted profiles to target profiles.
    pub const PREDICTED_TARGET_SIMILARITY: MeasurementName =
        MeasurementName(Cow::Borrowed("predicted_target_similarity"));

    /// Similarity of true profiles to target profiles.
    pub const ACTUAL_TARGET_SIMILARITY: MeasurementName =
        MeasurementName(Cow::Borrowed("actual_target_similarity"));

    /// Change in the concentration of interactions across items.
    pub const INTERACTION_SPREAD: MeasurementName =
        MeasurementName(Cow::Borrowed("interaction_spread"));

    /// Average feature score range of recommended items.
    pub const AVERAGE_FEATURE_SCORE_RANGE: MeasurementName =
        MeasurementName(Cow::Borrowed("afsr"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[derive(Debug)]
    struct Constant {
        log: ObservationLog,
        value: f64,
    }

    impl Measurement for Constant {
        fn log(&self) -> &ObservationLog {
            &self.log
        }

        fn log_mut(&mut self) -> &mut ObservationLog {
            &mut self.log
        }

        fn measure(&mut self, _state: &StateView<'_>) -> MeasureResult<()> {
            self.observe(Some(Observation::Scalar(self.value)));
            Ok(())
        }
    }

    #[test]
    fn test_measurement_name() {
        let a = MeasurementName::new("rmse");
        let b = MeasurementName::from("rmse");
        let c = MeasurementName::new("other");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, "rmse");
        assert_eq!(standard_names::RMSE, a);
    }

    #[test]
    fn test_observe_appends() {
        let users = array![[1.0]];
        let items = array![[1.0]];
        let state = StateView::new(0, &[], users.view(), items.view());

        let mut m = Constant {
            log: ObservationLog::new("constant"),
            value: 2.5,
        };
        m.measure(&state).unwrap();
        m.measure(&state).unwrap();

        assert_eq!(m.name(), "constant");
        assert_eq!(m.history().len(), 2);
        assert_eq!(m.history()[1], Some(Observation::Scalar(2.5)));
    }

    #[test]
    fn test_log_builder() {
        let log = ObservationLog::new("a").with_name("b").with_verbose(true);
        assert_eq!(log.name(), "b");
        assert!(log.is_verbose());
        assert!(log.is_empty());
        assert!(log.last().is_none());
    }

    #[test]
    fn test_observation_display() {
        assert_eq!(Observation::Scalar(0.5).to_string(), "0.500000");
        assert_eq!(
            Observation::Matrix(Array2::zeros((2, 3))).to_string(),
            "matrix[2x3]"
        );
        assert_eq!(describe_sample(&None), "None");
    }

    #[test]
    fn test_observation_serialize() {
        let scalar = serde_json::to_value(Observation::Scalar(1.5)).unwrap();
        assert_eq!(scalar, serde_json::json!(1.5));

        let matrix = serde_json::to_value(Observation::Matrix(array![[1.0, 2.0], [3.0, 4.0]]))
            .unwrap();
        assert_eq!(matrix, serde_json::json!([[1.0, 2.0], [3.0, 4.0]]));

        let indices = serde_json::to_value(Observation::Indices(vec![3, 1])).unwrap();
        assert_eq!(indices, serde_json::json!([3, 1]));
    }
}
