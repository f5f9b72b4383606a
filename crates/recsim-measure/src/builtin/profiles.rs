//! Snapshots of user profiles and their distance to target profiles.

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

use recsim_core::{StateError, StateView};

use crate::error::{MeasureError, MeasureResult};
use crate::measurement::{
    Measurement, MeasurementExt, MeasurementName, Observation, ObservationLog, standard_names,
};

use super::cosine_similarity;

/// Which profile matrix a measurement reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileSource {
    /// The true user profiles.
    #[default]
    Actual,
    /// The recommender's predicted profiles.
    Predicted,
    /// The profiles users are being steered toward.
    Target,
}

impl ProfileSource {
    /// Pick the matching matrix out of `state`, if it is present.
    pub fn select<'a>(self, state: &StateView<'a>) -> Option<ArrayView2<'a, f64>> {
        match self {
            ProfileSource::Actual => state.actual_user_profiles(),
            ProfileSource::Predicted => Some(state.predicted_user_profiles()),
            ProfileSource::Target => state.target_user_profiles(),
        }
    }

    fn field(self) -> &'static str {
        match self {
            ProfileSource::Actual => "actual user profiles",
            ProfileSource::Predicted => "predicted user profiles",
            ProfileSource::Target => "target user profiles",
        }
    }
}

/// Records a full copy of the user profiles at every step.
///
/// The step observes `None` if the state does not carry the selected
/// matrix.
#[derive(Debug, Clone)]
pub struct UserProfileSnapshot {
    log: ObservationLog,
    source: ProfileSource,
}

impl UserProfileSnapshot {
    /// Record the actual user profiles under the default name.
    pub fn new() -> Self {
        Self::of(ProfileSource::Actual)
    }

    /// Record the predicted profiles instead.
    pub fn predicted() -> Self {
        Self::of(ProfileSource::Predicted)
    }

    /// Record the target profiles instead.
    pub fn target() -> Self {
        Self::of(ProfileSource::Target)
    }

    /// Record `source` under its default name.
    pub fn of(source: ProfileSource) -> Self {
        let name = match source {
            ProfileSource::Actual => standard_names::ACTUAL_USER_PROFILES,
            ProfileSource::Predicted => MeasurementName::new("predicted_user_profiles"),
            ProfileSource::Target => standard_names::TARGET_USER_PROFILES,
        };
        Self {
            log: ObservationLog::new(name),
            source,
        }
    }

    /// Use a custom name.
    pub fn with_name(mut self, name: impl Into<MeasurementName>) -> Self {
        self.log = self.log.with_name(name);
        self
    }

    /// Log every observation.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.log = self.log.with_verbose(verbose);
        self
    }

    /// The recorded profile matrix.
    pub fn source(&self) -> ProfileSource {
        self.source
    }
}

impl Default for UserProfileSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl Measurement for UserProfileSnapshot {
    fn log(&self) -> &ObservationLog {
        &self.log
    }

    fn log_mut(&mut self) -> &mut ObservationLog {
        &mut self.log
    }

    fn description(&self) -> &str {
        match self.source {
            ProfileSource::Actual => "Copy of the actual user profiles",
            ProfileSource::Predicted => "Copy of the predicted user profiles",
            ProfileSource::Target => "Copy of the target user profiles",
        }
    }

    fn measure(&mut self, state: &StateView<'_>) -> MeasureResult<()> {
        let profiles = self.source.select(state);
        self.observe(profiles.map(|p| Observation::Matrix(p.to_owned())));
        Ok(())
    }
}

/// Mean cosine similarity between each user's profile and their target.
///
/// Compares either the predicted or the true profiles against the target
/// profiles row by row. Users where either vector has zero norm are left
/// out; if none remain the step observes `None`. A state without target
/// profiles, or without the compared profiles, is an error.
#[derive(Debug, Clone)]
pub struct TargetSimilarity {
    log: ObservationLog,
    source: ProfileSource,
}

impl TargetSimilarity {
    /// Compare the predicted profiles to the targets.
    pub fn predicted() -> Self {
        Self {
            log: ObservationLog::new(standard_names::PREDICTED_TARGET_SIMILARITY),
            source: ProfileSource::Predicted,
        }
    }

    /// Compare the true profiles to the targets.
    pub fn actual() -> Self {
        Self {
            log: ObservationLog::new(standard_names::ACTUAL_TARGET_SIMILARITY),
            source: ProfileSource::Actual,
        }
    }

    /// Use a custom name.
    pub fn with_name(mut self, name: impl Into<MeasurementName>) -> Self {
        self.log = self.log.with_name(name);
        self
    }

    /// Log every observation.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.log = self.log.with_verbose(verbose);
        self
    }

    /// The profiles compared against the targets.
    pub fn source(&self) -> ProfileSource {
        self.source
    }
}

impl Measurement for TargetSimilarity {
    fn log(&self) -> &ObservationLog {
        &self.log
    }

    fn log_mut(&mut self) -> &mut ObservationLog {
        &mut self.log
    }

    fn description(&self) -> &str {
        match self.source {
            ProfileSource::Actual => "Mean cosine similarity of actual profiles to target profiles",
            _ => "Mean cosine similarity of predicted profiles to target profiles",
        }
    }

    fn measure(&mut self, state: &StateView<'_>) -> MeasureResult<()> {
        let targets = state
            .target_user_profiles()
            .ok_or(MeasureError::MissingState {
                field: "target user profiles",
            })?;
        let profiles = self.source.select(state).ok_or(MeasureError::MissingState {
            field: self.source.field(),
        })?;

        if profiles.dim() != targets.dim() {
            let (what, expected, actual) = if profiles.nrows() != targets.nrows() {
                ("target user profile rows", profiles.nrows(), targets.nrows())
            } else {
                ("target user profile columns", profiles.ncols(), targets.ncols())
            };
            return Err(StateError::DimensionMismatch {
                what,
                expected,
                actual,
            }
            .into());
        }

        let similarities = profiles
            .outer_iter()
            .zip(targets.outer_iter())
            .filter_map(|(profile, target)| cosine_similarity(profile, target))
            .collect::<Vec<_>>();

        let mean = (!similarities.is_empty()).then(|| {
            Observation::Scalar(similarities.iter().sum::<f64>() / similarities.len() as f64)
        });
        self.observe(mean);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_actual_snapshot() {
        let predicted = array![[0.5, 0.5]];
        let actual = array![[1.0, 0.0]];
        let items = array![[1.0, 0.0]];

        let mut metric = UserProfileSnapshot::new();

        let state = StateView::new(0, &[], predicted.view(), items.view());
        metric.measure(&state).unwrap();

        let state = state.with_actual_user_profiles(actual.view());
        metric.measure(&state).unwrap();

        assert_eq!(metric.name(), "actual_user_profiles");
        assert_eq!(
            metric.history(),
            &[None, Some(Observation::Matrix(array![[1.0, 0.0]]))]
        );
    }

    #[test]
    fn test_predicted_snapshot() {
        let predicted = array![[0.5, 0.5]];
        let items = array![[1.0, 0.0]];
        let state = StateView::new(0, &[], predicted.view(), items.view());

        let mut metric = UserProfileSnapshot::predicted();
        metric.measure(&state).unwrap();

        assert_eq!(metric.source(), ProfileSource::Predicted);
        assert_eq!(
            metric.history(),
            &[Some(Observation::Matrix(array![[0.5, 0.5]]))]
        );
    }

    #[test]
    fn test_target_snapshot() {
        let predicted = array![[0.5, 0.5]];
        let targets = array![[0.0, 1.0]];
        let items = array![[1.0, 0.0]];
        let state = StateView::new(0, &[], predicted.view(), items.view())
            .with_target_user_profiles(targets.view());

        let mut metric = UserProfileSnapshot::target();
        metric.measure(&state).unwrap();

        assert_eq!(metric.name(), "target_user_profiles");
        assert_eq!(
            metric.history(),
            &[Some(Observation::Matrix(array![[0.0, 1.0]]))]
        );
    }

    #[test]
    fn test_target_similarity() {
        let predicted = array![[3.0, 4.0], [1.0, 0.0], [0.0, 0.0]];
        let actual = array![[0.0, 1.0], [1.0, 0.0], [1.0, 1.0]];
        let targets = array![[4.0, 3.0], [1.0, 0.0], [1.0, 0.0]];
        let items = array![[1.0, 0.0]];
        let state = StateView::new(2, &[], predicted.view(), items.view())
            .with_actual_user_profiles(actual.view())
            .with_target_user_profiles(targets.view());

        // 0.96 and 1.0; the zero profile is left out.
        let mut predicted_metric = TargetSimilarity::predicted();
        predicted_metric.measure(&state).unwrap();
        let value = predicted_metric.history()[0].as_ref().unwrap().as_scalar().unwrap();
        assert_abs_diff_eq!(value, 0.98, epsilon = 1e-12);

        // 0.6, 1.0 and 1/sqrt(2)
        let mut actual_metric = TargetSimilarity::actual();
        actual_metric.measure(&state).unwrap();
        let value = actual_metric.history()[0].as_ref().unwrap().as_scalar().unwrap();
        let expected = (0.6 + 1.0 + 1.0 / 2.0_f64.sqrt()) / 3.0;
        assert_abs_diff_eq!(value, expected, epsilon = 1e-12);
        assert_eq!(actual_metric.name(), "actual_target_similarity");
    }

    #[test]
    fn test_target_similarity_requires_targets() {
        let predicted = array![[1.0, 0.0]];
        let items = array![[1.0, 0.0]];
        let state = StateView::new(0, &[], predicted.view(), items.view());

        let mut metric = TargetSimilarity::predicted();
        assert!(matches!(
            metric.measure(&state),
            Err(MeasureError::MissingState { field: "target user profiles" })
        ));

        let targets = array![[1.0, 0.0]];
        let state = state.with_target_user_profiles(targets.view());
        let mut metric = TargetSimilarity::actual();
        assert!(matches!(
            metric.measure(&state),
            Err(MeasureError::MissingState { field: "actual user profiles" })
        ));
        assert!(metric.history().is_empty());
    }

    #[test]
    fn test_target_similarity_shape_mismatch() {
        let predicted = array![[1.0, 0.0], [0.0, 1.0]];
        let targets = array![[1.0, 0.0]];
        let items = array![[1.0, 0.0]];
        let state = StateView::new(0, &[], predicted.view(), items.view())
            .with_target_user_profiles(targets.view());

        let mut metric = TargetSimilarity::predicted();
        assert!(matches!(
            metric.measure(&state),
            Err(MeasureError::InvalidState(StateError::DimensionMismatch {
                what: "target user profile rows",
                expected: 2,
                actual: 1,
            }))
        ));
    }

    #[test]
    fn test_source_serde() {
        let source: ProfileSource = serde_json::from_str("\"target\"").unwrap();
        assert_eq!(source, ProfileSource::Target);
        assert_eq!(ProfileSource::default(), ProfileSource::Actual);
    }
}
