//! Cosine similarity between interacting users and items.

use ndarray::ArrayView1;

use recsim_core::{StateError, StateView};

use crate::error::MeasureResult;
use crate::measurement::{
    Measurement, MeasurementExt, MeasurementName, Observation, ObservationLog, standard_names,
};

/// Cosine similarity of two vectors.
///
/// Returns `None` when either vector has zero norm, since the similarity is
/// undefined there.
pub fn cosine_similarity(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> Option<f64> {
    let norm_a = a.dot(&a).sqrt();
    let norm_b = b.dot(&b).sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }
    Some(a.dot(&b) / (norm_a * norm_b))
}

/// Mean cosine similarity between each interacting user's predicted profile
/// and the predicted attributes of the item they interacted with.
///
/// Observes `None` when no interactions happened in the step. Pairs where
/// either vector has zero norm are left out of the mean; if every pair is
/// left out the step also observes `None`.
///
/// # Example
///
/// ```
/// use ndarray::array;
/// use recsim_core::{Interaction, StateView};
/// use recsim_measure::{Measurement, MeasurementExt, Observation};
/// use recsim_measure::builtin::MeanCosineSimilarity;
///
/// let users = array![[1.0, 0.0]];
/// let items = array![[1.0, 0.0]];
/// let interactions = [Interaction::new(0, 0)];
/// let state = StateView::new(1, &interactions, users.view(), items.view());
///
/// let mut metric = MeanCosineSimilarity::new();
/// metric.measure(&state)?;
/// assert_eq!(metric.history(), &[Some(Observation::Scalar(1.0))]);
/// # Ok::<(), recsim_measure::MeasureError>(())
/// ```
#[derive(Debug, Clone)]
pub struct MeanCosineSimilarity {
    log: ObservationLog,
}

impl MeanCosineSimilarity {
    /// Create the metric under its default name.
    pub fn new() -> Self {
        Self {
            log: ObservationLog::new(standard_names::MEAN_COSINE_SIMILARITY),
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
}

impl Default for MeanCosineSimilarity {
    fn default() -> Self {
        Self::new()
    }
}

impl Measurement for MeanCosineSimilarity {
    fn log(&self) -> &ObservationLog {
        &self.log
    }

    fn log_mut(&mut self) -> &mut ObservationLog {
        &mut self.log
    }

    fn description(&self) -> &str {
        "Mean cosine similarity between interacting user profiles and item attributes"
    }

    fn measure(&mut self, state: &StateView<'_>) -> MeasureResult<()> {
        let interactions = state.interactions();
        if interactions.is_empty() {
            self.observe(None);
            return Ok(());
        }

        let item_attributes = state.predicted_item_attributes().ncols();
        if item_attributes != state.num_attributes() {
            return Err(StateError::DimensionMismatch {
                what: "predicted item attributes",
                expected: state.num_attributes(),
                actual: item_attributes,
            }
            .into());
        }

        let mut total = 0.0;
        let mut counted = 0usize;
        for interaction in interactions {
            let profile = state.predicted_user_profile(interaction.user).ok_or(
                StateError::UserOutOfRange {
                    user: interaction.user,
                    num_users: state.num_users(),
                },
            )?;
            let attributes = state.predicted_item_attribute(interaction.item).ok_or(
                StateError::ItemOutOfRange {
                    item: interaction.item,
                    num_items: state.num_items(),
                },
            )?;

            if let Some(similarity) = cosine_similarity(profile, attributes) {
                total += similarity;
                counted += 1;
            }
        }

        let mean = (counted > 0).then(|| Observation::Scalar(total / counted as f64));
        self.observe(mean);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{Array2, array};
    use recsim_core::Interaction;

    use crate::error::MeasureError;

    fn measure_once(
        users: &Array2<f64>,
        items: &Array2<f64>,
        interactions: &[Interaction],
    ) -> MeasureResult<Option<f64>> {
        let state = StateView::new(1, interactions, users.view(), items.view());
        let mut metric = MeanCosineSimilarity::new();
        metric.measure(&state)?;
        assert_eq!(metric.history().len(), 1);
        Ok(metric.history()[0].as_ref().and_then(|o| o.as_scalar()))
    }

    #[test]
    fn test_cosine_similarity() {
        let a = array![3.0, 4.0];
        let b = array![4.0, 3.0];
        assert_abs_diff_eq!(cosine_similarity(a.view(), b.view()).unwrap(), 0.96, epsilon = 1e-12);

        let zero = array![0.0, 0.0];
        assert!(cosine_similarity(a.view(), zero.view()).is_none());
    }

    #[test]
    fn test_identical_vectors() {
        let users = array![[1.0, 0.0]];
        let items = array![[1.0, 0.0]];
        let value = measure_once(&users, &items, &[Interaction::new(0, 0)]).unwrap();
        assert_abs_diff_eq!(value.unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_no_interactions_is_none() {
        let users = array![[1.0, 0.0]];
        let items = array![[1.0, 0.0]];
        let value = measure_once(&users, &items, &[]).unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn test_mean_of_two_pairs() {
        let users = array![[3.0, 4.0], [1.0, 2.0]];
        let items = array![[4.0, 3.0], [2.0, 1.0]];
        let interactions = [Interaction::new(0, 0), Interaction::new(1, 1)];

        // cos([3,4],[4,3]) = 24/25 = 0.96 and cos([1,2],[2,1]) = 4/5 = 0.8
        let value = measure_once(&users, &items, &interactions).unwrap();
        assert_abs_diff_eq!(value.unwrap(), 0.88, epsilon = 1e-6);
    }

    #[test]
    fn test_mean_with_mixed_vectors() {
        let users = array![[3.0, 4.0]];
        let items = array![[2.0, 1.0], [0.0, 1.0]];
        let interactions = [Interaction::new(0, 0), Interaction::new(0, 1)];

        // 10 / (5 * sqrt(5)) and 4 / 5
        let expected = (10.0 / (5.0 * 5.0_f64.sqrt()) + 0.8) / 2.0;
        let value = measure_once(&users, &items, &interactions).unwrap();
        assert_abs_diff_eq!(value.unwrap(), expected, epsilon = 1e-6);
        assert_abs_diff_eq!(value.unwrap(), 0.847214, epsilon = 1e-6);
    }

    #[test]
    fn test_zero_norm_pairs_excluded() {
        let users = array![[0.0, 0.0], [1.0, 0.0]];
        let items = array![[1.0, 0.0]];

        let both = [Interaction::new(0, 0), Interaction::new(1, 0)];
        let value = measure_once(&users, &items, &both).unwrap();
        assert_abs_diff_eq!(value.unwrap(), 1.0, epsilon = 1e-12);

        let only_zero = [Interaction::new(0, 0)];
        assert!(measure_once(&users, &items, &only_zero).unwrap().is_none());
    }

    #[test]
    fn test_out_of_range_is_error() {
        let users = array![[1.0, 0.0]];
        let items = array![[1.0, 0.0]];

        let result = measure_once(&users, &items, &[Interaction::new(0, 3)]);
        assert!(matches!(
            result,
            Err(MeasureError::InvalidState(StateError::ItemOutOfRange { item: 3, .. }))
        ));
    }

    #[test]
    fn test_dimension_mismatch_is_error() {
        let users = array![[1.0, 0.0]];
        let items = array![[1.0, 0.0, 0.0]];

        let result = measure_once(&users, &items, &[Interaction::new(0, 0)]);
        assert!(matches!(
            result,
            Err(MeasureError::InvalidState(StateError::DimensionMismatch { .. }))
        ));
    }

    #[test]
    fn test_custom_name() {
        let metric = MeanCosineSimilarity::new()
            .with_name("cos_sim")
            .with_verbose(true);
        assert_eq!(metric.name(), "cos_sim");
        assert!(metric.log().is_verbose());
    }
}
