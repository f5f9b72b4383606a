//! Prediction error of the recommender's scores.

use recsim_core::{StateError, StateView};

use crate::error::{MeasureError, MeasureResult};
use crate::measurement::{
    Measurement, MeasurementExt, MeasurementName, Observation, ObservationLog, standard_names,
};

/// Root-mean-square error between predicted and actual user-item scores.
///
/// Predicted scores come from the predicted profiles and attributes, actual
/// scores from the true ones. The state must carry both actual matrices.
/// An empty score matrix observes `None`.
#[derive(Debug, Clone)]
pub struct RmseMeasurement {
    log: ObservationLog,
}

impl RmseMeasurement {
    /// Create the measurement under its default name.
    pub fn new() -> Self {
        Self {
            log: ObservationLog::new(standard_names::RMSE),
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

impl Default for RmseMeasurement {
    fn default() -> Self {
        Self::new()
    }
}

impl Measurement for RmseMeasurement {
    fn log(&self) -> &ObservationLog {
        &self.log
    }

    fn log_mut(&mut self) -> &mut ObservationLog {
        &mut self.log
    }

    fn description(&self) -> &str {
        "RMSE between predicted and actual user-item scores"
    }

    fn measure(&mut self, state: &StateView<'_>) -> MeasureResult<()> {
        let actual = state.actual_scores().ok_or(MeasureError::MissingState {
            field: "actual user profiles and item attributes",
        })??;
        let predicted = state.predicted_scores()?;

        if predicted.dim() != actual.dim() {
            let (what, expected, got) = if predicted.nrows() != actual.nrows() {
                ("actual score rows", predicted.nrows(), actual.nrows())
            } else {
                ("actual score columns", predicted.ncols(), actual.ncols())
            };
            return Err(StateError::DimensionMismatch {
                what,
                expected,
                actual: got,
            }
            .into());
        }

        if predicted.is_empty() {
            self.observe(None);
            return Ok(());
        }

        let squared_error = (&predicted - &actual).mapv(|d| d * d);
        let rmse = squared_error.mean().map(f64::sqrt);
        self.observe(rmse.map(Observation::Scalar));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_perfect_prediction() {
        let users = array![[1.0, 0.0], [0.0, 1.0]];
        let items = array![[1.0, 1.0]];
        let state = StateView::new(0, &[], users.view(), items.view())
            .with_actual_user_profiles(users.view())
            .with_actual_item_attributes(items.view());

        let mut metric = RmseMeasurement::new();
        metric.measure(&state).unwrap();
        assert_eq!(metric.history(), &[Some(Observation::Scalar(0.0))]);
    }

    #[test]
    fn test_known_error() {
        // predicted scores [[1, 0]], actual scores [[0, 2]]
        let predicted_users = array![[1.0, 0.0]];
        let actual_users = array![[0.0, 2.0]];
        let items = array![[1.0, 0.0], [0.0, 1.0]];

        let state = StateView::new(0, &[], predicted_users.view(), items.view())
            .with_actual_user_profiles(actual_users.view())
            .with_actual_item_attributes(items.view());

        let mut metric = RmseMeasurement::new();
        metric.measure(&state).unwrap();

        let value = metric.history()[0].as_ref().unwrap().as_scalar().unwrap();
        assert_abs_diff_eq!(value, (5.0_f64 / 2.0).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_missing_actuals_is_error() {
        let users = array![[1.0]];
        let items = array![[1.0]];
        let state = StateView::new(0, &[], users.view(), items.view());

        let mut metric = RmseMeasurement::new();
        assert!(matches!(
            metric.measure(&state),
            Err(MeasureError::MissingState { .. })
        ));
        assert!(metric.history().is_empty());
    }

    #[test]
    fn test_mismatched_widths_are_error() {
        let users = array![[1.0, 0.0]];
        let items = array![[1.0, 0.0, 0.0]];
        let actual_items = array![[1.0, 0.0]];
        let state = StateView::new(0, &[], users.view(), items.view())
            .with_actual_user_profiles(users.view())
            .with_actual_item_attributes(actual_items.view());

        let mut metric = RmseMeasurement::new();
        assert!(matches!(
            metric.measure(&state),
            Err(MeasureError::InvalidState(StateError::DimensionMismatch {
                what: "predicted item attributes",
                expected: 2,
                actual: 3,
            }))
        ));

        let state = StateView::new(0, &[], users.view(), actual_items.view())
            .with_actual_user_profiles(users.view())
            .with_actual_item_attributes(items.view());
        assert!(matches!(
            metric.measure(&state),
            Err(MeasureError::InvalidState(StateError::DimensionMismatch {
                what: "actual item attributes",
                ..
            }))
        ));
        assert!(metric.history().is_empty());
    }
}
