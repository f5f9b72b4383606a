//! Diversity of recommendation slates.

use recsim_core::{StateError, StateView};

use crate::error::{MeasureError, MeasureResult};
use crate::measurement::{
    Measurement, MeasurementExt, MeasurementName, Observation, ObservationLog, standard_names,
};

/// Average feature score range of the items shown to each user.
///
/// For every user, takes all predicted attribute values of the items in
/// their slate and computes `max - min`; the sample is the mean of that
/// range over users. Steps without interactions, or with empty slates,
/// observe `None`. The state must carry recommendations.
#[derive(Debug, Clone)]
pub struct AverageFeatureScoreRange {
    log: ObservationLog,
}

impl AverageFeatureScoreRange {
    /// Create the measurement under its default name.
    pub fn new() -> Self {
        Self {
            log: ObservationLog::new(standard_names::AVERAGE_FEATURE_SCORE_RANGE),
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

impl Default for AverageFeatureScoreRange {
    fn default() -> Self {
        Self::new()
    }
}

impl Measurement for AverageFeatureScoreRange {
    fn log(&self) -> &ObservationLog {
        &self.log
    }

    fn log_mut(&mut self) -> &mut ObservationLog {
        &mut self.log
    }

    fn description(&self) -> &str {
        "Mean over users of the attribute value range across their recommended items"
    }

    fn measure(&mut self, state: &StateView<'_>) -> MeasureResult<()> {
        if state.interactions().is_empty() {
            self.observe(None);
            return Ok(());
        }

        let slates = state.recommendations().ok_or(MeasureError::MissingState {
            field: "recommendations",
        })?;
        if slates.ncols() == 0 || slates.nrows() == 0 {
            self.observe(None);
            return Ok(());
        }

        let mut total = 0.0;
        for slate in slates.outer_iter() {
            let mut low = f64::INFINITY;
            let mut high = f64::NEG_INFINITY;
            for &item in slate.iter() {
                let attributes =
                    state
                        .predicted_item_attribute(item)
                        .ok_or(StateError::ItemOutOfRange {
                            item,
                            num_items: state.num_items(),
                        })?;
                for &value in attributes.iter() {
                    low = low.min(value);
                    high = high.max(value);
                }
            }
            // Zero-width attributes leave the bounds untouched.
            if high >= low {
                total += high - low;
            }
        }

        let mean = total / slates.nrows() as f64;
        self.observe(Some(Observation::Scalar(mean)));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use recsim_core::Interaction;

    #[test]
    fn test_range_per_user() {
        let users = array![[1.0, 0.0], [0.0, 1.0]];
        let items = array![[0.1, 0.9], [0.4, 0.5], [0.2, 0.3]];
        let slates = array![[0usize, 1], [1, 2]];
        let interactions = [Interaction::new(0, 0), Interaction::new(1, 2)];

        let state = StateView::new(1, &interactions, users.view(), items.view())
            .with_recommendations(slates.view());

        let mut metric = AverageFeatureScoreRange::new();
        metric.measure(&state).unwrap();

        // User 0: 0.9 - 0.1; user 1: 0.5 - 0.2.
        let value = metric.history()[0].as_ref().unwrap().as_scalar().unwrap();
        assert_abs_diff_eq!(value, (0.8 + 0.3) / 2.0, epsilon = 1e-12);
        assert_eq!(metric.name(), "afsr");
    }

    #[test]
    fn test_no_interactions_is_none() {
        let users = array![[1.0, 0.0]];
        let items = array![[1.0, 0.0]];
        let state = StateView::new(0, &[], users.view(), items.view());

        let mut metric = AverageFeatureScoreRange::new();
        metric.measure(&state).unwrap();
        assert_eq!(metric.history(), &[None]);
    }

    #[test]
    fn test_requires_recommendations() {
        let users = array![[1.0, 0.0]];
        let items = array![[1.0, 0.0]];
        let interactions = [Interaction::new(0, 0)];
        let state = StateView::new(1, &interactions, users.view(), items.view());

        let mut metric = AverageFeatureScoreRange::new();
        assert!(matches!(
            metric.measure(&state),
            Err(MeasureError::MissingState { field: "recommendations" })
        ));

        let slates = array![[3usize]];
        let state = state.with_recommendations(slates.view());
        assert!(matches!(
            metric.measure(&state),
            Err(MeasureError::InvalidState(StateError::ItemOutOfRange { item: 3, .. }))
        ));
        assert!(metric.history().is_empty());
    }
}
