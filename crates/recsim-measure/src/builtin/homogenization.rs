//! Item homogenization.

use ndarray::ArrayView2;

use recsim_core::StateView;

use crate::error::{MeasureError, MeasureResult};
use crate::measurement::{
    Measurement, MeasurementExt, MeasurementName, Observation, ObservationLog, standard_names,
};

/// Mean Euclidean distance over all pairs of rows.
///
/// Returns `None` with fewer than two rows.
pub fn mean_pairwise_distance(rows: ArrayView2<'_, f64>) -> Option<f64> {
    let n = rows.nrows();
    if n < 2 {
        return None;
    }

    let mut total = 0.0;
    let mut pairs = 0usize;
    for i in 0..n {
        for j in (i + 1)..n {
            let diff = &rows.row(i) - &rows.row(j);
            total += diff.dot(&diff).sqrt();
            pairs += 1;
        }
    }
    Some(total / pairs as f64)
}

/// Mean pairwise distance between item attribute vectors.
///
/// Lower values mean the catalog is more homogeneous. By default every
/// predicted item attribute row is compared; [`latest`](Self::latest)
/// restricts the comparison to the most recently added items, and
/// [`on_actual_attributes`](Self::on_actual_attributes) switches to the
/// true attributes.
#[derive(Debug, Clone)]
pub struct ItemHomogenization {
    log: ObservationLog,
    latest: Option<usize>,
    actual: bool,
}

impl ItemHomogenization {
    /// Create the measurement under its default name.
    pub fn new() -> Self {
        Self {
            log: ObservationLog::new(standard_names::ITEM_HOMOGENIZATION),
            latest: None,
            actual: false,
        }
    }

    /// Only compare the last `count` item rows.
    pub fn latest(mut self, count: usize) -> Self {
        self.latest = Some(count);
        self
    }

    /// Compare the true item attributes instead of the predicted ones.
    pub fn on_actual_attributes(mut self) -> Self {
        self.actual = true;
        self
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

impl Default for ItemHomogenization {
    fn default() -> Self {
        Self::new()
    }
}

impl Measurement for ItemHomogenization {
    fn log(&self) -> &ObservationLog {
        &self.log
    }

    fn log_mut(&mut self) -> &mut ObservationLog {
        &mut self.log
    }

    fn description(&self) -> &str {
        "Mean pairwise Euclidean distance between item attribute vectors"
    }

    fn measure(&mut self, state: &StateView<'_>) -> MeasureResult<()> {
        let attributes = if self.actual {
            state
                .actual_item_attributes()
                .ok_or(MeasureError::MissingState {
                    field: "actual item attributes",
                })?
        } else {
            state.predicted_item_attributes()
        };

        let rows = match self.latest {
            Some(count) if count < attributes.nrows() => {
                attributes.slice_move(ndarray::s![attributes.nrows() - count.., ..])
            }
            _ => attributes,
        };

        self.observe(mean_pairwise_distance(rows).map(Observation::Scalar));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_mean_pairwise_distance() {
        // distances: 5, 10, 5
        let rows = array![[0.0, 0.0], [3.0, 4.0], [6.0, 8.0]];
        assert_abs_diff_eq!(
            mean_pairwise_distance(rows.view()).unwrap(),
            20.0 / 3.0,
            epsilon = 1e-12
        );

        let single = array![[1.0, 1.0]];
        assert!(mean_pairwise_distance(single.view()).is_none());
    }

    #[test]
    fn test_latest_items_only() {
        let users = array![[1.0, 0.0]];
        let items = array![[100.0, 100.0], [0.0, 0.0], [3.0, 4.0]];
        let state = StateView::new(0, &[], users.view(), items.view());

        let mut all = ItemHomogenization::new();
        all.measure(&state).unwrap();

        let mut latest = ItemHomogenization::new().latest(2).with_name("latest_homo");
        latest.measure(&state).unwrap();

        assert_eq!(latest.history(), &[Some(Observation::Scalar(5.0))]);
        assert!(all.history()[0].as_ref().unwrap().as_scalar().unwrap() > 5.0);
    }

    #[test]
    fn test_actual_attributes_required() {
        let users = array![[1.0, 0.0]];
        let items = array![[1.0, 0.0], [0.0, 1.0]];
        let state = StateView::new(0, &[], users.view(), items.view());

        let mut metric = ItemHomogenization::new().on_actual_attributes();
        assert!(metric.measure(&state).is_err());

        let state = state.with_actual_item_attributes(items.view());
        metric.measure(&state).unwrap();
        assert_abs_diff_eq!(
            metric.history()[0].as_ref().unwrap().as_scalar().unwrap(),
            2.0_f64.sqrt(),
            epsilon = 1e-12
        );
    }
}
