//! Measurements over realized interactions.

use std::collections::BTreeSet;

use recsim_core::{StateError, StateView};

use crate::error::{MeasureError, MeasureResult};
use crate::measurement::{
    Measurement, MeasurementExt, MeasurementName, Observation, ObservationLog, standard_names,
};

/// Records which items were interacted with at every step.
///
/// Each sample holds the item indices of that step's interactions ordered by
/// user. Steps without interactions observe `None`.
#[derive(Debug, Clone)]
pub struct InteractionTracker {
    log: ObservationLog,
}

impl InteractionTracker {
    /// Create the tracker under its default name.
    pub fn new() -> Self {
        Self {
            log: ObservationLog::new(standard_names::INTERACTION_HISTORY),
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

impl Default for InteractionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl Measurement for InteractionTracker {
    fn log(&self) -> &ObservationLog {
        &self.log
    }

    fn log_mut(&mut self) -> &mut ObservationLog {
        &mut self.log
    }

    fn description(&self) -> &str {
        "Item indices interacted with at each step, ordered by user"
    }

    fn measure(&mut self, state: &StateView<'_>) -> MeasureResult<()> {
        let mut interactions = state.interactions().to_vec();
        if interactions.is_empty() {
            self.observe(None);
            return Ok(());
        }

        interactions.sort_by_key(|i| (i.user, i.item));
        let items = interactions.iter().map(|i| i.item).collect::<Vec<_>>();
        self.observe(Some(Observation::Indices(items)));
        Ok(())
    }
}

/// Mean Jaccard similarity between the interaction histories of user pairs.
///
/// The measurement keeps the set of items every user has interacted with so
/// far. At each step it averages, over the configured pairs, the Jaccard
/// index of the two users' sets. Pairs where both sets are still empty are
/// skipped; if every pair is skipped the step observes `None`.
#[derive(Debug, Clone)]
pub struct InteractionSimilarity {
    log: ObservationLog,
    pairs: Vec<(usize, usize)>,
    histories: Vec<BTreeSet<usize>>,
}

impl InteractionSimilarity {
    /// Create the measurement for the given user pairs.
    pub fn new(pairs: Vec<(usize, usize)>) -> Self {
        Self {
            log: ObservationLog::new(standard_names::INTERACTION_SIMILARITY),
            pairs,
            histories: Vec::new(),
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

    /// The user pairs being compared.
    pub fn pairs(&self) -> &[(usize, usize)] {
        &self.pairs
    }

    fn jaccard(a: &BTreeSet<usize>, b: &BTreeSet<usize>) -> Option<f64> {
        let union = a.union(b).count();
        if union == 0 {
            return None;
        }
        let intersection = a.intersection(b).count();
        Some(intersection as f64 / union as f64)
    }
}

impl Measurement for InteractionSimilarity {
    fn log(&self) -> &ObservationLog {
        &self.log
    }

    fn log_mut(&mut self) -> &mut ObservationLog {
        &mut self.log
    }

    fn description(&self) -> &str {
        "Mean Jaccard similarity of cumulative interaction histories over user pairs"
    }

    fn measure(&mut self, state: &StateView<'_>) -> MeasureResult<()> {
        if self.pairs.is_empty() {
            return Err(MeasureError::InvalidConfig(
                "interaction similarity needs at least one user pair".to_string(),
            ));
        }

        let num_users = state.num_users();
        for &(a, b) in &self.pairs {
            let user = a.max(b);
            if user >= num_users {
                return Err(StateError::UserOutOfRange { user, num_users }.into());
            }
        }

        // Reject the whole step before touching the cumulative sets.
        if let Some(interaction) = state.interactions().iter().find(|i| i.user >= num_users) {
            return Err(StateError::UserOutOfRange {
                user: interaction.user,
                num_users,
            }
            .into());
        }

        if self.histories.len() < num_users {
            self.histories.resize_with(num_users, BTreeSet::new);
        }
        for interaction in state.interactions() {
            self.histories[interaction.user].insert(interaction.item);
        }

        let similarities = self
            .pairs
            .iter()
            .filter_map(|&(a, b)| Self::jaccard(&self.histories[a], &self.histories[b]))
            .collect::<Vec<_>>();

        let mean = (!similarities.is_empty()).then(|| {
            Observation::Scalar(similarities.iter().sum::<f64>() / similarities.len() as f64)
        });
        self.observe(mean);
        Ok(())
    }
}

/// Change in how concentrated interactions are across items.
///
/// Each step builds a histogram of interactions per item, sorted from most
/// to least interacted, and observes the area under the previous step's
/// histogram minus the area under this one (trapezoidal rule, unit
/// spacing). The first histogram is compared against all zeros. Steps
/// without interactions observe `None` and leave the previous histogram in
/// place.
#[derive(Debug, Clone)]
pub struct InteractionSpread {
    log: ObservationLog,
    previous: Vec<f64>,
}

impl InteractionSpread {
    /// Create the measurement under its default name.
    pub fn new() -> Self {
        Self {
            log: ObservationLog::new(standard_names::INTERACTION_SPREAD),
            previous: Vec::new(),
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

    fn area(histogram: &[f64]) -> f64 {
        histogram
            .windows(2)
            .map(|pair| (pair[0] + pair[1]) / 2.0)
            .sum()
    }
}

impl Default for InteractionSpread {
    fn default() -> Self {
        Self::new()
    }
}

impl Measurement for InteractionSpread {
    fn log(&self) -> &ObservationLog {
        &self.log
    }

    fn log_mut(&mut self) -> &mut ObservationLog {
        &mut self.log
    }

    fn description(&self) -> &str {
        "Change in the area under the sorted per-item interaction histogram"
    }

    fn measure(&mut self, state: &StateView<'_>) -> MeasureResult<()> {
        let interactions = state.interactions();
        if interactions.is_empty() {
            self.observe(None);
            return Ok(());
        }

        let num_items = state.num_items();
        let mut histogram: Vec<f64> = vec![0.0; num_items];
        for interaction in interactions {
            let count = histogram.get_mut(interaction.item).ok_or(
                StateError::ItemOutOfRange {
                    item: interaction.item,
                    num_items,
                },
            )?;
            *count += 1.0;
        }
        histogram.sort_by(|a, b| b.total_cmp(a));

        let spread = Self::area(&self.previous) - Self::area(&histogram);
        self.previous = histogram;
        self.observe(Some(Observation::Scalar(spread)));
        Ok(())
    }
}
