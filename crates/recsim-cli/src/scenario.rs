//! Deterministic content-filtering scenario driven by the CLI.

use std::collections::BTreeSet;

use ndarray::{Array1, Array2};

use recsim::Recommender;
use recsim::recsim_core::{Interaction, RecommenderError, StateView};

use crate::config::ScenarioConfig;

/// Content filtering over fixed item attributes.
///
/// Every step each user is recommended the unseen item that scores highest
/// against their predicted profile, and consumes it. The predicted profile
/// becomes the mean of consumed items, and the true profile drifts toward
/// each consumed item. Users revisit items only once they have seen all of
/// them. Every user also has a fixed target profile, exposed for target
/// similarity metrics.
#[derive(Debug, Clone)]
pub struct ContentScenario {
    actual_users: Array2<f64>,
    predicted_users: Array2<f64>,
    target_users: Array2<f64>,
    items: Array2<f64>,
    recommendations: Array2<usize>,
    seen: Vec<BTreeSet<usize>>,
    interactions: Vec<Interaction>,
    timestep: u64,
    drift: f64,
}

impl ContentScenario {
    /// Generate the scenario. Values come from fixed trigonometric
    /// patterns, so two scenarios with the same config are identical.
    pub fn new(config: &ScenarioConfig) -> Self {
        let attributes = config.num_attributes;

        let actual_users = Array2::from_shape_fn((config.num_users, attributes), |(u, k)| {
            ((u * 7 + k * 3 + 1) as f64).sin().abs() + 0.05
        });
        let items = Array2::from_shape_fn((config.num_items, attributes), |(i, k)| {
            ((i * 5 + k * 11 + 2) as f64).cos().abs() + 0.05
        });
        let target_users = Array2::from_shape_fn((config.num_users, attributes), |(u, k)| {
            ((u * 3 + k * 5 + 4) as f64).cos().abs() + 0.05
        });
        // Stated preferences: a blurred copy of the true ones.
        let predicted_users = actual_users.mapv(|v| 0.5 * v + 0.5 / attributes as f64);

        Self {
            actual_users,
            predicted_users,
            target_users,
            items,
            recommendations: Array2::zeros((config.num_users, 0)),
            seen: vec![BTreeSet::new(); config.num_users],
            interactions: Vec::new(),
            timestep: 0,
            drift: config.drift,
        }
    }

    fn recommend(&self, user: usize) -> Option<usize> {
        let profile = self.predicted_users.row(user);
        let seen = &self.seen[user];
        let exhausted = seen.len() >= self.items.nrows();

        self.items
            .outer_iter()
            .enumerate()
            .filter(|(item, _)| exhausted || !seen.contains(item))
            .map(|(item, attributes)| (item, profile.dot(&attributes)))
            .fold(None, |best: Option<(usize, f64)>, (item, score)| match best {
                Some((_, top)) if top >= score => best,
                _ => Some((item, score)),
            })
            .map(|(item, _)| item)
    }

    fn consume(&mut self, user: usize, item: usize) {
        self.seen[user].insert(item);

        let target = self.items.row(item);
        let mut actual = self.actual_users.row_mut(user);
        let delta = &target - &actual;
        actual.scaled_add(self.drift, &delta);

        let mut mean = Array1::<f64>::zeros(self.items.ncols());
        for &seen in &self.seen[user] {
            mean += &self.items.row(seen);
        }
        mean /= self.seen[user].len() as f64;
        self.predicted_users.row_mut(user).assign(&mean);
    }

    /// The true user profiles.
    pub fn actual_users(&self) -> &Array2<f64> {
        &self.actual_users
    }
}

impl Recommender for ContentScenario {
    fn name(&self) -> &str {
        "content_filtering"
    }

    fn state(&self) -> StateView<'_> {
        StateView::new(
            self.timestep,
            &self.interactions,
            self.predicted_users.view(),
            self.items.view(),
        )
        .with_actual_user_profiles(self.actual_users.view())
        .with_actual_item_attributes(self.items.view())
        .with_target_user_profiles(self.target_users.view())
        .with_recommendations(self.recommendations.view())
    }

    fn step(&mut self) -> Result<(), RecommenderError> {
        let mut interactions = Vec::with_capacity(self.seen.len());
        let mut recommendations = Array2::zeros((self.seen.len(), 1));
        for user in 0..self.seen.len() {
            let item = self
                .recommend(user)
                .ok_or_else(|| RecommenderError::new(self.name(), "no items to recommend"))?;
            self.consume(user, item);
            recommendations[[user, 0]] = item;
            interactions.push(Interaction::new(user, item));
        }

        self.interactions = interactions;
        self.recommendations = recommendations;
        self.timestep += 1;
        Ok(())
    }
}
