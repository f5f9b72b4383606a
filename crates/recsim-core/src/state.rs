//! Read-only simulation state snapshots.
//!
//! A [`StateView`] is what every measurement sees at one point in simulated
//! time. It only borrows from the recommender that produced it, so a
//! measurement cannot hold on to it across invocations.

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{StateError, StateResult};

/// A single realized user-item interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interaction {
    /// Index of the interacting user.
    pub user: usize,
    /// Index of the item the user interacted with.
    pub item: usize,
}

impl Interaction {
    /// Create a new interaction.
    pub fn new(user: usize, item: usize) -> Self {
        Self { user, item }
    }
}

impl From<(usize, usize)> for Interaction {
    fn from((user, item): (usize, usize)) -> Self {
        Self::new(user, item)
    }
}

/// Borrowed view of the recommender state at one timestep.
///
/// Profile and attribute matrices are row-per-entity: user profiles are
/// `users × attributes` and item attributes are `items × attributes`.
/// Recommendation slates are `users × slate size` item indices.
///
/// # Example
///
/// ```
/// use ndarray::array;
/// use recsim_core::{Interaction, StateView};
///
/// let users = array![[1.0, 0.0]];
/// let items = array![[1.0, 0.0], [0.0, 1.0]];
/// let interactions = [Interaction::new(0, 1)];
///
/// let state = StateView::new(3, &interactions, users.view(), items.view());
/// assert_eq!(state.num_items(), 2);
/// assert!(state.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct StateView<'a> {
    timestep: u64,
    interactions: &'a [Interaction],
    predicted_user_profiles: ArrayView2<'a, f64>,
    predicted_item_attributes: ArrayView2<'a, f64>,
    actual_user_profiles: Option<ArrayView2<'a, f64>>,
    actual_item_attributes: Option<ArrayView2<'a, f64>>,
    target_user_profiles: Option<ArrayView2<'a, f64>>,
    recommendations: Option<ArrayView2<'a, usize>>,
}

impl<'a> StateView<'a> {
    /// Create a view over the required parts of the state.
    pub fn new(
        timestep: u64,
        interactions: &'a [Interaction],
        predicted_user_profiles: ArrayView2<'a, f64>,
        predicted_item_attributes: ArrayView2<'a, f64>,
    ) -> Self {
        Self {
            timestep,
            interactions,
            predicted_user_profiles,
            predicted_item_attributes,
            actual_user_profiles: None,
            actual_item_attributes: None,
            target_user_profiles: None,
            recommendations: None,
        }
    }

    /// Attach the true (unobserved by the recommender) user profiles.
    pub fn with_actual_user_profiles(mut self, profiles: ArrayView2<'a, f64>) -> Self {
        self.actual_user_profiles = Some(profiles);
        self
    }

    /// Attach the true item attributes.
    pub fn with_actual_item_attributes(mut self, attributes: ArrayView2<'a, f64>) -> Self {
        self.actual_item_attributes = Some(attributes);
        self
    }

    /// Attach the profiles users are being steered toward.
    pub fn with_target_user_profiles(mut self, profiles: ArrayView2<'a, f64>) -> Self {
        self.target_user_profiles = Some(profiles);
        self
    }

    /// Attach the items shown to each user during the step.
    pub fn with_recommendations(mut self, recommendations: ArrayView2<'a, usize>) -> Self {
        self.recommendations = Some(recommendations);
        self
    }

    /// The timestep this view was taken at. Timestep 0 is the initial state.
    pub fn timestep(&self) -> u64 {
        self.timestep
    }

    /// Interactions realized during the step that produced this state.
    pub fn interactions(&self) -> &'a [Interaction] {
        self.interactions
    }

    /// Number of users.
    pub fn num_users(&self) -> usize {
        self.predicted_user_profiles.nrows()
    }

    /// Number of items.
    pub fn num_items(&self) -> usize {
        self.predicted_item_attributes.nrows()
    }

    /// Dimensionality of profile and attribute vectors.
    pub fn num_attributes(&self) -> usize {
        self.predicted_user_profiles.ncols()
    }

    /// Predicted user profiles (`users × attributes`).
    pub fn predicted_user_profiles(&self) -> ArrayView2<'a, f64> {
        self.predicted_user_profiles
    }

    /// Predicted item attributes (`items × attributes`).
    pub fn predicted_item_attributes(&self) -> ArrayView2<'a, f64> {
        self.predicted_item_attributes
    }

    /// Predicted profile of a single user.
    pub fn predicted_user_profile(&self, user: usize) -> Option<ArrayView1<'a, f64>> {
        (user < self.num_users())
            .then(|| self.predicted_user_profiles.index_axis_move(Axis(0), user))
    }

    /// Predicted attributes of a single item.
    pub fn predicted_item_attribute(&self, item: usize) -> Option<ArrayView1<'a, f64>> {
        (item < self.num_items())
            .then(|| self.predicted_item_attributes.index_axis_move(Axis(0), item))
    }

    /// True user profiles, if the recommender exposes them.
    pub fn actual_user_profiles(&self) -> Option<ArrayView2<'a, f64>> {
        self.actual_user_profiles
    }

    /// True item attributes, if the recommender exposes them.
    pub fn actual_item_attributes(&self) -> Option<ArrayView2<'a, f64>> {
        self.actual_item_attributes
    }

    /// Target user profiles, if the simulation steers users.
    pub fn target_user_profiles(&self) -> Option<ArrayView2<'a, f64>> {
        self.target_user_profiles
    }

    /// Items shown to each user during the step, if recorded.
    pub fn recommendations(&self) -> Option<ArrayView2<'a, usize>> {
        self.recommendations
    }

    /// Scores the recommender would assign (`users × items`).
    ///
    /// # Errors
    ///
    /// Returns [`StateError::DimensionMismatch`] if profiles and attributes
    /// have different widths.
    pub fn predicted_scores(&self) -> StateResult<Array2<f64>> {
        scores(
            self.predicted_user_profiles,
            self.predicted_item_attributes,
            "predicted item attributes",
        )
    }

    /// Scores from the true profiles and attributes.
    ///
    /// `None` unless both actual matrices are present.
    pub fn actual_scores(&self) -> Option<StateResult<Array2<f64>>> {
        let users = self.actual_user_profiles?;
        let items = self.actual_item_attributes?;
        Some(scores(users, items, "actual item attributes"))
    }

    /// Check internal consistency of the view.
    ///
    /// # Errors
    ///
    /// Returns an error if matrix dimensions disagree or an interaction
    /// references a user or item that does not exist.
    pub fn validate(&self) -> StateResult<()> {
        if self.predicted_item_attributes.ncols() != self.num_attributes() {
            return Err(StateError::DimensionMismatch {
                what: "predicted item attributes",
                expected: self.num_attributes(),
                actual: self.predicted_item_attributes.ncols(),
            });
        }

        if let Some(actual) = self.actual_user_profiles {
            if actual.nrows() != self.num_users() {
                return Err(StateError::DimensionMismatch {
                    what: "actual user profile rows",
                    expected: self.num_users(),
                    actual: actual.nrows(),
                });
            }
        }

        if let Some(actual) = self.actual_item_attributes {
            if actual.nrows() != self.num_items() {
                return Err(StateError::DimensionMismatch {
                    what: "actual item attribute rows",
                    expected: self.num_items(),
                    actual: actual.nrows(),
                });
            }
        }

        if let Some(target) = self.target_user_profiles {
            if target.dim() != self.predicted_user_profiles.dim() {
                let (what, expected, actual) = if target.nrows() != self.num_users() {
                    ("target user profile rows", self.num_users(), target.nrows())
                } else {
                    ("target user profile columns", self.num_attributes(), target.ncols())
                };
                return Err(StateError::DimensionMismatch {
                    what,
                    expected,
                    actual,
                });
            }
        }

        if let Some(recommendations) = self.recommendations {
            if recommendations.nrows() != self.num_users() {
                return Err(StateError::DimensionMismatch {
                    what: "recommendation rows",
                    expected: self.num_users(),
                    actual: recommendations.nrows(),
                });
            }
            if let Some(&item) = recommendations.iter().find(|&&item| item >= self.num_items()) {
                return Err(StateError::ItemOutOfRange {
                    item,
                    num_items: self.num_items(),
                });
            }
        }

        for interaction in self.interactions {
            if interaction.user >= self.num_users() {
                return Err(StateError::UserOutOfRange {
                    user: interaction.user,
                    num_users: self.num_users(),
                });
            }
            if interaction.item >= self.num_items() {
                return Err(StateError::ItemOutOfRange {
                    item: interaction.item,
                    num_items: self.num_items(),
                });
            }
        }

        Ok(())
    }
}

fn scores(
    users: ArrayView2<'_, f64>,
    items: ArrayView2<'_, f64>,
    what: &'static str,
) -> StateResult<Array2<f64>> {
    if users.ncols() != items.ncols() {
        return Err(StateError::DimensionMismatch {
            what,
            expected: users.ncols(),
            actual: items.ncols(),
        });
    }
    Ok(users.dot(&items.t()))
}
