//! Built-in measurements for common metrics.
//!
//! This module provides standard measurements for:
//!
//! - [`MeanCosineSimilarity`]: Similarity of interacting users and items
//! - [`InteractionTracker`]: Which items were interacted with
//! - [`InteractionSimilarity`]: Overlap of user interaction histories
//! - [`RmseMeasurement`]: Score prediction error
//! - [`UserProfileSnapshot`]: Copies of user profiles
//! - [`TargetSimilarity`]: Closeness of user profiles to target profiles
//! - [`ItemHomogenization`]: Spread of the item catalog
//! - [`InteractionSpread`]: Concentration of interactions across items
//! - [`AverageFeatureScoreRange`]: Attribute range of recommendation slates
//!
//! [`MeasurementSpec`] builds any of them from configuration.

mod diversity;
mod homogenization;
mod interaction;
mod profiles;
mod rmse;
mod similarity;
mod spec;

pub use diversity::AverageFeatureScoreRange;
pub use homogenization::{ItemHomogenization, mean_pairwise_distance};
pub use interaction::{InteractionSimilarity, InteractionSpread, InteractionTracker};
pub use profiles::{ProfileSource, TargetSimilarity, UserProfileSnapshot};
pub use rmse::RmseMeasurement;
pub use similarity::{MeanCosineSimilarity, cosine_similarity};
pub use spec::MeasurementSpec;
