//! Configuration-driven construction of built-in measurements.

use serde::{Deserialize, Serialize};

use crate::error::{MeasureError, MeasureResult};
use crate::measurement::BoxedMeasurement;

use super::{
    AverageFeatureScoreRange, InteractionSimilarity, InteractionSpread, InteractionTracker,
    ItemHomogenization, MeanCosineSimilarity, ProfileSource, RmseMeasurement, TargetSimilarity,
    UserProfileSnapshot,
};

/// Declarative description of a built-in measurement.
///
/// Deserializes from tables such as:
///
/// ```toml
/// [[measurements]]
/// kind = "interaction_similarity"
/// name = "jaccard"
/// pairs = [[0, 1], [2, 3]]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MeasurementSpec {
    /// [`MeanCosineSimilarity`].
    MeanCosineSimilarity {
        /// Name override.
        #[serde(default)]
        name: Option<String>,
        /// Log every observation.
        #[serde(default)]
        verbose: bool,
    },
    /// [`InteractionTracker`].
    InteractionHistory {
        /// Name override.
        #[serde(default)]
        name: Option<String>,
        /// Log every observation.
        #[serde(default)]
        verbose: bool,
    },
    /// [`InteractionSimilarity`].
    InteractionSimilarity {
        /// Name override.
        #[serde(default)]
        name: Option<String>,
        /// Log every observation.
        #[serde(default)]
        verbose: bool,
        /// User pairs to compare.
        pairs: Vec<(usize, usize)>,
    },
    /// [`RmseMeasurement`].
    Rmse {
        /// Name override.
        #[serde(default)]
        name: Option<String>,
        /// Log every observation.
        #[serde(default)]
        verbose: bool,
    },
    /// [`UserProfileSnapshot`].
    UserProfiles {
        /// Name override.
        #[serde(default)]
        name: Option<String>,
        /// Log every observation.
        #[serde(default)]
        verbose: bool,
        /// Which profiles to record.
        #[serde(default)]
        source: ProfileSource,
    },
    /// [`TargetSimilarity`].
    TargetSimilarity {
        /// Name override.
        #[serde(default)]
        name: Option<String>,
        /// Log every observation.
        #[serde(default)]
        verbose: bool,
        /// Compare actual rather than predicted profiles.
        #[serde(default)]
        actual: bool,
    },
    /// [`ItemHomogenization`].
    ItemHomogenization {
        /// Name override.
        #[serde(default)]
        name: Option<String>,
        /// Log every observation.
        #[serde(default)]
        verbose: bool,
        /// Only compare the most recent items.
        #[serde(default)]
        latest: Option<usize>,
        /// Compare actual rather than predicted attributes.
        #[serde(default)]
        actual: bool,
    },
    /// [`InteractionSpread`].
    InteractionSpread {
        /// Name override.
        #[serde(default)]
        name: Option<String>,
        /// Log every observation.
        #[serde(default)]
        verbose: bool,
    },
    /// [`AverageFeatureScoreRange`].
    Afsr {
        /// Name override.
        #[serde(default)]
        name: Option<String>,
        /// Log every observation.
        #[serde(default)]
        verbose: bool,
    },
}

impl MeasurementSpec {
    /// All recognized `kind` values.
    pub fn kinds() -> &'static [&'static str] {
        &[
            "mean_cosine_similarity",
            "interaction_history",
            "interaction_similarity",
            "rmse",
            "user_profiles",
            "target_similarity",
            "item_homogenization",
            "interaction_spread",
            "afsr",
        ]
    }

    /// The `kind` of this spec.
    pub fn kind(&self) -> &'static str {
        match self {
            MeasurementSpec::MeanCosineSimilarity { .. } => "mean_cosine_similarity",
            MeasurementSpec::InteractionHistory { .. } => "interaction_history",
            MeasurementSpec::InteractionSimilarity { .. } => "interaction_similarity",
            MeasurementSpec::Rmse { .. } => "rmse",
            MeasurementSpec::UserProfiles { .. } => "user_profiles",
            MeasurementSpec::TargetSimilarity { .. } => "target_similarity",
            MeasurementSpec::ItemHomogenization { .. } => "item_homogenization",
            MeasurementSpec::InteractionSpread { .. } => "interaction_spread",
            MeasurementSpec::Afsr { .. } => "afsr",
        }
    }

    /// Construct the measurement.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings are unusable, such as an interaction
    /// similarity without any user pairs.
    pub fn build(&self) -> MeasureResult<BoxedMeasurement> {
        let measurement: BoxedMeasurement = match self {
            MeasurementSpec::MeanCosineSimilarity { name, verbose } => {
                let m = MeanCosineSimilarity::new().with_verbose(*verbose);
                Box::new(match name {
                    Some(name) => m.with_name(name.clone()),
                    None => m,
                })
            }
            MeasurementSpec::InteractionHistory { name, verbose } => {
                let m = InteractionTracker::new().with_verbose(*verbose);
                Box::new(match name {
                    Some(name) => m.with_name(name.clone()),
                    None => m,
                })
            }
            MeasurementSpec::InteractionSimilarity {
                name,
                verbose,
                pairs,
            } => {
                if pairs.is_empty() {
                    return Err(MeasureError::InvalidConfig(
                        "interaction_similarity requires at least one user pair".to_string(),
                    ));
                }
                if let Some(&(a, b)) = pairs.iter().find(|(a, b)| a == b) {
                    return Err(MeasureError::InvalidConfig(format!(
                        "interaction_similarity pair ({}, {}) compares a user with itself",
                        a, b
                    )));
                }
                let m = InteractionSimilarity::new(pairs.clone()).with_verbose(*verbose);
                Box::new(match name {
                    Some(name) => m.with_name(name.clone()),
                    None => m,
                })
            }
            MeasurementSpec::Rmse { name, verbose } => {
                let m = RmseMeasurement::new().with_verbose(*verbose);
                Box::new(match name {
                    Some(name) => m.with_name(name.clone()),
                    None => m,
                })
            }
            MeasurementSpec::UserProfiles {
                name,
                verbose,
                source,
            } => {
                let m = UserProfileSnapshot::of(*source).with_verbose(*verbose);
                Box::new(match name {
                    Some(name) => m.with_name(name.clone()),
                    None => m,
                })
            }
            MeasurementSpec::TargetSimilarity {
                name,
                verbose,
                actual,
            } => {
                let m = if *actual {
                    TargetSimilarity::actual()
                } else {
                    TargetSimilarity::predicted()
                }
                .with_verbose(*verbose);
                Box::new(match name {
                    Some(name) => m.with_name(name.clone()),
                    None => m,
                })
            }
            MeasurementSpec::ItemHomogenization {
                name,
                verbose,
                latest,
                actual,
            } => {
                let mut m = ItemHomogenization::new().with_verbose(*verbose);
                if let Some(count) = latest {
                    m = m.latest(*count);
                }
                if *actual {
                    m = m.on_actual_attributes();
                }
                Box::new(match name {
                    Some(name) => m.with_name(name.clone()),
                    None => m,
                })
            }
            MeasurementSpec::InteractionSpread { name, verbose } => {
                let m = InteractionSpread::new().with_verbose(*verbose);
                Box::new(match name {
                    Some(name) => m.with_name(name.clone()),
                    None => m,
                })
            }
            MeasurementSpec::Afsr { name, verbose } => {
                let m = AverageFeatureScoreRange::new().with_verbose(*verbose);
                Box::new(match name {
                    Some(name) => m.with_name(name.clone()),
                    None => m,
                })
            }
        };
        Ok(measurement)
    }
}
