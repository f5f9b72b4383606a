//! Core error types for recsim.
//!
//! This module defines the errors raised while building or validating a
//! simulation state snapshot, loading configuration, or advancing a
//! recommender. Measurement errors live in `recsim-measure`.

use thiserror::Error;

/// Errors detected while validating a [`StateView`](crate::StateView).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// Two matrices that must share a dimension do not.
    #[error("Dimension mismatch for {what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// What was being compared.
        what: &'static str,
        /// The expected size.
        expected: usize,
        /// The actual size.
        actual: usize,
    },

    /// An interaction refers to a user that does not exist.
    #[error("User index {user} out of range ({num_users} users)")]
    UserOutOfRange {
        /// The offending user index.
        user: usize,
        /// Number of users in the state.
        num_users: usize,
    },

    /// An interaction refers to an item that does not exist.
    #[error("Item index {item} out of range ({num_items} items)")]
    ItemOutOfRange {
        /// The offending item index.
        item: usize,
        /// Number of items in the state.
        num_items: usize,
    },
}

/// Errors in simulation configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A configuration value is invalid.
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// The configuration could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Error reported by a recommender while advancing one timestep.
#[derive(Debug, Clone, Error)]
#[error("Recommender '{recommender}' failed: {message}")]
pub struct RecommenderError {
    /// Name of the recommender that failed.
    pub recommender: String,
    /// Human-readable description.
    pub message: String,
}

impl RecommenderError {
    /// Create a new recommender error.
    pub fn new(recommender: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            recommender: recommender.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for state operations.
pub type StateResult<T> = std::result::Result<T, StateError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
