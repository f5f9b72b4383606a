//! Configuration types for recsim simulations.
//!
//! This module provides configuration structures for how long a simulation
//! runs and how the measurement layer reacts when a metric fails.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// What the measurement layer does when a metric returns an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Abort the simulation. Series alignment can no longer be trusted.
    #[default]
    Fatal,
    /// Log a warning, record the "no value" sentinel for the failing
    /// metric, and keep going.
    SkipAndRecordNone,
}

impl std::fmt::Display for ErrorPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorPolicy::Fatal => write!(f, "fatal"),
            ErrorPolicy::SkipAndRecordNone => write!(f, "skip_and_record_none"),
        }
    }
}

/// Configuration for a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of timesteps executed by a configured run.
    ///
    /// Defaults to 10.
    pub timesteps: u64,

    /// Policy applied when a measurement fails.
    pub on_error: ErrorPolicy,

    /// Validate every state snapshot before it reaches the measurements.
    pub validate_state: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            timesteps: 10,
            on_error: ErrorPolicy::Fatal,
            validate_state: true,
        }
    }
}

impl SimulationConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of timesteps for a configured run.
    pub fn with_timesteps(mut self, timesteps: u64) -> Self {
        self.timesteps = timesteps;
        self
    }

    /// Set the measurement error policy.
    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.on_error = policy;
        self
    }

    /// Enable or disable state validation.
    pub fn with_state_validation(mut self, enabled: bool) -> Self {
        self.validate_state = enabled;
        self
    }

    /// Check that the configuration is usable.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.timesteps == 0 {
            return Err(ConfigError::Invalid(
                "timesteps must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
