//! TOML configuration for CLI runs.
//!
//! ```toml
//! [simulation]
//! timesteps = 20
//! on_error = "skip_and_record_none"
//!
//! [scenario]
//! num_users = 6
//! num_items = 15
//!
//! [[measurements]]
//! kind = "mean_cosine_similarity"
//!
//! [[measurements]]
//! kind = "interaction_similarity"
//! pairs = [[0, 1], [2, 3]]
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use recsim::recsim_core::{ConfigError, ConfigResult, SimulationConfig};
use recsim::recsim_measure::{BoxedMeasurement, MeasurementSpec};

/// Everything a CLI run needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    /// Driver settings.
    pub simulation: SimulationConfig,
    /// Scenario dimensions and dynamics.
    pub scenario: ScenarioConfig,
    /// Measurements to register, in order.
    pub measurements: Vec<MeasurementSpec>,
}

impl CliConfig {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid configuration in {}", path.display()))
    }

    /// Parse from TOML text.
    pub fn parse(text: &str) -> ConfigResult<Self> {
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load from `path`, or use defaults without one.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Configured measurement specs, or the default set if none are listed.
    pub fn measurement_specs(&self) -> Vec<MeasurementSpec> {
        if !self.measurements.is_empty() {
            return self.measurements.clone();
        }
        vec![
            MeasurementSpec::MeanCosineSimilarity {
                name: None,
                verbose: false,
            },
            MeasurementSpec::Rmse {
                name: None,
                verbose: false,
            },
            MeasurementSpec::ItemHomogenization {
                name: None,
                verbose: false,
                latest: None,
                actual: false,
            },
        ]
    }

    /// Build the measurements.
    pub fn build_measurements(&self) -> Result<Vec<BoxedMeasurement>> {
        self.measurement_specs()
            .iter()
            .map(|spec| {
                spec.build()
                    .with_context(|| format!("Failed to build '{}' measurement", spec.kind()))
            })
            .collect()
    }

    /// Check settings that can be checked without running.
    pub fn validate(&self) -> ConfigResult<()> {
        self.simulation.validate()?;
        self.scenario.validate()?;

        for spec in &self.measurements {
            if let MeasurementSpec::InteractionSimilarity { pairs, .. } = spec {
                if let Some(&(a, b)) = pairs
                    .iter()
                    .find(|(a, b)| *a >= self.scenario.num_users || *b >= self.scenario.num_users)
                {
                    return Err(ConfigError::Invalid(format!(
                        "interaction_similarity pair ({}, {}) is outside the {} scenario users",
                        a, b, self.scenario.num_users
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Dimensions and dynamics of the content-filtering scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Number of users.
    pub num_users: usize,
    /// Number of items.
    pub num_items: usize,
    /// Attribute dimension shared by users and items.
    pub num_attributes: usize,
    /// How far a user's true preferences move toward a consumed item.
    pub drift: f64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            num_users: 10,
            num_items: 25,
            num_attributes: 4,
            drift: 0.1,
        }
    }
}

impl ScenarioConfig {
    /// Validate the scenario.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.num_users == 0 || self.num_items == 0 || self.num_attributes == 0 {
            return Err(ConfigError::Invalid(
                "scenario needs at least one user, item and attribute".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.drift) {
            return Err(ConfigError::Invalid(format!(
                "drift must be within [0, 1], got {}",
                self.drift
            )));
        }
        Ok(())
    }
}
