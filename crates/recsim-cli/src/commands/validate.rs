//! Validate command - Check a simulation configuration without running it.

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Args;
use serde::Serialize;

use recsim::recsim_measure::{MeasurementModuleBuilder, MeasurementName};

use crate::OutputFormat;
use crate::config::CliConfig;

/// Arguments for the validate command.
#[derive(Args)]
pub struct ValidateArgs {
    /// Configuration file to validate (defaults to --config)
    pub file: Option<PathBuf>,
}

/// Validation result.
#[derive(Debug, Serialize)]
struct ValidationResult {
    valid: bool,
    path: String,
    timesteps: u64,
    measurements: Vec<MeasurementName>,
    warnings: Vec<String>,
    errors: Vec<String>,
}

impl ValidationResult {
    fn check(path: String, config: &CliConfig) -> Self {
        let mut result = ValidationResult {
            valid: true,
            path,
            timesteps: config.simulation.timesteps,
            measurements: Vec::new(),
            warnings: Vec::new(),
            errors: Vec::new(),
        };

        if let Err(e) = config.validate() {
            result.errors.push(e.to_string());
        }

        if config.measurements.is_empty() {
            result
                .warnings
                .push("No measurements configured - the default set will be used".to_string());
        }
        if !config.simulation.validate_state {
            result
                .warnings
                .push("State validation is disabled".to_string());
        }

        // Building the module catches duplicate and reserved names.
        match config.build_measurements() {
            Ok(measurements) => {
                let built = measurements
                    .into_iter()
                    .fold(MeasurementModuleBuilder::new(), |builder, m| {
                        builder.with_boxed(m)
                    })
                    .build();
                match built {
                    Ok(module) => result.measurements = module.names(),
                    Err(e) => result.errors.push(e.to_string()),
                }
            }
            Err(e) => result.errors.push(format!("{:#}", e)),
        }

        result.valid = result.errors.is_empty();
        result
    }
}

/// Execute the validate command.
pub fn execute(
    args: ValidateArgs,
    config_path: Option<PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    let Some(path) = args.file.or(config_path) else {
        bail!("No configuration file given");
    };

    let result = match CliConfig::load(&path) {
        Ok(config) => ValidationResult::check(path.display().to_string(), &config),
        Err(e) => ValidationResult {
            valid: false,
            path: path.display().to_string(),
            timesteps: 0,
            measurements: Vec::new(),
            warnings: Vec::new(),
            errors: vec![format!("{:#}", e)],
        },
    };

    match format {
        OutputFormat::Human => {
            if result.valid {
                println!("Configuration is valid: {}", result.path);
                println!("  Timesteps: {}", result.timesteps);
                println!("  Measurements:");
                for name in &result.measurements {
                    println!("    - {}", name);
                }

                if !result.warnings.is_empty() {
                    println!("\nWarnings:");
                    for warning in &result.warnings {
                        println!("  - {}", warning);
                    }
                }
            } else {
                println!("Configuration is INVALID: {}", result.path);
                for error in &result.errors {
                    println!("  Error: {}", error);
                }
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        OutputFormat::JsonCompact => {
            println!("{}", serde_json::to_string(&result)?);
        }
    }

    if result.valid {
        Ok(())
    } else {
        Err(anyhow::anyhow!("Validation failed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(text: &str) -> ValidationResult {
        ValidationResult::check("test.toml".to_string(), &CliConfig::parse(text).unwrap())
    }

    #[test]
    fn test_valid_config() {
        let result = check(
            r#"
            [[measurements]]
            kind = "mean_cosine_similarity"

            [[measurements]]
            kind = "user_profiles"
            source = "predicted"
            "#,
        );

        assert!(result.valid);
        assert!(result.warnings.is_empty());
        assert_eq!(
            result.measurements,
            vec![
                MeasurementName::new("mean_cosine_similarity"),
                MeasurementName::new("predicted_user_profiles"),
            ]
        );
    }

    #[test]
    fn test_defaults_warn() {
        let result = check("");
        assert!(result.valid);
        assert_eq!(result.measurements.len(), 3);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_invalid_names() {
        let duplicate = check(
            r#"
            [[measurements]]
            kind = "rmse"

            [[measurements]]
            kind = "rmse"
            "#,
        );
        assert!(!duplicate.valid);
        assert!(duplicate.errors[0].contains("already registered"));

        let reserved = check(
            r#"
            [[measurements]]
            kind = "rmse"
            name = "timesteps"
            "#,
        );
        assert!(!reserved.valid);
        assert!(reserved.errors[0].contains("reserved"));
    }

    #[test]
    fn test_invalid_scenario() {
        let result = check("[simulation]\ntimesteps = 0\n\n[scenario]\nnum_items = 0");
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 1);
    }
}
