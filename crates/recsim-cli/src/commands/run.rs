//! Run command - Simulate the content-filtering scenario.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use recsim::prelude::*;

use crate::OutputFormat;
use crate::config::CliConfig;
use crate::scenario::ContentScenario;

/// Arguments for the run command.
#[derive(Args)]
pub struct RunArgs {
    /// Number of timesteps (overrides the configuration)
    #[arg(short = 't', long)]
    pub timesteps: Option<u64>,

    /// Number of users (overrides the configuration)
    #[arg(long)]
    pub users: Option<usize>,

    /// Number of items (overrides the configuration)
    #[arg(long)]
    pub items: Option<usize>,

    /// Record no value for failing measurements instead of aborting
    #[arg(long)]
    pub skip_errors: bool,

    /// Log every simulation event
    #[arg(long)]
    pub events: bool,
}

impl RunArgs {
    fn apply(&self, config: &mut CliConfig) {
        if let Some(timesteps) = self.timesteps {
            config.simulation.timesteps = timesteps;
        }
        if let Some(users) = self.users {
            config.scenario.num_users = users;
        }
        if let Some(items) = self.items {
            config.scenario.num_items = items;
        }
        if self.skip_errors {
            config.simulation.on_error = ErrorPolicy::SkipAndRecordNone;
        }
    }
}

/// Build and run the simulation described by `config`.
///
/// The report is returned even when the run fails, together with the error.
fn simulate(
    config: &CliConfig,
    events: bool,
) -> Result<(SimulationReport, SimulationResult<()>)> {
    config.validate().context("Invalid configuration")?;

    let mut builder = Simulation::builder(ContentScenario::new(&config.scenario))
        .with_config(config.simulation.clone())
        .with_measurements(config.build_measurements()?);
    if events {
        builder = builder.with_event_subscriber(Arc::new(
            LoggingSubscriber::new().with_level(tracing::Level::INFO),
        ));
    }

    let mut simulation = builder.build().context("Failed to configure simulation")?;
    tracing::info!(
        users = config.scenario.num_users,
        items = config.scenario.num_items,
        timesteps = config.simulation.timesteps,
        measurements = simulation.measurements().len(),
        "Running scenario"
    );

    let result = simulation.run_configured();
    Ok((simulation.report(), result))
}

/// Execute the run command.
pub fn execute(
    args: RunArgs,
    config_path: Option<PathBuf>,
    format: OutputFormat,
    quiet: bool,
) -> Result<()> {
    let mut config = CliConfig::load_or_default(config_path.as_deref())?;
    args.apply(&mut config);

    let (report, result) = simulate(&config, args.events)?;

    match format {
        OutputFormat::Human => {
            if quiet {
                if let Some(results) = &report.results {
                    print!("{}", ResultsTable::from_results(results).to_text());
                }
            } else {
                print!("{}", report.to_text());
            }
        }
        OutputFormat::Json => println!("{}", report.to_json_pretty()),
        OutputFormat::JsonCompact => println!("{}", serde_json::to_string(&report.to_json())?),
    }

    result.context("Simulation failed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_run() {
        let mut config = CliConfig::default();
        RunArgs {
            timesteps: Some(3),
            users: Some(4),
            items: None,
            skip_errors: false,
            events: false,
        }
        .apply(&mut config);

        let (report, result) = simulate(&config, false).unwrap();
        result.unwrap();

        assert!(report.is_success());
        assert_eq!(report.recommender.num_users, 4);

        let results = report.results.unwrap();
        assert_eq!(results.timesteps(), &[0, 1, 2, 3]);
        assert_eq!(results.num_series(), 3);

        // Nobody has interacted at timestep 0.
        let cosine = results
            .scalar_series(&standard_names::MEAN_COSINE_SIMILARITY)
            .unwrap();
        assert_eq!(cosine[0], None);
        assert!(cosine[1..].iter().all(|v| v.is_some_and(|v| v > 0.0 && v <= 1.0 + 1e-9)));

        let rmse = results.scalar_series(&standard_names::RMSE).unwrap();
        assert!(rmse.iter().all(Option::is_some));
    }

    #[test]
    fn test_duplicate_measurements_fail() {
        let config = CliConfig::parse(
            r#"
            [[measurements]]
            kind = "rmse"

            [[measurements]]
            kind = "mean_cosine_similarity"
            name = "rmse"
            "#,
        )
        .unwrap();

        let err = simulate(&config, false).unwrap_err();
        assert!(format!("{:#}", err).contains("already registered"));
    }

    #[test]
    fn test_interaction_similarity_run() {
        let config = CliConfig::parse(
            r#"
            [simulation]
            timesteps = 2

            [scenario]
            num_users = 3
            num_items = 4

            [[measurements]]
            kind = "interaction_similarity"
            pairs = [[0, 1], [1, 2]]

            [[measurements]]
            kind = "interaction_history"
            "#,
        )
        .unwrap();

        let (report, result) = simulate(&config, true).unwrap();
        result.unwrap();

        let results = report.results.unwrap();
        let history = results.get(&standard_names::INTERACTION_HISTORY).unwrap();
        assert_eq!(history[0], None);
        assert!(matches!(&history[1], Some(Observation::Indices(items)) if items.len() == 3));

        let jaccard = results
            .scalar_series(&standard_names::INTERACTION_SIMILARITY)
            .unwrap();
        assert_eq!(jaccard[0], None);
        assert!(jaccard[2].is_some());
    }

    #[test]
    fn test_target_and_diversity_run() {
        let config = CliConfig::parse(
            r#"
            [simulation]
            timesteps = 3

            [[measurements]]
            kind = "target_similarity"

            [[measurements]]
            kind = "target_similarity"
            actual = true

            [[measurements]]
            kind = "user_profiles"
            source = "target"

            [[measurements]]
            kind = "interaction_spread"

            [[measurements]]
            kind = "afsr"
            "#,
        )
        .unwrap();

        let (report, result) = simulate(&config, false).unwrap();
        result.unwrap();

        let results = report.results.unwrap();
        assert_eq!(results.num_series(), 5);

        for name in [
            standard_names::PREDICTED_TARGET_SIMILARITY,
            standard_names::ACTUAL_TARGET_SIMILARITY,
        ] {
            let series = results.scalar_series(&name).unwrap();
            assert!(series.iter().all(|v| v.is_some_and(|v| v > 0.0 && v <= 1.0 + 1e-9)));
        }

        let targets = results.get(&standard_names::TARGET_USER_PROFILES).unwrap();
        assert!(targets.iter().all(|s| matches!(s, Some(Observation::Matrix(_)))));

        let afsr = results
            .scalar_series(&standard_names::AVERAGE_FEATURE_SCORE_RANGE)
            .unwrap();
        assert_eq!(afsr[0], None);
        assert!(afsr[1..].iter().all(|v| v.is_some_and(|v| v >= 0.0)));

        let spread = results
            .scalar_series(&standard_names::INTERACTION_SPREAD)
            .unwrap();
        assert_eq!(spread[0], None);
        assert!(spread[1..].iter().all(Option::is_some));
    }
}
