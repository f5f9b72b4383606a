//! Metrics command - List the built-in measurements.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use recsim::recsim_measure::{
    AverageFeatureScoreRange, BoxedMeasurement, InteractionSimilarity, InteractionSpread,
    InteractionTracker, ItemHomogenization, MeanCosineSimilarity, Measurement, MeasurementExt,
    MeasurementSpec, RmseMeasurement, TargetSimilarity, UserProfileSnapshot,
};

use crate::OutputFormat;

/// Arguments for the metrics command.
#[derive(Args)]
pub struct MetricsArgs {
    /// Only show the configuration kinds
    #[arg(long)]
    pub kinds_only: bool,
}

#[derive(Debug, Serialize)]
struct MetricInfo {
    kind: &'static str,
    default_name: String,
    description: String,
}

fn builtin_metrics() -> Vec<MetricInfo> {
    // Same order as `MeasurementSpec::kinds`.
    let measurements: Vec<BoxedMeasurement> = vec![
        Box::new(MeanCosineSimilarity::new()),
        Box::new(InteractionTracker::new()),
        Box::new(InteractionSimilarity::new(vec![(0, 1)])),
        Box::new(RmseMeasurement::new()),
        Box::new(UserProfileSnapshot::new()),
        Box::new(TargetSimilarity::predicted()),
        Box::new(ItemHomogenization::new()),
        Box::new(InteractionSpread::new()),
        Box::new(AverageFeatureScoreRange::new()),
    ];

    MeasurementSpec::kinds()
        .iter()
        .zip(&measurements)
        .map(|(kind, measurement)| MetricInfo {
            kind: *kind,
            default_name: measurement.name().to_string(),
            description: measurement.description().to_string(),
        })
        .collect()
}

/// Execute the metrics command.
pub fn execute(args: MetricsArgs, format: OutputFormat) -> Result<()> {
    let metrics = builtin_metrics();

    match format {
        OutputFormat::Human => {
            if args.kinds_only {
                for metric in &metrics {
                    println!("{}", metric.kind);
                }
            } else {
                println!("Built-in measurements:");
                for metric in &metrics {
                    println!("\n  {} (name: {})", metric.kind, metric.default_name);
                    println!("    {}", metric.description);
                }
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&metrics)?);
        }
        OutputFormat::JsonCompact => {
            println!("{}", serde_json::to_string(&metrics)?);
        }
    }

    Ok(())
}
