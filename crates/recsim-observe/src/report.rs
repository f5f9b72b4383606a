//! Simulation reports.

use serde::Serialize;
use uuid::Uuid;

use recsim_measure::{MeasurementResults, describe_sample};

use crate::metrics::MetricsSnapshot;

/// Unique identifier for a simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RunId(Uuid);

impl RunId {
    /// Create a new random run ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Information about the simulated recommender.
#[derive(Debug, Clone, Serialize)]
pub struct RecommenderInfo {
    /// Recommender name.
    pub name: String,
    /// Number of users.
    pub num_users: usize,
    /// Number of items.
    pub num_items: usize,
    /// Attribute dimension.
    pub num_attributes: usize,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// All requested steps were measured.
    Completed {
        /// Current timestep after the run.
        timesteps: u64,
    },
    /// The run stopped on an error.
    Failed {
        /// Error message.
        message: String,
    },
}

impl RunOutcome {
    /// Check if the run completed.
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Completed { .. })
    }
}

/// A diagnostic message.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    /// Severity level.
    pub level: DiagnosticLevel,
    /// Message.
    pub message: String,
}

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    /// Informational.
    Info,
    /// Warning.
    Warning,
    /// Error.
    Error,
}

/// Measurement results laid out one row per timestep.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultsTable {
    /// Column headers; the first is always the timestep key.
    pub columns: Vec<String>,
    /// Rendered cells, one row per timestep.
    pub rows: Vec<Vec<String>>,
}

impl ResultsTable {
    /// Project merged results into a table.
    pub fn from_results(results: &MeasurementResults) -> Self {
        let mut columns = vec![MeasurementResults::TIMESTEP_KEY.to_string()];
        columns.extend(results.names().into_iter().map(|name| name.to_string()));

        let rows = results
            .timesteps()
            .iter()
            .enumerate()
            .map(|(i, timestep)| {
                let mut row = vec![timestep.to_string()];
                row.extend(
                    results
                        .iter()
                        .map(|(_, series)| series.get(i).map(describe_sample).unwrap_or_default()),
                );
                row
            })
            .collect();

        Self { columns, rows }
    }

    /// Render as aligned plain text.
    pub fn to_text(&self) -> String {
        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(c, header)| {
                self.rows
                    .iter()
                    .filter_map(|row| row.get(c))
                    .map(String::len)
                    .chain(std::iter::once(header.len()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let mut output = String::new();
        let mut push_line = |cells: &[String]| {
            let line = cells
                .iter()
                .zip(&widths)
                .map(|(cell, width)| format!("{:>width$}", cell, width = width))
                .collect::<Vec<_>>()
                .join("  ");
            output.push_str(line.trim_end());
            output.push('\n');
        };

        push_line(&self.columns);
        for row in &self.rows {
            push_line(row);
        }
        output
    }
}

/// Complete simulation report.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    /// Unique run ID.
    pub run_id: RunId,
    /// Recommender information.
    pub recommender: RecommenderInfo,
    /// How the run ended.
    pub outcome: RunOutcome,
    /// Merged measurement results, if they could be assembled.
    pub results: Option<MeasurementResults>,
    /// Collected metrics.
    pub metrics: MetricsSnapshot,
    /// Diagnostic messages.
    pub diagnostics: Vec<Diagnostic>,
}

impl SimulationReport {
    /// Create a new report.
    pub fn new(
        recommender: RecommenderInfo,
        outcome: RunOutcome,
        results: Option<MeasurementResults>,
        metrics: MetricsSnapshot,
    ) -> Self {
        Self {
            run_id: RunId::new(),
            recommender,
            outcome,
            results,
            metrics,
            diagnostics: Vec::new(),
        }
    }

    /// Add an info diagnostic.
    pub fn add_info(&mut self, message: impl Into<String>) {
        self.push(DiagnosticLevel::Info, message.into());
    }

    /// Add a warning diagnostic.
    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.push(DiagnosticLevel::Warning, message.into());
    }

    /// Add an error diagnostic.
    pub fn add_error(&mut self, message: impl Into<String>) {
        self.push(DiagnosticLevel::Error, message.into());
    }

    fn push(&mut self, level: DiagnosticLevel, message: String) {
        self.diagnostics.push(Diagnostic { level, message });
    }

    /// Check if the run completed.
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    /// Format as human-readable text.
    pub fn to_text(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("Simulation Report: {}\n", self.run_id));
        output.push_str(&format!(
            "Recommender: {} ({} users, {} items, {} attributes)\n\n",
            self.recommender.name,
            self.recommender.num_users,
            self.recommender.num_items,
            self.recommender.num_attributes
        ));

        output.push_str("Outcome: ");
        match &self.outcome {
            RunOutcome::Completed { timesteps } => {
                output.push_str(&format!("Completed at timestep {}\n", timesteps));
            }
            RunOutcome::Failed { message } => {
                output.push_str(&format!("Failed: {}\n", message));
            }
        }

        if let Some(results) = &self.results {
            output.push_str("\nMeasurements:\n");
            output.push_str(&ResultsTable::from_results(results).to_text());
        }

        output.push_str("\nMetrics:\n");
        output.push_str(&format!("  Run Time: {:?}\n", self.metrics.timing.run_time));
        output.push_str(&format!(
            "  Steps: {} completed, {} failed\n",
            self.metrics.steps.steps_completed, self.metrics.steps.failures
        ));
        output.push_str(&format!(
            "  Recommender Time: {:?}\n",
            self.metrics.steps.recommender_time
        ));
        output.push_str(&format!(
            "  Measurement Time: {:?}\n",
            self.metrics.steps.measurement_time
        ));
        if let Some((timestep, duration)) = self.metrics.steps.slowest_step {
            output.push_str(&format!(
                "  Slowest Step: {} ({:?})\n",
                timestep, duration
            ));
        }

        if !self.diagnostics.is_empty() {
            output.push_str("\nDiagnostics:\n");
            for diag in &self.diagnostics {
                let level = match diag.level {
                    DiagnosticLevel::Info => "INFO",
                    DiagnosticLevel::Warning => "WARN",
                    DiagnosticLevel::Error => "ERROR",
                };
                output.push_str(&format!("  [{}] {}\n", level, diag.message));
            }
        }

        output
    }

    /// Format as JSON.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Format as pretty JSON string.
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}
