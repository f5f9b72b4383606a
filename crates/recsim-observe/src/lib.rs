//! recsim Observability
//!
//! This crate provides observability features for recsim simulation runs,
//! including:
//!
//! - [`MetricsCollector`]: Collects step timing
//! - [`SimulationReport`]: Complete run reports
//! - [`ResultsTable`]: Tabular view of measurement results
//! - [`EventDispatcher`]: Observable event system
//!
//! # Metrics Collection
//!
//! ```ignore
//! use recsim_observe::MetricsCollector;
//!
//! let collector = MetricsCollector::new();
//! collector.record_start();
//! // ... run timesteps ...
//! collector.record_end();
//!
//! let snapshot = collector.snapshot();
//! println!("Run time: {:?}", snapshot.timing.run_time);
//! ```
//!
//! # Reports
//!
//! ```ignore
//! use recsim_observe::{SimulationReport, RunOutcome};
//!
//! let report = SimulationReport::new(
//!     recommender_info,
//!     RunOutcome::Completed { timesteps: 10 },
//!     Some(results),
//!     metrics.snapshot(),
//! );
//!
//! println!("{}", report.to_text());
//! ```
//!
//! # Event Subscription
//!
//! ```ignore
//! use recsim_observe::{EventDispatcher, LoggingSubscriber, SimulationEvent};
//! use std::sync::Arc;
//!
//! let dispatcher = EventDispatcher::new();
//! dispatcher.subscribe(Arc::new(LoggingSubscriber::new()));
//!
//! dispatcher.emit(SimulationEvent::Custom {
//!     name: "checkpoint".to_string(),
//!     data: serde_json::Value::Null,
//! });
//! ```

pub mod events;
pub mod metrics;
pub mod report;

// Re-export main types
pub use events::{
    CollectingSubscriber, EventDispatcher, EventSubscriber, FailureStage, LoggingSubscriber,
    SimulationEvent,
};
pub use metrics::{MetricsCollector, MetricsSnapshot, StepMetrics, TimingMetrics};
pub use report::{
    Diagnostic, DiagnosticLevel, RecommenderInfo, ResultsTable, RunId, RunOutcome,
    SimulationReport,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::events::{EventDispatcher, EventSubscriber, SimulationEvent};
    pub use crate::metrics::{MetricsCollector, MetricsSnapshot};
    pub use crate::report::{ResultsTable, RunOutcome, SimulationReport};
}
