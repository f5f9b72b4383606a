//! Observable events during a simulation run.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use recsim_measure::MeasurementName;

/// Events that can be observed during a simulation run.
#[derive(Debug, Clone)]
pub enum SimulationEvent {
    /// Measurements observed the initial state.
    Initialized {
        /// Registered measurement names, in observation order.
        measurements: Vec<MeasurementName>,
    },
    /// A timestep finished and was measured.
    StepCompleted {
        /// Timestep index that was just observed.
        timestep: u64,
        /// Number of interactions in that step.
        interactions: usize,
        /// Wall time of the step, including measurement.
        duration: Duration,
    },
    /// Processing a timestep failed and the simulation halted.
    StepFailed {
        /// Timestep being processed.
        timestep: u64,
        /// Which part of the step failed.
        stage: FailureStage,
        /// Error message.
        message: String,
    },
    /// The run finished.
    Finished {
        /// Number of steps taken in this run.
        timesteps: u64,
        /// Total duration.
        duration: Duration,
    },
    /// Custom event.
    Custom {
        /// Event name.
        name: String,
        /// Event data.
        data: serde_json::Value,
    },
}

/// The part of a timestep that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    /// The recommender could not advance.
    Recommender,
    /// The recommender produced an inconsistent state.
    State,
    /// A measurement failed.
    Measurement,
}

impl FailureStage {
    /// Lowercase name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureStage::Recommender => "recommender",
            FailureStage::State => "state",
            FailureStage::Measurement => "measurement",
        }
    }
}

impl std::fmt::Display for FailureStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SimulationEvent {
    /// Get the event type name.
    pub fn event_type(&self) -> &'static str {
        match self {
            SimulationEvent::Initialized { .. } => "initialized",
            SimulationEvent::StepCompleted { .. } => "step_completed",
            SimulationEvent::StepFailed { .. } => "step_failed",
            SimulationEvent::Finished { .. } => "finished",
            SimulationEvent::Custom { .. } => "custom",
        }
    }
}

/// Subscriber for simulation events.
pub trait EventSubscriber: Send + Sync {
    /// Called when an event occurs.
    fn on_event(&self, event: &SimulationEvent);

    /// Event types this subscriber is interested in.
    /// `None` receives all events.
    fn event_filter(&self) -> Option<Vec<&'static str>> {
        None
    }
}

/// Subscriber that forwards events to `tracing`.
pub struct LoggingSubscriber {
    /// Level used for per-step events.
    pub step_level: tracing::Level,
}

impl LoggingSubscriber {
    /// Create a new logging subscriber.
    pub fn new() -> Self {
        Self {
            step_level: tracing::Level::DEBUG,
        }
    }

    /// Set the level for per-step events.
    pub fn with_level(mut self, level: tracing::Level) -> Self {
        self.step_level = level;
        self
    }
}

impl Default for LoggingSubscriber {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSubscriber for LoggingSubscriber {
    fn on_event(&self, event: &SimulationEvent) {
        match event {
            SimulationEvent::Initialized { measurements } => {
                tracing::info!(
                    event = "initialized",
                    measurements = measurements.len(),
                    "Measurements initialized"
                );
            }
            SimulationEvent::StepCompleted {
                timestep,
                interactions,
                duration,
            } => {
                // tracing macros need a constant level
                if self.step_level >= tracing::Level::DEBUG {
                    tracing::debug!(
                        event = "step_completed",
                        timestep = timestep,
                        interactions = interactions,
                        duration_us = duration.as_micros(),
                        "Step completed"
                    );
                } else {
                    tracing::info!(
                        event = "step_completed",
                        timestep = timestep,
                        interactions = interactions,
                        duration_us = duration.as_micros(),
                        "Step completed"
                    );
                }
            }
            SimulationEvent::StepFailed {
                timestep,
                stage,
                message,
            } => {
                tracing::error!(
                    event = "step_failed",
                    timestep = timestep,
                    stage = %stage,
                    message = message,
                    "Step failed"
                );
            }
            SimulationEvent::Finished {
                timesteps,
                duration,
            } => {
                tracing::info!(
                    event = "finished",
                    timesteps = timesteps,
                    duration_ms = duration.as_millis(),
                    "Simulation finished"
                );
            }
            SimulationEvent::Custom { name, data } => {
                tracing::debug!(event = "custom", name = name, data = %data, "Custom event");
            }
        }
    }
}

/// A subscriber that collects events for later analysis.
pub struct CollectingSubscriber {
    events: RwLock<Vec<(Instant, SimulationEvent)>>,
    max_events: usize,
}

impl CollectingSubscriber {
    /// Create a subscriber that keeps at most `max_events` events.
    pub fn new(max_events: usize) -> Self {
        Self {
            events: RwLock::new(Vec::new()),
            max_events,
        }
    }

    /// Get collected events.
    pub fn events(&self) -> Vec<(Instant, SimulationEvent)> {
        self.events.read().clone()
    }

    /// Types of the collected events, in order.
    pub fn event_types(&self) -> Vec<&'static str> {
        self.events
            .read()
            .iter()
            .map(|(_, event)| event.event_type())
            .collect()
    }

    /// Clear collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Get event count.
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }
}

impl EventSubscriber for CollectingSubscriber {
    fn on_event(&self, event: &SimulationEvent) {
        let mut events = self.events.write();
        if events.len() < self.max_events {
            events.push((Instant::now(), event.clone()));
        }
    }
}

/// Event dispatcher that manages subscribers.
#[derive(Default)]
pub struct EventDispatcher {
    subscribers: RwLock<Vec<Arc<dyn EventSubscriber>>>,
}

impl EventDispatcher {
    /// Create a new event dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber.
    pub fn subscribe(&self, subscriber: Arc<dyn EventSubscriber>) {
        self.subscribers.write().push(subscriber);
    }

    /// Remove all subscribers.
    pub fn clear_subscribers(&self) {
        self.subscribers.write().clear();
    }

    /// Get subscriber count.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Emit an event to all interested subscribers.
    pub fn emit(&self, event: SimulationEvent) {
        let subscribers = self.subscribers.read();
        for subscriber in subscribers.iter() {
            if let Some(filter) = subscriber.event_filter() {
                if !filter.contains(&event.event_type()) {
                    continue;
                }
            }
            subscriber.on_event(&event);
        }
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}
