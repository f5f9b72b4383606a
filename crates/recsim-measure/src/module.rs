//! Measurement module management.
//!
//! This module provides the `MeasurementModule` type, which owns the
//! registered measurements, invokes them in lockstep, and merges their
//! series into [`MeasurementResults`].

use tracing::{debug, info, warn};

use recsim_core::{ErrorPolicy, StateView};

use crate::error::{MeasureError, MeasureResult};
use crate::measurement::{
    BoxedMeasurement, Measurement, MeasurementExt, MeasurementName, standard_names,
};
use crate::results::MeasurementResults;

/// The set of measurements observed by one simulation.
///
/// Measurements are invoked in registration order, once by
/// [`initialize`](Self::initialize) and once per [`step`](Self::step). After
/// every invocation the module checks that the measurement appended exactly
/// one sample. Anything else is a contract violation: it is reported as a
/// fatal error and the module refuses further work.
///
/// When a computation error stops a round part way, the samples that round
/// did record are left out of [`get_results`](Self::get_results), so every
/// completed timestep stays readable.
///
/// # Example
///
/// ```ignore
/// use recsim_measure::{MeasurementModule, builtin::MeanCosineSimilarity};
///
/// let mut module = MeasurementModule::new();
/// module.register(MeanCosineSimilarity::new())?;
///
/// module.initialize(&state)?;
/// module.step(&next_state)?;
///
/// let results = module.get_results()?;
/// ```
#[derive(Debug, Default)]
pub struct MeasurementModule {
    /// Registered measurements, in invocation order.
    measurements: Vec<BoxedMeasurement>,
    /// Number of completed simulation steps.
    timestep: u64,
    /// Whether the initial observation round has run.
    initialized: bool,
    /// Set after a fatal failure.
    poisoned: bool,
    /// Set when a computation error interrupted a round.
    partial_round: bool,
    /// Reaction to errors returned by `measure`.
    policy: ErrorPolicy,
}

impl MeasurementModule {
    /// Create an empty module with the fatal error policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty module with the given error policy.
    pub fn with_policy(policy: ErrorPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Create a module with the given measurements.
    pub fn with_measurements(measurements: Vec<BoxedMeasurement>) -> MeasureResult<Self> {
        let mut module = Self::new();
        for measurement in measurements {
            module.register_boxed(measurement)?;
        }
        Ok(module)
    }

    /// Register a measurement.
    ///
    /// # Errors
    ///
    /// Returns an error if a measurement with the same name is already
    /// registered, if the name is reserved, or if the module has already
    /// been initialized.
    pub fn register<M: Measurement + 'static>(&mut self, measurement: M) -> MeasureResult<()> {
        self.register_boxed(Box::new(measurement))
    }

    /// Register a boxed measurement.
    ///
    /// # Errors
    ///
    /// In addition to the checks of [`register`](Self::register), rejects a
    /// measurement that has already recorded samples.
    pub fn register_boxed(&mut self, measurement: BoxedMeasurement) -> MeasureResult<()> {
        let name = measurement.name().clone();

        if name == standard_names::TIMESTEPS {
            return Err(MeasureError::ReservedName(name));
        }

        if self.contains(&name) {
            return Err(MeasureError::AlreadyRegistered(name));
        }

        if self.initialized {
            return Err(MeasureError::RegistrationClosed(name));
        }

        if !measurement.history().is_empty() {
            return Err(MeasureError::InvalidConfig(format!(
                "measurement '{}' already holds {} samples",
                name,
                measurement.history().len()
            )));
        }

        self.measurements.push(measurement);

        info!(measurement = %name, "Measurement registered");
        Ok(())
    }

    /// Observe the initial state. Must be called exactly once, before the
    /// first [`step`](Self::step).
    pub fn initialize(&mut self, state: &StateView<'_>) -> MeasureResult<()> {
        if self.poisoned {
            return Err(MeasureError::Poisoned);
        }
        if self.initialized {
            return Err(MeasureError::AlreadyInitialized);
        }

        self.timestep = 0;
        self.observe_all(state)?;
        self.initialized = true;

        info!(
            measurements = self.measurements.len(),
            "Measurements initialized"
        );
        Ok(())
    }

    /// Observe the state after one completed simulation step.
    pub fn step(&mut self, state: &StateView<'_>) -> MeasureResult<()> {
        if self.poisoned {
            return Err(MeasureError::Poisoned);
        }
        if !self.initialized {
            return Err(MeasureError::NotInitialized);
        }

        self.observe_all(state)?;
        self.timestep += 1;

        debug!(timestep = self.timestep, "Measurement step completed");
        Ok(())
    }

    /// Invoke every measurement once, in registration order.
    fn observe_all(&mut self, state: &StateView<'_>) -> MeasureResult<()> {
        let timestep = if self.initialized {
            self.timestep + 1
        } else {
            0
        };

        for index in 0..self.measurements.len() {
            if let Err(e) = self.observe_one(index, state, timestep) {
                self.poisoned = true;
                self.partial_round = matches!(e, MeasureError::Computation { .. });
                return Err(e);
            }
        }
        Ok(())
    }

    fn observe_one(
        &mut self,
        index: usize,
        state: &StateView<'_>,
        timestep: u64,
    ) -> MeasureResult<()> {
        let policy = self.policy;
        let measurement = &mut self.measurements[index];
        let before = measurement.history().len();

        if let Err(e) = measurement.measure(state) {
            match policy {
                ErrorPolicy::Fatal => {
                    return Err(MeasureError::Computation {
                        name: measurement.name().clone(),
                        timestep,
                        source: Box::new(e),
                    });
                }
                ErrorPolicy::SkipAndRecordNone => {
                    warn!(
                        measurement = %measurement.name(),
                        timestep = timestep,
                        error = %e,
                        "Measurement failed, recording no value"
                    );
                    if measurement.history().len() == before {
                        measurement.observe(None);
                    }
                }
            }
        }

        let recorded = measurement.history().len().saturating_sub(before);
        if recorded != 1 {
            return Err(MeasureError::ContractViolation {
                name: measurement.name().clone(),
                timestep,
                recorded,
            });
        }
        Ok(())
    }

    /// Merge every series into one result set.
    ///
    /// # Errors
    ///
    /// Returns [`MeasureError::Inconsistent`] if any series does not have
    /// one sample per observed timestep. After an interrupted round, one
    /// extra trailing sample is allowed and dropped.
    pub fn get_results(&self) -> MeasureResult<MeasurementResults> {
        let expected = self.observed_rounds();
        let tolerated = if self.partial_round {
            expected + 1
        } else {
            expected
        };

        let mut series = Vec::with_capacity(self.measurements.len());
        for measurement in &self.measurements {
            let history = measurement.history();
            if history.len() < expected || history.len() > tolerated {
                return Err(MeasureError::Inconsistent {
                    name: measurement.name().clone(),
                    expected,
                    actual: history.len(),
                });
            }
            series.push((measurement.name().clone(), history[..expected].to_vec()));
        }

        let timesteps = (0..expected as u64).collect();
        Ok(MeasurementResults::new(timesteps, series))
    }

    /// Number of observation rounds that completed successfully.
    fn observed_rounds(&self) -> usize {
        if self.initialized {
            self.timestep as usize + 1
        } else {
            0
        }
    }

    /// Number of completed simulation steps.
    pub fn timestep(&self) -> u64 {
        self.timestep
    }

    /// Whether the initial observation round has run.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Whether a fatal failure stopped the module.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// The error policy in effect.
    pub fn policy(&self) -> ErrorPolicy {
        self.policy
    }

    /// Get the number of registered measurements.
    pub fn len(&self) -> usize {
        self.measurements.len()
    }

    /// Check if no measurements are registered.
    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }

    /// Check if a measurement is registered.
    pub fn contains(&self, name: &MeasurementName) -> bool {
        self.measurements.iter().any(|m| m.name() == name)
    }

    /// Get a measurement by name.
    pub fn get(&self, name: &MeasurementName) -> Option<&dyn Measurement> {
        self.measurements
            .iter()
            .find(|m| m.name() == name)
            .map(|m| &**m)
    }

    /// Get all measurement names, in registration order.
    pub fn names(&self) -> Vec<MeasurementName> {
        self.measurements.iter().map(|m| m.name().clone()).collect()
    }

    /// Iterate over all measurements, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn Measurement> + '_ {
        self.measurements.iter().map(|m| &**m)
    }
}

/// Builder for constructing measurement modules.
#[derive(Default)]
pub struct MeasurementModuleBuilder {
    measurements: Vec<BoxedMeasurement>,
    policy: ErrorPolicy,
}

impl MeasurementModuleBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a measurement.
    pub fn with<M: Measurement + 'static>(mut self, measurement: M) -> Self {
        self.measurements.push(Box::new(measurement));
        self
    }

    /// Add a boxed measurement.
    pub fn with_boxed(mut self, measurement: BoxedMeasurement) -> Self {
        self.measurements.push(measurement);
        self
    }

    /// Set the error policy.
    pub fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Build the module.
    pub fn build(self) -> MeasureResult<MeasurementModule> {
        let mut module = MeasurementModule::with_policy(self.policy);
        for measurement in self.measurements {
            module.register_boxed(measurement)?;
        }
        Ok(module)
    }
}
