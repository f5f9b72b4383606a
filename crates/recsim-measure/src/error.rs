//! Error types for the measurement system.

use thiserror::Error;

use recsim_core::StateError;

use crate::measurement::MeasurementName;

/// Errors related to measurements and the measurement module.
#[derive(Debug, Error)]
pub enum MeasureError {
    /// A measurement with this name is already registered.
    #[error("Measurement already registered: {0}")]
    AlreadyRegistered(MeasurementName),

    /// The name is reserved for the timestep series.
    #[error("Measurement name '{0}' is reserved")]
    ReservedName(MeasurementName),

    /// Measurements can only be registered before the first observation.
    #[error("Cannot register '{0}': measurements were already initialized")]
    RegistrationClosed(MeasurementName),

    /// `initialize` was called twice.
    #[error("Measurements already initialized")]
    AlreadyInitialized,

    /// `step` was called before `initialize`.
    #[error("Measurements not initialized")]
    NotInitialized,

    /// A previous fatal failure left the series misaligned.
    #[error("Measurement module is poisoned by an earlier failure")]
    Poisoned,

    /// A measurement did not observe exactly once during one invocation.
    #[error(
        "Measurement '{name}' recorded {recorded} observations at timestep {timestep}, expected exactly 1"
    )]
    ContractViolation {
        /// The offending measurement.
        name: MeasurementName,
        /// Timestep of the invocation.
        timestep: u64,
        /// Number of samples the invocation appended.
        recorded: usize,
    },

    /// A measurement failed while computing its value.
    #[error("Measurement '{name}' failed at timestep {timestep}: {source}")]
    Computation {
        /// The failing measurement.
        name: MeasurementName,
        /// Timestep of the invocation.
        timestep: u64,
        /// Underlying failure.
        #[source]
        source: Box<MeasureError>,
    },

    /// Recorded series have diverging lengths.
    #[error("Series for '{name}' has {actual} samples, expected {expected}")]
    Inconsistent {
        /// The misaligned measurement.
        name: MeasurementName,
        /// Expected series length.
        expected: usize,
        /// Actual series length.
        actual: usize,
    },

    /// The state does not carry data this measurement requires.
    #[error("State is missing {field}")]
    MissingState {
        /// Description of the missing data.
        field: &'static str,
    },

    /// The state is malformed for this measurement.
    #[error("Invalid state: {0}")]
    InvalidState(#[from] StateError),

    /// Invalid measurement configuration.
    #[error("Invalid measurement configuration: {0}")]
    InvalidConfig(String),
}

impl MeasureError {
    /// Whether this error stops the measurement module for good.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            MeasureError::ContractViolation { .. }
                | MeasureError::Computation { .. }
                | MeasureError::Inconsistent { .. }
                | MeasureError::Poisoned
        )
    }
}

/// Result type for measurement operations.
pub type MeasureResult<T> = std::result::Result<T, MeasureError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_errors() {
        let violation = MeasureError::ContractViolation {
            name: MeasurementName::new("m"),
            timestep: 3,
            recorded: 2,
        };
        assert!(violation.is_fatal());
        assert_eq!(
            violation.to_string(),
            "Measurement 'm' recorded 2 observations at timestep 3, expected exactly 1"
        );

        assert!(!MeasureError::AlreadyRegistered(MeasurementName::new("m")).is_fatal());
        assert!(!MeasureError::NotInitialized.is_fatal());
    }

    #[test]
    fn test_state_error_conversion() {
        let err: MeasureError = StateError::UserOutOfRange {
            user: 4,
            num_users: 2,
        }
        .into();
        assert!(matches!(err, MeasureError::InvalidState(_)));
        assert!(!err.is_fatal());
    }
}
