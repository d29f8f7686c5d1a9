// fusion_core/src/error.rs

use crate::messages::SensorKind;
use crate::types::Timestamp;
use thiserror::Error;

/// Everything that can go wrong while configuring or running the filter.
///
/// Numerical failures abort the current measurement cycle only; the filter
/// keeps its last good estimate and the caller may continue with the next
/// measurement.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    // --- Configuration ---
    #[error("invalid filter configuration: `{field}` {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    // --- Numerical divergence ---
    #[error("augmented covariance is not positive definite, the filter has diverged")]
    CovarianceNotPositiveDefinite,

    #[error("innovation covariance for the {sensor} update is singular")]
    SingularInnovationCovariance { sensor: SensorKind },

    #[error("the {sensor} update produced a non-finite state estimate")]
    NonFiniteState { sensor: SensorKind },

    // --- Input ---
    #[error("{kind} measurement expects {expected} values, got {got}")]
    MalformedMeasurement {
        kind: SensorKind,
        expected: usize,
        got: usize,
    },

    #[error("{kind} measurement contains a non-finite value")]
    NonFiniteMeasurement { kind: SensorKind },

    #[error("measurement at {current_us} us is older than the filter time {previous_us} us")]
    TimestampRegression {
        previous_us: Timestamp,
        current_us: Timestamp,
    },

    #[error("time step from {previous_us} us to {current_us} us overflows")]
    TimestampOverflow {
        previous_us: Timestamp,
        current_us: Timestamp,
    },
}
