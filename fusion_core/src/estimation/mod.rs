// fusion_core/src/estimation/mod.rs

use crate::error::FilterError;
use crate::messages::{MeasurementMessage, SensorKind};
use crate::state::CtrvState;

/// What a single call to [`StateEstimator::process`] did with its input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProcessOutcome {
    /// First accepted measurement: the state was seeded, no predict/update ran.
    Initialized,
    /// A full predict + update cycle ran and was committed.
    Updated { sensor: SensorKind, nis: f64 },
    /// The measurement came from a disabled sensor and was dropped.
    Ignored,
}

/// The contract for any algorithm that performs the "State Estimator" role.
/// Its sole responsibility is to estimate the state of a single tracked object.
pub trait StateEstimator: Send + Sync {
    /// The single, unified method for processing measurements.
    ///
    /// On `Err` the estimator's state is exactly what it was before the call.
    fn process(&mut self, message: &MeasurementMessage) -> Result<ProcessOutcome, FilterError>;

    /// Returns the current best estimate, or `None` before initialization.
    fn get_state(&self) -> Option<&CtrvState>;
}

pub mod filters;
pub mod nis;
pub mod sigma_points;
