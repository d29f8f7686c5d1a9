// fusion_sim/src/prelude.rs

// Re-export the entire fusion_core prelude so you can easily access
// pure types like `UnscentedKalmanFilter`, `MeasurementMessage`, etc.
pub use fusion_core::prelude::*;

// Re-export common simulation-specific types.
pub use crate::simulation::config::{ConfigError, ScenarioConfig};
pub use crate::simulation::metrics::{NisStats, NisSummary, RmseAccumulator};
pub use crate::simulation::prng::SimulationRng;
pub use crate::simulation::replay::{load_log, parse_log, ReplayError};
pub use crate::simulation::runner::{
    generate_measurements, run_filter, run_replay, run_scenario, RunReport, SimulationError,
};
pub use crate::simulation::truth::{to_cartesian, CartesianTruth, GroundTruth, LabeledMeasurement};
