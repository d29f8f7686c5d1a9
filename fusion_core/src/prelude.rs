// fusion_core/src/prelude.rs

// --- Core Abstractions (The main contracts of the library) ---
pub use crate::estimation::{ProcessOutcome, StateEstimator};
pub use crate::messages::{MeasurementData, MeasurementMessage, SensorKind};
pub use crate::models::measurement::MeasurementModel;

// --- Core Data Structures ---
pub use crate::config::{LidarNoise, ProcessNoise, RadarNoise, UkfConfig};
pub use crate::error::FilterError;
pub use crate::state::{CtrvState, StateVariable};
pub use crate::types::{StateCovariance, StateVector, Timestamp};

// --- Estimation Algorithms ---
pub use crate::estimation::filters::ukf::UnscentedKalmanFilter;
pub use crate::estimation::nis::{NisDiagnostics, NisThresholds};

// --- Concrete Model Implementations ---
pub use crate::models::dynamics::ctrv::CtrvModel;
pub use crate::models::measurement::lidar::LidarModel;
pub use crate::models::measurement::radar::RadarModel;
