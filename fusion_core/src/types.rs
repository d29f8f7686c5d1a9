// fusion_core/src/types.rs

use nalgebra::{Matrix2, SMatrix, SVector};

// --- Dimensions ---
/// Dimension of the CTRV state `[px, py, v, yaw, yaw_rate]`.
pub const STATE_DIM: usize = 5;
/// State dimension plus the two process noise terms (`nu_a`, `nu_yawdd`).
pub const AUGMENTED_DIM: usize = STATE_DIM + 2;
/// Number of sigma points generated from the augmented state.
pub const SIGMA_COUNT: usize = 2 * AUGMENTED_DIM + 1;

// --- Core Type Aliases ---
pub type StateVector = SVector<f64, STATE_DIM>;
pub type StateCovariance = SMatrix<f64, STATE_DIM, STATE_DIM>;
pub type AugmentedVector = SVector<f64, AUGMENTED_DIM>;
pub type AugmentedCovariance = SMatrix<f64, AUGMENTED_DIM, AUGMENTED_DIM>;
pub type AugmentedSigmaPoints = SMatrix<f64, AUGMENTED_DIM, SIGMA_COUNT>;
/// Sigma points after propagation, one column per point, in state space.
pub type SigmaPoints = SMatrix<f64, STATE_DIM, SIGMA_COUNT>;
pub type SigmaWeights = SVector<f64, SIGMA_COUNT>;
/// Covariance of the two process noise terms.
pub type ProcessNoiseCovariance = Matrix2<f64>;

/// Measurement time in microseconds.
pub type Timestamp = i64;

/// Microseconds per second, for converting timestamp differences to `dt`.
pub const MICROS_PER_SECOND: f64 = 1_000_000.0;
