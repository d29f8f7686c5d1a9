// fusion_core/src/models/measurement/mod.rs

use dyn_clone::DynClone;
use nalgebra::{DMatrix, DVector, Vector2};
use std::fmt::Debug;

use crate::messages::SensorKind;
use crate::types::{SigmaPoints, SigmaWeights, StateVector, SIGMA_COUNT};

// --- MEASUREMENT MODEL TRAIT ---
// Represents the mathematical model of a sensor. `z = h(x) + v`
/// One update strategy of the filter. Each sensor kind supplies its own
/// projection into measurement space and its own residual arithmetic; the
/// shared UKF update routine never branches on the sensor kind.
pub trait MeasurementModel: DynClone + Debug + Send + Sync {
    /// The sensor this model handles.
    fn kind(&self) -> SensorKind;

    /// Number of components in the measurement vector `z`.
    fn dim(&self) -> usize {
        self.kind().measurement_dim()
    }

    /// Builds the measurement noise covariance matrix `R`.
    /// A fresh matrix is returned on every call.
    fn noise_covariance(&self) -> DMatrix<f64>;

    /// Predicts the ideal measurement `z_pred = h(x)` for one state.
    fn project(&self, x: &StateVector) -> DVector<f64>;

    /// Difference `a - b` of two measurement-space vectors, with any angular
    /// components wrapped into (-pi, pi].
    fn residual(&self, a: &DVector<f64>, b: &DVector<f64>) -> DVector<f64> {
        a - b
    }

    /// Weighted mean of projected sigma points, one column per point.
    /// Models with angular components override this to average across the
    /// +-pi seam correctly.
    fn mean(&self, z_sigma: &DMatrix<f64>, weights: &SigmaWeights) -> DVector<f64> {
        weighted_mean(z_sigma, weights)
    }

    /// Position `(px, py)` implied by a single measurement, used to seed the
    /// state on the very first measurement.
    fn initial_position(&self, z: &DVector<f64>) -> Vector2<f64>;

    /// Projects every predicted sigma point, one column per point.
    fn project_sigma_points(&self, sigma_points: &SigmaPoints) -> DMatrix<f64> {
        let mut projected = DMatrix::zeros(self.dim(), SIGMA_COUNT);
        for i in 0..SIGMA_COUNT {
            let x: StateVector = sigma_points.column(i).into_owned();
            projected.set_column(i, &self.project(&x));
        }
        projected
    }
}

/// Plain weighted sum of the columns of `z_sigma`.
pub fn weighted_mean(z_sigma: &DMatrix<f64>, weights: &SigmaWeights) -> DVector<f64> {
    let mut mean = DVector::zeros(z_sigma.nrows());
    for i in 0..SIGMA_COUNT {
        mean += weights[i] * z_sigma.column(i);
    }
    mean
}

// This macro automatically generates the implementation of `Clone` for `Box<dyn MeasurementModel>`.
dyn_clone::clone_trait_object!(MeasurementModel);

pub mod lidar;
pub mod radar;
