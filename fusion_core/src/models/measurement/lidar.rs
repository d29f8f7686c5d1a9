// fusion_core/src/models/measurement/lidar.rs

use nalgebra::{DMatrix, DVector, Vector2};

use crate::config::LidarNoise;
use crate::messages::SensorKind;
use crate::models::measurement::MeasurementModel;
use crate::state::StateVariable;
use crate::types::StateVector;

/// Linear positional sensor: `z = [px, py]`.
#[derive(Debug, Clone)] // Make sure it's cloneable for the dyn-clone
pub struct LidarModel {
    pub noise: LidarNoise,
}

impl LidarModel {
    pub fn new(noise: LidarNoise) -> Self {
        Self { noise }
    }
}

impl MeasurementModel for LidarModel {
    fn kind(&self) -> SensorKind {
        SensorKind::Lidar
    }

    fn noise_covariance(&self) -> DMatrix<f64> {
        DMatrix::from_diagonal(&DVector::from_vec(vec![
            self.noise.std_px.powi(2),
            self.noise.std_py.powi(2),
        ]))
    }

    fn project(&self, x: &StateVector) -> DVector<f64> {
        // Identity on the position, velocity and heading are unobserved.
        DVector::from_vec(vec![
            x[StateVariable::Px.index()],
            x[StateVariable::Py.index()],
        ])
    }

    fn initial_position(&self, z: &DVector<f64>) -> Vector2<f64> {
        Vector2::new(z[0], z[1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SigmaPoints, SIGMA_COUNT};
    use approx::assert_abs_diff_eq;

    fn model() -> LidarModel {
        LidarModel::new(LidarNoise::default())
    }

    #[test]
    fn test_projection_drops_unobserved_states() {
        let z = model().project(&StateVector::new(1.5, -2.0, 7.0, 0.3, 0.1));
        assert_eq!(z.len(), 2);
        assert_eq!(z[0], 1.5);
        assert_eq!(z[1], -2.0);
    }

    #[test]
    fn test_noise_covariance_is_diagonal_variance() {
        let r = model().noise_covariance();
        assert_abs_diff_eq!(r[(0, 0)], 0.0225, epsilon = 1e-12);
        assert_abs_diff_eq!(r[(1, 1)], 0.0225, epsilon = 1e-12);
        assert_eq!(r[(0, 1)], 0.0);
    }

    #[test]
    fn test_noise_covariance_is_fresh_each_call() {
        let lidar = model();
        let mut first = lidar.noise_covariance();
        first[(0, 0)] = 99.0;
        assert_abs_diff_eq!(lidar.noise_covariance()[(0, 0)], 0.0225, epsilon = 1e-12);
    }

    #[test]
    fn test_project_sigma_points_shape() {
        let points = SigmaPoints::from_fn(|r, c| (r * 100 + c) as f64);
        let projected = model().project_sigma_points(&points);
        assert_eq!(projected.shape(), (2, SIGMA_COUNT));
        assert_eq!(projected[(1, 4)], 104.0);
    }

    #[test]
    fn test_residual_is_plain_difference() {
        let a = DVector::from_vec(vec![4.0, 1.0]);
        let b = DVector::from_vec(vec![1.0, 5.0]);
        let d = model().residual(&a, &b);
        assert_eq!(d.as_slice(), &[3.0, -4.0]);
    }
}
