// fusion_core/src/models/measurement/radar.rs

use nalgebra::{DMatrix, DVector, Vector2};
use tracing::trace;

use crate::config::RadarNoise;
use crate::messages::SensorKind;
use crate::models::measurement::{weighted_mean, MeasurementModel};
use crate::state::StateVariable;
use crate::types::{SigmaWeights, StateVector, SIGMA_COUNT};
use crate::utils::angles::{normalize_angle, polar_to_cartesian};

/// Floor (m) applied to the range in the range-rate denominator.
/// A sigma point sitting on the sensor origin would otherwise divide by zero.
pub const MIN_RANGE: f64 = 1e-4;

/// Index of the bearing within the radar measurement vector.
const BEARING: usize = 1;

/// Nonlinear range/bearing/range-rate sensor located at the origin.
///
/// `z = [sqrt(px^2 + py^2), atan2(py, px), (px v cos(yaw) + py v sin(yaw)) / range]`
#[derive(Debug, Clone)]
pub struct RadarModel {
    pub noise: RadarNoise,
}

impl RadarModel {
    pub fn new(noise: RadarNoise) -> Self {
        Self { noise }
    }
}

impl MeasurementModel for RadarModel {
    fn kind(&self) -> SensorKind {
        SensorKind::Radar
    }

    fn noise_covariance(&self) -> DMatrix<f64> {
        DMatrix::from_diagonal(&DVector::from_vec(vec![
            self.noise.std_range.powi(2),
            self.noise.std_bearing.powi(2),
            self.noise.std_range_rate.powi(2),
        ]))
    }

    fn project(&self, x: &StateVector) -> DVector<f64> {
        let p_x = x[StateVariable::Px.index()];
        let p_y = x[StateVariable::Py.index()];
        let v = x[StateVariable::Speed.index()];
        let yaw = x[StateVariable::Yaw.index()];

        let range = p_x.hypot(p_y);
        let bearing = p_y.atan2(p_x);

        let denominator = if range < MIN_RANGE {
            trace!(range, "radar projection at near-zero range, clamping");
            MIN_RANGE
        } else {
            range
        };
        let range_rate = (p_x * v * yaw.cos() + p_y * v * yaw.sin()) / denominator;

        DVector::from_vec(vec![range, bearing, range_rate])
    }

    fn residual(&self, a: &DVector<f64>, b: &DVector<f64>) -> DVector<f64> {
        let mut diff = a - b;
        diff[BEARING] = normalize_angle(diff[BEARING]);
        diff
    }

    fn mean(&self, z_sigma: &DMatrix<f64>, weights: &SigmaWeights) -> DVector<f64> {
        let mut mean = weighted_mean(z_sigma, weights);

        // Average the bearings as offsets from the first point, so a cloud
        // straddling +-pi is not pulled towards zero.
        let reference = z_sigma[(BEARING, 0)];
        let offset: f64 = (0..SIGMA_COUNT)
            .map(|i| weights[i] * normalize_angle(z_sigma[(BEARING, i)] - reference))
            .sum();
        mean[BEARING] = normalize_angle(reference + offset);
        mean
    }

    fn initial_position(&self, z: &DVector<f64>) -> Vector2<f64> {
        let (x, y) = polar_to_cartesian(z[0], z[BEARING]);
        Vector2::new(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    const EPSILON: f64 = 1e-12;

    fn model() -> RadarModel {
        RadarModel::new(RadarNoise::default())
    }

    #[test]
    fn test_projection_of_receding_target() {
        // Target at (3, 4) moving radially away at 2 m/s.
        let yaw = 4.0_f64.atan2(3.0);
        let z = model().project(&StateVector::new(3.0, 4.0, 2.0, yaw, 0.0));
        assert_abs_diff_eq!(z[0], 5.0, epsilon = EPSILON);
        assert_abs_diff_eq!(z[1], yaw, epsilon = EPSILON);
        assert_abs_diff_eq!(z[2], 2.0, epsilon = EPSILON);
    }

    #[test]
    fn test_tangential_motion_has_zero_range_rate() {
        let z = model().project(&StateVector::new(0.0, 10.0, 3.0, 0.0, 0.0));
        assert_abs_diff_eq!(z[1], PI / 2.0, epsilon = EPSILON);
        assert_abs_diff_eq!(z[2], 0.0, epsilon = EPSILON);
    }

    #[test]
    fn test_zero_range_projection_is_finite() {
        let z = model().project(&StateVector::new(0.0, 0.0, 5.0, 0.3, 0.1));
        assert!(z.iter().all(|v| v.is_finite()), "got {}", z);
        assert_eq!(z[0], 0.0);

        let z = model().project(&StateVector::new(1e-9, -1e-9, 5.0, 0.3, 0.1));
        assert!(z.iter().all(|v| v.is_finite()), "got {}", z);
    }

    #[test]
    fn test_residual_wraps_bearing_only() {
        let a = DVector::from_vec(vec![10.0, 3.1, 1.0]);
        let b = DVector::from_vec(vec![4.0, -3.1, -1.0]);
        let d = model().residual(&a, &b);
        assert_abs_diff_eq!(d[0], 6.0, epsilon = EPSILON);
        assert_abs_diff_eq!(d[1], 6.2 - 2.0 * PI, epsilon = 1e-9);
        assert_abs_diff_eq!(d[2], 2.0, epsilon = EPSILON);
    }

    #[test]
    fn test_mean_bearing_across_the_seam() {
        // Bearings alternating just above -pi and just below pi.
        let mut z_sigma = DMatrix::zeros(3, SIGMA_COUNT);
        for i in 0..SIGMA_COUNT {
            z_sigma[(0, i)] = 10.0;
            z_sigma[(BEARING, i)] = if i % 2 == 0 { PI - 0.01 } else { -PI + 0.01 };
        }
        let weights = SigmaWeights::from_element(1.0 / SIGMA_COUNT as f64);

        let mean = model().mean(&z_sigma, &weights);
        assert_abs_diff_eq!(mean[0], 10.0, epsilon = EPSILON);
        // Eight points at pi - 0.01, seven at -pi + 0.01.
        let expected = PI - 0.01 + 7.0 * 0.02 / SIGMA_COUNT as f64;
        assert_abs_diff_eq!(normalize_angle(mean[BEARING] - expected), 0.0, epsilon = 1e-9);

        // The plain sum would land near zero.
        assert!(weighted_mean(&z_sigma, &weights)[BEARING].abs() < 0.5);
    }

    #[test]
    fn test_initial_position_from_polar() {
        let z = DVector::from_vec(vec![2.0, 0.0, 0.0]);
        let p = model().initial_position(&z);
        assert_abs_diff_eq!(p.x, 2.0, epsilon = EPSILON);
        assert_abs_diff_eq!(p.y, 0.0, epsilon = EPSILON);
    }

    #[test]
    fn test_boxed_models_clone() {
        let boxed: Box<dyn MeasurementModel> = Box::new(model());
        let cloned = boxed.clone();
        assert_eq!(cloned.kind(), SensorKind::Radar);
        assert_eq!(cloned.dim(), 3);
    }
}
