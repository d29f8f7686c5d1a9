// fusion_core/src/state.rs

use nalgebra::Vector2;

use crate::types::{StateCovariance, StateVector, Timestamp, STATE_DIM};
use crate::utils::angles::normalize_angle;

/// Every variable of the CTRV state vector, in layout order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateVariable {
    /// Position along x in m.
    Px,
    /// Position along y in m.
    Py,
    /// Speed along the heading in m/s.
    Speed,
    /// Heading in rad, kept in (-pi, pi].
    Yaw,
    /// Heading rate in rad/s.
    YawRate,
}

impl StateVariable {
    /// The ordered schema of the state vector.
    pub const LAYOUT: [StateVariable; STATE_DIM] = [
        StateVariable::Px,
        StateVariable::Py,
        StateVariable::Speed,
        StateVariable::Yaw,
        StateVariable::YawRate,
    ];

    /// Index of this variable in the state vector.
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// The filter's belief: mean, covariance and the time they refer to.
#[derive(Debug, Clone, PartialEq)]
pub struct CtrvState {
    /// The mean `x = [px, py, v, yaw, yaw_rate]`.
    pub vector: StateVector,
    /// The covariance matrix `P`.
    pub covariance: StateCovariance,
    /// The timestamp of the last processed measurement, in microseconds.
    pub last_update_timestamp: Timestamp,
}

impl CtrvState {
    pub fn new(vector: StateVector, covariance: StateCovariance, timestamp: Timestamp) -> Self {
        Self {
            vector,
            covariance,
            last_update_timestamp: timestamp,
        }
    }

    pub fn get(&self, var: StateVariable) -> f64 {
        self.vector[var.index()]
    }

    /// Cartesian velocity `(v cos(yaw), v sin(yaw))`.
    pub fn velocity(&self) -> Vector2<f64> {
        let v = self.get(StateVariable::Speed);
        let yaw = self.get(StateVariable::Yaw);
        Vector2::new(v * yaw.cos(), v * yaw.sin())
    }

    pub fn is_finite(&self) -> bool {
        self.vector.iter().all(|v| v.is_finite()) && self.covariance.iter().all(|v| v.is_finite())
    }

    /// Wraps the heading and forces `P` symmetric.
    /// Tiny numerical errors can make P slightly non-symmetric, which would
    /// eventually break the Cholesky factorization in the predictor.
    pub(crate) fn tidy(&mut self) {
        let yaw = StateVariable::Yaw.index();
        self.vector[yaw] = normalize_angle(self.vector[yaw]);
        self.covariance = (self.covariance + self.covariance.transpose()) * 0.5;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_layout_matches_indices() {
        for (i, var) in StateVariable::LAYOUT.iter().enumerate() {
            assert_eq!(var.index(), i);
        }
    }

    #[test]
    fn test_velocity_components() {
        let state = CtrvState::new(
            StateVector::new(0.0, 0.0, 2.0, PI / 2.0, 0.0),
            StateCovariance::identity(),
            0,
        );
        let vel = state.velocity();
        assert_abs_diff_eq!(vel.x, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(vel.y, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_tidy_wraps_yaw_and_symmetrizes() {
        let mut covariance = StateCovariance::identity();
        covariance[(0, 1)] = 0.2;
        covariance[(1, 0)] = 0.4;
        let mut state = CtrvState::new(StateVector::new(0.0, 0.0, 1.0, 4.0, 0.0), covariance, 0);
        state.tidy();

        assert_abs_diff_eq!(state.get(StateVariable::Yaw), 4.0 - 2.0 * PI, epsilon = 1e-12);
        assert_abs_diff_eq!(state.covariance[(0, 1)], 0.3, epsilon = 1e-12);
        assert_eq!(state.covariance, state.covariance.transpose());
    }
}
