// fusion_sim/src/simulation/truth.rs

use fusion_core::messages::MeasurementMessage;
use fusion_core::models::dynamics::ctrv::CtrvModel;
use fusion_core::state::StateVariable;
use fusion_core::types::{AugmentedVector, StateVector, STATE_DIM};
use fusion_core::utils::angles::normalize_angle;
use nalgebra::Vector4;
use rand_distr::{Distribution, Normal};

use crate::simulation::config::{ConfigError, TruthConfig};
use crate::simulation::prng::SimulationRng;

/// Reference kinematics `[px, py, vx, vy]` a filter estimate is scored against.
pub type CartesianTruth = Vector4<f64>;

/// Converts a CTRV state into `[px, py, v cos(yaw), v sin(yaw)]`.
pub fn to_cartesian(x: &StateVector) -> CartesianTruth {
    let v = x[StateVariable::Speed.index()];
    let yaw = x[StateVariable::Yaw.index()];
    Vector4::new(
        x[StateVariable::Px.index()],
        x[StateVariable::Py.index()],
        v * yaw.cos(),
        v * yaw.sin(),
    )
}

/// A measurement together with the true kinematics at its timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledMeasurement {
    pub message: MeasurementMessage,
    pub truth: CartesianTruth,
}

/// The simulated target. Moves along a CTRV trajectory whose accelerations
/// are a configured constant plus Gaussian jitter drawn once per step.
#[derive(Debug, Clone)]
pub struct GroundTruth {
    state: StateVector,
    acceleration: f64,
    yaw_acceleration: f64,
    accel_noise: Normal<f64>,
    yaw_accel_noise: Normal<f64>,
}

impl GroundTruth {
    pub fn new(config: &TruthConfig) -> Result<Self, ConfigError> {
        let noise = |field: &'static str, std: f64| {
            Normal::new(0.0, std).map_err(|e| ConfigError::Invalid {
                field,
                reason: e.to_string(),
            })
        };

        let mut state = StateVector::from_column_slice(&config.initial_state);
        let yaw = StateVariable::Yaw.index();
        state[yaw] = normalize_angle(state[yaw]);

        Ok(Self {
            state,
            acceleration: config.acceleration,
            yaw_acceleration: config.yaw_acceleration,
            accel_noise: noise("truth.std_a", config.std_a)?,
            yaw_accel_noise: noise("truth.std_yawdd", config.std_yawdd)?,
        })
    }

    pub fn state(&self) -> &StateVector {
        &self.state
    }

    pub fn cartesian(&self) -> CartesianTruth {
        to_cartesian(&self.state)
    }

    /// Moves the target forward by `dt` seconds.
    pub fn advance(&mut self, dt: f64, rng: &mut SimulationRng) {
        if dt <= 0.0 {
            return;
        }
        let nu_a = self.acceleration + self.accel_noise.sample(&mut rng.0);
        let nu_yawdd = self.yaw_acceleration + self.yaw_accel_noise.sample(&mut rng.0);

        let mut x_aug = AugmentedVector::zeros();
        x_aug.fixed_rows_mut::<STATE_DIM>(0).copy_from(&self.state);
        x_aug[STATE_DIM] = nu_a;
        x_aug[STATE_DIM + 1] = nu_yawdd;

        self.state = CtrvModel::propagate(&x_aug, dt);
        let yaw = StateVariable::Yaw.index();
        self.state[yaw] = normalize_angle(self.state[yaw]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    fn truth(initial_state: [f64; 5]) -> GroundTruth {
        GroundTruth::new(&TruthConfig {
            initial_state,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_noise_free_circle_returns_to_start() {
        // 1 rad/s at 2 m/s: radius 2, period 2pi seconds.
        let mut target = truth([0.0, 0.0, 2.0, 0.0, 1.0]);
        let mut rng = SimulationRng::new(Some(0));
        let steps = 1000;
        for _ in 0..steps {
            target.advance(2.0 * PI / steps as f64, &mut rng);
        }
        let x = target.state();
        assert_abs_diff_eq!(x[0], 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(x[1], 0.0, epsilon = 1e-9);
        assert!(x[3] > -PI && x[3] <= PI);
    }

    #[test]
    fn test_constant_acceleration_speeds_up() {
        let mut target = GroundTruth::new(&TruthConfig {
            initial_state: [0.0, 0.0, 1.0, 0.0, 0.0],
            acceleration: 0.5,
            ..Default::default()
        })
        .unwrap();
        let mut rng = SimulationRng::new(Some(0));
        for _ in 0..10 {
            target.advance(0.1, &mut rng);
        }
        assert_abs_diff_eq!(target.state()[2], 1.5, epsilon = 1e-12);
        // x = v0 t + a t^2 / 2
        assert_abs_diff_eq!(target.state()[0], 1.25, epsilon = 1e-12);
    }

    #[test]
    fn test_cartesian_velocity() {
        let c = to_cartesian(&StateVector::new(1.0, 2.0, 2.0, PI / 2.0, 0.0));
        assert_abs_diff_eq!(c[0], 1.0);
        assert_abs_diff_eq!(c[1], 2.0);
        assert_abs_diff_eq!(c[2], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(c[3], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_same_seed_same_trajectory() {
        let config = TruthConfig {
            std_a: 0.5,
            std_yawdd: 0.2,
            ..Default::default()
        };
        let run = || {
            let mut target = GroundTruth::new(&config).unwrap();
            let mut rng = SimulationRng::new(Some(9));
            for _ in 0..50 {
                target.advance(0.05, &mut rng);
            }
            *target.state()
        };
        assert_eq!(run(), run());
    }
}
