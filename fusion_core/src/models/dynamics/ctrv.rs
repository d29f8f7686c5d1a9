// fusion_core/src/models/dynamics/ctrv.rs

use crate::config::ProcessNoise;
use crate::types::{
    AugmentedSigmaPoints, AugmentedVector, ProcessNoiseCovariance, SigmaPoints, StateVector,
    SIGMA_COUNT,
};

/// Below this yaw rate (rad/s) the straight-line limit of the turn integral is used.
pub const YAW_RATE_THRESHOLD: f64 = 1e-3;

/// Constant turn rate and velocity (CTRV) motion model.
///
/// The object moves with constant speed `v` along a circular arc of constant
/// yaw rate. Two process noise terms, longitudinal acceleration `nu_a` and
/// yaw acceleration `nu_yawdd`, are held constant over each interval and enter
/// through the augmented state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CtrvModel {
    pub process_noise: ProcessNoise,
}

impl CtrvModel {
    pub fn new(process_noise: ProcessNoise) -> Self {
        Self { process_noise }
    }

    /// Covariance `Q` of `[nu_a, nu_yawdd]`, placed on the augmented diagonal.
    pub fn noise_covariance(&self) -> ProcessNoiseCovariance {
        ProcessNoiseCovariance::new(
            self.process_noise.std_a.powi(2),
            0.0,
            0.0,
            self.process_noise.std_yawdd.powi(2),
        )
    }

    /// Propagates one augmented point `[px, py, v, yaw, yawd, nu_a, nu_yawdd]`
    /// over `dt` seconds and returns the resulting (non-augmented) state.
    ///
    /// The heading is NOT wrapped here; wrapping happens on residuals during
    /// recombination so that the cloud stays continuous.
    pub fn propagate(x_aug: &AugmentedVector, dt: f64) -> StateVector {
        let p_x = x_aug[0];
        let p_y = x_aug[1];
        let v = x_aug[2];
        let yaw = x_aug[3];
        let yawd = x_aug[4];
        let nu_a = x_aug[5];
        let nu_yawdd = x_aug[6];

        // --- Deterministic part ---
        let (mut px_p, mut py_p) = if yawd.abs() > YAW_RATE_THRESHOLD {
            let yaw_end = yaw + yawd * dt;
            (
                p_x + v / yawd * (yaw_end.sin() - yaw.sin()),
                p_y + v / yawd * (yaw.cos() - yaw_end.cos()),
            )
        } else {
            (p_x + v * dt * yaw.cos(), p_y + v * dt * yaw.sin())
        };
        let mut v_p = v;
        let mut yaw_p = yaw + yawd * dt;
        let mut yawd_p = yawd;

        // --- Noise contribution ---
        let half_dt2 = 0.5 * dt * dt;
        px_p += half_dt2 * nu_a * yaw.cos();
        py_p += half_dt2 * nu_a * yaw.sin();
        v_p += nu_a * dt;
        yaw_p += half_dt2 * nu_yawdd;
        yawd_p += nu_yawdd * dt;

        StateVector::new(px_p, py_p, v_p, yaw_p, yawd_p)
    }

    /// Runs every augmented sigma point through [`CtrvModel::propagate`].
    pub fn propagate_sigma_points(
        &self,
        augmented_points: &AugmentedSigmaPoints,
        dt: f64,
    ) -> SigmaPoints {
        let mut predicted = SigmaPoints::zeros();
        for i in 0..SIGMA_COUNT {
            let point: AugmentedVector = augmented_points.column(i).into_owned();
            predicted.set_column(i, &Self::propagate(&point, dt));
        }
        predicted
    }
}
