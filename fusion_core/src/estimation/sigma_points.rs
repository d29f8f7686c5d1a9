// fusion_core/src/estimation/sigma_points.rs

//! Pure building blocks of the unscented transform: augmentation, sigma point
//! generation, weights and recombination. Nothing in here holds state.

use nalgebra::{Cholesky, DVector};

use crate::error::FilterError;
use crate::state::StateVariable;
use crate::types::{
    AugmentedCovariance, AugmentedSigmaPoints, AugmentedVector, ProcessNoiseCovariance,
    SigmaPoints, SigmaWeights, StateCovariance, StateVector, AUGMENTED_DIM, SIGMA_COUNT,
    STATE_DIM,
};
use crate::utils::angles::normalize_angle;

/// Sigma point spreading parameter `lambda = 3 - n`.
pub fn spreading_parameter(n: usize) -> f64 {
    3.0 - n as f64
}

/// Weights for `2n+1` sigma points with spreading parameter `lambda`:
/// `w0 = lambda / (lambda + n)`, `wi = 1 / (2 (lambda + n))`.
///
/// They always sum to one. `lambda + n` must be non-zero.
pub fn weights_for(lambda: f64, n: usize) -> DVector<f64> {
    let denom = lambda + n as f64;
    let mut weights = DVector::from_element(2 * n + 1, 0.5 / denom);
    weights[0] = lambda / denom;
    weights
}

/// The weights used by the filter (augmented dimension, `lambda = 3 - n`).
pub fn sigma_weights() -> SigmaWeights {
    let lambda = spreading_parameter(AUGMENTED_DIM);
    SigmaWeights::from_column_slice(weights_for(lambda, AUGMENTED_DIM).as_slice())
}

/// Appends the two zero-mean process noise terms to the state.
///
/// The state covariance fills the top-left block and `q` the bottom-right
/// 2x2 block; the cross terms are zero.
pub fn augment(
    x: &StateVector,
    p: &StateCovariance,
    q: &ProcessNoiseCovariance,
) -> (AugmentedVector, AugmentedCovariance) {
    let mut x_aug = AugmentedVector::zeros();
    x_aug.fixed_rows_mut::<STATE_DIM>(0).copy_from(x);

    let mut p_aug = AugmentedCovariance::zeros();
    p_aug
        .fixed_view_mut::<STATE_DIM, STATE_DIM>(0, 0)
        .copy_from(p);
    p_aug
        .fixed_view_mut::<2, 2>(STATE_DIM, STATE_DIM)
        .copy_from(q);

    (x_aug, p_aug)
}

/// Generates the `2n+1` augmented sigma points:
/// the mean, then `mean + sqrt(lambda + n) * L_i` and `mean - sqrt(lambda + n) * L_i`
/// for every column `L_i` of the lower Cholesky factor of `p_aug`.
///
/// Fails if `p_aug` is not positive definite, which means the filter has diverged.
pub fn generate_augmented_sigma_points(
    x_aug: &AugmentedVector,
    p_aug: &AugmentedCovariance,
) -> Result<AugmentedSigmaPoints, FilterError> {
    if !p_aug.iter().all(|v| v.is_finite()) {
        return Err(FilterError::CovarianceNotPositiveDefinite);
    }

    // Cholesky decomposition: P = L * L^T
    // This gives us a "square root" of the covariance matrix.
    let l_matrix = Cholesky::new(*p_aug)
        .ok_or(FilterError::CovarianceNotPositiveDefinite)?
        .l();

    let n = AUGMENTED_DIM;
    let scale = (spreading_parameter(n) + n as f64).sqrt();

    let mut sigma_points = AugmentedSigmaPoints::zeros();
    // First point is the mean.
    sigma_points.set_column(0, x_aug);

    // The other 2n points are spread around the mean.
    for i in 0..n {
        let offset = l_matrix.column(i) * scale;
        sigma_points.set_column(i + 1, &(x_aug + offset));
        sigma_points.set_column(i + 1 + n, &(x_aug - offset));
    }

    Ok(sigma_points)
}

/// `a - b` in state space with the heading difference wrapped into (-pi, pi].
pub fn state_residual(a: &StateVector, b: &StateVector) -> StateVector {
    let yaw = StateVariable::Yaw.index();
    let mut diff = a - b;
    diff[yaw] = normalize_angle(diff[yaw]);
    diff
}

/// Recombines propagated sigma points into a predicted mean and covariance.
///
/// Heading residuals are wrapped before forming the outer products, so
/// points straddling +-pi are not averaged naively.
pub fn predict_mean_and_covariance(
    sigma_points: &SigmaPoints,
    weights: &SigmaWeights,
) -> (StateVector, StateCovariance) {
    // Predicted mean: x_pred = sum(w_i * X_i)
    let mean: StateVector = sigma_points * weights;

    // Predicted covariance: P_pred = sum(w_i * (X_i - x_pred) * (X_i - x_pred)^T)
    let mut covariance = StateCovariance::zeros();
    for i in 0..SIGMA_COUNT {
        let point: StateVector = sigma_points.column(i).into_owned();
        let diff = state_residual(&point, &mean);
        covariance += weights[i] * diff * diff.transpose();
    }

    (mean, covariance)
}
