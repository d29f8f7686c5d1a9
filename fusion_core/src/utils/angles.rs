// fusion_core/src/utils/angles.rs

use num_traits::{Float, FloatConst};

/// Wraps an angle into the half-open interval `(-pi, pi]`.
///
/// Non-finite inputs are returned unchanged so that the caller's finiteness
/// checks still see them.
pub fn normalize_angle<T: Float + FloatConst>(angle: T) -> T {
    if !angle.is_finite() {
        return angle;
    }
    let pi = T::PI();
    let two_pi = pi + pi;

    // `%` keeps the sign of the dividend, so this lands in (-2pi, 2pi).
    let wrapped = angle % two_pi;
    if wrapped > pi {
        wrapped - two_pi
    } else if wrapped <= -pi {
        wrapped + two_pi
    } else {
        wrapped
    }
}

/// Converts a polar `(range, bearing)` pair into Cartesian `(x, y)`.
pub fn polar_to_cartesian<T: Float>(range: T, bearing: T) -> (T, T) {
    (range * bearing.cos(), range * bearing.sin())
}
