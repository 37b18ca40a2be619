//! Scalar helpers shared by the weather and conditions models.

/// Clamp to `[0, 1]`. NaN maps to 0.
pub fn saturate(value: f64) -> f64 {
    if value > 0.0 {
        value.min(1.0)
    } else {
        0.0
    }
}

/// Linear interpolation from `from` (t = 0) to `to` (t = 1).
pub fn lerp(t: f64, from: f64, to: f64) -> f64 {
    (1.0 - t) * from + t * to
}

/// Position of `value` inside `[from, to]`, saturated.
pub fn lerp_inv_sat(value: f64, from: f64, to: f64) -> f64 {
    saturate((value - from) / (to - from))
}

/// Hermite smooth-step `3x² − 2x³` for a saturated input.
/// Zero slope at both ends, so interpolated values never jump at a boundary.
pub fn smooth_step(x: f64) -> f64 {
    x * x * (3.0 - 2.0 * x)
}
