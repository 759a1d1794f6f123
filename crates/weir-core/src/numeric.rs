//! Numeric tolerance helpers.
//!
//! Every quantity the kernel carries between steps (remaining capacity,
//! remaining work, solved shares) is snapped to exactly zero once it drops
//! below [`EPSILON`], so floating-point drift never shows up as a tiny
//! positive rate or a never-finishing action.

/// Absolute tolerance used throughout the kernel.
pub const EPSILON: f64 = 1e-5;

/// Subtract `amount` from `value`, snapping the result to zero below
/// [`EPSILON`].
pub fn double_update(value: &mut f64, amount: f64) {
    *value -= amount;
    if *value < EPSILON {
        *value = 0.0;
    }
}

/// Whether `value` is meaningfully positive.
pub fn double_positive(value: f64) -> bool {
    value > EPSILON
}

/// `value`, or zero when it is below [`EPSILON`].
pub fn snap(value: f64) -> f64 {
    if value < EPSILON {
        0.0
    } else {
        value
    }
}
