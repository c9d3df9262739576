//! Scaled Euclidean norms.
//!
//! Squaring components overflows past ~1e154 and underflows below ~1e-154,
//! so every norm here divides by the largest component magnitude first.

use nalgebra::{SVector, Unit};

/// Euclidean norm computed without intermediate overflow or underflow.
///
/// Returns NaN if any component is NaN and infinity if any is infinite.
pub(crate) fn stable_norm<const D: usize>(v: &SVector<f64, D>) -> f64 {
    if v.iter().any(|c| c.is_nan()) {
        return f64::NAN;
    }
    let scale = v.amax();
    if scale.is_infinite() || scale <= 0.0 {
        return scale;
    }
    (v / scale).norm() * scale
}

/// Unit vector along `v`, or `None` if `v` is zero or has a non-finite component.
pub(crate) fn unit_direction<const D: usize>(v: &SVector<f64, D>) -> Option<Unit<SVector<f64, D>>> {
    if !v.iter().all(|c| c.is_finite()) {
        return None;
    }
    let scale = v.amax();
    if scale <= 0.0 {
        return None;
    }
    // The largest scaled component is 1, so the norm lies in [1, sqrt(D)]
    Unit::try_new(v / scale, 0.0)
}
