//! Floating-point helpers shared by the symbolizer and metric evaluator.
//!
//! Every metric in [`crate::metrics`] divides by a quantity that can legitimately
//! be zero (an empty `present`, a pattern with zero frequency in a degenerate
//! ensemble, ...). Centralizing the NaN/infinity guard here keeps that
//! bookkeeping out of the formulas themselves.

/// Replace a non-finite f64 with `default`.
pub fn safe_f64(value: f64, default: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        log::warn!("non-finite f64 {:?} replaced with {}", value, default);
        default
    }
}

/// Division that never produces NaN/inf: falls back to `default` when the
/// denominator is zero or non-finite, or when the result would be non-finite.
pub fn safe_divide(numerator: f64, denominator: f64, default: f64) -> f64 {
    if denominator == 0.0 || !denominator.is_finite() {
        default
    } else {
        safe_f64(numerator / denominator, default)
    }
}

/// Clamp a possibly non-finite value into `[min, max]`, substituting the
/// midpoint for NaN/infinity before clamping.
pub fn clamp_f64(value: f64, min: f64, max: f64) -> f64 {
    safe_f64(value, (min + max) / 2.0).clamp(min, max)
}

/// Canonical big-endian byte serialization of a 768-dim vector, used as the
/// symbolizer's hash input (§4.1). NaN is canonicalized to a single fixed bit
/// pattern first so two NaN-bearing vectors that differ only in NaN payload
/// hash identically, and the encoding is platform-endianness-independent.
pub fn canonical_float_bytes(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vector.len() * 4);
    for &component in vector {
        let canonical = if component.is_nan() {
            f32::NAN.to_bits() // a single fixed NaN bit pattern
        } else {
            component.to_bits()
        };
        bytes.extend_from_slice(&canonical.to_be_bytes());
    }
    bytes
}
