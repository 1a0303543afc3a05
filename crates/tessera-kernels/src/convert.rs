//! Half-precision conversion rules.
//!
//! f16 values cannot be added directly: both operands are widened to f32,
//! added, and the sum narrowed back. Widening is exact. Narrowing is IEEE 754
//! round-to-nearest, ties-to-even, with overflow going to ±inf and NaN kept
//! as NaN.

use half::f16;

/// Widen an f16 to f32. Exact for every f16 value.
#[inline]
pub fn widen(x: f16) -> f32 {
    x.to_f32()
}

/// Narrow an f32 to f16 with round-to-nearest-even.
#[inline]
pub fn narrow(x: f32) -> f16 {
    f16::from_f32(x)
}
