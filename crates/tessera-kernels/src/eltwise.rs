//! Elementwise addition over flat buffers.
//!
//! One kernel per encoding. Kernels see only slices: no shapes, tiles or
//! accelerator state, which is what lets the executor swap them per backend.

use half::f16;
use tessera_core::{Result, TesseraError};

use crate::convert::{narrow, widen};

fn check_lengths(a: usize, b: usize, out: usize) -> Result<()> {
    if a != out || b != out {
        return Err(TesseraError::ShapeMismatch {
            expected: vec![out],
            got: vec![a, b],
        });
    }
    Ok(())
}

/// Full precision: out[i] = a[i] + b[i]
pub fn add_f32(a: &[f32], b: &[f32], out: &mut [f32]) -> Result<()> {
    check_lengths(a.len(), b.len(), out.len())?;
    for ((o, &x), &y) in out.iter_mut().zip(a).zip(b) {
        *o = x + y;
    }
    Ok(())
}

/// Half precision: out[i] = narrow(widen(a[i]) + widen(b[i]))
pub fn add_f16(a: &[f16], b: &[f16], out: &mut [f16]) -> Result<()> {
    check_lengths(a.len(), b.len(), out.len())?;
    for ((o, &x), &y) in out.iter_mut().zip(a).zip(b) {
        *o = narrow(widen(x) + widen(y));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_f32() {
        let a = [1.0, 2.0, 3.0];
        let b = [4.0, 5.0, 6.0];
        let mut c = [0.0f32; 3];
        add_f32(&a, &b, &mut c).unwrap();
        assert_eq!(c, [5.0, 7.0, 9.0]);
    }

    #[test]
    fn test_add_f16() {
        let a: Vec<f16> = [1.0f32, 2.5, -3.0].iter().map(|&v| f16::from_f32(v)).collect();
        let b: Vec<f16> = [0.5f32, 0.25, 3.0].iter().map(|&v| f16::from_f32(v)).collect();
        let mut c = vec![f16::ZERO; 3];
        add_f16(&a, &b, &mut c).unwrap();
        let c: Vec<f32> = c.iter().map(|h| h.to_f32()).collect();
        assert_eq!(c, vec![1.5, 2.75, 0.0]);
    }

    #[test]
    fn test_add_f16_rounds_the_sum() {
        // 2048 + 1 is not representable in f16; the tie rounds to even.
        let a = [f16::from_f32(2048.0)];
        let b = [f16::from_f32(1.0)];
        let mut c = [f16::ZERO];
        add_f16(&a, &b, &mut c).unwrap();
        assert_eq!(c[0].to_f32(), 2048.0);
    }

    #[test]
    fn test_length_mismatch() {
        let mut out = [0.0f32; 2];
        assert!(matches!(
            add_f32(&[1.0, 2.0, 3.0], &[1.0, 2.0], &mut out),
            Err(TesseraError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_empty() {
        let mut out: [f32; 0] = [];
        add_f32(&[], &[], &mut out).unwrap();
    }
}
