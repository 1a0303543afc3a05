//! Dtype-driven kernel selection.

use std::fmt;

use half::f16;
use tessera_core::{DType, Result, Storage, TesseraError};

use crate::eltwise;

/// Which precision kernel handles a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelKind {
    /// Native f32 addition.
    Fp32,
    /// f16 storage, f32 arithmetic (widen, add, narrow).
    Fp16,
}

impl KernelKind {
    /// Kernel for an encoding. Anything outside {F32, F16} reaching a kernel
    /// is a configuration error.
    pub fn for_dtype(dtype: DType) -> Result<Self> {
        match dtype {
            DType::F32 => Ok(KernelKind::Fp32),
            DType::F16 => Ok(KernelKind::Fp16),
            other => Err(TesseraError::UnsupportedDType(other)),
        }
    }

    pub fn dtype(&self) -> DType {
        match self {
            KernelKind::Fp32 => DType::F32,
            KernelKind::Fp16 => DType::F16,
        }
    }
}

impl fmt::Display for KernelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelKind::Fp32 => write!(f, "eltwise_add_f32"),
            KernelKind::Fp16 => write!(f, "eltwise_add_f16"),
        }
    }
}

/// Add the first `len` elements of `a` and `b` into `out`.
///
/// All three storages must share one encoding; the kernel is picked from it.
pub fn add_storage(a: &Storage, b: &Storage, out: &mut Storage, len: usize) -> Result<KernelKind> {
    let dtype = out.dtype();
    for operand in [a.dtype(), b.dtype()] {
        if operand != dtype {
            return Err(TesseraError::DTypeMismatch {
                expected: dtype,
                got: operand,
            });
        }
    }
    if len > a.numel() || len > b.numel() || len > out.numel() {
        return Err(TesseraError::StorageError(format!(
            "kernel length {} exceeds operand sizes ({}, {}, {})",
            len,
            a.numel(),
            b.numel(),
            out.numel()
        )));
    }

    let kind = KernelKind::for_dtype(dtype)?;
    tracing::trace!("{} over {} elements", kind, len);
    match kind {
        KernelKind::Fp32 => eltwise::add_f32(
            &a.as_slice::<f32>()?[..len],
            &b.as_slice::<f32>()?[..len],
            &mut out.as_mut_slice::<f32>()?[..len],
        )?,
        KernelKind::Fp16 => eltwise::add_f16(
            &a.as_slice::<f16>()?[..len],
            &b.as_slice::<f16>()?[..len],
            &mut out.as_mut_slice::<f16>()?[..len],
        )?,
    }
    Ok(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_for_dtype() {
        assert_eq!(KernelKind::for_dtype(DType::F32).unwrap(), KernelKind::Fp32);
        assert_eq!(KernelKind::for_dtype(DType::F16).unwrap(), KernelKind::Fp16);
        assert!(matches!(
            KernelKind::for_dtype(DType::BF16),
            Err(TesseraError::UnsupportedDType(DType::BF16))
        ));
        assert_eq!(KernelKind::Fp16.dtype(), DType::F16);
    }

    #[test]
    fn test_add_storage_f32_partial_length() {
        let a = Storage::from_vec(vec![1.0f32, 2.0, 3.0, 4.0]);
        let b = Storage::from_vec(vec![10.0f32, 20.0, 30.0, 40.0]);
        let mut out = Storage::zeros(DType::F32, 4);
        let kind = add_storage(&a, &b, &mut out, 3).unwrap();
        assert_eq!(kind, KernelKind::Fp32);
        assert_eq!(out.as_slice::<f32>().unwrap(), &[11.0, 22.0, 33.0, 0.0]);
    }

    #[test]
    fn test_add_storage_f16() {
        let a = Storage::from_vec(vec![f16::from_f32(1.0), f16::from_f32(2.0)]);
        let b = Storage::from_vec(vec![f16::from_f32(0.5), f16::from_f32(0.5)]);
        let mut out = Storage::zeros(DType::F16, 2);
        assert_eq!(add_storage(&a, &b, &mut out, 2).unwrap(), KernelKind::Fp16);
        let got: Vec<f32> = out.as_slice::<f16>().unwrap().iter().map(|h| h.to_f32()).collect();
        assert_eq!(got, vec![1.5, 2.5]);
    }

    #[test]
    fn test_add_storage_rejects_mixed_encodings() {
        let a = Storage::zeros(DType::F32, 2);
        let b = Storage::zeros(DType::F16, 2);
        let mut out = Storage::zeros(DType::F32, 2);
        assert!(matches!(
            add_storage(&a, &b, &mut out, 2),
            Err(TesseraError::DTypeMismatch { expected: DType::F32, got: DType::F16 })
        ));
    }

    #[test]
    fn test_add_storage_rejects_unsupported() {
        let a = Storage::zeros(DType::F64, 2);
        let b = Storage::zeros(DType::F64, 2);
        let mut out = Storage::zeros(DType::F64, 2);
        assert!(matches!(
            add_storage(&a, &b, &mut out, 2),
            Err(TesseraError::UnsupportedDType(DType::F64))
        ));
    }

    #[test]
    fn test_add_storage_rejects_overlong() {
        let a = Storage::zeros(DType::F32, 2);
        let b = Storage::zeros(DType::F32, 2);
        let mut out = Storage::zeros(DType::F32, 2);
        assert!(add_storage(&a, &b, &mut out, 3).is_err());
    }
}
