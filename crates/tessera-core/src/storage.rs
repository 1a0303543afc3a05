use half::{bf16, f16};

use crate::{DType, Result, TesseraError};

/// Backing storage for tensor data, tagged with its encoding.
///
/// Each variant owns a typed buffer, so typed access never needs a raw
/// pointer cast. Asking for a type that does not match the tag is an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Storage {
    F16(Vec<f16>),
    BF16(Vec<bf16>),
    F32(Vec<f32>),
    F64(Vec<f64>),
    I32(Vec<i32>),
}

/// Element types that can live in a [`Storage`].
pub trait Element: bytemuck::Pod + Copy + Default + Send + Sync + 'static {
    const DTYPE: DType;

    fn slice(storage: &Storage) -> Option<&[Self]>;
    fn slice_mut(storage: &mut Storage) -> Option<&mut [Self]>;
    fn wrap(data: Vec<Self>) -> Storage;
}

macro_rules! impl_element {
    ($ty:ty, $variant:ident) => {
        impl Element for $ty {
            const DTYPE: DType = DType::$variant;

            fn slice(storage: &Storage) -> Option<&[Self]> {
                match storage {
                    Storage::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn slice_mut(storage: &mut Storage) -> Option<&mut [Self]> {
                match storage {
                    Storage::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn wrap(data: Vec<Self>) -> Storage {
                Storage::$variant(data)
            }
        }
    };
}

impl_element!(f16, F16);
impl_element!(bf16, BF16);
impl_element!(f32, F32);
impl_element!(f64, F64);
impl_element!(i32, I32);

impl Storage {
    /// Allocate zero-filled storage for `numel` elements of the given dtype.
    pub fn zeros(dtype: DType, numel: usize) -> Self {
        match dtype {
            DType::F16 => Storage::F16(vec![f16::ZERO; numel]),
            DType::BF16 => Storage::BF16(vec![bf16::ZERO; numel]),
            DType::F32 => Storage::F32(vec![0.0; numel]),
            DType::F64 => Storage::F64(vec![0.0; numel]),
            DType::I32 => Storage::I32(vec![0; numel]),
        }
    }

    /// Wrap an owned vector of elements.
    pub fn from_vec<T: Element>(data: Vec<T>) -> Self {
        T::wrap(data)
    }

    /// Encoding tag of this storage.
    pub fn dtype(&self) -> DType {
        match self {
            Storage::F16(_) => DType::F16,
            Storage::BF16(_) => DType::BF16,
            Storage::F32(_) => DType::F32,
            Storage::F64(_) => DType::F64,
            Storage::I32(_) => DType::I32,
        }
    }

    /// Number of elements.
    pub fn numel(&self) -> usize {
        match self {
            Storage::F16(v) => v.len(),
            Storage::BF16(v) => v.len(),
            Storage::F32(v) => v.len(),
            Storage::F64(v) => v.len(),
            Storage::I32(v) => v.len(),
        }
    }

    /// Size in bytes.
    pub fn nbytes(&self) -> usize {
        self.dtype().storage_bytes(self.numel())
    }

    /// Typed read access. Fails if `T` does not match the storage tag.
    pub fn as_slice<T: Element>(&self) -> Result<&[T]> {
        T::slice(self).ok_or(TesseraError::DTypeMismatch {
            expected: T::DTYPE,
            got: self.dtype(),
        })
    }

    /// Typed write access. Fails if `T` does not match the storage tag.
    pub fn as_mut_slice<T: Element>(&mut self) -> Result<&mut [T]> {
        let got = self.dtype();
        T::slice_mut(self).ok_or(TesseraError::DTypeMismatch {
            expected: T::DTYPE,
            got,
        })
    }

    /// Raw byte view.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Storage::F16(v) => bytemuck::cast_slice(v),
            Storage::BF16(v) => bytemuck::cast_slice(v),
            Storage::F32(v) => bytemuck::cast_slice(v),
            Storage::F64(v) => bytemuck::cast_slice(v),
            Storage::I32(v) => bytemuck::cast_slice(v),
        }
    }

    /// Mutable raw byte view.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        match self {
            Storage::F16(v) => bytemuck::cast_slice_mut(v),
            Storage::BF16(v) => bytemuck::cast_slice_mut(v),
            Storage::F32(v) => bytemuck::cast_slice_mut(v),
            Storage::F64(v) => bytemuck::cast_slice_mut(v),
            Storage::I32(v) => bytemuck::cast_slice_mut(v),
        }
    }

    /// Copy `len` elements from `src[src_offset..]` into `self[dst_offset..]`.
    ///
    /// Only the destination range is written.
    pub fn copy_from(
        &mut self,
        src: &Storage,
        src_offset: usize,
        dst_offset: usize,
        len: usize,
    ) -> Result<()> {
        if self.dtype() != src.dtype() {
            return Err(TesseraError::DTypeMismatch {
                expected: self.dtype(),
                got: src.dtype(),
            });
        }
        if src_offset + len > src.numel() || dst_offset + len > self.numel() {
            return Err(TesseraError::StorageError(format!(
                "copy of {} elements out of bounds (src {}+{} of {}, dst {}+{} of {})",
                len,
                src_offset,
                len,
                src.numel(),
                dst_offset,
                len,
                self.numel()
            )));
        }
        let width = self.dtype().element_size();
        let src_bytes = &src.as_bytes()[src_offset * width..(src_offset + len) * width];
        self.as_bytes_mut()[dst_offset * width..(dst_offset + len) * width]
            .copy_from_slice(src_bytes);
        Ok(())
    }

    /// Whether every element of two same-dtype storages is bitwise equal.
    pub fn bitwise_eq(&self, other: &Storage) -> bool {
        self.dtype() == other.dtype() && self.as_bytes() == other.as_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeros() {
        let s = Storage::zeros(DType::F16, 6);
        assert_eq!(s.dtype(), DType::F16);
        assert_eq!(s.numel(), 6);
        assert_eq!(s.nbytes(), 12);
        assert!(s.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_typed_access_checks_tag() {
        let mut s = Storage::from_vec(vec![1.0f32, 2.0, 3.0]);
        assert_eq!(s.as_slice::<f32>().unwrap(), &[1.0, 2.0, 3.0]);
        s.as_mut_slice::<f32>().unwrap()[1] = 7.0;
        assert_eq!(s.as_slice::<f32>().unwrap()[1], 7.0);

        match s.as_slice::<f16>() {
            Err(TesseraError::DTypeMismatch { expected, got }) => {
                assert_eq!(expected, DType::F16);
                assert_eq!(got, DType::F32);
            }
            other => panic!("expected DTypeMismatch, got {other:?}"),
        }
        assert!(s.as_mut_slice::<i32>().is_err());
    }

    #[test]
    fn test_copy_from_range_only() {
        let src = Storage::from_vec(vec![1.0f32, 2.0, 3.0, 4.0]);
        let mut dst = Storage::from_vec(vec![-1.0f32; 6]);
        dst.copy_from(&src, 1, 2, 2).unwrap();
        assert_eq!(dst.as_slice::<f32>().unwrap(), &[-1.0, -1.0, 2.0, 3.0, -1.0, -1.0]);
    }

    #[test]
    fn test_copy_from_rejects_mismatch() {
        let src = Storage::zeros(DType::F16, 4);
        let mut dst = Storage::zeros(DType::F32, 4);
        assert!(dst.copy_from(&src, 0, 0, 4).is_err());

        let src = Storage::zeros(DType::F32, 4);
        assert!(dst.copy_from(&src, 2, 0, 4).is_err());
    }

    #[test]
    fn test_byte_view_roundtrip() {
        let mut s = Storage::from_vec(vec![f16::from_f32(1.5), f16::from_f32(-2.0)]);
        assert_eq!(s.as_bytes().len(), 4);
        let copy = s.as_bytes().to_vec();
        s.as_bytes_mut().copy_from_slice(&copy);
        assert_eq!(s.as_slice::<f16>().unwrap()[0].to_f32(), 1.5);
    }
}
