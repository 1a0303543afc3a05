use std::fmt;

use half::f16;

use crate::dtype::DType;
use crate::error::TesseraError;
use crate::shape::Shape;
use crate::storage::{Element, Storage};
use crate::Result;

/// A named, contiguous, row-major tensor.
///
/// The shape never changes after construction and the dtype is fixed by the
/// storage allocated with it.
///
/// # Examples
///
/// ```
/// use tessera_core::{DType, Tensor};
///
/// let t = Tensor::from_f32("x", &[1.0, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
/// assert_eq!(t.shape().dims(), &[2, 2]);
/// assert_eq!(t.dtype(), DType::F32);
/// assert_eq!(t.data::<f32>().unwrap()[3], 4.0);
/// ```
#[derive(Clone)]
pub struct Tensor {
    name: String,
    shape: Shape,
    storage: Storage,
}

impl Tensor {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// Create a zero-filled tensor with the given shape and dtype.
    pub fn zeros(name: impl Into<String>, shape: impl Into<Shape>, dtype: DType) -> Self {
        let shape = shape.into();
        let storage = Storage::zeros(dtype, shape.storage_size());
        Self {
            name: name.into(),
            shape,
            storage,
        }
    }

    /// Create a tensor from pre-built storage. The storage must hold exactly
    /// `shape.storage_size()` elements.
    pub fn from_storage(
        name: impl Into<String>,
        storage: Storage,
        shape: impl Into<Shape>,
    ) -> Result<Self> {
        let shape = shape.into();
        if storage.numel() != shape.storage_size() {
            return Err(TesseraError::StorageError(format!(
                "shape {} needs {} elements, storage holds {}",
                shape,
                shape.storage_size(),
                storage.numel()
            )));
        }
        Ok(Self {
            name: name.into(),
            shape,
            storage,
        })
    }

    /// Create a tensor from a typed vector.
    pub fn from_vec<T: Element>(name: impl Into<String>, data: Vec<T>, shape: &[usize]) -> Result<Self> {
        Self::from_storage(name, Storage::from_vec(data), Shape::new(shape))
    }

    /// Create a tensor from f32 data.
    pub fn from_f32(name: impl Into<String>, data: &[f32], shape: &[usize]) -> Result<Self> {
        Self::from_vec(name, data.to_vec(), shape)
    }

    /// Create an f16 tensor, narrowing each f32 value with round-to-nearest.
    pub fn from_f32_as_f16(name: impl Into<String>, data: &[f32], shape: &[usize]) -> Result<Self> {
        let halves: Vec<f16> = data.iter().map(|&v| f16::from_f32(v)).collect();
        Self::from_vec(name, halves, shape)
    }

    // =========================================================================
    // Properties
    // =========================================================================

    /// Registry name of the tensor.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shape of the tensor.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Encoding of the tensor's elements.
    pub fn dtype(&self) -> DType {
        self.storage.dtype()
    }

    /// Number of logical elements.
    pub fn numel(&self) -> usize {
        self.shape.numel()
    }

    /// Number of stored elements, including alignment padding.
    pub fn storage_size(&self) -> usize {
        self.storage.numel()
    }

    /// Bytes per element.
    pub fn element_size(&self) -> usize {
        self.dtype().element_size()
    }

    /// Underlying storage.
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Copy `len` elements of `src` (from `src_offset`) into this tensor's
    /// storage at `dst_offset`. Dtype and storage length are unchanged.
    pub fn write_from(
        &mut self,
        src: &Storage,
        src_offset: usize,
        dst_offset: usize,
        len: usize,
    ) -> Result<()> {
        self.storage.copy_from(src, src_offset, dst_offset, len)
    }

    /// Typed view of the data.
    pub fn data<T: Element>(&self) -> Result<&[T]> {
        self.storage.as_slice()
    }

    /// Typed mutable view of the data.
    pub fn data_mut<T: Element>(&mut self) -> Result<&mut [T]> {
        self.storage.as_mut_slice()
    }

    /// Copy all elements out as f32, widening f16/bf16 and narrowing f64.
    pub fn to_f32_vec(&self) -> Vec<f32> {
        match &self.storage {
            Storage::F16(v) => v.iter().map(|h| h.to_f32()).collect(),
            Storage::BF16(v) => v.iter().map(|h| h.to_f32()).collect(),
            Storage::F32(v) => v.clone(),
            Storage::F64(v) => v.iter().map(|&x| x as f32).collect(),
            Storage::I32(v) => v.iter().map(|&x| x as f32).collect(),
        }
    }

    /// Overwrite every element from an f32 producer, converting to the
    /// tensor's dtype.
    pub fn fill_with(&mut self, mut f: impl FnMut(usize) -> f32) {
        match &mut self.storage {
            Storage::F16(v) => v.iter_mut().enumerate().for_each(|(i, x)| *x = f16::from_f32(f(i))),
            Storage::BF16(v) => v
                .iter_mut()
                .enumerate()
                .for_each(|(i, x)| *x = half::bf16::from_f32(f(i))),
            Storage::F32(v) => v.iter_mut().enumerate().for_each(|(i, x)| *x = f(i)),
            Storage::F64(v) => v.iter_mut().enumerate().for_each(|(i, x)| *x = f(i) as f64),
            Storage::I32(v) => v.iter_mut().enumerate().for_each(|(i, x)| *x = f(i) as i32),
        }
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Tensor(name={:?}, shape={}, dtype={})",
            self.name,
            self.shape,
            self.dtype()
        )
    }
}
