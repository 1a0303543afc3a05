//! Scratchpad memory for copy-in/copy-out backends.
//!
//! Each operand gets its own bounded region, allocated once per operator
//! execution and reused across tiles. Nothing here is global: two executions
//! never see each other's scratchpads.

use tessera_core::{DType, Result, Storage, TesseraError};

/// One bounded on-accelerator buffer.
///
/// Holds typed storage for the dtype currently being processed. The buffer
/// is reallocated only when the dtype changes; the capacity never changes.
#[derive(Debug)]
pub struct Scratchpad {
    capacity: usize,
    data: Storage,
}

impl Scratchpad {
    /// Create a scratchpad with the given capacity in bytes.
    pub fn new(capacity: usize, dtype: DType) -> Self {
        Self {
            capacity,
            data: Storage::zeros(dtype, capacity / dtype.element_size()),
        }
    }

    /// Make sure the region holds `dtype` and can fit `elems` elements.
    pub fn ensure(&mut self, dtype: DType, elems: usize) -> Result<()> {
        let requested = dtype.storage_bytes(elems);
        if requested > self.capacity {
            return Err(TesseraError::ScratchpadOverflow {
                requested,
                capacity: self.capacity,
            });
        }
        if self.data.dtype() != dtype {
            tracing::trace!("scratchpad: retyping {} -> {}", self.data.dtype(), dtype);
            self.data = Storage::zeros(dtype, self.capacity / dtype.element_size());
        }
        Ok(())
    }

    /// Total capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Capacity in elements of the current dtype.
    pub fn capacity_elems(&self) -> usize {
        self.data.numel()
    }

    pub fn dtype(&self) -> DType {
        self.data.dtype()
    }

    pub fn storage(&self) -> &Storage {
        &self.data
    }

    pub fn storage_mut(&mut self) -> &mut Storage {
        &mut self.data
    }
}

/// The three operand regions of the elementwise unit.
#[derive(Debug)]
pub struct ScratchpadSet {
    pub spad0: Scratchpad,
    pub spad1: Scratchpad,
    pub spad2: Scratchpad,
}

impl ScratchpadSet {
    pub fn new(capacity: usize, dtype: DType) -> Self {
        Self {
            spad0: Scratchpad::new(capacity, dtype),
            spad1: Scratchpad::new(capacity, dtype),
            spad2: Scratchpad::new(capacity, dtype),
        }
    }

    pub fn ensure(&mut self, dtype: DType, elems: usize) -> Result<()> {
        self.spad0.ensure(dtype, elems)?;
        self.spad1.ensure(dtype, elems)?;
        self.spad2.ensure(dtype, elems)
    }

    /// Bytes reserved across all regions.
    pub fn total_bytes(&self) -> usize {
        self.spad0.capacity() + self.spad1.capacity() + self.spad2.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_in_elements() {
        let s = Scratchpad::new(1024, DType::F16);
        assert_eq!(s.capacity(), 1024);
        assert_eq!(s.capacity_elems(), 512);
        assert_eq!(s.dtype(), DType::F16);
    }

    #[test]
    fn test_ensure_retypes() {
        let mut s = Scratchpad::new(64, DType::F16);
        s.ensure(DType::F32, 16).unwrap();
        assert_eq!(s.dtype(), DType::F32);
        assert_eq!(s.capacity_elems(), 16);
        assert_eq!(s.capacity(), 64);
    }

    #[test]
    fn test_exhaustion() {
        let mut s = Scratchpad::new(64, DType::F32);
        assert!(s.ensure(DType::F32, 16).is_ok());
        match s.ensure(DType::F32, 17) {
            Err(TesseraError::ScratchpadOverflow { requested, capacity }) => {
                assert_eq!(requested, 68);
                assert_eq!(capacity, 64);
            }
            other => panic!("expected overflow, got {other:?}"),
        }
    }

    #[test]
    fn test_set() {
        let mut set = ScratchpadSet::new(256, DType::F16);
        assert_eq!(set.total_bytes(), 768);
        set.ensure(DType::F16, 128).unwrap();
        assert!(set.ensure(DType::F16, 129).is_err());
    }
}
