//! Tile planning: cut tensors into scratchpad-sized pieces.
//!
//! Tiles run along the batch (outermost) axis in row-major order. If a whole
//! batch row fits in a tile, a tile takes as many whole rows as fit; if not,
//! each row is split into column chunks. Every tile is viewed as a 2-D
//! `[1, len]` block and padded to the backend alignment in storage only.
//!
//! A single [`TilePlan`] drives the tiled collections of both inputs and the
//! output, so tile `i` has the same range and shape in all three.

use std::ops::Range;

use tessera_core::{DType, Result, Shape, Storage, Tensor, TesseraError};

use crate::backend::BackendDescriptor;

/// Largest tile, in elements, that fits the scratchpad.
///
/// `max(1, min(capacity_bytes / elem_bytes, total_elems))`. Never zero, so a
/// pathologically small scratchpad still makes progress one element at a
/// time.
pub fn max_tile_elems(capacity_bytes: usize, elem_bytes: usize, total_elems: usize) -> usize {
    let fit = capacity_bytes.checked_div(elem_bytes).unwrap_or(0);
    fit.min(total_elems).max(1)
}

/// Where one tile sits in the source tensor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileRange {
    pub index: usize,
    /// Batch rows touched by this tile.
    pub rows: Range<usize>,
    /// First element, as a flat row-major offset.
    pub offset: usize,
    /// Number of logical elements.
    pub len: usize,
}

impl TileRange {
    /// Flat element range covered by this tile.
    pub fn elements(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }
}

/// Tiling scheme shared by the input and output collections of one operation.
#[derive(Debug, Clone)]
pub struct TilePlan {
    dims: Shape,
    dtype: DType,
    alignment: usize,
    max_tile_elems: usize,
    ranges: Vec<TileRange>,
}

impl TilePlan {
    /// Plan tiles of `shape` for `backend`'s scratchpad.
    pub fn new(shape: &Shape, dtype: DType, backend: &BackendDescriptor) -> Self {
        Self::with_capacity(shape, dtype, backend.spad_capacity_bytes, backend.alignment)
    }

    /// Plan tiles for an explicit scratchpad capacity and alignment.
    pub fn with_capacity(shape: &Shape, dtype: DType, capacity_bytes: usize, alignment: usize) -> Self {
        let total = shape.numel();
        let max = max_tile_elems(capacity_bytes, dtype.element_size(), total);
        let ranges = cut_ranges(shape.batch(), shape.row_elems(), max);
        tracing::debug!(
            "tile plan: shape={} dtype={} capacity={}B max_tile_elems={} tiles={}",
            shape,
            dtype,
            capacity_bytes,
            max,
            ranges.len()
        );
        Self {
            dims: Shape::new(shape.dims()),
            dtype,
            alignment,
            max_tile_elems: max,
            ranges,
        }
    }

    pub fn shape(&self) -> &Shape {
        &self.dims
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn alignment(&self) -> usize {
        self.alignment
    }

    pub fn max_tile_elems(&self) -> usize {
        self.max_tile_elems
    }

    pub fn tile_count(&self) -> usize {
        self.ranges.len()
    }

    pub fn ranges(&self) -> &[TileRange] {
        &self.ranges
    }

    /// Storage shape of one tile: `[1, len]` with the plan's alignment.
    pub fn tile_shape(&self, range: &TileRange) -> Shape {
        Shape::with_alignment(&[1, range.len], self.alignment)
    }

    /// Largest padded tile, in elements. Sizes the scratchpads.
    pub fn max_tile_storage(&self) -> usize {
        self.ranges
            .iter()
            .map(|r| self.tile_shape(r).storage_size())
            .max()
            .unwrap_or(0)
    }
}

fn cut_ranges(batch: usize, row_elems: usize, max: usize) -> Vec<TileRange> {
    let mut ranges = Vec::new();
    if batch == 0 || row_elems == 0 {
        return ranges;
    }

    // Small rows are grouped so a tile fills the scratchpad; [8, 128] f16 in
    // 512 bytes is 4 tiles of 2 rows, not 8 half-empty ones.
    if row_elems <= max {
        let rows_per_tile = max / row_elems;
        let mut start = 0;
        while start < batch {
            let end = (start + rows_per_tile).min(batch);
            ranges.push(TileRange {
                index: ranges.len(),
                rows: start..end,
                offset: start * row_elems,
                len: (end - start) * row_elems,
            });
            start = end;
        }
    } else {
        for row in 0..batch {
            let mut col = 0;
            while col < row_elems {
                let len = max.min(row_elems - col);
                ranges.push(TileRange {
                    index: ranges.len(),
                    rows: row..row + 1,
                    offset: row * row_elems + col,
                    len,
                });
                col += len;
            }
        }
    }
    ranges
}

/// One tile with its own private storage.
#[derive(Debug, Clone)]
pub struct Tile {
    range: TileRange,
    shape: Shape,
    storage: Storage,
}

impl Tile {
    pub fn index(&self) -> usize {
        self.range.index
    }

    pub fn range(&self) -> &TileRange {
        &self.range
    }

    /// Logical element count.
    pub fn len(&self) -> usize {
        self.range.len
    }

    pub fn is_empty(&self) -> bool {
        self.range.len == 0
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn dtype(&self) -> DType {
        self.storage.dtype()
    }

    /// Stored element count, padding included.
    pub fn storage_size(&self) -> usize {
        self.storage.numel()
    }

    /// Stored byte length, padding included.
    pub fn nbytes(&self) -> usize {
        self.storage.nbytes()
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut Storage {
        &mut self.storage
    }
}

/// Ordered tiles of one logical tensor.
#[derive(Debug, Clone)]
pub struct TiledTensor {
    source: String,
    dims: Shape,
    dtype: DType,
    tiles: Vec<Tile>,
}

impl TiledTensor {
    /// Build the tiled collection of `tensor` under `plan`.
    ///
    /// With `copy_data` each tile is filled from the source; without it the
    /// tiles are left zeroed (used for outputs). The source must be
    /// unpadded so flat offsets address its storage directly.
    pub fn from_tensor(tensor: &Tensor, plan: &TilePlan, copy_data: bool) -> Result<Self> {
        if !tensor.shape().same_dims(plan.shape()) {
            return Err(TesseraError::ShapeMismatch {
                expected: plan.shape().dims().to_vec(),
                got: tensor.shape().dims().to_vec(),
            });
        }
        if tensor.dtype() != plan.dtype() {
            return Err(TesseraError::DTypeMismatch {
                expected: plan.dtype(),
                got: tensor.dtype(),
            });
        }
        if tensor.storage_size() != tensor.numel() {
            return Err(TesseraError::StorageError(format!(
                "cannot tile padded tensor '{}' ({} stored for {} elements)",
                tensor.name(),
                tensor.storage_size(),
                tensor.numel()
            )));
        }

        let mut tiles = Vec::with_capacity(plan.tile_count());
        for range in plan.ranges() {
            let shape = plan.tile_shape(range);
            let mut storage = Storage::zeros(plan.dtype(), shape.storage_size());
            if copy_data {
                storage.copy_from(tensor.storage(), range.offset, 0, range.len)?;
            }
            tiles.push(Tile {
                range: range.clone(),
                shape,
                storage,
            });
        }

        Ok(Self {
            source: tensor.name().to_string(),
            dims: plan.shape().clone(),
            dtype: plan.dtype(),
            tiles,
        })
    }

    /// Name of the tensor this collection was cut from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn shape(&self) -> &Shape {
        &self.dims
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn tile(&self, index: usize) -> Result<&Tile> {
        let count = self.tiles.len();
        self.tiles
            .get(index)
            .ok_or(TesseraError::TileIndexOutOfRange { index, count })
    }

    pub fn tile_mut(&mut self, index: usize) -> Result<&mut Tile> {
        let count = self.tiles.len();
        self.tiles
            .get_mut(index)
            .ok_or(TesseraError::TileIndexOutOfRange { index, count })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }
}
