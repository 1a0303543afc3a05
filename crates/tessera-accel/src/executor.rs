//! Per-tile dispatch.
//!
//! For each tile the executor picks the path the backend implements:
//! - direct: the kernel runs on the tile storage in place;
//! - copy-in/copy-out: operands are mapped for the accelerator, both inputs
//!   are loaded into scratchpad, the kernel runs there, and the result is
//!   stored back into the output tile.
//!
//! Tiles share no state beyond the reusable scratchpads, and each tile's
//! loads complete before its kernel starts.

use tessera_core::{Result, TesseraError};
use tessera_kernels::{add_storage, KernelKind};

use crate::backend::{AcceleratorId, BackendDescriptor, TransferMode};
use crate::scratchpad::ScratchpadSet;
use crate::tiling::{Tile, TilePlan};
use crate::transfer::{DmaTransfer, MappingTable, Transfer, TransferStats};

/// Kernel argument names on the accelerator side.
pub const HOST_INPUT0: &str = "host_input0";
pub const HOST_INPUT1: &str = "host_input1";
pub const HOST_OUTPUT: &str = "host_output";

/// Runs tiles for one operator execution.
pub struct TileExecutor {
    backend: BackendDescriptor,
    spads: Option<ScratchpadSet>,
    mappings: MappingTable,
    transfer: Box<dyn Transfer>,
    tiles_run: usize,
}

impl TileExecutor {
    /// Executor with the simulated DMA engine.
    pub fn new(backend: &BackendDescriptor, plan: &TilePlan) -> Result<Self> {
        Self::with_transfer(backend, plan, Box::new(DmaTransfer::new()))
    }

    /// Executor with a caller-provided transfer engine.
    pub fn with_transfer(
        backend: &BackendDescriptor,
        plan: &TilePlan,
        transfer: Box<dyn Transfer>,
    ) -> Result<Self> {
        if backend.accelerator.name().is_none() {
            return Err(TesseraError::Config(format!(
                "backend '{}' targets unmapped accelerator {}",
                backend.name, backend.accelerator
            )));
        }

        let spads = match backend.transfer_mode() {
            TransferMode::Direct => None,
            TransferMode::CopyInOut => {
                let needed = plan.dtype().storage_bytes(plan.max_tile_storage());
                if needed > backend.spad_capacity_bytes {
                    tracing::warn!(
                        "padded tile needs {}B, scratchpad of '{}' has {}B; growing scratchpad",
                        needed,
                        backend.name,
                        backend.spad_capacity_bytes
                    );
                }
                let capacity = backend.spad_capacity_bytes.max(needed);
                Some(ScratchpadSet::new(capacity, plan.dtype()))
            }
        };

        Ok(Self {
            backend: backend.clone(),
            spads,
            mappings: MappingTable::new(),
            transfer,
            tiles_run: 0,
        })
    }

    pub fn mode(&self) -> TransferMode {
        self.backend.transfer_mode()
    }

    pub fn stats(&self) -> TransferStats {
        self.transfer.stats()
    }

    pub fn tiles_run(&self) -> usize {
        self.tiles_run
    }

    /// Compute `out = a + b` for one tile index.
    ///
    /// Inputs are read only. An encoding the backend does not accept is a
    /// configuration error and aborts the run.
    pub fn run_tile(&mut self, a: &Tile, b: &Tile, out: &mut Tile) -> Result<KernelKind> {
        check_same_tile(a, b)?;
        check_same_tile(a, out)?;

        let dtype = out.dtype();
        for operand in [a.dtype(), b.dtype()] {
            if operand != dtype {
                return Err(TesseraError::DTypeMismatch {
                    expected: dtype,
                    got: operand,
                });
            }
        }
        if !self.backend.supports(dtype) {
            return Err(TesseraError::UnsupportedDType(dtype));
        }

        let kind = match self.backend.transfer_mode() {
            TransferMode::Direct => {
                tracing::debug!("tile {}: direct on {}", out.index(), self.backend.name);
                let len = out.len();
                add_storage(a.storage(), b.storage(), out.storage_mut(), len)?
            }
            TransferMode::CopyInOut => {
                tracing::debug!("tile {}: copy-in/copy-out on {}", out.index(), self.backend.name);
                let accel = self.backend.accelerator;
                self.mappings.clear();
                self.mappings.map_array(accel, HOST_INPUT0, a.nbytes());
                self.mappings.map_array(accel, HOST_INPUT1, b.nbytes());
                self.mappings.map_array(accel, HOST_OUTPUT, out.nbytes());
                self.invoke_kernel(accel, a, b, out)?
            }
        };
        self.tiles_run += 1;
        Ok(kind)
    }

    /// Run the elementwise unit on `accel` over scratchpad copies of the
    /// operands. Every operand must be mapped for `accel` first.
    fn invoke_kernel(
        &mut self,
        accel: AcceleratorId,
        a: &Tile,
        b: &Tile,
        out: &mut Tile,
    ) -> Result<KernelKind> {
        let n = out.storage_size();
        let bytes = out.nbytes();
        self.mappings.require(accel, HOST_INPUT0, bytes)?;
        self.mappings.require(accel, HOST_INPUT1, bytes)?;
        self.mappings.require(accel, HOST_OUTPUT, bytes)?;

        let spads = self.spads.as_mut().ok_or_else(|| {
            TesseraError::Config(format!("backend '{}' has no scratchpads", self.backend.name))
        })?;
        spads.ensure(out.dtype(), n)?;

        self.transfer.load(&mut spads.spad0, a.storage(), n)?;
        self.transfer.load(&mut spads.spad1, b.storage(), n)?;
        let kind = add_storage(
            spads.spad0.storage(),
            spads.spad1.storage(),
            spads.spad2.storage_mut(),
            n,
        )?;
        self.transfer.store(out.storage_mut(), &spads.spad2, n)?;
        Ok(kind)
    }
}

fn check_same_tile(a: &Tile, b: &Tile) -> Result<()> {
    if a.index() != b.index() || a.shape() != b.shape() {
        return Err(TesseraError::ShapeMismatch {
            expected: a.shape().dims().to_vec(),
            got: b.shape().dims().to_vec(),
        });
    }
    Ok(())
}
