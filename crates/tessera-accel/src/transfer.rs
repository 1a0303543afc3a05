//! Host ↔ scratchpad transfers and accelerator argument mappings.
//!
//! `DmaTransfer` simulates a DMA engine: a value-preserving copy confined to
//! the requested range, with byte counters standing in for transfer cost. A
//! hardware-backed engine only has to implement [`Transfer`]; kernels and the
//! planner do not change.

use std::collections::HashMap;

use tessera_core::{Result, Storage, TesseraError};

use crate::backend::AcceleratorId;
use crate::scratchpad::Scratchpad;

/// Counters for completed transfers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferStats {
    pub loads: usize,
    pub stores: usize,
    pub bytes_loaded: usize,
    pub bytes_stored: usize,
}

impl TransferStats {
    pub fn total_bytes(&self) -> usize {
        self.bytes_loaded + self.bytes_stored
    }
}

/// Moves tile data between host-visible storage and a scratchpad.
///
/// Both directions copy exactly `len` leading elements and leave every other
/// byte alone, so repeating a transfer has no further effect. A transfer
/// completes before the call returns.
pub trait Transfer {
    /// Host → scratchpad.
    fn load(&mut self, spad: &mut Scratchpad, host: &Storage, len: usize) -> Result<()>;

    /// Scratchpad → host.
    fn store(&mut self, host: &mut Storage, spad: &Scratchpad, len: usize) -> Result<()>;

    fn stats(&self) -> TransferStats;
}

/// Simulated synchronous DMA engine.
#[derive(Debug, Default)]
pub struct DmaTransfer {
    stats: TransferStats,
}

impl DmaTransfer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transfer for DmaTransfer {
    fn load(&mut self, spad: &mut Scratchpad, host: &Storage, len: usize) -> Result<()> {
        spad.ensure(host.dtype(), len)?;
        spad.storage_mut().copy_from(host, 0, 0, len)?;
        let bytes = host.dtype().storage_bytes(len);
        tracing::trace!("dma load: {} bytes into scratchpad", bytes);
        self.stats.loads += 1;
        self.stats.bytes_loaded += bytes;
        Ok(())
    }

    fn store(&mut self, host: &mut Storage, spad: &Scratchpad, len: usize) -> Result<()> {
        host.copy_from(spad.storage(), 0, 0, len)?;
        let bytes = spad.dtype().storage_bytes(len);
        tracing::trace!("dma store: {} bytes back to host", bytes);
        self.stats.stores += 1;
        self.stats.bytes_stored += bytes;
        Ok(())
    }

    fn stats(&self) -> TransferStats {
        self.stats
    }
}

/// Argument mappings between host buffers and an accelerator's address
/// space, one per kernel operand.
#[derive(Debug, Default)]
pub struct MappingTable {
    entries: HashMap<(AcceleratorId, String), usize>,
}

impl MappingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map kernel argument `arg` of `accel` onto a host buffer of `bytes`.
    pub fn map_array(&mut self, accel: AcceleratorId, arg: &str, bytes: usize) {
        tracing::trace!("map {} -> {} ({} bytes)", arg, accel, bytes);
        self.entries.insert((accel, arg.to_string()), bytes);
    }

    /// Check that `arg` is mapped for `accel` and covers `bytes`.
    pub fn require(&self, accel: AcceleratorId, arg: &str, bytes: usize) -> Result<()> {
        let mapped = self
            .entries
            .get(&(accel, arg.to_string()))
            .copied()
            .ok_or_else(|| TesseraError::UnmappedArgument {
                accel: accel.0,
                arg: arg.to_string(),
            })?;
        if mapped < bytes {
            return Err(TesseraError::MappingTooSmall {
                arg: arg.to_string(),
                mapped,
                needed: bytes,
            });
        }
        Ok(())
    }

    pub fn mapped_bytes(&self, accel: AcceleratorId, arg: &str) -> Option<usize> {
        self.entries.get(&(accel, arg.to_string())).copied()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
