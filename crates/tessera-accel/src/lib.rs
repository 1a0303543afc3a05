//! # tessera-accel
//!
//! Scratchpad-tiled offload of elementwise addition.
//!
//! Large tensors are cut into tiles that fit an accelerator's scratchpad,
//! each tile is added on the selected backend, and the tiles are merged back
//! into a contiguous result.
//!
//! ## Key Features
//! - Backend descriptors with built-in presets (`reference`, `smv`) and JSON config
//! - Tile planner shared by inputs and output
//! - Direct and copy-in/copy-out execution behind one `Transfer` trait
//! - Input validation for the elementwise add operator

pub mod backend;
pub mod config;
pub mod scratchpad;
pub mod transfer;
pub mod tiling;
pub mod executor;
pub mod merge;
pub mod operator;

pub use backend::{AcceleratorId, BackendDescriptor, TransferMode};
pub use config::BackendConfig;
pub use executor::TileExecutor;
pub use merge::flatten_tiled_tensor;
pub use operator::{EltwiseAddOp, ExecutionReport, INPUT0, INPUT1};
pub use tiling::{max_tile_elems, TilePlan, TiledTensor};
pub use transfer::{DmaTransfer, Transfer, TransferStats};
