//! # tessera-kernels
//!
//! Precision kernels for the Tessera offload engine.
//!
//! Provides:
//! - Full-precision (f32) and half-precision (f16) elementwise add
//! - IEEE half conversion rules (exact widen, round-to-nearest-even narrow)
//! - Kernel selection from a buffer's encoding tag

pub mod convert;
pub mod eltwise;
pub mod dispatch;

pub use dispatch::{add_storage, KernelKind};
