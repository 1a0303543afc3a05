//! Convenience re-exports for common tessera-core types.
//!
//! ```rust
//! use tessera_core::prelude::*;
//! ```

pub use crate::DType;
pub use crate::Shape;
pub use crate::Storage;
pub use crate::Tensor;
pub use crate::TesseraError;
pub use crate::Workspace;
pub use crate::Result;
