//! # tessera-core
//!
//! Tensor data model for the Tessera offload engine.
//!
//! Provides:
//! - `DType` with the offloadable encodings (F32, F16) and a few others
//! - `Shape` with innermost-dimension alignment padding
//! - `Storage`, a tagged buffer with checked typed accessors
//! - `Tensor` and the `Workspace` registry that owns tensors

pub mod dtype;
pub mod shape;
pub mod storage;
pub mod tensor;
pub mod workspace;
pub mod error;
pub mod prelude;

pub use dtype::DType;
pub use shape::Shape;
pub use storage::{Element, Storage};
pub use tensor::Tensor;
pub use workspace::Workspace;
pub use error::TesseraError;

pub use half::f16;

pub type Result<T> = std::result::Result<T, TesseraError>;
