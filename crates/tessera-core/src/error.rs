use crate::dtype::DType;

/// Errors raised by Tessera tensors, kernels and the offload engine.
#[derive(Debug, thiserror::Error)]
pub enum TesseraError {
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch { expected: Vec<usize>, got: Vec<usize> },

    #[error("DType mismatch: expected {expected}, got {got}")]
    DTypeMismatch { expected: DType, got: DType },

    #[error("Unsupported dtype for this operation: {0}")]
    UnsupportedDType(DType),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Tensor '{0}' is already registered in the workspace")]
    DuplicateTensor(String),

    #[error("Tensor '{0}' not found in the workspace")]
    TensorNotFound(String),

    #[error("Tile index {index} out of range for {count} tiles")]
    TileIndexOutOfRange { index: usize, count: usize },

    #[error("Scratchpad overflow: {requested} bytes requested, capacity is {capacity}")]
    ScratchpadOverflow { requested: usize, capacity: usize },

    #[error("Argument '{arg}' is not mapped for accelerator {accel:#x}")]
    UnmappedArgument { accel: u32, arg: String },

    #[error("Mapping '{arg}' covers {mapped} bytes, kernel needs {needed}")]
    MappingTooSmall { arg: String, mapped: usize, needed: usize },

    #[error("Operator '{0}' has not been tiled; call plan_tiles first")]
    NotTiled(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
