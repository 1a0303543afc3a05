//! Backend descriptors: what an execution target can do.
//!
//! A descriptor is resolved at configuration time and never mutated during a
//! run. Its alignment decides the transfer mode: 0 means the accelerator
//! addresses host memory directly, anything else means data must be staged
//! through the scratchpad.

use std::fmt;

use tessera_core::{DType, Result, TesseraError};

/// Accelerator identifier used for argument mappings and kernel invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AcceleratorId(pub u32);

impl AcceleratorId {
    /// Elementwise unit of the reference backend.
    pub const REFERENCE_ELTWISE: AcceleratorId = AcceleratorId(0x0003);
    /// Elementwise unit of the vectorized SMV backend.
    pub const SMV_ELTWISE: AcceleratorId = AcceleratorId(0x0103);

    const KNOWN: [(&'static str, AcceleratorId); 2] = [
        ("reference-eltwise", AcceleratorId::REFERENCE_ELTWISE),
        ("smv-eltwise", AcceleratorId::SMV_ELTWISE),
    ];

    /// Look up an accelerator by its configuration name.
    pub fn from_name(name: &str) -> Result<Self> {
        Self::KNOWN
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, id)| *id)
            .ok_or_else(|| TesseraError::Config(format!("unknown accelerator '{name}'")))
    }

    /// Configuration name, if this is a known accelerator.
    pub fn name(&self) -> Option<&'static str> {
        Self::KNOWN.iter().find(|(_, id)| id == self).map(|(n, _)| *n)
    }
}

impl fmt::Display for AcceleratorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}({:#06x})", self.0),
            None => write!(f, "{:#06x}", self.0),
        }
    }
}

/// How operands reach the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    /// Kernel works on host-visible tile storage in place.
    Direct,
    /// Inputs are loaded into scratchpad, the output is stored back.
    CopyInOut,
}

impl fmt::Display for TransferMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferMode::Direct => write!(f, "direct"),
            TransferMode::CopyInOut => write!(f, "copy-in/copy-out"),
        }
    }
}

/// Capabilities of one execution target.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendDescriptor {
    pub name: String,
    /// Bytes of on-accelerator working memory per operand.
    pub spad_capacity_bytes: usize,
    /// Innermost-dimension alignment in elements (0 = direct host access).
    pub alignment: usize,
    pub accelerator: AcceleratorId,
    /// Encodings the backend's kernel accepts.
    pub dtypes: Vec<DType>,
}

impl BackendDescriptor {
    /// Reference backend: 64 KiB scratchpad, direct host access, f32.
    pub fn reference() -> Self {
        Self {
            name: "reference".into(),
            spad_capacity_bytes: 64 * 1024,
            alignment: 0,
            accelerator: AcceleratorId::REFERENCE_ELTWISE,
            dtypes: vec![DType::F32],
        }
    }

    /// SMV backend: 32 KiB scratchpads, 8-lane vectors, f16.
    pub fn smv() -> Self {
        Self {
            name: "smv".into(),
            spad_capacity_bytes: 32 * 1024,
            alignment: 8,
            accelerator: AcceleratorId::SMV_ELTWISE,
            dtypes: vec![DType::F16],
        }
    }

    /// Look up a built-in backend by name.
    pub fn preset(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "reference" | "ref" => Ok(Self::reference()),
            "smv" => Ok(Self::smv()),
            other => Err(TesseraError::Config(format!("unknown backend preset '{other}'"))),
        }
    }

    /// Names of the built-in presets.
    pub fn preset_names() -> &'static [&'static str] {
        &["reference", "smv"]
    }

    /// Same backend with a different scratchpad capacity.
    pub fn with_spad_capacity(mut self, bytes: usize) -> Self {
        self.spad_capacity_bytes = bytes;
        self
    }

    pub fn transfer_mode(&self) -> TransferMode {
        if self.alignment == 0 {
            TransferMode::Direct
        } else {
            TransferMode::CopyInOut
        }
    }

    pub fn supports(&self, dtype: DType) -> bool {
        self.dtypes.contains(&dtype)
    }

    /// The backend's preferred encoding (the first one it lists).
    pub fn native_dtype(&self) -> Option<DType> {
        self.dtypes.first().copied()
    }
}

impl fmt::Display for BackendDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dtypes: Vec<String> = self.dtypes.iter().map(|d| d.to_string()).collect();
        write!(
            f,
            "{} (spad={} B, align={}, mode={}, accel={}, dtypes=[{}])",
            self.name,
            self.spad_capacity_bytes,
            self.alignment,
            self.transfer_mode(),
            self.accelerator,
            dtypes.join(", ")
        )
    }
}
