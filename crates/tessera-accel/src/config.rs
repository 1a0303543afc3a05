//! Backend configuration files.
//!
//! A config names a built-in preset and optionally overrides any of its
//! fields:
//!
//! ```json
//! { "preset": "smv", "spad_capacity_bytes": 512 }
//! ```

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tessera_core::{DType, Result, TesseraError};

use crate::backend::{AcceleratorId, BackendDescriptor};

/// Serialized backend selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendConfig {
    /// Built-in backend to start from (`reference` when absent).
    pub preset: Option<String>,

    /// Display name of the resulting backend.
    pub name: Option<String>,

    /// Scratchpad bytes per operand.
    pub spad_capacity_bytes: Option<usize>,

    /// Innermost-dimension alignment; 0 selects direct host access.
    pub alignment: Option<usize>,

    /// Accelerator name, e.g. `smv-eltwise`.
    pub accelerator: Option<String>,

    /// Accepted encodings, e.g. `["f16"]`.
    pub dtypes: Option<Vec<String>>,
}

impl BackendConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| TesseraError::Config(format!("invalid backend config: {e}")))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Full config describing an existing backend. Only backends on a known
    /// accelerator can be written out.
    pub fn from_descriptor(backend: &BackendDescriptor) -> Result<Self> {
        let accelerator = backend.accelerator.name().ok_or_else(|| {
            TesseraError::Config(format!(
                "backend '{}' targets unmapped accelerator {}",
                backend.name, backend.accelerator
            ))
        })?;
        Ok(Self {
            preset: None,
            name: Some(backend.name.clone()),
            spad_capacity_bytes: Some(backend.spad_capacity_bytes),
            alignment: Some(backend.alignment),
            accelerator: Some(accelerator.to_string()),
            dtypes: Some(backend.dtypes.iter().map(|d| d.to_string()).collect()),
        })
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| TesseraError::Config(format!("cannot serialize backend config: {e}")))
    }

    /// Resolve the preset and apply overrides.
    pub fn into_descriptor(self) -> Result<BackendDescriptor> {
        let mut backend = BackendDescriptor::preset(self.preset.as_deref().unwrap_or("reference"))?;
        if let Some(name) = self.name {
            backend.name = name;
        }
        if let Some(bytes) = self.spad_capacity_bytes {
            backend.spad_capacity_bytes = bytes;
        }
        if let Some(alignment) = self.alignment {
            backend.alignment = alignment;
        }
        if let Some(accel) = self.accelerator {
            backend.accelerator = AcceleratorId::from_name(&accel)?;
        }
        if let Some(dtypes) = self.dtypes {
            let parsed = dtypes
                .iter()
                .map(|d| DType::from_str(d))
                .collect::<Result<Vec<_>>>()?;
            if let Some(bad) = parsed.iter().find(|d| !d.is_offload_supported()) {
                return Err(TesseraError::Config(format!(
                    "backend '{}' lists {} which no kernel implements",
                    backend.name, bad
                )));
            }
            backend.dtypes = parsed;
        }
        tracing::debug!("resolved backend config: {}", backend);
        Ok(backend)
    }
}
