//! Elementwise addition operator.
//!
//! Lifecycle on a [`Workspace`]:
//!
//! 1. `set_input` for both slots, `create_all_tensors` to register the output
//! 2. `validate_inputs`
//! 3. `plan_tiles` cuts both inputs and the output into tiles
//! 4. `execute` runs every tile and merges the result into the output
//!
//! The planned tiles are consumed by `execute`; running again needs a new
//! `plan_tiles`.

use tessera_core::{Result, Shape, Tensor, TesseraError, Workspace};
use tessera_kernels::KernelKind;

use crate::backend::{BackendDescriptor, TransferMode};
use crate::executor::TileExecutor;
use crate::merge::flatten_tiled_tensor;
use crate::tiling::{TilePlan, TiledTensor};
use crate::transfer::TransferStats;

/// Input slot of the left operand.
pub const INPUT0: usize = 0;
/// Input slot of the right operand.
pub const INPUT1: usize = 1;

/// What one `execute` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    pub tiles: usize,
    pub mode: TransferMode,
    /// Kernel used, if any tile ran.
    pub kernel: Option<KernelKind>,
    pub stats: TransferStats,
}

struct TiledOperands {
    plan: TilePlan,
    input0: TiledTensor,
    input1: TiledTensor,
    output: TiledTensor,
}

/// `output = input0 + input1`, tiled for one backend.
pub struct EltwiseAddOp {
    name: String,
    backend: BackendDescriptor,
    inputs: [Option<String>; 2],
    tiled: Option<TiledOperands>,
}

impl EltwiseAddOp {
    /// The output tensor is registered under the operator's name.
    pub fn new(name: impl Into<String>, backend: BackendDescriptor) -> Self {
        Self {
            name: name.into(),
            backend,
            inputs: [None, None],
            tiled: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn output_name(&self) -> &str {
        &self.name
    }

    pub fn backend(&self) -> &BackendDescriptor {
        &self.backend
    }

    /// Bind input `slot` ([`INPUT0`] or [`INPUT1`]) to a workspace tensor.
    pub fn set_input(&mut self, slot: usize, tensor: impl Into<String>) -> Result<()> {
        let entry = self.inputs.get_mut(slot).ok_or_else(|| {
            TesseraError::Config(format!("elementwise add has 2 inputs, got slot {slot}"))
        })?;
        *entry = Some(tensor.into());
        self.tiled = None;
        Ok(())
    }

    pub fn input(&self, slot: usize) -> Option<&str> {
        self.inputs.get(slot).and_then(|s| s.as_deref())
    }

    fn input_name(&self, slot: usize) -> Result<&str> {
        self.input(slot).ok_or_else(|| {
            TesseraError::Config(format!("operator '{}': input {} not set", self.name, slot))
        })
    }

    /// Register the output tensor with input 0's shape and dtype. An existing
    /// output is kept if it matches; the output may never alias an input.
    pub fn create_all_tensors(&self, ws: &mut Workspace) -> Result<()> {
        let output_name = self.output_name();
        if self.inputs.iter().flatten().any(|input| input == output_name) {
            return Err(TesseraError::Config(format!(
                "operator '{}': output would overwrite input '{}'",
                self.name, output_name
            )));
        }

        let input0 = ws.tensor(self.input_name(INPUT0)?)?;
        let (dims, dtype) = (input0.shape().dims().to_vec(), input0.dtype());
        if ws.contains(output_name) {
            let existing = ws.tensor(output_name)?;
            if existing.shape().dims() != dims.as_slice() {
                return Err(TesseraError::ShapeMismatch {
                    expected: dims,
                    got: existing.shape().dims().to_vec(),
                });
            }
            if existing.dtype() != dtype {
                return Err(TesseraError::DTypeMismatch {
                    expected: dtype,
                    got: existing.dtype(),
                });
            }
            return Ok(());
        }

        let output = Tensor::zeros(output_name, Shape::new(&dims), dtype);
        tracing::debug!("operator '{}': created output {:?}", self.name, output);
        ws.add_tensor(output)
    }

    /// True iff both inputs exist, have equal shapes and both carry an
    /// offloadable encoding (f32 or f16).
    pub fn validate_inputs(&self, ws: &Workspace) -> bool {
        let lookup = |slot: usize| self.input(slot).and_then(|name| ws.tensor(name).ok());
        let (Some(a), Some(b)) = (lookup(INPUT0), lookup(INPUT1)) else {
            tracing::debug!("operator '{}': missing input", self.name);
            return false;
        };

        let shapes_equal = a.shape() == b.shape();
        let encodings_ok = a.dtype().is_offload_supported() && b.dtype().is_offload_supported();
        if !shapes_equal {
            tracing::debug!("operator '{}': shapes {} and {} differ", self.name, a.shape(), b.shape());
        }
        if !encodings_ok {
            tracing::debug!(
                "operator '{}': unsupported encoding ({}, {})",
                self.name,
                a.dtype(),
                b.dtype()
            );
        }
        shapes_equal && encodings_ok
    }

    /// Build the tiled collections of both inputs and the output.
    pub fn plan_tiles(&mut self, ws: &mut Workspace) -> Result<()> {
        self.tiled = None;
        self.create_all_tensors(ws)?;

        let a = ws.tensor(self.input_name(INPUT0)?)?;
        let b = ws.tensor(self.input_name(INPUT1)?)?;
        let out = ws.tensor(self.output_name())?;

        let dtype = a.dtype();
        if !self.backend.supports(dtype) {
            return Err(TesseraError::UnsupportedDType(dtype));
        }
        let plan = TilePlan::new(a.shape(), dtype, &self.backend);
        let tiled = TiledOperands {
            input0: TiledTensor::from_tensor(a, &plan, true)?,
            input1: TiledTensor::from_tensor(b, &plan, true)?,
            output: TiledTensor::from_tensor(out, &plan, false)?,
            plan,
        };
        tracing::debug!(
            "operator '{}': {} tiles of at most {} elements",
            self.name,
            tiled.plan.tile_count(),
            tiled.plan.max_tile_elems()
        );
        self.tiled = Some(tiled);
        Ok(())
    }

    pub fn is_tiled(&self) -> bool {
        self.tiled.is_some()
    }

    /// Planned tiles, if `plan_tiles` has run.
    pub fn plan(&self) -> Option<&TilePlan> {
        self.tiled.as_ref().map(|t| &t.plan)
    }

    /// Run every tile in index order and merge into the output tensor.
    ///
    /// On error the output tensor's contents are unspecified.
    pub fn execute(&mut self, ws: &mut Workspace) -> Result<ExecutionReport> {
        let TiledOperands {
            plan,
            input0,
            input1,
            mut output,
        } = self
            .tiled
            .take()
            .ok_or_else(|| TesseraError::NotTiled(self.name.clone()))?;

        tracing::info!(
            "operator '{}': executing {} tiles on {}",
            self.name,
            plan.tile_count(),
            self.backend
        );
        let mut exec = TileExecutor::new(&self.backend, &plan)?;
        let mut kernel = None;
        for i in 0..plan.tile_count() {
            kernel = Some(exec.run_tile(input0.tile(i)?, input1.tile(i)?, output.tile_mut(i)?)?);
        }

        let dest = ws.tensor_mut(self.output_name())?;
        flatten_tiled_tensor(&output, dest)?;

        let report = ExecutionReport {
            tiles: exec.tiles_run(),
            mode: exec.mode(),
            kernel,
            stats: exec.stats(),
        };
        tracing::info!(
            "operator '{}': done, {} tiles, {} bytes transferred",
            self.name,
            report.tiles,
            report.stats.total_bytes()
        );
        Ok(report)
    }

    /// Validate, plan and execute in one go.
    pub fn run(&mut self, ws: &mut Workspace) -> Result<ExecutionReport> {
        if !self.validate_inputs(ws) {
            return Err(TesseraError::Config(format!(
                "operator '{}': inputs failed validation",
                self.name
            )));
        }
        self.plan_tiles(ws)?;
        self.execute(ws)
    }
}
