//! Tensor registry that owns tensor lifetime for an operator graph.

use std::collections::HashMap;

use crate::error::TesseraError;
use crate::tensor::Tensor;
use crate::Result;

/// Name → tensor registry.
///
/// Operators never own tensors; they look them up here by name for the
/// duration of a call, so every tensor outlives the operator invocation that
/// reads or writes it.
#[derive(Debug, Default)]
pub struct Workspace {
    tensors: HashMap<String, Tensor>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tensor under its own name.
    pub fn add_tensor(&mut self, tensor: Tensor) -> Result<()> {
        let name = tensor.name().to_string();
        if self.tensors.contains_key(&name) {
            return Err(TesseraError::DuplicateTensor(name));
        }
        tracing::trace!("workspace: registered {:?}", tensor);
        self.tensors.insert(name, tensor);
        Ok(())
    }

    pub fn tensor(&self, name: &str) -> Result<&Tensor> {
        self.tensors
            .get(name)
            .ok_or_else(|| TesseraError::TensorNotFound(name.to_string()))
    }

    pub fn tensor_mut(&mut self, name: &str) -> Result<&mut Tensor> {
        self.tensors
            .get_mut(name)
            .ok_or_else(|| TesseraError::TensorNotFound(name.to_string()))
    }

    /// Remove a tensor, handing ownership back to the caller.
    pub fn remove(&mut self, name: &str) -> Option<Tensor> {
        self.tensors.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tensors.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DType, Shape};

    #[test]
    fn test_add_and_lookup() {
        let mut ws = Workspace::new();
        ws.add_tensor(Tensor::zeros("a", Shape::new(&[2, 2]), DType::F32)).unwrap();
        assert!(ws.contains("a"));
        assert_eq!(ws.len(), 1);
        assert_eq!(ws.tensor("a").unwrap().numel(), 4);
        ws.tensor_mut("a").unwrap().fill_with(|_| 1.0);
        assert_eq!(ws.tensor("a").unwrap().to_f32_vec(), vec![1.0; 4]);
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut ws = Workspace::new();
        ws.add_tensor(Tensor::zeros("a", Shape::new(&[2]), DType::F32)).unwrap();
        let err = ws.add_tensor(Tensor::zeros("a", Shape::new(&[3]), DType::F16)).unwrap_err();
        assert!(matches!(err, TesseraError::DuplicateTensor(ref n) if n == "a"));
    }

    #[test]
    fn test_missing_and_remove() {
        let mut ws = Workspace::new();
        assert!(matches!(ws.tensor("nope"), Err(TesseraError::TensorNotFound(_))));
        ws.add_tensor(Tensor::zeros("a", Shape::new(&[2]), DType::F32)).unwrap();
        let t = ws.remove("a").unwrap();
        assert_eq!(t.name(), "a");
        assert!(ws.is_empty());
    }
}
