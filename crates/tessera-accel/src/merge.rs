//! Reassembly of tiled results into a contiguous tensor.

use tessera_core::{Result, Tensor, TesseraError};

use crate::tiling::TiledTensor;

/// Copy every tile of `tiled` back to its place in `dest`.
///
/// Only the logical elements of each tile are written; alignment padding is
/// dropped. `dest` must have the collection's dims and dtype and be
/// unpadded.
pub fn flatten_tiled_tensor(tiled: &TiledTensor, dest: &mut Tensor) -> Result<()> {
    if !dest.shape().same_dims(tiled.shape()) {
        return Err(TesseraError::ShapeMismatch {
            expected: tiled.shape().dims().to_vec(),
            got: dest.shape().dims().to_vec(),
        });
    }
    if dest.dtype() != tiled.dtype() {
        return Err(TesseraError::DTypeMismatch {
            expected: tiled.dtype(),
            got: dest.dtype(),
        });
    }
    if dest.storage_size() != dest.numel() {
        return Err(TesseraError::StorageError(format!(
            "cannot merge into padded tensor '{}'",
            dest.name()
        )));
    }

    let mut written = 0;
    for tile in tiled.iter() {
        let range = tile.range();
        dest.write_from(tile.storage(), 0, range.offset, range.len)?;
        written += range.len;
    }
    if written != dest.numel() {
        return Err(TesseraError::StorageError(format!(
            "tiles of '{}' cover {} of {} elements",
            tiled.source(),
            written,
            dest.numel()
        )));
    }
    tracing::trace!("merged {} tiles into '{}'", tiled.tile_count(), dest.name());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiling::TilePlan;
    use tessera_core::{DType, Shape};

    #[test]
    fn test_tile_then_merge_restores_tensor() {
        let data: Vec<f32> = (0..35).map(|i| i as f32 * 0.25).collect();
        let src = Tensor::from_f32_as_f16("x", &data, &[5, 7]).unwrap();
        for cap in [2, 6, 14, 28, 64, 1024] {
            let plan = TilePlan::with_capacity(src.shape(), DType::F16, cap, 8);
            let tiled = TiledTensor::from_tensor(&src, &plan, true).unwrap();
            let mut dest = Tensor::zeros("y", Shape::new(&[5, 7]), DType::F16);
            flatten_tiled_tensor(&tiled, &mut dest).unwrap();
            assert!(dest.storage().bitwise_eq(src.storage()), "capacity {cap}");
        }
    }

    #[test]
    fn test_padding_is_dropped() {
        let src = Tensor::from_f32("x", &[1.0, 2.0, 3.0], &[1, 3]).unwrap();
        let plan = TilePlan::with_capacity(src.shape(), DType::F32, 1024, 8);
        let mut tiled = TiledTensor::from_tensor(&src, &plan, true).unwrap();
        tiled
            .tile_mut(0)
            .unwrap()
            .storage_mut()
            .as_mut_slice::<f32>()
            .unwrap()[5] = 99.0;
        let mut dest = Tensor::zeros("y", Shape::new(&[1, 3]), DType::F32);
        flatten_tiled_tensor(&tiled, &mut dest).unwrap();
        assert_eq!(dest.data::<f32>().unwrap(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_rejects_wrong_destination() {
        let src = Tensor::from_f32("x", &[0.0; 8], &[2, 4]).unwrap();
        let plan = TilePlan::with_capacity(src.shape(), DType::F32, 16, 0);
        let tiled = TiledTensor::from_tensor(&src, &plan, true).unwrap();

        let mut wrong_shape = Tensor::zeros("y", Shape::new(&[4, 2]), DType::F32);
        assert!(matches!(
            flatten_tiled_tensor(&tiled, &mut wrong_shape),
            Err(TesseraError::ShapeMismatch { .. })
        ));
        let mut wrong_dtype = Tensor::zeros("y", Shape::new(&[2, 4]), DType::F16);
        assert!(matches!(
            flatten_tiled_tensor(&tiled, &mut wrong_dtype),
            Err(TesseraError::DTypeMismatch { .. })
        ));
        let mut padded = Tensor::zeros("y", Shape::with_alignment(&[2, 4], 8), DType::F32);
        assert!(flatten_tiled_tensor(&tiled, &mut padded).is_err());
    }
}
