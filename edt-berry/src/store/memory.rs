//! 纯内存切片存储. 适用于小体数据和测试.

use super::{check_finalize, check_shape, check_z, track_shape, SliceSink, SliceStore};
use crate::data::{DistSlice, OwnedDistSlice, VolumeAttr, VolumeMeta};
use crate::error::StoreError;
use crate::Idx2d;
use ndarray::Array2;

/// 纯内存存储的构建阶段.
#[derive(Debug, Default)]
pub struct MemSliceSink {
    slices: Vec<Array2<f32>>,
    sh: Option<Idx2d>,
}

impl MemSliceSink {
    /// 初始化.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SliceSink for MemSliceSink {
    type Store = MemSliceStore;

    fn push_slice(&mut self, slice: DistSlice<'_>) -> Result<(), StoreError> {
        track_shape(&mut self.sh, slice.shape())?;
        self.slices.push(slice.data().to_owned());
        Ok(())
    }

    #[inline]
    fn len_pushed(&self) -> usize {
        self.slices.len()
    }

    fn finalize(self, meta: VolumeMeta) -> Result<MemSliceStore, StoreError> {
        check_finalize(&meta, self.slices.len(), self.sh)?;
        Ok(MemSliceStore {
            meta,
            slices: self.slices,
        })
    }
}

/// 封存后的纯内存存储.
#[derive(Debug, Clone)]
pub struct MemSliceStore {
    meta: VolumeMeta,
    slices: Vec<Array2<f32>>,
}

impl VolumeAttr for MemSliceStore {
    #[inline]
    fn meta(&self) -> &VolumeMeta {
        &self.meta
    }
}

impl SliceStore for MemSliceStore {
    fn read_slice(&self, z: usize) -> Result<OwnedDistSlice, StoreError> {
        check_z(z, self.slices.len())?;
        Ok(self.slices[z].clone().into())
    }

    fn write_slice(&mut self, z: usize, slice: DistSlice<'_>) -> Result<(), StoreError> {
        check_z(z, self.slices.len())?;
        check_shape(self.slice_shape(), slice.shape())?;
        self.slices[z].assign(&slice.data());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::MemSliceSink;
    use crate::store::tests::{contract, finalize_mismatch};

    #[test]
    fn test_mem_store_contract() {
        contract(MemSliceSink::new());
        finalize_mismatch(MemSliceSink::new());
    }
}
