//! 内存压缩切片存储.
//!
//! 距离场中存在大片的 0 (背景) 和正无穷 (前景), zlib 对其压缩率很高.
//! 读取时解压, 写入时重新压缩.

use super::{check_finalize, check_shape, check_z, track_shape, SliceSink, SliceStore};
use crate::data::{CompactDistSlice, DistSlice, OwnedDistSlice, VolumeAttr, VolumeMeta};
use crate::error::StoreError;
use crate::Idx2d;

/// 内存压缩存储的构建阶段.
#[derive(Debug)]
pub struct CompactSliceSink {
    level: u32,
    slices: Vec<CompactDistSlice>,
    sh: Option<Idx2d>,
}

impl CompactSliceSink {
    /// 以 zlib 压缩等级 `level` 初始化.
    #[inline]
    pub fn new(level: u32) -> Self {
        Self {
            level,
            slices: Vec::new(),
            sh: None,
        }
    }
}

impl SliceSink for CompactSliceSink {
    type Store = CompactSliceStore;

    fn push_slice(&mut self, slice: DistSlice<'_>) -> Result<(), StoreError> {
        track_shape(&mut self.sh, slice.shape())?;
        self.slices.push(slice.to_owned().compress(self.level)?);
        Ok(())
    }

    #[inline]
    fn len_pushed(&self) -> usize {
        self.slices.len()
    }

    fn finalize(self, meta: VolumeMeta) -> Result<CompactSliceStore, StoreError> {
        check_finalize(&meta, self.slices.len(), self.sh)?;
        Ok(CompactSliceStore {
            meta,
            level: self.level,
            slices: self.slices,
        })
    }
}

/// 封存后的内存压缩存储.
#[derive(Debug, Clone)]
pub struct CompactSliceStore {
    meta: VolumeMeta,
    level: u32,
    slices: Vec<CompactDistSlice>,
}

impl CompactSliceStore {
    /// 所有切片压缩后的总字节数.
    pub fn compressed_bytes(&self) -> usize {
        self.slices.iter().map(CompactDistSlice::compressed_len).sum()
    }
}

impl VolumeAttr for CompactSliceStore {
    #[inline]
    fn meta(&self) -> &VolumeMeta {
        &self.meta
    }
}

impl SliceStore for CompactSliceStore {
    fn read_slice(&self, z: usize) -> Result<OwnedDistSlice, StoreError> {
        check_z(z, self.slices.len())?;
        self.slices[z].decompress()
    }

    fn write_slice(&mut self, z: usize, slice: DistSlice<'_>) -> Result<(), StoreError> {
        check_z(z, self.slices.len())?;
        check_shape(self.slice_shape(), slice.shape())?;
        self.slices[z] = slice.to_owned().compress(self.level)?;
        Ok(())
    }
}
