//! 流式切片存储.
//!
//! 存储的生命周期分为两个阶段:
//!
//! 1. 构建阶段: 通过 [`SliceSink::push_slice`] 按 z 升序逐张追加切片;
//! 2. 封存后: [`SliceSink::finalize`] 产生一个 [`SliceStore`],
//!   可以按 z 索引随机读取或就地重写切片, 但不能再追加.
//!
//! 该约定对具体后端不做任何要求. 本模块提供三种后端:
//! 纯内存 ([`MemSliceStore`]), 内存压缩 ([`CompactSliceStore`])
//! 以及每张切片一个文件的磁盘存储 ([`DiskSliceStore`]).

use crate::data::{DistSlice, DistSliceMut, OwnedDistSlice, VolumeAttr, VolumeMeta};
use crate::error::StoreError;
use crate::Idx2d;

mod compact;
mod disk;
mod memory;

pub use compact::{CompactSliceSink, CompactSliceStore};
pub use disk::{DiskSliceSink, DiskSliceStore};
pub use memory::{MemSliceSink, MemSliceStore};

/// 构建阶段的切片存储: 只能按 z 升序追加.
pub trait SliceSink {
    /// 封存后得到的存储类型.
    type Store: SliceStore;

    /// 追加下一张切片. 所有切片的形状必须一致, 否则返回 [`StoreError::ShapeMismatch`].
    fn push_slice(&mut self, slice: DistSlice<'_>) -> Result<(), StoreError>;

    /// 已经追加的切片个数.
    fn len_pushed(&self) -> usize;

    /// 封存. `meta` 被原样记录为输出的元信息;
    /// 其形状必须与已追加的切片一致.
    fn finalize(self, meta: VolumeMeta) -> Result<Self::Store, StoreError>;
}

/// 封存后的切片存储: 可以随机读取, 也可以就地重写.
pub trait SliceStore: VolumeAttr {
    /// 读取第 `z` 张切片.
    fn read_slice(&self, z: usize) -> Result<OwnedDistSlice, StoreError>;

    /// 用 `slice` 覆写第 `z` 张切片. 形状必须与存储一致.
    fn write_slice(&mut self, z: usize, slice: DistSlice<'_>) -> Result<(), StoreError>;

    /// 以 "读取 - 修改 - 提交" 方式访问第 `z` 张切片.
    ///
    /// 修改只有在调用 [`WriteableSlice::commit`] 后才会写回存储.
    fn writeable_slice(&mut self, z: usize) -> Result<WriteableSlice<'_, Self>, StoreError>
    where
        Self: Sized,
    {
        let data = self.read_slice(z)?;
        Ok(WriteableSlice {
            store: self,
            z,
            data,
        })
    }
}

/// 某张切片的可写句柄.
///
/// 该句柄持有切片的一份拷贝; 直接 drop 句柄会丢弃所有修改.
pub struct WriteableSlice<'s, S: SliceStore> {
    store: &'s mut S,
    z: usize,
    data: OwnedDistSlice,
}

impl<'s, S: SliceStore> WriteableSlice<'s, S> {
    /// 切片的 z 索引.
    #[inline]
    pub fn z(&self) -> usize {
        self.z
    }

    /// 获得不可变切片引用.
    #[inline]
    pub fn as_immutable(&self) -> DistSlice<'_> {
        self.data.as_immutable()
    }

    /// 获得可变切片引用.
    #[inline]
    pub fn as_mutable(&mut self) -> DistSliceMut<'_> {
        self.data.as_mutable()
    }

    /// 将修改写回存储.
    pub fn commit(self) -> Result<(), StoreError> {
        let Self { store, z, data } = self;
        store.write_slice(z, data.as_immutable())
    }
}

/// 检查 z 索引是否越界.
#[inline]
pub(crate) fn check_z(z: usize, len: usize) -> Result<(), StoreError> {
    if z < len {
        Ok(())
    } else {
        Err(StoreError::OutOfRange { z, len })
    }
}

/// 检查切片形状是否与期望一致.
#[inline]
pub(crate) fn check_shape(expected: Idx2d, found: Idx2d) -> Result<(), StoreError> {
    if expected == found {
        Ok(())
    } else {
        Err(StoreError::ShapeMismatch { expected, found })
    }
}

/// 构建阶段追加切片时的形状记录. 第一张切片决定后续所有切片的形状.
#[inline]
pub(crate) fn track_shape(sh: &mut Option<Idx2d>, found: Idx2d) -> Result<(), StoreError> {
    match sh {
        Some(expected) => check_shape(*expected, found),
        None => {
            *sh = Some(found);
            Ok(())
        }
    }
}

/// 封存时检查元信息与已追加的切片是否一致.
pub(crate) fn check_finalize(
    meta: &VolumeMeta,
    pushed: usize,
    sh: Option<Idx2d>,
) -> Result<(), StoreError> {
    let (z, h, w) = meta.shape;
    if z != pushed {
        return Err(StoreError::LengthMismatch {
            expected: z,
            found: pushed,
        });
    }
    match sh {
        Some(found) => check_shape((h, w), found),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    /// 所有后端共用的约定测试.
    pub(crate) fn contract<K: SliceSink>(mut sink: K) {
        let a = OwnedDistSlice::from(array![[0.0, 1.0, f32::INFINITY], [2.0, 0.0, 3.0]]);
        let b = OwnedDistSlice::filled((2, 3), 7.0);
        sink.push_slice(a.as_immutable()).unwrap();
        assert_eq!(sink.len_pushed(), 1);

        // 形状不一致.
        let bad = OwnedDistSlice::filled((3, 2), 0.0);
        assert!(matches!(
            sink.push_slice(bad.as_immutable()),
            Err(StoreError::ShapeMismatch {
                expected: (2, 3),
                found: (3, 2)
            })
        ));
        sink.push_slice(b.as_immutable()).unwrap();
        assert_eq!(sink.len_pushed(), 2);

        let meta = VolumeMeta::new((2, 2, 3), [1.5, 1.0, 0.5]).with_offset([1.0, 2.0, 3.0]);
        let mut store = sink.finalize(meta.clone()).unwrap();
        assert_eq!(store.meta(), &meta);
        assert_eq!(store.len_z(), 2);
        assert_eq!(store.read_slice(0).unwrap(), a);
        assert_eq!(store.read_slice(1).unwrap(), b);
        assert!(matches!(
            store.read_slice(2),
            Err(StoreError::OutOfRange { z: 2, len: 2 })
        ));

        // 读取 - 修改 - 提交.
        let mut ws = store.writeable_slice(0).unwrap();
        assert_eq!(ws.z(), 0);
        ws.as_mutable()[(0, 2)] = 4.0;
        ws.commit().unwrap();
        assert_eq!(store.read_slice(0).unwrap().as_immutable()[(0, 2)], 4.0);

        // 未提交的修改被丢弃.
        let mut ws = store.writeable_slice(1).unwrap();
        ws.as_mutable()[(0, 0)] = -1.0;
        drop(ws);
        assert_eq!(store.read_slice(1).unwrap(), b);

        assert!(store.write_slice(0, bad.as_immutable()).is_err());
        assert!(store.write_slice(5, a.as_immutable()).is_err());
    }

    pub(crate) fn finalize_mismatch<K: SliceSink>(mut sink: K) {
        let a = OwnedDistSlice::filled((2, 2), 0.0);
        sink.push_slice(a.as_immutable()).unwrap();
        assert!(matches!(
            sink.finalize(VolumeMeta::new((3, 2, 2), [1.0; 3])),
            Err(StoreError::LengthMismatch {
                expected: 3,
                found: 1
            })
        ));
    }

    #[test]
    fn test_check_helpers() {
        assert!(check_z(0, 1).is_ok());
        assert!(check_z(1, 1).is_err());
        let mut sh = None;
        assert!(track_shape(&mut sh, (2, 2)).is_ok());
        assert!(track_shape(&mut sh, (2, 2)).is_ok());
        assert!(track_shape(&mut sh, (2, 3)).is_err());
        let meta = VolumeMeta::new((1, 2, 2), [1.0; 3]);
        assert!(check_finalize(&meta, 1, sh).is_ok());
        assert!(check_finalize(&meta, 1, Some((4, 4))).is_err());
    }
}
