use crate::error::StoreError;
use crate::Idx2d;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use ndarray::iter::{Iter, IterMut};
use ndarray::{Array2, ArrayView2, ArrayViewMut2, Ix2};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::io::{Read, Write};
use std::ops::{Index, IndexMut};

/// 不可变、借用的二维水平输入切片. 像素值为归一化强度.
pub struct ScanSlice<'a> {
    /// 底层数据的轻量级视图.
    ///
    /// 这里有意把代码写死为 `ArrayView` 降低灵活性, 但使结构的意图更加明确.
    data: ArrayView2<'a, f32>,
}

/// 不可变、借用的二维水平距离切片.
///
/// 根据所处阶段, 像素值可能是 z 方向列距离, 平方距离或最终的欧氏距离.
/// 前景占位值为正无穷.
pub struct DistSlice<'a> {
    /// 底层数据的轻量级视图.
    data: ArrayView2<'a, f32>,
}

/// 可变、借用的二维水平距离切片.
pub struct DistSliceMut<'a> {
    /// 底层数据的轻量级视图.
    data: ArrayViewMut2<'a, f32>,
}

macro_rules! impl_index {
    ($($slice: ty),+) => {
        $(
            impl Index<Idx2d> for $slice {
                type Output = f32;

                #[inline]
                fn index(&self, index: Idx2d) -> &Self::Output {
                    &self.data[index]
                }
            }
        )+
    };
}

impl_index!(ScanSlice<'_>, DistSlice<'_>, DistSliceMut<'_>);

impl IndexMut<Idx2d> for DistSliceMut<'_> {
    #[inline]
    fn index_mut(&mut self, index: Idx2d) -> &mut Self::Output {
        &mut self.data[index]
    }
}

/// 切片不可变方法集合.
macro_rules! impl_slice_immut {
    ($life: lifetime, $slice: ty, $array: ty, $owned: ident) => {
        /// 不可变方法集合.
        impl<$life> $slice {
            /// 直接初始化.
            #[inline]
            pub fn new(data: $array) -> Self {
                Self { data }
            }

            /// 获得数据的一份不可变 shallow copy.
            #[inline]
            pub fn data(&self) -> ArrayView2<f32> {
                self.data.view()
            }

            /// 获取可以迭代图像像素的迭代器.
            #[inline]
            pub fn iter(&self) -> Iter<'_, f32, Ix2> {
                self.data.iter()
            }

            /// 获取给定位置 (高, 宽) 的像素值. 越界时返回 `None`.
            #[inline]
            pub fn get(&self, pos: Idx2d) -> Option<&f32> {
                self.data.get(pos)
            }

            /// 图像的分辨率 (高, 宽).
            #[inline]
            pub fn shape(&self) -> Idx2d {
                self.data.dim()
            }

            /// 图像的像素个数.
            #[inline]
            pub fn size(&self) -> usize {
                let (h, w) = self.shape();
                h * w
            }

            /// 判断一个索引是否合法 (未越界).
            #[inline]
            pub fn check(&self, (h, w): Idx2d) -> bool {
                let (h_len, w_len) = self.shape();
                h < h_len && w < w_len
            }

            /// 克隆自己, 获得一个拥有所有权的切片对象.
            pub fn to_owned(&self) -> $owned {
                $owned {
                    data: self.data.to_owned(),
                }
            }

            /// 以行优先规则, 获取能迭代图像所有 `(索引, 像素值)` 的迭代器.
            #[inline]
            pub fn indexed_iter(&self) -> impl Iterator<Item = (Idx2d, &f32)> {
                self.data.indexed_iter()
            }

            /// 获得行优先存储的序列化数据.
            /// 当原始数据本身就是行优先格式时, 可以避免一次 deepcopy.
            pub fn as_row_major_slice(&self) -> Cow<[f32]> {
                match self.data.as_slice() {
                    Some(s) => Cow::Borrowed(s),
                    None => Cow::Owned(self.data.iter().copied().collect()),
                }
            }
        }
    };
}

impl_slice_immut!('a, ScanSlice<'a>, ArrayView2<'a, f32>, OwnedScanSlice);
impl_slice_immut!('a, DistSlice<'a>, ArrayView2<'a, f32>, OwnedDistSlice);
impl_slice_immut!('a, DistSliceMut<'a>, ArrayViewMut2<'a, f32>, OwnedDistSlice);

/// 距离切片专有的不可变方法.
macro_rules! impl_dist_slice_immut {
    ($($slice: ty),+) => {
        $(
            impl $slice {
                /// 最大的有限像素值. 如果不存在有限值, 则返回 `None`.
                pub fn max_finite(&self) -> Option<f32> {
                    self.data
                        .iter()
                        .copied()
                        .filter(|v| v.is_finite())
                        .max_by_key(|v| OrderedFloat(*v))
                }

                /// 值为 0 的像素 (即背景) 个数.
                #[inline]
                pub fn count_background(&self) -> usize {
                    self.data.iter().filter(|v| **v == 0.0).count()
                }

                /// 该切片是否为全背景?
                #[inline]
                pub fn is_background(&self) -> bool {
                    self.data.iter().all(|v| *v == 0.0)
                }
            }
        )+
    };
}

impl_dist_slice_immut!(DistSlice<'_>, DistSliceMut<'_>);

/// 可变方法集合.
impl<'a> DistSliceMut<'a> {
    /// 获得数据的一份可变 shallow copy.
    #[inline]
    pub fn data_mut(&mut self) -> ArrayViewMut2<f32> {
        self.data.view_mut()
    }

    /// 获取可以迭代并修改图像像素的迭代器.
    #[inline]
    pub fn iter_mut(&mut self) -> IterMut<'_, f32, Ix2> {
        self.data.iter_mut()
    }

    /// 获取给定位置 (高, 宽) 的像素值, 并可就地修改. 越界时返回 `None`.
    #[inline]
    pub fn get_mut(&mut self, pos: Idx2d) -> Option<&mut f32> {
        self.data.get_mut(pos)
    }

    /// 获得一份不可变的 **本体** shallow copy.
    #[inline]
    pub fn shallow_copy(&self) -> DistSlice {
        DistSlice::new(self.data.view())
    }
}

/// 拥有所有权的二维水平输入切片.
#[derive(Clone, Debug)]
pub struct OwnedScanSlice {
    data: Array2<f32>,
}

impl OwnedScanSlice {
    /// 获得不可变切片引用.
    #[inline]
    pub fn as_immutable(&self) -> ScanSlice<'_> {
        ScanSlice::new(self.data.view())
    }

    /// 直接获得底层数据.
    #[inline]
    pub fn into_raw(self) -> Array2<f32> {
        self.data
    }

    /// 图像的分辨率 (高, 宽).
    #[inline]
    pub fn shape(&self) -> Idx2d {
        self.data.dim()
    }
}

impl From<Array2<f32>> for OwnedScanSlice {
    #[inline]
    fn from(data: Array2<f32>) -> Self {
        Self { data }
    }
}

/// 拥有所有权的二维水平距离切片.
///
/// `OwnedDistSlice` 仅提供到 `DistSlice` 和 `DistSliceMut`
/// 的轻量转换, 压缩和底层数据移动, 不提供任何其它方法.
#[derive(Clone, Debug, PartialEq)]
pub struct OwnedDistSlice {
    data: Array2<f32>,
}

impl OwnedDistSlice {
    /// 创建形状为 `(h, w)`, 所有像素值为 `value` 的切片.
    #[inline]
    pub fn filled(shape: Idx2d, value: f32) -> Self {
        Self {
            data: Array2::from_elem(shape, value),
        }
    }

    /// 获得不可变切片引用.
    #[inline]
    pub fn as_immutable(&self) -> DistSlice<'_> {
        DistSlice::new(self.data.view())
    }

    /// 获得可变切片引用.
    #[inline]
    pub fn as_mutable(&mut self) -> DistSliceMut<'_> {
        DistSliceMut::new(self.data.view_mut())
    }

    /// 直接获得底层数据.
    #[inline]
    pub fn into_raw(self) -> Array2<f32> {
        self.data
    }

    /// 图像的分辨率 (高, 宽).
    #[inline]
    pub fn shape(&self) -> Idx2d {
        self.data.dim()
    }

    /// 以 zlib 等级 `level` 压缩数据. `level` 超过 9 时按 9 处理.
    pub fn compress(&self, level: u32) -> Result<CompactDistSlice, StoreError> {
        let data = self.as_immutable();
        let buf = data.as_row_major_slice();
        let mut e = ZlibEncoder::new(
            Vec::with_capacity(buf.len()),
            Compression::new(level.min(9)),
        );
        let bytes: Vec<u8> = buf.iter().flat_map(|v| v.to_le_bytes()).collect();
        e.write_all(&bytes)?;
        Ok(CompactDistSlice {
            buf: e.finish()?,
            sh: self.shape(),
        })
    }
}

impl From<Array2<f32>> for OwnedDistSlice {
    #[inline]
    fn from(data: Array2<f32>) -> Self {
        Self { data }
    }
}

/// 压缩存储的 `OwnedDistSlice`; 不透明类型.
///
/// 压缩前的数据是行优先、小端序的 `f32` 字节流.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompactDistSlice {
    /// 压缩的不透明字节流.
    buf: Vec<u8>,

    /// 形状.
    sh: Idx2d,
}

impl CompactDistSlice {
    /// 原始切片形状 (高, 宽).
    #[inline]
    pub fn shape(&self) -> Idx2d {
        self.sh
    }

    /// 压缩后的字节数.
    #[inline]
    pub fn compressed_len(&self) -> usize {
        self.buf.len()
    }

    /// 解压缩数据. 如果解出的体素个数与形状不符, 返回 [`StoreError::Corrupted`].
    pub fn decompress(&self) -> Result<OwnedDistSlice, StoreError> {
        let (h, w) = self.sh;
        let mut d = ZlibDecoder::new(self.buf.as_slice());
        let mut bytes = Vec::with_capacity(h * w * 4);
        d.read_to_end(&mut bytes)?;
        if bytes.len() != h * w * 4 {
            return Err(StoreError::Corrupted {
                expected: h * w,
                found: bytes.len() / 4,
            });
        }
        let values: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        // 长度已检查, 该操作不会生成 `Err`.
        let data = Array2::from_shape_vec((h, w), values).map_err(|_| StoreError::Corrupted {
            expected: h * w,
            found: h * w,
        })?;
        Ok(OwnedDistSlice { data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_compress_keeps_infinity() {
        let s = OwnedDistSlice::from(array![[0.0, 1.5, f32::INFINITY], [2.25, 0.0, 3.0]]);
        for level in [0, 6, 9] {
            let c = s.compress(level).unwrap();
            assert_eq!(c.shape(), (2, 3));
            assert_eq!(c.decompress().unwrap(), s);
        }
    }

    #[test]
    fn test_corrupted_payload() {
        let s = OwnedDistSlice::filled((2, 2), 1.0);
        let mut c = s.compress(6).unwrap();
        c.sh = (3, 3);
        assert!(matches!(
            c.decompress(),
            Err(StoreError::Corrupted {
                expected: 9,
                found: 4
            })
        ));
    }

    #[test]
    fn test_dist_slice_stats() {
        let s = OwnedDistSlice::from(array![[0.0, 1.5], [f32::INFINITY, 0.0]]);
        let v = s.as_immutable();
        assert_eq!(v.max_finite(), Some(1.5));
        assert_eq!(v.count_background(), 2);
        assert!(!v.is_background());
        assert!(OwnedDistSlice::filled((3, 2), 0.0)
            .as_immutable()
            .is_background());
        assert_eq!(
            OwnedDistSlice::filled((1, 1), f32::INFINITY)
                .as_immutable()
                .max_finite(),
            None
        );
    }

    #[test]
    fn test_non_standard_layout_row_major() {
        let a = array![[1.0f32, 2.0], [3.0, 4.0]];
        let t = a.t();
        let s = DistSlice::new(t);
        assert_eq!(s.as_row_major_slice().as_ref(), &[1.0, 3.0, 2.0, 4.0]);
    }
}
