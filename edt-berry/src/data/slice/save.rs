//! 距离切片的可视化存储.

use crate::{DistSlice, DistSliceMut, OwnedDistSlice};
use image::ImageResult;
use std::path::Path;

/// 表明一个可以通过 **可视化友好** 模式持久化存储的图像对象.
///
/// 距离切片以 `f32` 保存, 无法按原样写入常见图像格式.
/// 因此保存时会以切片中最大的有限距离为上限, 线性映射到 8-bit 灰度:
/// 背景为黑色, 越远越亮, 正无穷 (不存在任何背景种子) 为白色.
pub trait ImgWriteVis {
    /// 按照上述可视化规则将图片保存到 `path` 路径.
    fn save<P: AsRef<Path>>(&self, path: P) -> ImageResult<()>;
}

/// 将距离 `d` 按上限 `max` 映射为灰度.
#[inline]
pub(crate) fn pretty(d: f32, max: f32) -> u8 {
    if !d.is_finite() {
        return u8::MAX;
    }
    if max <= 0.0 {
        return u8::MIN;
    }
    // 255, not 256.
    ((d / max).clamp(0.0, 1.0) * 255.0) as u8
}

macro_rules! impl_dist_vis {
    ($($slice: ty),+) => {
        $(
            impl ImgWriteVis for $slice {
                fn save<P: AsRef<Path>>(&self, path: P) -> ImageResult<()> {
                    let (height, width) = self.shape();
                    let max = self.max_finite().unwrap_or(0.0);
                    let mut buf = image::GrayImage::new(width as u32, height as u32);
                    for ((h, w), &d) in self.indexed_iter() {
                        buf.put_pixel(w as u32, h as u32, image::Luma([pretty(d, max)]));
                    }
                    buf.save(path)
                }
            }
        )+
    };
}

impl_dist_vis!(DistSlice<'_>, DistSliceMut<'_>);

impl ImgWriteVis for OwnedDistSlice {
    #[inline]
    fn save<P: AsRef<Path>>(&self, path: P) -> ImageResult<()> {
        self.as_immutable().save(path)
    }
}
