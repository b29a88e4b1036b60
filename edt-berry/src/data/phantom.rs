//! 合成体数据 (phantom).
//!
//! 所有 phantom 都使用 [`IntensityWindow::unit`] 窗口, 背景强度为 0, 前景强度为 1.
//! 因此在 `(0, 1]` 内的任意阈值下, 背景/前景划分都是一致的.

use super::{InMemoryVolume, IntensityWindow};
use crate::Idx3d;
use ndarray::Array3;

/// 背景强度.
pub const BACKGROUND: f32 = 0.0;

/// 前景强度.
pub const FOREGROUND: f32 = 1.0;

#[inline]
fn filled(shape: Idx3d, value: f32, spacing: [f64; 3]) -> InMemoryVolume {
    InMemoryVolume::new(Array3::from_elem(shape, value), spacing)
        .with_window(IntensityWindow::unit())
}

/// 全背景体数据.
#[inline]
pub fn all_background(shape: Idx3d, spacing: [f64; 3]) -> InMemoryVolume {
    filled(shape, BACKGROUND, spacing)
}

/// 全前景体数据. 其距离场处处为正无穷.
#[inline]
pub fn all_foreground(shape: Idx3d, spacing: [f64; 3]) -> InMemoryVolume {
    filled(shape, FOREGROUND, spacing)
}

/// 除 `seed` 处为背景外, 其余体素均为前景.
///
/// 如果 `seed` 越界, 则程序 panic.
pub fn single_seed(shape: Idx3d, seed: Idx3d, spacing: [f64; 3]) -> InMemoryVolume {
    let mut v = all_foreground(shape, spacing);
    v[seed] = BACKGROUND;
    v
}

/// 除 `pos` 处为前景外, 其余体素均为背景.
///
/// 如果 `pos` 越界, 则程序 panic.
pub fn single_foreground(shape: Idx3d, pos: Idx3d, spacing: [f64; 3]) -> InMemoryVolume {
    let mut v = all_background(shape, spacing);
    v[pos] = FOREGROUND;
    v
}

/// 物理半径为 `radius` 的实心前景球, 球外为背景. `center` 以体素索引表示.
pub fn ball(shape: Idx3d, center: [f64; 3], radius: f64, spacing: [f64; 3]) -> InMemoryVolume {
    let r2 = radius * radius;
    let data = Array3::from_shape_fn(shape, |(z, h, w)| {
        let d2: f64 = [z, h, w]
            .iter()
            .zip(center.iter().zip(spacing.iter()))
            .map(|(&i, (&c, &s))| {
                let d = (i as f64 - c) * s;
                d * d
            })
            .sum();
        if d2 <= r2 {
            FOREGROUND
        } else {
            BACKGROUND
        }
    });
    InMemoryVolume::new(data, spacing).with_window(IntensityWindow::unit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VolumeAttr;

    #[test]
    fn test_single_seed() {
        let v = single_seed((3, 3, 3), (1, 1, 1), [1.0; 3]);
        assert_eq!(v[(1, 1, 1)], BACKGROUND);
        assert_eq!(v[(0, 0, 0)], FOREGROUND);
        assert_eq!(v.data().iter().filter(|p| **p == BACKGROUND).count(), 1);
    }

    #[test]
    fn test_ball() {
        let v = ball((9, 9, 9), [4.0; 3], 2.0, [1.0; 3]);
        assert_eq!(v.shape(), (9, 9, 9));
        assert_eq!(v[(4, 4, 4)], FOREGROUND);
        assert_eq!(v[(4, 4, 6)], FOREGROUND);
        assert_eq!(v[(4, 4, 7)], BACKGROUND);
        assert_eq!(v[(0, 0, 0)], BACKGROUND);

        // 各向异性: z 方向体素大两倍, 球在 z 方向只跨越 1 个体素.
        let v = ball((9, 9, 9), [4.0; 3], 2.0, [2.0, 1.0, 1.0]);
        assert_eq!(v[(5, 4, 4)], FOREGROUND);
        assert_eq!(v[(6, 4, 4)], BACKGROUND);
    }
}
