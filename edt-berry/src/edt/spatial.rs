//! 单张切片内部的可分离距离变换 (x 方向与 y 方向).

use super::envelope::LowerEnvelope;
use super::PassOrder;
use crate::data::DistSliceMut;
use crate::error::EdtResult;
use ndarray::{Array2, ArrayViewMut1, Axis, Zip};

/// 切片内部变换所需的临时缓冲区.
///
/// 其中 `tmp` 即 "临时切片": 保存第一个方向变换后的平方距离.
/// 同一个 `SpatialScratch` 可以在多张切片之间复用.
#[derive(Debug)]
pub struct SpatialScratch {
    tmp: Array2<f64>,
    env: LowerEnvelope,
    fbuf: Vec<f64>,
    obuf: Vec<f64>,
}

impl Default for SpatialScratch {
    fn default() -> Self {
        Self::new()
    }
}

impl SpatialScratch {
    /// 初始化. 缓冲区在第一次使用时按切片大小分配.
    #[inline]
    pub fn new() -> Self {
        Self {
            tmp: Array2::zeros((0, 0)),
            env: LowerEnvelope::default(),
            fbuf: Vec::new(),
            obuf: Vec::new(),
        }
    }
}

/// 对一条扫描线就地做一维距离变换.
fn transform_lane(
    mut lane: ArrayViewMut1<f64>,
    spacing: f64,
    env: &mut LowerEnvelope,
    fbuf: &mut Vec<f64>,
    obuf: &mut Vec<f64>,
) -> EdtResult<()> {
    fbuf.clear();
    fbuf.extend(lane.iter().copied());
    obuf.clear();
    obuf.resize(fbuf.len(), 0.0);
    env.transform(fbuf, spacing, obuf)?;
    lane.iter_mut().zip(obuf.iter()).for_each(|(l, o)| *l = *o);
    Ok(())
}

/// 沿 `axis` 方向对 `tmp` 的每条扫描线就地做一维距离变换.
fn transform_axis(
    tmp: &mut Array2<f64>,
    axis: Axis,
    spacing: f64,
    parallel: bool,
    env: &mut LowerEnvelope,
    fbuf: &mut Vec<f64>,
    obuf: &mut Vec<f64>,
) -> EdtResult<()> {
    // 沿 axis 方向的扫描线, 是另一个轴上的子视图.
    let across = Axis(1 - axis.index());

    cfg_if::cfg_if! {
        if #[cfg(feature = "rayon")] {
            if parallel {
                use rayon::iter::{IntoParallelIterator, ParallelIterator};

                let n = tmp.len_of(axis);
                return tmp.axis_iter_mut(across).into_par_iter().try_for_each_init(
                    || (LowerEnvelope::with_len(n), Vec::with_capacity(n), Vec::with_capacity(n)),
                    |(env, fbuf, obuf), lane| transform_lane(lane, spacing, env, fbuf, obuf),
                );
            }
        } else {
            let _ = parallel;
        }
    }

    for lane in tmp.axis_iter_mut(across) {
        transform_lane(lane, spacing, env, fbuf, obuf)?;
    }
    Ok(())
}

/// 对一张切片就地做二维可分离距离变换.
///
/// 输入 `slice` 中是 **未平方** 的 z 方向列距离 (背景为 0, 无种子为正无穷);
/// 种子值在读入时平方. 第一个方向的结果保持平方形式写入临时切片,
/// 第二个方向的结果开方后写回 `slice`. `spacing` 为 `(y, x)` 方向的体素分辨率.
pub fn spatial_pass(
    mut slice: DistSliceMut<'_>,
    (sy, sx): (f64, f64),
    order: PassOrder,
    parallel: bool,
    scratch: &mut SpatialScratch,
) -> EdtResult<()> {
    let shape = slice.shape();
    let SpatialScratch {
        tmp,
        env,
        fbuf,
        obuf,
    } = scratch;
    if tmp.dim() != shape {
        *tmp = Array2::zeros(shape);
    }

    Zip::from(&mut *tmp).and(slice.data()).for_each(|t, &g| {
        let g = g as f64;
        *t = g * g;
    });

    // Axis(1) 即 x (宽) 方向, Axis(0) 即 y (高) 方向.
    let passes = match order {
        PassOrder::RowsFirst => [(Axis(1), sx), (Axis(0), sy)],
        PassOrder::ColumnsFirst => [(Axis(0), sy), (Axis(1), sx)],
    };
    for (axis, sp) in passes {
        transform_axis(tmp, axis, sp, parallel, env, fbuf, obuf)?;
    }

    Zip::from(slice.data_mut())
        .and(&*tmp)
        .for_each(|s, &t| *s = t.sqrt() as f32);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::OwnedDistSlice;
    use approx::assert_relative_eq;
    use ndarray::Array2;

    const INF: f32 = f32::INFINITY;

    /// 除 `seeds` 外全为前景的切片.
    fn seeded(shape: (usize, usize), seeds: &[(usize, usize)]) -> OwnedDistSlice {
        let mut a = Array2::from_elem(shape, INF);
        for s in seeds {
            a[*s] = 0.0;
        }
        a.into()
    }

    fn run(mut s: OwnedDistSlice, sp: (f64, f64), order: PassOrder, parallel: bool) -> Array2<f32> {
        spatial_pass(s.as_mutable(), sp, order, parallel, &mut SpatialScratch::new()).unwrap();
        s.into_raw()
    }

    /// 暴力求解.
    fn brute(shape: (usize, usize), seeds: &[(usize, usize)], (sy, sx): (f64, f64)) -> Array2<f32> {
        Array2::from_shape_fn(shape, |(h, w)| {
            seeds
                .iter()
                .map(|&(sh, sw)| {
                    let dy = (h as f64 - sh as f64) * sy;
                    let dx = (w as f64 - sw as f64) * sx;
                    (dy * dy + dx * dx).sqrt()
                })
                .fold(f64::INFINITY, f64::min) as f32
        })
    }

    #[test]
    fn test_order_independent() {
        let seeds = [(0, 0), (3, 7), (6, 2), (9, 9), (4, 4)];
        for sp in [(1.0, 1.0), (0.7, 1.9)] {
            let a = run(seeded((10, 12), &seeds), sp, PassOrder::RowsFirst, false);
            let b = run(seeded((10, 12), &seeds), sp, PassOrder::ColumnsFirst, false);
            let want = brute((10, 12), &seeds, sp);
            for ((x, y), w) in a.iter().zip(b.iter()).zip(want.iter()) {
                assert_relative_eq!(x, y, max_relative = 1e-5);
                assert_relative_eq!(x, w, max_relative = 1e-5);
            }
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let seeds = [(1, 1), (5, 10), (7, 3)];
        let a = run(seeded((8, 16), &seeds), (1.0, 0.5), PassOrder::RowsFirst, false);
        let b = run(seeded((8, 16), &seeds), (1.0, 0.5), PassOrder::RowsFirst, true);
        assert_eq!(a, b);
    }

    #[test]
    fn test_z_distance_seeds() {
        // 第一行的列距离为 3 (来自 z 方向), 其余无种子.
        let mut a = Array2::from_elem((3, 3), INF);
        a[(0, 1)] = 3.0;
        let out = run(a.into(), (1.0, 1.0), PassOrder::RowsFirst, false);
        assert_relative_eq!(out[(0, 1)], 3.0);
        assert_relative_eq!(out[(2, 2)], (9.0f32 + 4.0 + 1.0).sqrt());
    }

    #[test]
    fn test_no_seed_stays_infinite() {
        let out = run(seeded((4, 5), &[]), (1.0, 1.0), PassOrder::RowsFirst, false);
        assert!(out.iter().all(|v| *v == INF));
    }

    #[test]
    fn test_scratch_reused_across_shapes() {
        let mut scratch = SpatialScratch::new();
        for shape in [(3, 4), (6, 2), (3, 4)] {
            let mut s = seeded(shape, &[(0, 0)]);
            spatial_pass(s.as_mutable(), (1.0, 1.0), PassOrder::RowsFirst, false, &mut scratch)
                .unwrap();
            let (h, w) = shape;
            assert_relative_eq!(
                s.as_immutable()[(h - 1, w - 1)],
                (((h - 1) * (h - 1) + (w - 1) * (w - 1)) as f32).sqrt()
            );
        }
    }
}
