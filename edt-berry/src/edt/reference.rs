//! 暴力求解的参考实现. 复杂度为 O(体素个数 × 背景体素个数), 仅适用于小体数据.

use crate::consts::{ElemType, FOREGROUND};
use crate::data::Volume;
use crate::error::StoreError;
use crate::Idx3d;
use itertools::iproduct;
use ndarray::{Array3, Axis};

/// 对每个体素, 枚举所有背景体素求最小物理距离. 不存在背景体素时结果全为正无穷.
///
/// 二值化规则与 [`super::forward_pass`] 完全一致.
pub fn brute_force<V: Volume + ?Sized>(volume: &V, threshold: f32) -> Result<Array3<f32>, StoreError> {
    let shape = volume.shape();
    let (nz, _, _) = shape;
    let [sz, sy, sx] = volume.pix_dim();

    let mut seeds: Vec<Idx3d> = Vec::new();
    for z in 0..nz {
        let s = volume.slice_at(z)?;
        seeds.extend(
            s.as_immutable()
                .indexed_iter()
                .filter(|(_, v)| ElemType::classify(**v, threshold).is_background())
                .map(|((h, w), _)| (z, h, w)),
        );
    }

    let mut ans = Array3::from_elem(shape, FOREGROUND);
    if seeds.is_empty() {
        return Ok(ans);
    }
    for (z, mut plane) in ans.axis_iter_mut(Axis(0)).enumerate() {
        let (h_len, w_len) = plane.dim();
        for (h, w) in iproduct!(0..h_len, 0..w_len) {
            let d2 = seeds
                .iter()
                .map(|&(z0, h0, w0)| {
                    let dz = (z as f64 - z0 as f64) * sz;
                    let dy = (h as f64 - h0 as f64) * sy;
                    let dx = (w as f64 - w0 as f64) * sx;
                    dz * dz + dy * dy + dx * dx
                })
                .fold(f64::INFINITY, f64::min);
            plane[(h, w)] = d2.sqrt() as f32;
        }
    }
    Ok(ans)
}

#[cfg(test)]
mod tests {
    use super::brute_force;
    use crate::data::phantom;
    use approx::assert_relative_eq;

    #[test]
    fn test_single_seed_corner() {
        let v = phantom::single_seed((5, 5, 5), (2, 2, 2), [1.0; 3]);
        let d = brute_force(&v, 0.5).unwrap();
        assert_eq!(d[(2, 2, 2)], 0.0);
        assert_relative_eq!(d[(0, 0, 0)], 12f32.sqrt());
    }

    #[test]
    fn test_no_background() {
        let v = phantom::all_foreground((2, 3, 4), [1.0; 3]);
        assert!(brute_force(&v, 0.5)
            .unwrap()
            .iter()
            .all(|x| *x == f32::INFINITY));
    }
}
