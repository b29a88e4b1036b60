//! 一维抛物线下包络 (Felzenszwalb–Huttenlocher) 距离变换.
//!
//! 给定种子值 `f(0..n)` 和均匀间距 `sp`, 对每个 `q` 计算
//!
//! ```text
//! d(q) = min_i f(i) + sp² · (q − i)²
//! ```
//!
//! `f(i) = +inf` 的位置不产生抛物线. 该变换分两步完成, 总复杂度 O(n).

use crate::error::{EdtError, EdtResult};

/// 一条扫描线的下包络状态.
///
/// - `v[k]`: 第 `k` 条位于包络上的抛物线的顶点位置 (体素索引);
/// - `z[k]`: 第 `k` 条抛物线开始成为最小值的分界点 (物理坐标),
///   `z[0] = -inf`, 最后一条抛物线之后为 `+inf`.
///
/// 缓冲区可以在同一 worker 的多条扫描线之间复用, 但不能被多个 worker 共享.
#[derive(Clone, Debug, Default)]
pub struct LowerEnvelope {
    v: Vec<usize>,
    z: Vec<f64>,
}

impl LowerEnvelope {
    /// 为长度不超过 `n` 的扫描线预分配缓冲区.
    #[inline]
    pub fn with_len(n: usize) -> Self {
        Self {
            v: vec![0; n + 1],
            z: vec![0.0; n + 1],
        }
    }

    /// 保证缓冲区能容纳长度为 `n` 的扫描线.
    #[inline]
    fn reserve(&mut self, n: usize) {
        if self.v.len() < n + 1 {
            self.v.resize(n + 1, 0);
            self.z.resize(n + 1, 0.0);
        }
    }

    /// 位于 `p` 和 `q` 处两条抛物线交点的物理横坐标. 要求 `p < q`, 且两处种子值有限.
    #[inline]
    fn intersection(f: &[f64], p: usize, q: usize, sp: f64) -> f64 {
        let (pf, qf) = (p as f64, q as f64);
        ((f[q] - f[p]) + sp * sp * (qf * qf - pf * pf)) / (2.0 * sp * (qf - pf))
    }

    /// 对种子值 `f` 做一维距离变换, 结果写入 `out`. `spacing` 为相邻位置的物理间距.
    ///
    /// 若 `f` 全为正无穷, 则 `out` 也全为正无穷.
    ///
    /// # 错误
    ///
    /// 种子值中出现 NaN, 或者包络分界点没有严格递增时, 返回 [`EdtError::NumericInvariant`].
    ///
    /// # Panics
    ///
    /// `f` 与 `out` 长度不一致时 panic.
    pub fn transform(&mut self, f: &[f64], spacing: f64, out: &mut [f64]) -> EdtResult<()> {
        let n = f.len();
        assert_eq!(n, out.len(), "输入输出扫描线长度不一致");
        if n == 0 {
            return Ok(());
        }
        if let Some(index) = f.iter().position(|x| x.is_nan()) {
            return Err(EdtError::NumericInvariant {
                index,
                detail: "种子值为 NaN".to_string(),
            });
        }
        self.reserve(n);
        let (v, z) = (&mut self.v, &mut self.z);
        let sp = spacing;

        let mut k = 0usize;
        v[0] = 0;
        z[0] = f64::NEG_INFINITY;
        z[1] = f64::INFINITY;

        for q in 1..n {
            if f[q] == f64::INFINITY {
                continue;
            }
            // 包络中唯一的抛物线来自无穷远种子, 直接替换.
            if k == 0 && f[v[0]] == f64::INFINITY {
                v[0] = q;
                continue;
            }

            let mut s = Self::intersection(f, v[k], q, sp);
            while k > 0 && s <= z[k] {
                k -= 1;
                s = Self::intersection(f, v[k], q, sp);
            }
            if !(s > z[k]) {
                return Err(EdtError::NumericInvariant {
                    index: q,
                    detail: format!("包络分界点未严格递增: s = {s}, z[{k}] = {}", z[k]),
                });
            }
            k += 1;
            v[k] = q;
            z[k] = s;
            z[k + 1] = f64::INFINITY;
        }

        let mut k = 0usize;
        for (q, o) in out.iter_mut().enumerate() {
            let x = sp * q as f64;
            while z[k + 1] < x {
                k += 1;
            }
            let d = sp * (q as f64 - v[k] as f64);
            *o = f[v[k]] + d * d;
        }
        Ok(())
    }
}
