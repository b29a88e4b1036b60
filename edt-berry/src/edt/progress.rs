//! 进度回调.

/// 接收 `[0, 1]` 内进度值的回调.
///
/// 距离变换保证: 报告的进度值单调不减, 且最后一次报告恰好为 `1.0`.
/// 正向扫描占据 `[0, split]`, 反向扫描占据 `[split, 1]`, 每张切片各报告一次.
pub trait Progress {
    /// 报告当前进度.
    fn report(&mut self, fraction: f64);
}

impl<F: FnMut(f64)> Progress for F {
    #[inline]
    fn report(&mut self, fraction: f64) {
        self(fraction)
    }
}

/// 不接收进度.
impl Progress for () {
    #[inline]
    fn report(&mut self, _fraction: f64) {}
}

/// 第 `done / total` 步在 `[lo, hi]` 中对应的进度. 最后一步恰好为 `hi`.
#[inline]
pub(crate) fn stage(lo: f64, hi: f64, done: usize, total: usize) -> f64 {
    if done >= total {
        hi
    } else {
        lo + (hi - lo) * done as f64 / total as f64
    }
}

/// 保证单调不减并截断到 `[0, 1]` 的进度包装.
pub(crate) struct Monotone<'p, P: Progress + ?Sized> {
    inner: &'p mut P,
    last: f64,
}

impl<'p, P: Progress + ?Sized> Monotone<'p, P> {
    #[inline]
    pub(crate) fn new(inner: &'p mut P) -> Self {
        Self { inner, last: 0.0 }
    }

    /// 若尚未报告过 `1.0`, 补报一次.
    pub(crate) fn finish(&mut self) {
        if self.last < 1.0 {
            self.report(1.0);
        }
    }
}

impl<P: Progress + ?Sized> Progress for Monotone<'_, P> {
    #[inline]
    fn report(&mut self, fraction: f64) {
        let f = fraction.clamp(0.0, 1.0).max(self.last);
        self.last = f;
        self.inner.report(f);
    }
}
