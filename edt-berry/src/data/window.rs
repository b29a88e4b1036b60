/// 强度归一化窗口, 包含窗位 (level) 和窗宽 (width).
///
/// 窗口将原始体素强度线性映射到 `[0, 1]`: 不高于窗下限的值映射为 0,
/// 不低于窗上限的值映射为 1.
///
/// 该窗口是只读的. 若要修改窗口参数, 你应该创建新的实例.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct IntensityWindow {
    level: f32,
    width: f32,
}

impl IntensityWindow {
    /// 构建窗口.
    ///
    /// `level` 必须有限, `width` 必须为有限正数, 否则返回 `None`.
    pub fn new(level: f32, width: f32) -> Option<IntensityWindow> {
        if level.is_finite() && width.is_finite() && width > 0.0 {
            Some(Self { level, width })
        } else {
            None
        }
    }

    /// 以 `[min, max]` 为窗口范围构建窗口. 要求 `min < max` 且二者有限.
    #[inline]
    pub fn from_range(min: f32, max: f32) -> Option<IntensityWindow> {
        Self::new((min + max) / 2.0, max - min)
    }

    /// `[0, 1]` 上的恒等映射. 适用于已经归一化的数据.
    #[inline]
    pub const fn unit() -> IntensityWindow {
        Self {
            level: 0.5,
            width: 1.0,
        }
    }

    /// 窗下限.
    #[inline]
    pub fn lower_bound(&self) -> f32 {
        self.level - self.width / 2.0
    }

    /// 窗上限.
    #[inline]
    pub fn upper_bound(&self) -> f32 {
        self.level + self.width / 2.0
    }

    /// 窗位.
    #[inline]
    pub fn level(&self) -> f32 {
        self.level
    }

    /// 窗宽.
    #[inline]
    pub fn width(&self) -> f32 {
        self.width
    }

    /// 求在当前窗口设置下, 原始强度 `v` 对应的归一化值 (0.0 <= value <= 1.0).
    ///
    /// 如果 `v` 无意义 (如 inf, NaN), 则返回 `None`.
    pub fn eval(&self, v: f32) -> Option<f32> {
        if !v.is_finite() {
            return None;
        }
        let lb = self.lower_bound();
        if v <= lb {
            Some(0.0)
        } else if v >= self.upper_bound() {
            Some(1.0)
        } else {
            Some((v - lb) / self.width)
        }
    }

    /// 与 [`Self::eval`] 相同, 但无意义的输入映射为 NaN (之后会被分类为前景).
    #[inline]
    pub fn normalize(&self, v: f32) -> f32 {
        self.eval(v).unwrap_or(f32::NAN)
    }
}

impl Default for IntensityWindow {
    #[inline]
    fn default() -> Self {
        Self::unit()
    }
}

#[cfg(test)]
mod tests {
    use super::IntensityWindow;

    fn is_valid_init(level: f32, width: f32) -> bool {
        IntensityWindow::new(level, width).is_some()
    }

    #[test]
    fn test_window_invalid_input() {
        assert!(!is_valid_init(0.0, -1.0));
        assert!(!is_valid_init(0.0, 0.0));
        assert!(!is_valid_init(f32::NAN, 1.0));
        assert!(!is_valid_init(0.0, f32::INFINITY));
        assert!(IntensityWindow::from_range(3.0, 3.0).is_none());
    }

    fn float_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_window_generic() {
        // [60, 100]
        let w = IntensityWindow::new(80.0, 40.0).unwrap();
        assert_eq!(w.eval(f32::NAN), None);
        assert!(w.normalize(f32::NAN).is_nan());
        assert_eq!(w.eval(f32::MIN), Some(0.0));
        assert_eq!(w.eval(f32::MAX), Some(1.0));

        assert_eq!(w.eval(60.0), Some(0.0));
        assert!(float_eq(w.eval(70.0).unwrap(), 0.25));
        assert!(float_eq(w.eval(80.0).unwrap(), 0.5));
        assert!(float_eq(w.eval(90.0).unwrap(), 0.75));
        assert_eq!(w.eval(100.0), Some(1.0));

        // boundary
        assert!(w.eval(60.1).unwrap() > 0.0);
        assert!(w.eval(99.9).unwrap() < 1.0);
    }

    #[test]
    fn test_unit_window_is_identity() {
        let w = IntensityWindow::unit();
        for v in [0.0, 0.125, 0.5, 0.875, 1.0] {
            assert!(float_eq(w.eval(v).unwrap(), v));
        }
        let r = IntensityWindow::from_range(-1000.0, 1000.0).unwrap();
        assert!(float_eq(r.eval(0.0).unwrap(), 0.5));
    }
}
