//! 通用常量.

/// 默认二值化阈值. 归一化强度 **严格小于** 该值的体素视为背景.
pub const DEFAULT_THRESHOLD: f32 = 0.5;

/// 默认进度划分点: 正向扫描占据 `[0, 0.5]`, 反向扫描占据 `[0.5, 1]`.
pub const DEFAULT_PROGRESS_SPLIT: f64 = 0.5;

/// 默认 zlib 压缩等级.
pub const DEFAULT_COMPRESSION: u32 = 6;

/// zlib 支持的最大压缩等级.
pub const MAX_COMPRESSION: u32 = 9;

/// 前景体素的距离占位值. 必须是 IEEE-754 正无穷, 不能用大的有限值替代,
/// 否则包络交点公式中的平方项可能溢出.
pub const FOREGROUND: f32 = f32::INFINITY;

/// 体素类型.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ElemType {
    /// 归一化强度小于阈值, 即距离场的种子.
    Background,

    /// 归一化强度不小于阈值 (或为 NaN).
    Foreground,
}

impl ElemType {
    /// 按照 `threshold` 对归一化强度 `v` 分类. 等于阈值的体素属于前景.
    #[inline]
    pub fn classify(v: f32, threshold: f32) -> Self {
        if v < threshold {
            Self::Background
        } else {
            Self::Foreground
        }
    }

    /// 是否为前景.
    #[inline]
    pub fn is_foreground(&self) -> bool {
        matches!(self, Self::Foreground)
    }

    /// 是否为背景.
    #[inline]
    pub fn is_background(&self) -> bool {
        !self.is_foreground()
    }
}
