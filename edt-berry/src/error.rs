//! 运行时错误.

use crate::Idx2d;
use thiserror::Error;

/// 切片读写错误. 切片存储和输入体数据共用该类型.
#[derive(Debug, Error)]
pub enum StoreError {
    /// 底层 I/O 错误.
    #[error("切片 I/O 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 切片或元信息编解码错误.
    #[error("切片编解码错误: {0}")]
    Codec(#[from] bincode::Error),

    /// 解压后的数据长度与记录的形状不符.
    #[error("切片数据损坏: 期望 {expected} 个体素, 实际 {found} 个")]
    Corrupted {
        /// 形状对应的体素个数.
        expected: usize,
        /// 实际解出的体素个数.
        found: usize,
    },

    /// 切片形状与存储的形状不一致.
    #[error("切片形状不一致: 期望 {expected:?}, 实际 {found:?}")]
    ShapeMismatch {
        /// 存储的切片形状 `(h, w)`.
        expected: Idx2d,
        /// 提交的切片形状 `(h, w)`.
        found: Idx2d,
    },

    /// 封存时切片个数与元信息不一致.
    #[error("切片个数不一致: 元信息声明 {expected} 张, 实际推入 {found} 张")]
    LengthMismatch {
        /// 元信息声明的切片个数.
        expected: usize,
        /// 实际推入的切片个数.
        found: usize,
    },

    /// z 索引越界.
    #[error("z 索引越界: {z} >= {len}")]
    OutOfRange {
        /// 请求的索引.
        z: usize,
        /// 切片总数.
        len: usize,
    },

    /// NIfTI 文件读取错误.
    #[error("NIfTI 读取错误: {0}")]
    Nifti(String),

    /// 导出 npy 文件失败.
    #[error("npy 写入错误: {0}")]
    Npy(#[from] ndarray_npy::WriteNpyError),
}

impl From<nifti::NiftiError> for StoreError {
    fn from(e: nifti::NiftiError) -> Self {
        Self::Nifti(e.to_string())
    }
}

/// 距离变换错误.
///
/// 任何错误都会立即中止整个变换; 不存在部分结果.
/// 此时输出存储处于不一致状态, 调用者应直接丢弃它.
#[derive(Debug, Error)]
pub enum EdtError {
    /// 输入体数据或参数不合法. 在任何切片 I/O 之前检出.
    #[error("输入不合法: {0}")]
    InvalidInput(String),

    /// 读取第 `z` 张输入切片失败.
    #[error("读取第 {z} 张输入切片失败: {source}")]
    VolumeRead {
        /// 切片索引.
        z: usize,
        /// 底层错误.
        #[source]
        source: StoreError,
    },

    /// 读写第 `z` 张输出切片失败.
    #[error("读写第 {z} 张输出切片失败: {source}")]
    Store {
        /// 切片索引.
        z: usize,
        /// 底层错误.
        #[source]
        source: StoreError,
    },

    /// 一维包络中出现了 NaN 或非递增的分界点. 属于逻辑错误, 正确输入下不可达.
    #[error("数值不变量被破坏 (扫描线位置 {index}): {detail}")]
    NumericInvariant {
        /// 出错时扫描线上的位置.
        index: usize,
        /// 具体描述.
        detail: String,
    },
}

impl EdtError {
    /// 构建 [`EdtError::InvalidInput`].
    #[inline]
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput(reason.into())
    }

    /// 该错误是否来自切片 I/O (输入或输出).
    #[inline]
    pub fn is_io(&self) -> bool {
        matches!(self, Self::VolumeRead { .. } | Self::Store { .. })
    }
}

/// 距离变换运行结果.
pub type EdtResult<T> = Result<T, EdtError>;

/// 给切片存储错误附加 z 索引.
pub(crate) trait StoreContext<T> {
    /// 作为输出存储错误.
    fn at_store(self, z: usize) -> EdtResult<T>;

    /// 作为输入体数据错误.
    fn at_volume(self, z: usize) -> EdtResult<T>;
}

impl<T> StoreContext<T> for Result<T, StoreError> {
    #[inline]
    fn at_store(self, z: usize) -> EdtResult<T> {
        self.map_err(|source| EdtError::Store { z, source })
    }

    #[inline]
    fn at_volume(self, z: usize) -> EdtResult<T> {
        self.map_err(|source| EdtError::VolumeRead { z, source })
    }
}
