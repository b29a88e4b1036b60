//! 距离变换配置.

use crate::consts::{DEFAULT_COMPRESSION, DEFAULT_PROGRESS_SPLIT, DEFAULT_THRESHOLD, MAX_COMPRESSION};
use crate::edt::PassOrder;
use crate::error::{EdtError, EdtResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// 距离变换配置.
///
/// 所有字段都有合理的默认值. 可以通过 `with_*` 方法链式修改,
/// 或者通过 [`EdtConfig::from_env`] 从环境变量加载.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdtConfig {
    /// 二值化阈值, 位于 `[0, 1]`. 归一化强度严格小于它的体素是背景.
    pub threshold: f32,

    /// 正向扫描在进度区间中所占的比例, 位于 `[0, 1]`.
    pub progress_split: f64,

    /// 是否在切片内部按扫描线并行. 仅在启用 `rayon` feature 时生效.
    pub parallel: bool,

    /// 切片内部两个方向的处理顺序.
    pub order: PassOrder,

    /// 压缩存储使用的 zlib 等级, 位于 `[0, 9]`.
    pub compression: u32,

    /// 磁盘存储的根目录. 为 `None` 时见 [`EdtConfig::spill_dir_or_default`].
    pub spill_dir: Option<PathBuf>,
}

impl Default for EdtConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            progress_split: DEFAULT_PROGRESS_SPLIT,
            parallel: true,
            order: PassOrder::default(),
            compression: DEFAULT_COMPRESSION,
            spill_dir: None,
        }
    }
}

impl EdtConfig {
    /// 设置二值化阈值.
    #[inline]
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// 设置进度划分点.
    #[inline]
    pub fn with_progress_split(mut self, split: f64) -> Self {
        self.progress_split = split;
        self
    }

    /// 设置是否并行.
    #[inline]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// 设置切片内处理顺序.
    #[inline]
    pub fn with_order(mut self, order: PassOrder) -> Self {
        self.order = order;
        self
    }

    /// 设置压缩等级.
    #[inline]
    pub fn with_compression(mut self, level: u32) -> Self {
        self.compression = level;
        self
    }

    /// 设置磁盘存储根目录.
    #[inline]
    pub fn with_spill_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.spill_dir = Some(dir.into());
        self
    }

    /// 检查配置是否合法.
    pub fn validate(&self) -> EdtResult<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(EdtError::invalid_input(format!(
                "阈值必须位于 [0, 1], 实际为 {}",
                self.threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.progress_split) {
            return Err(EdtError::invalid_input(format!(
                "进度划分点必须位于 [0, 1], 实际为 {}",
                self.progress_split
            )));
        }
        if self.compression > MAX_COMPRESSION {
            return Err(EdtError::invalid_input(format!(
                "压缩等级必须位于 [0, {MAX_COMPRESSION}], 实际为 {}",
                self.compression
            )));
        }
        Ok(())
    }

    /// 是否真的以并行方式运行.
    #[inline]
    pub fn effective_parallel(&self) -> bool {
        cfg!(feature = "rayon") && self.parallel
    }

    /// 从默认配置出发, 用环境变量覆盖对应字段.
    ///
    /// 1. `$EDT_THRESHOLD`: 二值化阈值;
    /// 2. `$EDT_PARALLEL`: `0`/`false` 关闭并行, 其余值开启;
    /// 3. `$EDT_COMPRESSION`: zlib 压缩等级;
    /// 4. `$EDT_SPILL_DIR`: 磁盘存储根目录.
    ///
    /// 无法解析的数值返回 [`EdtError::InvalidInput`]. 返回前会调用 [`Self::validate`].
    pub fn from_env() -> EdtResult<Self> {
        let mut cfg = Self::default();
        if let Ok(v) = env::var("EDT_THRESHOLD") {
            cfg.threshold = v
                .trim()
                .parse()
                .map_err(|_| EdtError::invalid_input(format!("无法解析 EDT_THRESHOLD=`{v}`")))?;
        }
        if let Ok(v) = env::var("EDT_PARALLEL") {
            cfg.parallel = !matches!(v.trim(), "0" | "false" | "off");
        }
        if let Ok(v) = env::var("EDT_COMPRESSION") {
            cfg.compression = v
                .trim()
                .parse()
                .map_err(|_| EdtError::invalid_input(format!("无法解析 EDT_COMPRESSION=`{v}`")))?;
        }
        if let Ok(d) = env::var("EDT_SPILL_DIR") {
            cfg.spill_dir = Some(PathBuf::from(d));
        }
        cfg.validate()?;
        Ok(cfg)
    }

    /// 获取磁盘存储根目录.
    ///
    /// 1. 若 `self.spill_dir` 非空, 则返回其值;
    /// 2. 否则, 返回 `{用户缓存目录}/edt-berry`;
    /// 3. 若系统没有缓存目录, 返回 `{临时目录}/edt-berry`.
    pub fn spill_dir_or_default(&self) -> PathBuf {
        if let Some(d) = self.spill_dir.as_ref() {
            return d.clone();
        }
        let mut ans = dirs::cache_dir().unwrap_or_else(env::temp_dir);
        ans.push("edt-berry");
        ans
    }
}
