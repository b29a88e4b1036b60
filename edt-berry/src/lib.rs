#![warn(missing_docs)] // <= 合适时移除它.

//! 核心库. 在以切片为单位落盘/压缩存储的 3D 体数据上计算 **精确** 欧氏距离变换.
//!
//! 体数据可能大于内存, 因此整个算法以 z 方向水平切片为单位流式处理:
//! 任意时刻内存中最多驻留三张完整的二维切片, 与 z 方向切片总数无关.
//!
//! # 注意
//!
//! 1. 所有体数据均按照 `(z, h, w)` (即 `(z, y, x)`) 模式访问,
//!   水平切片按照 `(h, w)` 模式访问. 体素分辨率数组同样以 `[z, h, w]` 顺序存储.
//! 2. 输出的是到最近 **背景** 体素 (归一化强度严格小于阈值) 的物理距离,
//!   即考虑了体素各向异性的距离, 而不是体素个数.
//!
//! # 算法概览
//!
//! ### 二值化 + z 正向扫描 ✅
//!
//! 逐张读取输入切片, 按阈值二值化, 并沿 z 正方向累加 (未平方的) 列距离.
//! 每张切片生成后立即推入切片存储.
//!
//! 实现位于 `edt-berry/src/edt/pass.rs`.
//!
//! ### z 反向扫描 + 融合的 x/y 可分离变换 ✅
//!
//! 从上往下 (z 递减) 合并列距离, 随后对每张切片依次沿 x, y 方向执行一维抛物线下包络变换,
//! 最终开方写回存储.
//!
//! 实现位于 `edt-berry/src/edt/{pass, spatial, envelope}.rs`.
//!
//! ### 切片存储 ✅
//!
//! 内存 / 内存压缩 / 磁盘三种后端, 均满足
//! "顺序追加 - 封存 - 随机读写" 的约定.
//!
//! 实现位于 `edt-berry/src/store`.
//!
//! ### 小功能 ✅
//!
//! 1. NIfTI 文件输入, 强度归一化窗口. ✅
//! 2. 合成体数据 (phantom), 暴力求解参考实现. ✅
//! 3. 距离切片可视化保存, 整体导出为 npy. ✅
//! 4. 目录级 nii 数据集加载器. ✅

/// 二维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx2d = (usize, usize);

/// 三维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx3d = (usize, usize, usize);

/// 体数据, 切片与归一化窗口.
mod data;

pub use data::{
    phantom, CompactDistSlice, DistSlice, DistSliceMut, ImgWriteVis, InMemoryVolume,
    IntensityWindow, NiftiVolume, OwnedDistSlice, OwnedScanSlice, ScanSlice, Volume, VolumeAttr,
    VolumeMeta,
};

pub mod config;
pub mod consts;
pub mod dataset;
pub mod edt;
pub mod error;
pub mod prelude;
pub mod store;

pub use config::EdtConfig;
pub use error::{EdtError, EdtResult, StoreError};
