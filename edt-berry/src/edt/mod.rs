//! 精确欧氏距离变换.
//!
//! 入口为 [`distance_transform`]. 整个变换分为两遍 z 方向扫描, 见 [`forward_pass`] 和
//! [`backward_pass`]; 切片内部的 x/y 变换见 [`spatial_pass`].

use crate::config::EdtConfig;
use crate::data::{OwnedDistSlice, Volume, VolumeAttr, VolumeMeta};
use crate::error::{EdtResult, StoreError};
use crate::store::{MemSliceSink, MemSliceStore, SliceSink, SliceStore};
use log::{debug, info};
use ndarray::{Array3, Axis};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;

mod envelope;
mod pass;
mod progress;
pub mod reference;
mod spatial;

pub use envelope::LowerEnvelope;
pub use pass::{backward_pass, forward_pass};
pub use progress::Progress;
pub use spatial::{spatial_pass, SpatialScratch};

use progress::Monotone;

/// 切片内部两个方向的处理顺序. 两种顺序的结果相同.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PassOrder {
    /// 先 x (沿行) 后 y (沿列).
    #[default]
    RowsFirst,

    /// 先 y (沿列) 后 x (沿行).
    ColumnsFirst,
}

/// 距离变换的结果. 第 `z` 张切片中保存的是到最近背景体素的物理距离,
/// 不存在背景体素时为正无穷.
///
/// 元信息与输入体数据完全一致.
#[derive(Debug)]
pub struct DistanceField<S> {
    store: S,
}

impl<S: SliceStore> VolumeAttr for DistanceField<S> {
    #[inline]
    fn meta(&self) -> &VolumeMeta {
        self.store.meta()
    }
}

impl<S: SliceStore> DistanceField<S> {
    /// 读取第 `z` 张距离切片.
    #[inline]
    pub fn slice_at(&self, z: usize) -> Result<OwnedDistSlice, StoreError> {
        self.store.read_slice(z)
    }

    /// 底层切片存储.
    #[inline]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// 取出底层切片存储.
    #[inline]
    pub fn into_store(self) -> S {
        self.store
    }

    /// 把所有切片收集到一个 `(z, h, w)` 数组中.
    ///
    /// # 注意
    ///
    /// 该方法将整个距离场载入内存, 仅适用于小体数据.
    pub fn to_array3(&self) -> Result<Array3<f32>, StoreError> {
        let mut ans = Array3::zeros(self.shape());
        for (z, mut dst) in ans.axis_iter_mut(Axis(0)).enumerate() {
            dst.assign(&self.slice_at(z)?.as_immutable().data());
        }
        Ok(ans)
    }

    /// 以 npy 格式导出整个距离场, 形状为 `(z, h, w)`.
    ///
    /// 与 [`Self::to_array3`] 一样需要把整个距离场载入内存.
    pub fn save_npy<P: AsRef<Path>>(&self, path: P) -> Result<(), StoreError> {
        let data = self.to_array3()?;
        ndarray_npy::write_npy(path, &data)?;
        Ok(())
    }
}

/// 计算 `volume` 的精确欧氏距离变换, 结果保存在由 `sink` 封存得到的存储中.
///
/// 依次执行: 参数检查 → [`forward_pass`] → [`backward_pass`].
/// 任何错误都会立即中止变换, 此时存储中的内容无意义.
///
/// `progress` 收到的进度值单调不减, 最后一次恰好为 `1.0`.
pub fn distance_transform<V, K, P>(
    volume: &V,
    sink: K,
    config: &EdtConfig,
    progress: &mut P,
) -> EdtResult<DistanceField<K::Store>>
where
    V: Volume + ?Sized,
    K: SliceSink,
    P: Progress + ?Sized,
{
    config.validate()?;
    volume.meta().validate()?;

    info!(
        "开始距离变换: 形状 {:?}, 分辨率 {:?}, 阈值 {}, 并行 {}",
        volume.shape(),
        volume.pix_dim(),
        config.threshold,
        config.effective_parallel()
    );
    let start = Instant::now();
    let mut progress = Monotone::new(progress);

    let mut store = forward_pass(volume, sink, config, &mut progress)?;
    debug!("正向扫描完成, 累计用时 {:?}", start.elapsed());

    backward_pass(&mut store, config, &mut progress)?;
    debug!("反向扫描完成, 累计用时 {:?}", start.elapsed());

    progress.finish();
    info!("距离变换完成, 用时 {:?}", start.elapsed());
    Ok(DistanceField { store })
}

/// 使用纯内存切片存储计算距离变换, 不报告进度.
#[inline]
pub fn distance_transform_in_memory<V: Volume + ?Sized>(
    volume: &V,
    config: &EdtConfig,
) -> EdtResult<DistanceField<MemSliceStore>> {
    distance_transform(volume, MemSliceSink::new(), config, &mut ())
}
