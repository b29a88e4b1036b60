//! z 方向的两遍扫描.
//!
//! 1. 正向: 逐张读取输入切片, 二值化, 沿 z 正方向累加列距离, 推入切片存储;
//! 2. 反向: 沿 z 负方向合并列距离, 随即对每张切片做 x/y 可分离变换并写回.
//!
//! 任意时刻驻留内存的只有: 上一张切片的 (仅 z 方向的) `f64` 列距离, 当前切片, 以及一张 `f64` 临时切片.

use super::progress::{stage, Progress};
use super::spatial::{spatial_pass, SpatialScratch};
use crate::config::EdtConfig;
use crate::consts::{ElemType, FOREGROUND};
use crate::data::{DistSlice, Volume};
use crate::error::{EdtError, EdtResult, StoreContext, StoreError};
use crate::store::{SliceSink, SliceStore};
use log::trace;
use ndarray::{Array2, Zip};

/// 二值化 + z 正向扫描.
///
/// 对每个 `(y, x)`, 输出切片 `z` 中保存的是到 `z' <= z` 中最近背景体素的
/// **未平方** z 方向物理距离; 不存在时为正无穷. 切片生成后立即推入 `sink`,
/// 全部推入后以输入的元信息封存.
///
/// 进度报告位于 `[0, config.progress_split]`.
pub fn forward_pass<V, K, P>(
    volume: &V,
    mut sink: K,
    config: &EdtConfig,
    progress: &mut P,
) -> EdtResult<K::Store>
where
    V: Volume + ?Sized,
    K: SliceSink,
    P: Progress + ?Sized,
{
    config.validate()?;
    let meta = volume.meta();
    meta.validate()?;
    let (nz, h, w) = meta.shape;
    let sz = meta.spacing[0];
    let threshold = config.threshold;
    let split = config.progress_split;

    // 列距离以 f64 累加, 写入存储时才舍入为 f32, 长列的误差不随 nz 累积.
    // z = 0 时 "上一张" 切片全为前景, 因此前景的列距离为 inf + sz = inf.
    let mut acc = Array2::from_elem((h, w), f64::from(FOREGROUND));
    let mut cur = Array2::from_elem((h, w), FOREGROUND);
    for z in 0..nz {
        let scan = volume.slice_at(z).at_volume(z)?;
        if scan.shape() != (h, w) {
            return Err(EdtError::VolumeRead {
                z,
                source: StoreError::ShapeMismatch {
                    expected: (h, w),
                    found: scan.shape(),
                },
            });
        }
        Zip::from(&mut cur)
            .and(&mut acc)
            .and(scan.as_immutable().data())
            .for_each(|c, a, &v| {
                *a = match ElemType::classify(v, threshold) {
                    ElemType::Background => 0.0,
                    ElemType::Foreground => *a + sz,
                };
                *c = *a as f32;
            });
        sink.push_slice(DistSlice::new(cur.view())).at_store(z)?;

        trace!("正向扫描: 第 {z} 张切片已推入");
        progress.report(stage(0.0, split, z + 1, nz));
    }
    sink.finalize(meta.clone()).at_store(nz - 1)
}

/// z 反向扫描 + x/y 可分离变换.
///
/// `store` 必须是 [`forward_pass`] 的输出. 从最顶层切片开始, 沿 z 递减方向:
///
/// 1. 用上一张切片 (z + 1) 的 **仅 z 方向** 列距离加上 `sz` 更新当前切片,
///   得到完整的一维列距离. 最顶层切片无需合并;
/// 2. 以 `f64` 保存当前切片的列距离, 供下一张切片使用;
/// 3. 对当前切片做 x/y 变换, 开方后写回存储.
///
/// 进度报告位于 `[config.progress_split, 1]`, 最后一次恰好为 `1.0`.
pub fn backward_pass<S, P>(store: &mut S, config: &EdtConfig, progress: &mut P) -> EdtResult<()>
where
    S: SliceStore,
    P: Progress + ?Sized,
{
    config.validate()?;
    let meta = store.meta().clone();
    meta.validate()?;
    let (nz, _, _) = meta.shape;
    let [sz, sy, sx] = meta.spacing;
    let parallel = config.effective_parallel();
    let order = config.order;
    let split = config.progress_split;
    let mut scratch = SpatialScratch::new();

    let top = nz - 1;
    let mut ws = store.writeable_slice(top).at_store(top)?;
    let mut prev = ws.as_immutable().data().mapv(f64::from);
    spatial_pass(ws.as_mutable(), (sy, sx), order, parallel, &mut scratch)?;
    ws.commit().at_store(top)?;
    trace!("反向扫描: 第 {top} 张切片已写回");
    progress.report(stage(split, 1.0, 1, nz));

    for z in (0..top).rev() {
        let mut ws = store.writeable_slice(z).at_store(z)?;
        {
            let mut cur = ws.as_mutable();
            Zip::from(cur.data_mut()).and(&mut prev).for_each(|c, p| {
                let up = *p + sz;
                let down = f64::from(*c);
                if up < down {
                    *c = up as f32;
                    *p = up;
                } else {
                    *p = down;
                }
            });
        }
        spatial_pass(ws.as_mutable(), (sy, sx), order, parallel, &mut scratch)?;
        ws.commit().at_store(z)?;

        trace!("反向扫描: 第 {z} 张切片已写回");
        progress.report(stage(split, 1.0, nz - z, nz));
    }
    Ok(())
}
