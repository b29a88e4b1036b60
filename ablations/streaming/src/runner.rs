//! 程序运行函数.

use crate::profile::Profile;
use crate::result::AblationResult;
use edt_berry::prelude::*;
use log::{info, warn};
use ndarray::{Array3, Zip};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::path::Path;
use std::thread;
use utils::loader;

/// 参考实现的开销上限 (体素个数 × 背景体素个数). 超过该值的体数据不做比对.
const ORACLE_BUDGET: usize = 1 << 27;

/// 一个待变换的体数据, 以及 (可能存在的) 参考答案.
pub struct Case {
    name: String,
    volume: InMemoryVolume,
    oracle: Option<Array3<f32>>,
}

impl Case {
    /// 初始化. 开销允许时同时计算参考答案.
    fn new(name: impl Into<String>, volume: InMemoryVolume, threshold: f32) -> Self {
        let name = name.into();
        let window = volume.window();
        let seeds = volume
            .data()
            .iter()
            .filter(|v| ElemType::classify(window.normalize(**v), threshold).is_background())
            .count();
        let oracle = if volume.size().saturating_mul(seeds) <= ORACLE_BUDGET {
            match brute_force(&volume, threshold) {
                Ok(a) => Some(a),
                Err(e) => {
                    warn!("{name}: 参考实现失败: {e}");
                    None
                }
            }
        } else {
            None
        };
        info!(
            "{name}: 形状 {:?}, 背景体素 {seeds} 个, 参考答案 {}",
            volume.shape(),
            if oracle.is_some() { "有" } else { "无" }
        );
        Self {
            name,
            volume,
            oracle,
        }
    }
}

/// 背景比例约为 `ratio` 的随机体数据.
fn sparse_random(shape: Idx3d, spacing: [f64; 3], ratio: f64, seed: u64) -> InMemoryVolume {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let data = Array3::from_shape_simple_fn(shape, || {
        if rng.gen_bool(ratio) {
            phantom::BACKGROUND
        } else {
            phantom::FOREGROUND
        }
    });
    InMemoryVolume::new(data, spacing)
}

/// 合成体数据, 以及 `$EDT_NII_DIR` (或 `$HOME/dataset/edt`) 下的 nii 体数据.
fn build_cases(threshold: f32) -> Vec<Case> {
    let mut cases = vec![
        Case::new(
            "ball",
            phantom::ball((32, 32, 32), [15.5; 3], 10.0, [1.0; 3]),
            threshold,
        ),
        Case::new(
            "single-seed-aniso",
            phantom::single_seed((48, 40, 40), (7, 30, 5), [2.5, 0.8, 0.8]),
            threshold,
        ),
        Case::new(
            "sparse-random",
            sparse_random((24, 24, 24), [1.0, 0.7, 0.7], 0.01, 2024),
            threshold,
        ),
        Case::new(
            "thin-slab",
            sparse_random((1, 64, 64), [3.0, 1.0, 1.0], 0.02, 7),
            threshold,
        ),
        Case::new(
            "all-foreground",
            phantom::all_foreground((16, 16, 16), [1.0; 3]),
            threshold,
        ),
    ];

    match loader::nii_loader_from_env_or_home() {
        Some(files) => {
            for (path, volume) in files {
                match volume {
                    Ok(v) => cases.push(Case::new(
                        path.display().to_string(),
                        v.as_in_memory().clone(),
                        threshold,
                    )),
                    Err(e) => warn!("跳过 {}: {e}", path.display()),
                }
            }
        }
        None => info!("未找到 nii 数据目录, 仅使用合成体数据"),
    }
    cases
}

/// 两个距离场的最大绝对误差. 同为正无穷的位置误差为 0.
fn max_abs_err(got: &Array3<f32>, want: &Array3<f32>) -> f32 {
    Zip::from(got).and(want).fold(0.0f32, |acc, &g, &w| {
        let e = if g == w { 0.0 } else { (g - w).abs() };
        if e.is_nan() {
            f32::INFINITY
        } else {
            acc.max(e)
        }
    })
}

/// 在 `sink` 上变换 `case`, 并记录到 `profile`. 失败时返回 `None`.
fn run_case<K: SliceSink>(
    case: &Case,
    sink: K,
    cfg: &EdtConfig,
    profile: &mut Profile,
) -> Option<DistanceField<K::Store>> {
    profile.transform_start();
    let ans = distance_transform(&case.volume, sink, cfg, &mut ());
    profile.transform_elapsed();

    let field = match ans {
        Ok(field) => field,
        Err(e) => {
            warn!("{}: {e}", case.name);
            profile.count_failed();
            return None;
        }
    };
    profile.count_volume(case.volume.len_z());

    if let Some(want) = case.oracle.as_ref() {
        match field.to_array3() {
            Ok(got) => profile.count_checked(max_abs_err(&got, want)),
            Err(e) => {
                warn!("{}: 读取结果失败: {e}", case.name);
                profile.count_failed();
            }
        }
    }
    Some(field)
}

pub fn mem(cases: &[Case], cfg: &EdtConfig, _: &Path) -> Profile {
    let mut profile = Profile::new();
    for case in cases {
        info!("Mem: {}...", case.name);
        run_case(case, MemSliceSink::new(), cfg, &mut profile);
    }
    profile.finish()
}

pub fn compact(cases: &[Case], cfg: &EdtConfig, _: &Path) -> Profile {
    let mut profile = Profile::new();
    for case in cases {
        info!("Compact: {}...", case.name);
        run_case(case, CompactSliceSink::new(cfg.compression), cfg, &mut profile);
    }
    profile.finish()
}

pub fn disk(cases: &[Case], cfg: &EdtConfig, root: &Path) -> Profile {
    let mut profile = Profile::new();
    for (idx, case) in cases.iter().enumerate() {
        info!("Disk: {}...", case.name);
        let dir = root.join(format!("{idx:03}"));
        let sink = match DiskSliceSink::create(&dir, cfg.compression) {
            Ok(s) => s,
            Err(e) => {
                warn!("{}: 无法创建 {}: {e}", case.name, dir.display());
                profile.count_failed();
                continue;
            }
        };
        if let Some(field) = run_case(case, sink, cfg, &mut profile) {
            if let Err(e) = field.into_store().remove() {
                warn!("无法清理 {}: {e}", dir.display());
            }
        }
    }
    profile.finish()
}

/// 实际运行.
pub fn run(cfg: &EdtConfig) -> AblationResult {
    let cases = build_cases(cfg.threshold);
    let root = cfg.spill_dir_or_default().join("ablation");

    println!(
        "Running ablation studies on {} volumes ({} cpus)...",
        cases.len(),
        utils::cpus()
    );
    thread::scope(|s| {
        let (cases, root) = (cases.as_slice(), root.as_path());
        let handles = [mem, compact, disk].map(|t| s.spawn(move || t(cases, cfg, root)));

        AblationResult::from_iter(
            ["mem", "compact", "disk"].into_iter().zip(
                handles
                    .into_iter()
                    .map(|th| th.join().expect("Thread joining error")),
            ),
        )
    })
}
