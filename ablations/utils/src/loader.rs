//! 对 `edt-berry::dataset` 的更一层封装. 提供更直接的数据集加载器.

use edt_berry::dataset::{self, NiftiLoader};
use edt_berry::StoreError;
use std::env;
use std::path::{Path, PathBuf};

/// 获取 nii 体数据目录.
///
/// 1. 若环境变量 `$EDT_NII_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/edt`;
/// 3. 若无法获得用户主目录, 返回 `None`.
pub fn nii_dir_from_env_or_home() -> Option<PathBuf> {
    match env::var("EDT_NII_DIR") {
        Ok(d) if !d.is_empty() => Some(PathBuf::from(d)),
        _ => dataset::home_dataset_dir_with(["edt"]),
    }
}

/// 获取 `path` 目录下的 nii 体数据加载器.
#[inline]
pub fn nii_loader<P: AsRef<Path>>(path: P) -> Result<NiftiLoader, StoreError> {
    dataset::nifti_loader(path)
}

/// 从 `$EDT_NII_DIR` 或者 `$HOME/dataset/edt` 下加载 nii 体数据.
///
/// 目录不存在时返回 `None`.
pub fn nii_loader_from_env_or_home() -> Option<NiftiLoader> {
    let dir = nii_dir_from_env_or_home()?;
    if !dir.is_dir() {
        return None;
    }
    nii_loader(dir).ok()
}
