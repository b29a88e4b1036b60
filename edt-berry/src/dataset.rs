//! 数据集操作.
//!
//! 提供迭代器风格的 nii 体数据获取模式.

use crate::data::NiftiVolume;
use crate::error::StoreError;
use std::fs;
use std::path::{Path, PathBuf};

/// 获取 `{用户主目录}/dataset` 目录.
pub fn home_dataset_dir() -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    Some(ans)
}

/// 获取 `{用户主目录}/dataset` 目录下给定继续项组成的全路径.
pub fn home_dataset_dir_with<P: AsRef<Path>, I: IntoIterator<Item = P>>(it: I) -> Option<PathBuf> {
    let mut ans = home_dataset_dir()?;
    ans.extend(it);
    Some(ans)
}

/// 文件名是否以 `.nii` 或 `.nii.gz` 结尾?
#[inline]
fn is_nifti(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map_or(false, |s| s.ends_with(".nii") || s.ends_with(".nii.gz"))
}

/// 创建 `dir` 目录下所有 nii 文件的加载器. 文件按文件名字典序加载.
///
/// 目录无法读取时返回 `Err`; 单个文件的读取错误在迭代时返回.
pub fn nifti_loader<P: AsRef<Path>>(dir: P) -> Result<NiftiLoader, StoreError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_nifti(&path) {
            files.push(path);
        }
    }
    files.sort_unstable_by(|a, b| b.cmp(a));
    Ok(NiftiLoader { files_rev: files })
}

/// nii 体数据加载器.
#[derive(Debug)]
pub struct NiftiLoader {
    files_rev: Vec<PathBuf>,
}

impl Iterator for NiftiLoader {
    type Item = (PathBuf, Result<NiftiVolume, StoreError>);

    fn next(&mut self) -> Option<Self::Item> {
        let path = self.files_rev.pop()?;
        let data = NiftiVolume::open(&path);
        Some((path, data))
    }
}

impl ExactSizeIterator for NiftiLoader {
    #[inline]
    fn len(&self) -> usize {
        self.files_rev.len()
    }
}
