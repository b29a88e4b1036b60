//! 磁盘切片存储.
//!
//! 目录布局:
//!
//! ```text
//! {dir}/slice-000000.bin   <= bincode 编码的 `CompactDistSlice`
//! {dir}/slice-000001.bin
//! ...
//! {dir}/meta.bin           <= 封存时写入, bincode 编码的元信息
//! ```
//!
//! 重写切片时先写入临时文件再重命名, 因此单张切片的覆写是原子的.

use super::{check_finalize, check_shape, check_z, track_shape, SliceSink, SliceStore};
use crate::data::{CompactDistSlice, DistSlice, OwnedDistSlice, VolumeAttr, VolumeMeta};
use crate::error::StoreError;
use crate::Idx2d;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

const META_FILE: &str = "meta.bin";

/// 落盘的元信息.
#[derive(Debug, Serialize, Deserialize)]
struct DiskMeta {
    meta: VolumeMeta,
    level: u32,
}

#[inline]
fn slice_path(dir: &Path, z: usize) -> PathBuf {
    dir.join(format!("slice-{z:06}.bin"))
}

/// 是否为 `slice-*.bin` 或其临时文件?
#[inline]
fn is_slice_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map_or(false, |s| {
            s.starts_with("slice-") && (s.ends_with(".bin") || s.ends_with(".bin.tmp"))
        })
}

/// 将 `value` 以 bincode 编码写入 `path`. 先写临时文件再重命名.
fn write_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let tmp = path.with_extension("bin.tmp");
    {
        let mut w = BufWriter::new(File::create(&tmp)?);
        bincode::serialize_into(&mut w, value)?;
        w.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

fn read_from<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, StoreError> {
    let r = BufReader::new(File::open(path)?);
    Ok(bincode::deserialize_from(r)?)
}

/// 磁盘存储的构建阶段.
#[derive(Debug)]
pub struct DiskSliceSink {
    dir: PathBuf,
    level: u32,
    pushed: usize,
    sh: Option<Idx2d>,
}

impl DiskSliceSink {
    /// 在目录 `dir` 下创建存储 (目录不存在时自动创建), 使用 zlib 压缩等级 `level`.
    ///
    /// 目录中已有的切片文件 (含临时文件) 和元信息都会被删除, 其他文件保持不变.
    pub fn create<P: AsRef<Path>>(dir: P, level: u32) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_owned();
        fs::create_dir_all(&dir)?;
        // 先删除元信息, 避免半成品被误当作完整存储打开.
        let meta = dir.join(META_FILE);
        if meta.exists() {
            fs::remove_file(meta)?;
        }
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_file() && is_slice_file(&path) {
                fs::remove_file(path)?;
            }
        }
        Ok(Self {
            dir,
            level,
            pushed: 0,
            sh: None,
        })
    }

    /// 存储目录.
    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl SliceSink for DiskSliceSink {
    type Store = DiskSliceStore;

    fn push_slice(&mut self, slice: DistSlice<'_>) -> Result<(), StoreError> {
        track_shape(&mut self.sh, slice.shape())?;
        let compact = slice.to_owned().compress(self.level)?;
        write_atomic(&slice_path(&self.dir, self.pushed), &compact)?;
        self.pushed += 1;
        Ok(())
    }

    #[inline]
    fn len_pushed(&self) -> usize {
        self.pushed
    }

    fn finalize(self, meta: VolumeMeta) -> Result<DiskSliceStore, StoreError> {
        check_finalize(&meta, self.pushed, self.sh)?;
        let disk = DiskMeta {
            meta,
            level: self.level,
        };
        write_atomic(&self.dir.join(META_FILE), &disk)?;
        Ok(DiskSliceStore {
            dir: self.dir,
            meta: disk.meta,
            level: disk.level,
        })
    }
}

/// 封存后的磁盘存储.
#[derive(Debug, Clone)]
pub struct DiskSliceStore {
    dir: PathBuf,
    meta: VolumeMeta,
    level: u32,
}

impl DiskSliceStore {
    /// 重新打开目录 `dir` 下一个已经封存的存储.
    ///
    /// 目录中缺少元信息 (即从未封存) 或任何一张切片文件时返回 `Err`.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_owned();
        let DiskMeta { meta, level } = read_from(&dir.join(META_FILE))?;
        for z in 0..meta.shape.0 {
            let p = slice_path(&dir, z);
            if !p.is_file() {
                return Err(StoreError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("缺少切片文件 {}", p.display()),
                )));
            }
        }
        Ok(Self { dir, meta, level })
    }

    /// 存储目录.
    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 删除整个存储目录.
    pub fn remove(self) -> Result<(), StoreError> {
        fs::remove_dir_all(&self.dir)?;
        Ok(())
    }
}

impl VolumeAttr for DiskSliceStore {
    #[inline]
    fn meta(&self) -> &VolumeMeta {
        &self.meta
    }
}

impl SliceStore for DiskSliceStore {
    fn read_slice(&self, z: usize) -> Result<OwnedDistSlice, StoreError> {
        check_z(z, self.len_z())?;
        let compact: CompactDistSlice = read_from(&slice_path(&self.dir, z))?;
        check_shape(self.slice_shape(), compact.shape())?;
        compact.decompress()
    }

    fn write_slice(&mut self, z: usize, slice: DistSlice<'_>) -> Result<(), StoreError> {
        check_z(z, self.len_z())?;
        check_shape(self.slice_shape(), slice.shape())?;
        let compact = slice.to_owned().compress(self.level)?;
        write_atomic(&slice_path(&self.dir, z), &compact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::{contract, finalize_mismatch};

    #[test]
    fn test_disk_store_contract() {
        let dir = tempfile::tempdir().unwrap();
        contract(DiskSliceSink::create(dir.path().join("a"), 6).unwrap());
        finalize_mismatch(DiskSliceSink::create(dir.path().join("b"), 6).unwrap());
    }

    #[test]
    fn test_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DiskSliceSink::create(dir.path(), 3).unwrap();
        let s = OwnedDistSlice::filled((3, 4), 2.5);
        sink.push_slice(s.as_immutable()).unwrap();
        sink.push_slice(s.as_immutable()).unwrap();

        // 未封存的存储不能被打开.
        assert!(DiskSliceStore::open(dir.path()).is_err());

        let meta = VolumeMeta::new((2, 3, 4), [1.0, 2.0, 3.0]);
        let mut store = sink.finalize(meta.clone()).unwrap();
        store
            .write_slice(1, OwnedDistSlice::filled((3, 4), 0.0).as_immutable())
            .unwrap();

        let reopened = DiskSliceStore::open(dir.path()).unwrap();
        assert_eq!(reopened.meta(), &meta);
        assert_eq!(reopened.read_slice(0).unwrap(), s);
        assert!(reopened.read_slice(1).unwrap().as_immutable().is_background());

        // 临时文件不会残留.
        let leftovers = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.path().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);

        // 缺失切片文件.
        fs::remove_file(slice_path(dir.path(), 1)).unwrap();
        assert!(DiskSliceStore::open(dir.path()).is_err());
    }

    #[test]
    fn test_create_clears_stale_slices() {
        let dir = tempfile::tempdir().unwrap();
        let s = OwnedDistSlice::filled((2, 2), 1.0);
        let mut sink = DiskSliceSink::create(dir.path(), 1).unwrap();
        for _ in 0..3 {
            sink.push_slice(s.as_immutable()).unwrap();
        }
        sink.finalize(VolumeMeta::new((3, 2, 2), [1.0; 3])).unwrap();
        fs::write(dir.path().join("notes.txt"), b"keep").unwrap();

        // 复用目录, 只写入一张切片.
        let mut sink = DiskSliceSink::create(dir.path(), 1).unwrap();
        assert!(!dir.path().join(META_FILE).exists());
        sink.push_slice(s.as_immutable()).unwrap();
        sink.finalize(VolumeMeta::new((1, 2, 2), [1.0; 3])).unwrap();

        assert!(slice_path(dir.path(), 0).is_file());
        assert!(!slice_path(dir.path(), 1).exists());
        assert!(!slice_path(dir.path(), 2).exists());
        assert!(dir.path().join("notes.txt").is_file());
        assert_eq!(DiskSliceStore::open(dir.path()).unwrap().len_z(), 1);
    }

    #[test]
    fn test_remove() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("spill");
        let mut sink = DiskSliceSink::create(&root, 1).unwrap();
        sink.push_slice(OwnedDistSlice::filled((1, 1), 0.0).as_immutable())
            .unwrap();
        let store = sink.finalize(VolumeMeta::new((1, 1, 1), [1.0; 3])).unwrap();
        assert!(root.is_dir());
        store.remove().unwrap();
        assert!(!root.exists());
    }
}
