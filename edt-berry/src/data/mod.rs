use std::ops::{Index, IndexMut};
use std::path::Path;

use ndarray::{Array3, ArrayView, ArrayViewMut, Axis, Ix3};
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};
use serde::{Deserialize, Serialize};

use crate::error::{EdtError, EdtResult, StoreError};
use crate::{Idx2d, Idx3d};

pub mod phantom;
pub mod slice;
pub mod window;

pub use slice::{
    CompactDistSlice, DistSlice, DistSliceMut, ImgWriteVis, OwnedDistSlice, OwnedScanSlice,
    ScanSlice,
};

pub use window::IntensityWindow;

/// 4x4 单位矩阵.
const IDENTITY: [[f64; 4]; 4] = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// 体数据元信息.
///
/// 除了形状和分辨率以外, 其余字段仅被原样复制到输出, 距离变换不会解释它们.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VolumeMeta {
    /// `(z, h, w)` 形状, 即 `(nz, ny, nx)`.
    pub shape: Idx3d,

    /// 体素分辨率 `[z, h, w]`, 以物理单位 (通常是毫米) 表示.
    pub spacing: [f64; 3],

    /// 世界坐标系原点 `[z, y, x]`.
    pub offset: [f64; 3],

    /// 物理坐标到世界坐标的仿射变换.
    pub transform: [[f64; 4]; 4],
}

impl VolumeMeta {
    /// 以形状和分辨率创建元信息. 原点为 0, 变换为单位矩阵.
    #[inline]
    pub fn new(shape: Idx3d, spacing: [f64; 3]) -> Self {
        Self {
            shape,
            spacing,
            offset: [0.0; 3],
            transform: IDENTITY,
        }
    }

    /// 设置世界坐标原点.
    #[inline]
    pub fn with_offset(mut self, offset: [f64; 3]) -> Self {
        self.offset = offset;
        self
    }

    /// 设置仿射变换.
    #[inline]
    pub fn with_transform(mut self, transform: [[f64; 4]; 4]) -> Self {
        self.transform = transform;
        self
    }

    /// 检查形状非空且分辨率为有限正数.
    pub fn validate(&self) -> EdtResult<()> {
        let (z, h, w) = self.shape;
        if z == 0 || h == 0 || w == 0 {
            return Err(EdtError::invalid_input(format!(
                "体数据形状不能包含 0, 实际为 {:?}",
                self.shape
            )));
        }
        if let Some(s) = self.spacing.iter().find(|s| !(s.is_finite() && **s > 0.0)) {
            return Err(EdtError::invalid_input(format!(
                "体素分辨率必须为有限正数, 实际含有 {s}"
            )));
        }
        Ok(())
    }
}

/// 体数据的共用属性和部分通用操作.
pub trait VolumeAttr {
    /// 获取元信息.
    fn meta(&self) -> &VolumeMeta;

    /// 获取数据形状大小 `(z, h, w)`.
    #[inline]
    fn shape(&self) -> Idx3d {
        self.meta().shape
    }

    /// 获取数据水平切片形状大小.
    #[inline]
    fn slice_shape(&self) -> Idx2d {
        let (_, h, w) = self.shape();
        (h, w)
    }

    /// 获取水平切片个数.
    #[inline]
    fn len_z(&self) -> usize {
        self.shape().0
    }

    /// 获取数据体素个数.
    #[inline]
    fn size(&self) -> usize {
        let (z, h, w) = self.shape();
        z * h * w
    }

    /// 检查索引是否合法.
    #[inline]
    fn check(&self, (z0, h0, w0): &Idx3d) -> bool {
        let (z, h, w) = self.shape();
        *z0 < z && *h0 < h && *w0 < w
    }

    /// 获取单个体素分辨率, 分别代表空间 (相邻切片方向),
    /// 高 (自然图像的垂直方向), 宽 (自然图像的水平方向).
    ///
    /// 该值也可以通过 `self.{z_mm, height_mm, width_mm}` 分别获取.
    #[inline]
    fn pix_dim(&self) -> [f64; 3] {
        self.meta().spacing
    }

    /// 获取 width 方向 (x 方向) 体素分辨率.
    #[inline]
    fn width_mm(&self) -> f64 {
        self.meta().spacing[2]
    }

    /// 获取 height 方向 (y 方向) 体素分辨率.
    #[inline]
    fn height_mm(&self) -> f64 {
        self.meta().spacing[1]
    }

    /// 获取空间方向 (相邻 2D 切片的方向) 体素分辨率.
    #[inline]
    fn z_mm(&self) -> f64 {
        self.meta().spacing[0]
    }

    /// 体素分辨率在三个维度上是否是各向同的?
    #[inline]
    fn is_isotropic(&self) -> bool {
        let [z, h, w] = self.pix_dim();
        z == h && z == w
    }

    /// 获取体素的实际体积值.
    #[inline]
    fn voxel(&self) -> f64 {
        self.pix_dim().iter().product()
    }

    /// 获取水平切片方向的像素实际面积值.
    #[inline]
    fn slice_pixel(&self) -> f64 {
        self.pix_dim().iter().skip(1).product()
    }
}

/// 可以按 z 索引逐张读取归一化切片的 3D 标量体数据.
///
/// 实现者不必把整个体数据放在内存中; 距离变换只会按 z 升序逐张调用 [`Volume::slice_at`].
pub trait Volume: VolumeAttr {
    /// 读取第 `z` 张水平切片, 像素值为 `[0, 1]` 中的归一化强度
    /// (无意义的原始值归一化为 NaN).
    fn slice_at(&self, z: usize) -> Result<OwnedScanSlice, StoreError>;
}

/// 完全驻留在内存中的 3D 体数据, 包括元信息、原始强度和归一化窗口.
#[derive(Debug, Clone)]
pub struct InMemoryVolume {
    meta: VolumeMeta,
    data: Array3<f32>,
    window: IntensityWindow,
}

impl VolumeAttr for InMemoryVolume {
    #[inline]
    fn meta(&self) -> &VolumeMeta {
        &self.meta
    }
}

impl Volume for InMemoryVolume {
    fn slice_at(&self, z: usize) -> Result<OwnedScanSlice, StoreError> {
        let len = self.len_z();
        if z >= len {
            return Err(StoreError::OutOfRange { z, len });
        }
        let w = self.window;
        Ok(self
            .data
            .index_axis(Axis(0), z)
            .mapv(|v| w.normalize(v))
            .into())
    }
}

impl Index<Idx3d> for InMemoryVolume {
    type Output = f32;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl IndexMut<Idx3d> for InMemoryVolume {
    #[inline]
    fn index_mut(&mut self, index: Idx3d) -> &mut Self::Output {
        &mut self.data[index]
    }
}

impl InMemoryVolume {
    /// 以 `(z, h, w)` 组织的原始强度和 `[z, h, w]` 分辨率创建体数据.
    /// 归一化窗口为 [`IntensityWindow::unit`].
    pub fn new(data: Array3<f32>, spacing: [f64; 3]) -> Self {
        let meta = VolumeMeta::new(data.dim(), spacing);
        Self {
            meta,
            data,
            window: IntensityWindow::unit(),
        }
    }

    /// 以完整元信息创建体数据.
    ///
    /// 如果 `meta.shape` 与 `data` 形状不一致, 则程序 panic.
    pub fn from_parts(data: Array3<f32>, meta: VolumeMeta, window: IntensityWindow) -> Self {
        assert_eq!(data.dim(), meta.shape, "体数据与元信息形状不一致");
        Self { meta, data, window }
    }

    /// 替换归一化窗口.
    #[inline]
    pub fn with_window(mut self, window: IntensityWindow) -> Self {
        self.window = window;
        self
    }

    /// 当前归一化窗口.
    #[inline]
    pub fn window(&self) -> IntensityWindow {
        self.window
    }

    /// 获得原始强度的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView<'_, f32, Ix3> {
        self.data.view()
    }

    /// 获得原始强度的一份可变 shallow copy.
    #[inline]
    pub fn data_mut(&mut self) -> ArrayViewMut<'_, f32, Ix3> {
        self.data.view_mut()
    }

    /// 原始强度中最小和最大的有限值. 不存在有限值时返回 `None`.
    pub fn finite_range(&self) -> Option<(f32, f32)> {
        self.data
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

/// `NiftiHeader` 是栈上大对象, 移动该对象的开销很可观.
/// 因此我们将其分配到堆上.
type BoxedHeader = Box<NiftiHeader>;

/// nii 格式 3D 体数据. 打开时整个文件被载入内存.
///
/// 元信息取自 header: 分辨率来自 `pixdim`,
/// 原点来自 `quatern_{x,y,z}` (即 nifti 标准中的 `qoffset_*`),
/// 仿射变换来自 `srow_*`. 默认的归一化窗口覆盖数据中全部有限值的范围.
#[derive(Debug, Clone)]
pub struct NiftiVolume {
    header: BoxedHeader,
    inner: InMemoryVolume,
}

/// 将 header 中的 [W, H, z] 信息转换成 (z, H, W).
#[inline]
fn meta_from_header(h: &NiftiHeader) -> VolumeMeta {
    let [_, w, hh, z, ..] = h.dim;
    let [_, pw, ph, pz, ..] = h.pixdim;
    let row = |r: [f32; 4]| r.map(f64::from);
    VolumeMeta::new(
        (z as usize, hh as usize, w as usize),
        [pz as f64, ph as f64, pw as f64],
    )
    .with_offset([
        h.quatern_z as f64,
        h.quatern_y as f64,
        h.quatern_x as f64,
    ])
    .with_transform([
        row(h.srow_x),
        row(h.srow_y),
        row(h.srow_z),
        [0.0, 0.0, 0.0, 1.0],
    ])
}

impl VolumeAttr for NiftiVolume {
    #[inline]
    fn meta(&self) -> &VolumeMeta {
        self.inner.meta()
    }
}

impl Volume for NiftiVolume {
    #[inline]
    fn slice_at(&self, z: usize) -> Result<OwnedScanSlice, StoreError> {
        self.inner.slice_at(z)
    }
}

impl NiftiVolume {
    /// 打开 nii (或 nii.gz) 文件格式的 3D 体数据. `path` 为文件的本地路径.
    /// 如果打开成功, 则返回 `Ok(Self)`, 否则返回 `Err`. 仅支持 3D 数据.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let obj = ReaderOptions::new().read_file(path.as_ref())?;
        let header = Box::new(obj.header().clone());

        let data = obj.into_volume().into_ndarray::<f32>()?;
        if data.ndim() != 3 {
            return Err(StoreError::Nifti(format!(
                "仅支持 3D 体数据, 实际维数为 {}",
                data.ndim()
            )));
        }

        // [W, H, z] -> [z, H, W].
        // hint: 原第一维向下增长, 原第二维向右增长.
        let data = data
            .permuted_axes([2, 1, 0].as_slice())
            .into_dimensionality::<Ix3>()
            .map_err(|e| StoreError::Nifti(e.to_string()))?
            .as_standard_layout()
            .into_owned();

        let meta = meta_from_header(&header);
        if meta.shape != data.dim() {
            return Err(StoreError::Nifti(format!(
                "header 声明的形状 {:?} 与数据形状 {:?} 不一致",
                meta.shape,
                data.dim()
            )));
        }

        let mut inner = InMemoryVolume::from_parts(data, meta, IntensityWindow::unit());
        let window = match inner.finite_range() {
            Some((lo, hi)) => IntensityWindow::from_range(lo, hi)
                .or_else(|| IntensityWindow::new(lo, 1.0))
                .unwrap_or_default(),
            None => IntensityWindow::unit(),
        };
        inner = inner.with_window(window);
        Ok(Self { header, inner })
    }

    /// 替换归一化窗口. 例如对 CT 数据使用以 HU 为单位的窗口.
    #[inline]
    pub fn with_window(mut self, window: IntensityWindow) -> Self {
        self.inner = self.inner.with_window(window);
        self
    }

    /// 获取 header 部分.
    #[inline]
    pub fn header(&self) -> &NiftiHeader {
        &self.header
    }

    /// 获得内存中的体数据.
    #[inline]
    pub fn as_in_memory(&self) -> &InMemoryVolume {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_meta_validate() {
        assert!(VolumeMeta::new((1, 1, 1), [1.0; 3]).validate().is_ok());
        assert!(VolumeMeta::new((0, 1, 1), [1.0; 3]).validate().is_err());
        assert!(VolumeMeta::new((2, 2, 0), [1.0; 3]).validate().is_err());
        assert!(VolumeMeta::new((2, 2, 2), [1.0, 0.0, 1.0])
            .validate()
            .is_err());
        assert!(VolumeMeta::new((2, 2, 2), [1.0, 1.0, f64::NAN])
            .validate()
            .is_err());
    }

    #[test]
    fn test_volume_attr() {
        let v = InMemoryVolume::new(Array3::zeros((3, 4, 5)), [2.5, 0.5, 0.5]);
        assert_eq!(v.shape(), (3, 4, 5));
        assert_eq!(v.slice_shape(), (4, 5));
        assert_eq!(v.len_z(), 3);
        assert_eq!(v.size(), 60);
        assert!(v.check(&(2, 3, 4)));
        assert!(!v.check(&(3, 0, 0)));
        assert_eq!(v.z_mm(), 2.5);
        assert_eq!(v.height_mm(), 0.5);
        assert_eq!(v.width_mm(), 0.5);
        assert!(!v.is_isotropic());
        assert_eq!(v.voxel(), 0.625);
        assert_eq!(v.slice_pixel(), 0.25);
    }

    #[test]
    fn test_slice_at_normalizes() {
        let mut data = Array3::from_elem((2, 2, 2), 100.0f32);
        data[(1, 0, 0)] = -100.0;
        data[(1, 1, 1)] = f32::NAN;
        let v = InMemoryVolume::new(data, [1.0; 3])
            .with_window(IntensityWindow::from_range(-100.0, 100.0).unwrap());

        let s = v.slice_at(1).unwrap();
        let s = s.as_immutable();
        assert_eq!(s[(0, 0)], 0.0);
        assert_eq!(s[(0, 1)], 1.0);
        assert!(s[(1, 1)].is_nan());

        assert!(matches!(
            v.slice_at(2),
            Err(StoreError::OutOfRange { z: 2, len: 2 })
        ));
        assert_eq!(v.finite_range(), Some((-100.0, 100.0)));
    }

    #[test]
    fn test_nifti_open() {
        use nifti::writer::WriterOptions;

        // nii 中的维度顺序为 [W, H, z].
        let mut raw = Array3::from_elem((4, 3, 2), 100.0f32);
        raw[(1, 2, 0)] = 0.0;
        raw[(3, 0, 1)] = 40.0;
        let mut header = NiftiHeader::default();
        header.pixdim = [1.0, 0.5, 0.75, 2.0, 1.0, 1.0, 1.0, 1.0];
        header.quatern_x = 10.0;
        header.quatern_y = 20.0;
        header.quatern_z = 30.0;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vol.nii");
        WriterOptions::new(&path)
            .reference_header(&header)
            .write_nifti(&raw)
            .unwrap();

        let v = NiftiVolume::open(&path).unwrap();
        assert_eq!(v.shape(), (2, 3, 4));
        assert_eq!(v.pix_dim(), [2.0, 0.75, 0.5]);
        assert_eq!(v.meta().offset, [30.0, 20.0, 10.0]);
        assert_eq!(v.as_in_memory()[(0, 2, 1)], 0.0);
        assert_eq!(v.as_in_memory()[(1, 0, 3)], 40.0);
        assert_eq!(v.as_in_memory()[(1, 2, 3)], 100.0);

        // 窗口覆盖数据范围 [0, 100].
        let s0 = v.slice_at(0).unwrap();
        assert_eq!(s0.as_immutable()[(2, 1)], 0.0);
        assert_eq!(s0.as_immutable()[(0, 0)], 1.0);
        let s1 = v.slice_at(1).unwrap();
        approx::assert_relative_eq!(s1.as_immutable()[(0, 3)], 0.4, max_relative = 1e-6);

        let got = crate::edt::distance_transform_in_memory(&v, &crate::EdtConfig::default())
            .unwrap()
            .to_array3()
            .unwrap();
        let want = crate::edt::reference::brute_force(&v, 0.5).unwrap();
        assert_eq!(got[(0, 2, 1)], 0.0);
        assert_eq!(got[(1, 0, 3)], 0.0);
        for (g, w) in got.iter().zip(want.iter()) {
            approx::assert_relative_eq!(*g, *w, max_relative = 1e-6);
        }
    }
}
