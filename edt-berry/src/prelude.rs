//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx2d, Idx3d};

pub use crate::data::phantom;
pub use crate::data::{
    CompactDistSlice, DistSlice, DistSliceMut, ImgWriteVis, InMemoryVolume, IntensityWindow,
    NiftiVolume, OwnedDistSlice, OwnedScanSlice, ScanSlice, Volume, VolumeAttr, VolumeMeta,
};

pub use crate::consts::{ElemType, DEFAULT_THRESHOLD, FOREGROUND};

pub use crate::config::EdtConfig;
pub use crate::error::{EdtError, EdtResult, StoreError};

pub use crate::edt::reference::brute_force;
pub use crate::edt::{
    distance_transform, distance_transform_in_memory, DistanceField, PassOrder, Progress,
};

pub use crate::store::{
    CompactSliceSink, CompactSliceStore, DiskSliceSink, DiskSliceStore, MemSliceSink,
    MemSliceStore, SliceSink, SliceStore, WriteableSlice,
};
