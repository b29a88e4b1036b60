//! 输入切片与距离切片对象的操作.

mod core;
mod save;

pub use self::core::{
    CompactDistSlice, DistSlice, DistSliceMut, OwnedDistSlice, OwnedScanSlice, ScanSlice,
};

pub use save::ImgWriteVis;
