#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

#[doc(inline)]
pub use depthcloud_image as image;

#[doc(inline)]
pub use depthcloud_io as io;

#[doc(inline)]
pub use depthcloud_3d as k3d;
