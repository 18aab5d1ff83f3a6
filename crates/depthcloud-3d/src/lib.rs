#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Calibration model of the depth and color cameras.
pub mod calibration;

/// Color sampling of point clouds.
pub mod colorize;

/// I/O utilities for reading and writing calibration and 3D data.
pub mod io;

/// Linear algebra utilities.
pub mod linalg;

/// The depth to point cloud pipeline.
pub mod pipeline;

/// Point cloud types.
pub mod pointcloud;

/// 3D transforms algorithms.
pub mod transforms;

/// Depth raster unprojection.
pub mod unproject;
