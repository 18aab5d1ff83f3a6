#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Error types for I/O operations.
///
/// Defines [`IoError`](error::IoError) variants for file access, decoding failures
/// and PFM format errors.
pub mod error;

/// High-level raster reading functions.
///
/// See [`functional::read_depth_any`] for automatic format detection.
pub mod functional;

/// Portable float map (PFM) encoding and decoding.
pub mod pfm;

pub use error::IoError;
