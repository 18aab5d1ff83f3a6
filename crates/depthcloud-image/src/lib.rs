#![deny(missing_docs)]
//! Dense raster types for depth and color images

/// image representation for depth and color rasters.
pub mod image;

/// Error types for the image module.
pub mod error;

pub use crate::error::ImageError;
pub use crate::image::{Image, ImageSize};
