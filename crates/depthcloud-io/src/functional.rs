use std::path::Path;

use depthcloud_image::{Image, ImageSize};

use crate::error::IoError;
use crate::pfm::read_depth_pfm;

fn decode_image(file_path: &Path) -> Result<image::DynamicImage, IoError> {
    // verify the file exists
    if !file_path.exists() {
        return Err(IoError::FileDoesNotExist(file_path.to_path_buf()));
    }

    let img = image::ImageReader::open(file_path)?
        .with_guessed_format()?
        .decode()?;

    Ok(img)
}

/// Reads a depth raster from the given file path.
///
/// `.pfm` files are read with [`read_depth_pfm`]. Any other file is decoded with the
/// image crate and must be a single channel 8-bit or 16-bit image, or a float image of
/// which the first channel is taken.
///
/// # Arguments
///
/// * `file_path` - The path to a valid depth file.
///
/// # Returns
///
/// A single channel raster with raw depth values widened to `f64`.
pub fn read_depth_any(file_path: impl AsRef<Path>) -> Result<Image<f64, 1>, IoError> {
    let file_path = file_path.as_ref();

    if file_path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pfm"))
    {
        return read_depth_pfm(file_path);
    }

    let img = decode_image(file_path)?;
    let size = ImageSize {
        width: img.width() as usize,
        height: img.height() as usize,
    };

    let data: Vec<f64> = match img.color() {
        image::ColorType::L8 => img
            .into_luma8()
            .into_raw()
            .into_iter()
            .map(f64::from)
            .collect(),
        image::ColorType::L16 => img
            .into_luma16()
            .into_raw()
            .into_iter()
            .map(f64::from)
            .collect(),
        image::ColorType::Rgb32F | image::ColorType::Rgba32F => img
            .into_rgb32f()
            .into_raw()
            .chunks_exact(3)
            .map(|px| px[0] as f64)
            .collect(),
        color => return Err(IoError::UnsupportedImageFormat(format!("{color:?}"))),
    };

    Ok(Image::new(size, data)?)
}

/// Reads an RGB image from the given file path.
///
/// The method tries to read from any image format supported by the image crate and
/// converts the result to 8-bit RGB.
///
/// # Arguments
///
/// * `file_path` - The path to a valid image file.
///
/// # Returns
///
/// An image with three channels (rgb8).
pub fn read_image_rgb8(file_path: impl AsRef<Path>) -> Result<Image<u8, 3>, IoError> {
    let img = decode_image(file_path.as_ref())?;
    let size = ImageSize {
        width: img.width() as usize,
        height: img.height() as usize,
    };

    Ok(Image::new(size, img.into_rgb8().into_raw())?)
}
