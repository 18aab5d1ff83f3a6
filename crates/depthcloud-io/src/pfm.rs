use std::io::Write;
use std::path::Path;

use depthcloud_image::{Image, ImageSize};

use crate::error::IoError;

/// The header of a portable float map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PfmHeader {
    /// Number of channels: 1 for `Pf`, 3 for `PF`.
    pub channels: usize,
    /// The raster size.
    pub size: ImageSize,
    /// The scale factor. A negative value means little-endian samples.
    pub scale: f32,
}

impl PfmHeader {
    /// Check if the samples are stored in little-endian byte order.
    pub fn is_little_endian(&self) -> bool {
        self.scale < 0.0
    }
}

// Read a whitespace terminated token, consuming exactly one trailing whitespace byte.
fn next_token<'a>(buf: &'a [u8], pos: &mut usize) -> Option<&'a str> {
    while buf.get(*pos).is_some_and(u8::is_ascii_whitespace) {
        *pos += 1;
    }
    let start = *pos;
    while buf.get(*pos).is_some_and(|b| !b.is_ascii_whitespace()) {
        *pos += 1;
    }
    let token = std::str::from_utf8(buf.get(start..*pos)?).ok()?;

    // the separator before the payload must be a single byte
    if *pos >= buf.len() || token.is_empty() {
        return None;
    }
    *pos += 1;

    Some(token)
}

/// Parse the header of a portable float map.
///
/// # Returns
///
/// The header and the offset of the first payload byte.
pub fn parse_pfm_header(buf: &[u8]) -> Result<(PfmHeader, usize), IoError> {
    let mut pos = 0;
    let mut token = |what: &str| {
        next_token(buf, &mut pos)
            .ok_or_else(|| IoError::MalformedPfmHeader(format!("missing {what}")))
    };

    let channels = match token("magic number")? {
        "Pf" => 1,
        "PF" => 3,
        magic => return Err(IoError::MalformedPfmHeader(format!("bad magic number {magic}"))),
    };

    let parse_dim = |value: &str| {
        value
            .parse::<usize>()
            .map_err(|_| IoError::MalformedPfmHeader(format!("bad dimension {value}")))
    };
    let width = parse_dim(token("width")?)?;
    let height = parse_dim(token("height")?)?;

    let scale_token = token("scale")?;
    let scale = scale_token
        .parse::<f32>()
        .ok()
        .filter(|s| s.is_finite() && *s != 0.0)
        .ok_or_else(|| IoError::MalformedPfmHeader(format!("bad scale {scale_token}")))?;

    let header = PfmHeader {
        channels,
        size: ImageSize { width, height },
        scale,
    };

    Ok((header, pos))
}

fn check_pfm_path(file_path: &Path) -> Result<(), IoError> {
    if !file_path.exists() {
        return Err(IoError::FileDoesNotExist(file_path.to_path_buf()));
    }

    if file_path
        .extension()
        .map_or(true, |ext| !ext.eq_ignore_ascii_case("pfm"))
    {
        return Err(IoError::InvalidFileExtension(file_path.to_path_buf()));
    }

    Ok(())
}

/// Decode a single channel portable float map from memory.
///
/// The rows of a PFM payload are stored from the bottom of the image to the top.
/// The returned raster has its first row at the top.
pub fn decode_depth_pfm(buf: &[u8]) -> Result<Image<f64, 1>, IoError> {
    let (header, offset) = parse_pfm_header(buf)?;
    if header.channels != 1 {
        return Err(IoError::UnsupportedChannels(header.channels));
    }

    let ImageSize { width, height } = header.size;
    let expected = width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| IoError::MalformedPfmHeader(format!("raster too large: {}", header.size)))?;

    let payload = &buf[offset..];
    if payload.len() < expected {
        return Err(IoError::TruncatedPayload {
            expected,
            got: payload.len(),
        });
    }
    if payload.len() > expected {
        log::debug!("ignoring {} trailing bytes", payload.len() - expected);
    }

    let little_endian = header.is_little_endian();
    let mut data = Vec::with_capacity(width * height);
    for row in (0..height).rev() {
        let row_bytes = &payload[row * width * 4..(row + 1) * width * 4];
        data.extend(row_bytes.chunks_exact(4).map(|b| {
            let bytes = [b[0], b[1], b[2], b[3]];
            let v = if little_endian {
                f32::from_le_bytes(bytes)
            } else {
                f32::from_be_bytes(bytes)
            };
            v as f64
        }));
    }

    Ok(Image::new(header.size, data)?)
}

/// Read a single channel portable float map (`Pf`) as a depth raster.
///
/// # Arguments
///
/// * `file_path` - The path to a `.pfm` file.
///
/// # Returns
///
/// A single channel raster widened to `f64`, first row at the top.
pub fn read_depth_pfm(file_path: impl AsRef<Path>) -> Result<Image<f64, 1>, IoError> {
    let file_path = file_path.as_ref();
    check_pfm_path(file_path)?;

    let buf = std::fs::read(file_path)?;
    decode_depth_pfm(&buf)
}

/// Write a single channel raster as a little-endian portable float map.
///
/// Samples are narrowed to `f32`.
///
/// # Arguments
///
/// * `file_path` - The path to the `.pfm` file.
/// * `image` - The raster to write.
pub fn write_depth_pfm<T>(file_path: impl AsRef<Path>, image: &Image<T, 1>) -> Result<(), IoError>
where
    T: Copy + Into<f64>,
{
    let file = std::fs::File::create(file_path)?;
    let mut writer = std::io::BufWriter::new(file);

    write!(writer, "Pf\n{} {}\n-1.0\n", image.width(), image.height())?;

    let width = image.width();
    if width > 0 {
        for row in image.as_slice().chunks_exact(width).rev() {
            for v in row {
                let v: f64 = (*v).into();
                writer.write_all(&(v as f32).to_le_bytes())?;
            }
        }
    }
    writer.flush()?;

    Ok(())
}
