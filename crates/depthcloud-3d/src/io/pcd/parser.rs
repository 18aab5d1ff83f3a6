use std::collections::HashMap;
use std::io::{BufRead, Read};
use std::path::Path;

use super::{check_extension, PcdError};
use crate::pointcloud::{ColorPoint3d, Point3d, PointCloud};

const MAX_POINT_STEP: usize = 1024;
const MAX_POINTS: usize = 50_000_000;

/// A point cloud read from a PCD file, with or without colors.
#[derive(Debug, Clone, PartialEq)]
pub enum GenericPointCloud {
    /// A cloud with `x y z` fields.
    Xyz(PointCloud<Point3d>),
    /// A cloud with `x y z rgb` fields.
    XyzRgb(PointCloud<ColorPoint3d>),
}

impl GenericPointCloud {
    /// Get the number of points in the point cloud.
    pub fn len(&self) -> usize {
        match self {
            GenericPointCloud::Xyz(cloud) => cloud.len(),
            GenericPointCloud::XyzRgb(cloud) => cloud.len(),
        }
    }

    /// Check if the point cloud is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Describes a single field in a PCD point record
#[derive(Debug)]
struct PcdField {
    name: String,
    index: usize,  // position of the field in an ascii record
    offset: usize, // byte offset within a binary point
    kind: char,    // PCD type: 'F' = float, 'U' = unsigned int, 'I' = signed int
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PcdData {
    Ascii,
    Binary,
}

#[derive(Debug)]
struct PcdLayout {
    fields: HashMap<String, PcdField>,
    num_fields: usize,
    point_step: usize, // total bytes per point
    num_points: usize, // number of points
    width: Option<usize>,
    height: Option<usize>,
    data: PcdData,
}

impl PcdLayout {
    fn get_field(&self, name: &str) -> Result<&PcdField, PcdError> {
        self.fields.get(name).ok_or(PcdError::UnsupportedProperty)
    }
}

/// Read a little-endian f32 from a byte buffer
#[inline]
fn read_f32(buf: &[u8], offset: usize) -> Result<f32, PcdError> {
    let slice = buf
        .get(offset..offset + 4)
        .ok_or(PcdError::UnsupportedProperty)?;
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(slice);
    Ok(f32::from_le_bytes(bytes))
}

/// Read a little-endian u32 from a byte buffer
#[inline]
fn read_u32(buf: &[u8], offset: usize) -> Result<u32, PcdError> {
    let slice = buf
        .get(offset..offset + 4)
        .ok_or(PcdError::UnsupportedProperty)?;
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(slice);
    Ok(u32::from_le_bytes(bytes))
}

fn parse_usize(token: Option<&str>) -> Result<usize, PcdError> {
    token
        .ok_or(PcdError::UnsupportedProperty)?
        .parse::<usize>()
        .map_err(|_| PcdError::UnsupportedProperty)
}

fn parse_pcd_layout<R: BufRead>(reader: &mut R) -> Result<PcdLayout, PcdError> {
    let mut field_names: Vec<String> = Vec::new();
    let mut sizes = Vec::new();
    let mut types = Vec::new();
    let mut counts = Vec::new();
    let mut points = 0usize;
    let mut width = None;
    let mut height = None;

    let data = loop {
        let mut line = String::new();
        let n = reader.read_line(&mut line)?;
        if n == 0 {
            return Err(PcdError::MalformedHeader);
        }
        let line = line.trim();

        if line.starts_with("DATA") {
            match line {
                "DATA ascii" => break PcdData::Ascii,
                "DATA binary" => break PcdData::Binary,
                _ => return Err(PcdError::UnsupportedProperty),
            }
        }

        let mut it = line.split_whitespace();
        match it.next() {
            Some("SIZE") => {
                sizes = it
                    .map(|v| parse_usize(Some(v)))
                    .collect::<Result<Vec<_>, _>>()?;
            }
            Some("TYPE") => {
                types = it
                    .map(|v| v.chars().next().ok_or(PcdError::UnsupportedProperty))
                    .collect::<Result<Vec<_>, _>>()?;
            }
            Some("COUNT") => {
                counts = it
                    .map(|v| parse_usize(Some(v)))
                    .collect::<Result<Vec<_>, _>>()?;
            }
            Some("WIDTH") => width = Some(parse_usize(it.next())?),
            Some("HEIGHT") => height = Some(parse_usize(it.next())?),
            Some("POINTS") => points = parse_usize(it.next())?,
            Some("FIELDS") => field_names = it.map(String::from).collect(),
            _ => {}
        }
    };

    if field_names.is_empty()
        || sizes.len() != field_names.len()
        || types.len() != field_names.len()
        || (!counts.is_empty() && counts.len() != field_names.len())
    {
        return Err(PcdError::UnsupportedProperty);
    }

    // Compute byte offsets for each field
    let mut offset = 0usize;
    let mut fields = HashMap::new();

    for (i, name) in field_names.iter().enumerate() {
        // COUNT defaults to 1 when omitted
        let count = counts.get(i).copied().unwrap_or(1);
        let size = sizes[i];

        match name.as_str() {
            "x" | "y" | "z" => {
                if !(size == 4 && count == 1 && types[i] == 'F') {
                    return Err(PcdError::UnsupportedProperty);
                }
            }
            "rgb" => {
                if !(size == 4
                    && count == 1
                    && (types[i] == 'U' || types[i] == 'I' || types[i] == 'F'))
                {
                    return Err(PcdError::UnsupportedProperty);
                }
            }
            // ascii records are read one token per field
            _ if data == PcdData::Ascii && count != 1 => {
                return Err(PcdError::UnsupportedProperty);
            }
            _ => {}
        }

        let field = PcdField {
            name: name.clone(),
            index: i,
            offset,
            kind: types[i],
        };

        let field_bytes = size.checked_mul(count).ok_or(PcdError::MalformedHeader)?;

        offset = offset
            .checked_add(field_bytes)
            .ok_or(PcdError::MalformedHeader)?;

        if offset > MAX_POINT_STEP {
            return Err(PcdError::MalformedHeader);
        }

        if fields.contains_key(&field.name) {
            return Err(PcdError::MalformedHeader);
        }
        fields.insert(field.name.clone(), field);
    }

    Ok(PcdLayout {
        fields,
        num_fields: field_names.len(),
        point_step: offset,
        num_points: points,
        width,
        height,
        data,
    })
}

/// Interpret the raw bits of a PCD `rgb` field as a `0x00RRGGBB` value.
fn rgb_from_ascii(token: &str, kind: char) -> Option<u32> {
    match kind {
        // PCL stores the packed color in the bits of a float
        'F' => token.parse::<f32>().ok().map(f32::to_bits),
        'I' => token.parse::<i32>().ok().map(|v| v as u32),
        _ => token.parse::<u32>().ok(),
    }
}

/// Read a PCD file.
///
/// # Arguments
/// * `path` - Path to a `.pcd` file.
///
/// # Returns
/// A [`GenericPointCloud`] holding the 3D points and, if the file has an `rgb` field,
/// their colors. The `WIDTH`/`HEIGHT` layout is kept when it matches the number of points.
///
/// # Supported formats
/// - XYZ and XYZRGB, `DATA ascii` or `DATA binary`
pub fn read_pcd(path: impl AsRef<Path>) -> Result<GenericPointCloud, PcdError> {
    check_extension(path.as_ref())?;

    // Open file
    let file = std::fs::File::open(path)?;
    let mut reader = std::io::BufReader::new(file);

    read_pcd_from(&mut reader)
}

/// Read a PCD stream. See [`read_pcd`].
pub fn read_pcd_from<R: BufRead>(reader: &mut R) -> Result<GenericPointCloud, PcdError> {
    let layout = parse_pcd_layout(reader)?;

    if layout.num_points > MAX_POINTS {
        return Err(PcdError::MalformedHeader);
    }

    if layout.point_step == 0 || layout.point_step > MAX_POINT_STEP {
        return Err(PcdError::MalformedHeader);
    }

    let (points, colors) = match layout.data {
        PcdData::Ascii => read_ascii_records(reader, &layout)?,
        PcdData::Binary => read_binary_records(reader, &layout)?,
    };

    let (width, height) = match (layout.width, layout.height) {
        (Some(w), Some(h)) if w.checked_mul(h) == Some(points.len()) => (w, h),
        _ => (points.len(), 1),
    };

    Ok(match colors {
        Some(colors) => {
            let points = points
                .into_iter()
                .zip(colors)
                .map(|(p, rgb)| ColorPoint3d::new(p, rgb))
                .collect();
            GenericPointCloud::XyzRgb(PointCloud::from_raster_parts(points, width, height))
        }
        None => GenericPointCloud::Xyz(PointCloud::from_raster_parts(points, width, height)),
    })
}

type Records = (Vec<Point3d>, Option<Vec<[u8; 3]>>);

fn read_binary_records<R: Read>(reader: &mut R, layout: &PcdLayout) -> Result<Records, PcdError> {
    // Required fields
    let fx = layout.get_field("x")?.offset;
    let fy = layout.get_field("y")?.offset;
    let fz = layout.get_field("z")?.offset;

    // Optional fields
    let frgb = layout.fields.get("rgb").map(|f| f.offset);

    let mut buffer = vec![0u8; layout.point_step];
    let mut points = Vec::with_capacity(layout.num_points);
    let mut colors = Vec::with_capacity(if frgb.is_some() { layout.num_points } else { 0 });

    // Read binary points
    for _ in 0..layout.num_points {
        reader.read_exact(&mut buffer)?;

        let x = read_f32(&buffer, fx)?;
        let y = read_f32(&buffer, fy)?;
        let z = read_f32(&buffer, fz)?;
        points.push(Point3d::new(x as f64, y as f64, z as f64));

        if let Some(off) = frgb {
            colors.push(ColorPoint3d::unpack_rgb(read_u32(&buffer, off)?));
        }
    }

    Ok((points, frgb.map(|_| colors)))
}

fn read_ascii_records<R: BufRead>(reader: &mut R, layout: &PcdLayout) -> Result<Records, PcdError> {
    let fx = layout.get_field("x")?.index;
    let fy = layout.get_field("y")?.index;
    let fz = layout.get_field("z")?.index;
    let frgb = layout.fields.get("rgb").map(|f| (f.index, f.kind));

    let mut points = Vec::with_capacity(layout.num_points);
    let mut colors = Vec::with_capacity(if frgb.is_some() { layout.num_points } else { 0 });

    let mut line = String::new();
    let mut line_no = 0usize;
    while points.len() < layout.num_points {
        line.clear();
        line_no += 1;
        if reader.read_line(&mut line)? == 0 {
            return Err(PcdError::MalformedRecord(line_no));
        }
        let tokens = line.split_whitespace().collect::<Vec<_>>();
        if tokens.is_empty() {
            continue;
        }
        if tokens.len() != layout.num_fields {
            return Err(PcdError::MalformedRecord(line_no));
        }

        // `f64::from_str` accepts "nan", "inf" and "-inf"
        let coord = |i: usize| {
            tokens[i]
                .parse::<f64>()
                .map_err(|_| PcdError::MalformedRecord(line_no))
        };
        points.push(Point3d::new(coord(fx)?, coord(fy)?, coord(fz)?));

        if let Some((index, kind)) = frgb {
            let rgb = rgb_from_ascii(tokens[index], kind).ok_or(PcdError::MalformedRecord(line_no))?;
            colors.push(ColorPoint3d::unpack_rgb(rgb));
        }
    }

    Ok((points, frgb.map(|_| colors)))
}
