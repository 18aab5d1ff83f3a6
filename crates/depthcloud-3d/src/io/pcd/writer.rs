use std::io::{BufWriter, Write};
use std::path::Path;

use super::{check_extension, PcdError};
use crate::pointcloud::{FieldDescriptor, FieldKind, FieldValue, PointCloud, PointRecord};

/// Options of the ascii PCD writer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PcdWriteOptions {
    /// Number of decimal digits written for float fields.
    ///
    /// `None` writes the shortest representation that reads back to the same `f32`.
    pub precision: Option<usize>,
}

/// Write a point cloud as an ascii PCD file.
///
/// # Arguments
///
/// * `path` - Path to a `.pcd` file. The file is created or truncated.
/// * `cloud` - The point cloud to write.
/// * `options` - The formatting options.
///
/// Example:
///
/// ```no_run
/// use depthcloud_3d::io::pcd::{write_pcd_ascii, PcdWriteOptions};
/// use depthcloud_3d::pointcloud::{Point3d, PointCloud};
///
/// let cloud = PointCloud::unorganized(vec![Point3d::new(0.0, 1.0, 2.0)]);
/// write_pcd_ascii("cloud.pcd", &cloud, &PcdWriteOptions::default()).unwrap();
/// ```
pub fn write_pcd_ascii<P: PointRecord>(
    path: impl AsRef<Path>,
    cloud: &PointCloud<P>,
    options: &PcdWriteOptions,
) -> Result<(), PcdError> {
    check_extension(path.as_ref())?;

    let file = std::fs::File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_pcd_ascii_to(&mut writer, cloud, options)?;
    writer.flush()?;

    Ok(())
}

/// Write a point cloud in the ascii PCD format to any writer.
pub fn write_pcd_ascii_to<W: Write, P: PointRecord>(
    writer: &mut W,
    cloud: &PointCloud<P>,
    options: &PcdWriteOptions,
) -> Result<(), PcdError> {
    write_header(writer, cloud)?;

    for point in cloud.points() {
        for i in 0..P::FIELDS.len() {
            if i > 0 {
                writer.write_all(b" ")?;
            }
            write_value(writer, point.field(i), options.precision)?;
        }
        writer.write_all(b"\n")?;
    }

    Ok(())
}

fn write_header<W: Write, P: PointRecord>(
    writer: &mut W,
    cloud: &PointCloud<P>,
) -> Result<(), PcdError> {
    writeln!(writer, "# .PCD v0.7 - Point Cloud Data file format")?;
    writeln!(writer, "VERSION 0.7")?;
    writeln!(writer, "FIELDS {}", join_fields::<P>(|f| f.name))?;
    writeln!(writer, "SIZE {}", join_fields::<P>(|_| "4"))?;
    writeln!(
        writer,
        "TYPE {}",
        join_fields::<P>(|f| match f.kind {
            FieldKind::Float32 => "F",
            FieldKind::UInt32 => "U",
        })
    )?;
    writeln!(writer, "COUNT {}", join_fields::<P>(|_| "1"))?;
    writeln!(writer, "WIDTH {}", cloud.width())?;
    writeln!(writer, "HEIGHT {}", cloud.height())?;
    writeln!(writer, "VIEWPOINT 0 0 0 1 0 0 0")?;
    writeln!(writer, "POINTS {}", cloud.len())?;
    writeln!(writer, "DATA ascii")?;

    Ok(())
}

fn join_fields<P: PointRecord>(token: impl Fn(&FieldDescriptor) -> &'static str) -> String {
    P::FIELDS.iter().map(token).collect::<Vec<_>>().join(" ")
}

fn write_value<W: Write>(
    writer: &mut W,
    value: FieldValue,
    precision: Option<usize>,
) -> std::io::Result<()> {
    match value {
        FieldValue::Unsigned(v) => write!(writer, "{v}"),
        FieldValue::Float(v) => {
            let v = v as f32;
            if v.is_nan() {
                write!(writer, "nan")
            } else if v.is_infinite() {
                write!(writer, "{}", if v > 0.0 { "inf" } else { "-inf" })
            } else if let Some(precision) = precision {
                write!(writer, "{v:.precision$}")
            } else {
                write!(writer, "{v}")
            }
        }
    }
}
