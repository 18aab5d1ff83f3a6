use glam::DVec3;

/// A 3D point in a camera coordinate frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point3d {
    /// The x coordinate.
    pub x: f64,
    /// The y coordinate.
    pub y: f64,
    /// The z coordinate (depth along the optical axis).
    pub z: f64,
}

impl Point3d {
    /// Create a new point from its coordinates.
    #[inline]
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Check if all the coordinates are finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<DVec3> for Point3d {
    fn from(p: DVec3) -> Self {
        Self::new(p.x, p.y, p.z)
    }
}

impl From<Point3d> for DVec3 {
    fn from(p: Point3d) -> Self {
        DVec3::new(p.x, p.y, p.z)
    }
}

/// A 3D point carrying an RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ColorPoint3d {
    /// The x coordinate.
    pub x: f64,
    /// The y coordinate.
    pub y: f64,
    /// The z coordinate.
    pub z: f64,
    /// The color of the point in RGB order.
    pub rgb: [u8; 3],
}

impl ColorPoint3d {
    /// Create a new colored point from a position and a color.
    #[inline]
    pub fn new(point: Point3d, rgb: [u8; 3]) -> Self {
        Self {
            x: point.x,
            y: point.y,
            z: point.z,
            rgb,
        }
    }

    /// Pack the color as `0x00RRGGBB`, the layout used by the `rgb` field of PCD files.
    #[inline]
    pub fn packed_rgb(&self) -> u32 {
        ((self.rgb[0] as u32) << 16) | ((self.rgb[1] as u32) << 8) | self.rgb[2] as u32
    }

    /// Unpack a `0x00RRGGBB` color.
    #[inline]
    pub fn unpack_rgb(rgb: u32) -> [u8; 3] {
        [
            ((rgb >> 16) & 0xFF) as u8,
            ((rgb >> 8) & 0xFF) as u8,
            (rgb & 0xFF) as u8,
        ]
    }
}

/// Storage kind of a point field once serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// 32-bit float (PCD type `F`, size 4).
    Float32,
    /// 32-bit unsigned integer (PCD type `U`, size 4).
    UInt32,
}

/// Name and storage kind of a point field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// The field name.
    pub name: &'static str,
    /// The field storage kind.
    pub kind: FieldKind,
}

/// The value of a single point field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    /// A real value.
    Float(f64),
    /// An unsigned integer value.
    Unsigned(u32),
}

/// A point record exposing named numeric fields.
///
/// This is the contract serializers rely on: a point cloud is an ordered sequence of
/// records, each one with the fields listed in [`PointRecord::FIELDS`].
pub trait PointRecord: Copy + Send + Sync {
    /// The fields of the record, in serialization order.
    const FIELDS: &'static [FieldDescriptor];

    /// Get the value of the field at `index` in [`PointRecord::FIELDS`].
    ///
    /// PRECONDITION: `index < Self::FIELDS.len()`.
    fn field(&self, index: usize) -> FieldValue;

    /// Get the position of the point.
    fn position(&self) -> Point3d;
}

const XYZ_FIELDS: [FieldDescriptor; 3] = [
    FieldDescriptor {
        name: "x",
        kind: FieldKind::Float32,
    },
    FieldDescriptor {
        name: "y",
        kind: FieldKind::Float32,
    },
    FieldDescriptor {
        name: "z",
        kind: FieldKind::Float32,
    },
];

const XYZRGB_FIELDS: [FieldDescriptor; 4] = [
    XYZ_FIELDS[0],
    XYZ_FIELDS[1],
    XYZ_FIELDS[2],
    FieldDescriptor {
        name: "rgb",
        kind: FieldKind::UInt32,
    },
];

impl PointRecord for Point3d {
    const FIELDS: &'static [FieldDescriptor] = &XYZ_FIELDS;

    fn field(&self, index: usize) -> FieldValue {
        match index {
            0 => FieldValue::Float(self.x),
            1 => FieldValue::Float(self.y),
            _ => FieldValue::Float(self.z),
        }
    }

    #[inline]
    fn position(&self) -> Point3d {
        *self
    }
}

impl PointRecord for ColorPoint3d {
    const FIELDS: &'static [FieldDescriptor] = &XYZRGB_FIELDS;

    fn field(&self, index: usize) -> FieldValue {
        match index {
            0 => FieldValue::Float(self.x),
            1 => FieldValue::Float(self.y),
            2 => FieldValue::Float(self.z),
            _ => FieldValue::Unsigned(self.packed_rgb()),
        }
    }

    #[inline]
    fn position(&self) -> Point3d {
        Point3d::new(self.x, self.y, self.z)
    }
}

/// A point cloud with width and height metadata.
///
/// Organized clouds keep the raster layout they were produced from (`width * height`
/// points in row-major order). Unorganized clouds have `height == 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct PointCloud<P> {
    // The points in the point cloud.
    points: Vec<P>,
    // The number of columns of an organized cloud, or the number of points.
    width: usize,
    // The number of rows of an organized cloud, or 1.
    height: usize,
}

impl<P: PointRecord> PointCloud<P> {
    /// Create an organized point cloud.
    ///
    /// Returns `None` if the number of points is not `width * height`.
    pub fn organized(points: Vec<P>, width: usize, height: usize) -> Option<Self> {
        (points.len() == width * height).then_some(Self {
            points,
            width,
            height,
        })
    }

    /// Create an organized point cloud from points already laid out as a raster.
    ///
    /// PRECONDITION: `points.len() == width * height`.
    pub(crate) fn from_raster_parts(points: Vec<P>, width: usize, height: usize) -> Self {
        debug_assert_eq!(points.len(), width * height);
        Self {
            points,
            width,
            height,
        }
    }

    /// Create an unorganized point cloud (`height == 1`).
    pub fn unorganized(points: Vec<P>) -> Self {
        let width = points.len();
        Self {
            points,
            width,
            height: 1,
        }
    }

    /// Get the number of points in the point cloud.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the point cloud is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The declared width of the point cloud.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// The declared height of the point cloud.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Check if the point cloud keeps a raster layout.
    #[inline]
    pub fn is_organized(&self) -> bool {
        self.height > 1
    }

    /// Get as reference the points in the point cloud.
    pub fn points(&self) -> &[P] {
        &self.points
    }

    /// Consume the point cloud and return its points.
    pub fn into_points(self) -> Vec<P> {
        self.points
    }

    /// Get the minimum bound of the finite points of the point cloud.
    ///
    /// Returns `None` if the cloud has no finite point.
    pub fn min_bound(&self) -> Option<Point3d> {
        self.fold_finite(f64::min)
    }

    /// Get the maximum bound of the finite points of the point cloud.
    ///
    /// Returns `None` if the cloud has no finite point.
    pub fn max_bound(&self) -> Option<Point3d> {
        self.fold_finite(f64::max)
    }

    fn fold_finite(&self, op: fn(f64, f64) -> f64) -> Option<Point3d> {
        self.points
            .iter()
            .map(P::position)
            .filter(Point3d::is_finite)
            .reduce(|a, b| Point3d::new(op(a.x, b.x), op(a.y, b.y), op(a.z, b.z)))
    }
}

/// The output of the cloud assembler: a geometric or a colorized point cloud.
#[derive(Debug, Clone, PartialEq)]
pub enum AssembledCloud {
    /// An organized cloud in the depth camera frame.
    Geometric(PointCloud<Point3d>),
    /// An unorganized cloud in the color camera frame.
    Colorized(PointCloud<ColorPoint3d>),
}

impl AssembledCloud {
    /// Get the number of points in the point cloud.
    pub fn len(&self) -> usize {
        match self {
            AssembledCloud::Geometric(cloud) => cloud.len(),
            AssembledCloud::Colorized(cloud) => cloud.len(),
        }
    }

    /// Check if the point cloud is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointcloud() {
        let pointcloud = PointCloud::organized(
            vec![
                Point3d::new(0.0, 0.0, 0.0),
                Point3d::new(1.0, 0.0, 0.0),
                Point3d::new(0.0, 2.0, 0.5),
                Point3d::new(1.0, 2.0, 3.0),
            ],
            2,
            2,
        )
        .expect("4 points fit a 2x2 layout");

        assert_eq!(pointcloud.len(), 4);
        assert_eq!(pointcloud.width(), 2);
        assert_eq!(pointcloud.height(), 2);
        assert!(pointcloud.is_organized());

        assert_eq!(pointcloud.min_bound(), Some(Point3d::new(0.0, 0.0, 0.0)));
        assert_eq!(pointcloud.max_bound(), Some(Point3d::new(1.0, 2.0, 3.0)));
    }

    #[test]
    fn test_organized_wrong_size() {
        let cloud = PointCloud::organized(vec![Point3d::default(); 3], 2, 2);
        assert!(cloud.is_none());
    }

    #[test]
    fn test_unorganized_bounds_skip_non_finite() {
        let cloud = PointCloud::unorganized(vec![
            ColorPoint3d::new(Point3d::new(f64::NAN, 0.0, 1.0), [0, 0, 0]),
            ColorPoint3d::new(Point3d::new(-1.0, 4.0, 2.0), [1, 2, 3]),
            ColorPoint3d::new(Point3d::new(3.0, f64::INFINITY, 1.0), [0, 0, 0]),
        ]);
        assert_eq!(cloud.height(), 1);
        assert_eq!(cloud.width(), 3);
        assert!(!cloud.is_organized());
        assert_eq!(cloud.min_bound(), Some(Point3d::new(-1.0, 4.0, 2.0)));

        let empty = PointCloud::<Point3d>::unorganized(vec![]);
        assert!(empty.is_empty());
        assert_eq!(empty.max_bound(), None);
    }

    #[test]
    fn test_point_record_fields() {
        let p = ColorPoint3d::new(Point3d::new(1.0, 2.0, 3.0), [0x12, 0x34, 0x56]);
        let names = ColorPoint3d::FIELDS
            .iter()
            .map(|f| f.name)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["x", "y", "z", "rgb"]);
        assert_eq!(p.field(2), FieldValue::Float(3.0));
        assert_eq!(p.field(3), FieldValue::Unsigned(0x123456));
        assert_eq!(ColorPoint3d::unpack_rgb(p.packed_rgb()), [0x12, 0x34, 0x56]);

        assert_eq!(Point3d::FIELDS.len(), 3);
        assert_eq!(Point3d::new(4.0, 5.0, 6.0).field(0), FieldValue::Float(4.0));
    }
}
