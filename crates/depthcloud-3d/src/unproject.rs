use depthcloud_image::Image;
use rayon::prelude::*;

use crate::calibration::ReprojectionParams;
use crate::pointcloud::{Point3d, PointCloud};

/// A single channel depth or disparity raster in raw sensor units.
pub type DepthRaster = Image<f64, 1>;

/// Scale from raw depth units (millimeters) to metric units.
pub const DEPTH_SCALE: f64 = 1000.0;

/// Unproject a single depth sample at column `col` and row `row`.
///
/// ```text
/// z = d / 1000
/// x = ((col + cx) / f) * z
/// y = ((row + cy) / f) * z
/// ```
#[inline]
pub fn unproject_pixel(col: usize, row: usize, d: f64, params: &ReprojectionParams) -> Point3d {
    let z = d / DEPTH_SCALE;
    let x = ((col as f64 + params.cx) / params.f) * z;
    let y = ((row as f64 + params.cy) / params.f) * z;
    Point3d::new(x, y, z)
}

/// Unproject a depth raster into an organized point cloud in the depth camera frame.
///
/// Every pixel produces exactly one point, in row-major scan order. Degenerate samples
/// are not filtered: a zero depth gives a point at the origin and a zero focal length
/// gives non-finite `x` and `y`. Consumers that need valid points filter them.
///
/// # Arguments
///
/// * `depth` - The depth raster.
/// * `params` - The reprojection parameters.
///
/// Example:
///
/// ```
/// use depthcloud_3d::calibration::ReprojectionParams;
/// use depthcloud_3d::unproject::unproject_depth;
/// use depthcloud_image::{Image, ImageSize};
///
/// let depth = Image::new(ImageSize { width: 2, height: 1 }, vec![1000.0, 2000.0]).unwrap();
/// let params = ReprojectionParams { f: 1.0, cx: 0.0, cy: 0.0, inv_baseline: 0.0 };
/// let cloud = unproject_depth(&depth, &params);
/// assert_eq!(cloud.len(), 2);
/// assert_eq!(cloud.points()[1].x, 2.0);
/// ```
pub fn unproject_depth(depth: &DepthRaster, params: &ReprojectionParams) -> PointCloud<Point3d> {
    let (width, height) = (depth.width(), depth.height());
    let mut points = vec![Point3d::default(); width * height];

    if width > 0 {
        points
            .par_chunks_mut(width)
            .zip(depth.as_slice().par_chunks(width))
            .enumerate()
            .for_each(|(row, (dst_row, src_row))| {
                for (col, (dst, &d)) in dst_row.iter_mut().zip(src_row).enumerate() {
                    *dst = unproject_pixel(col, row, d, params);
                }
            });
    }

    log::debug!("unprojected {} points from a {}x{} raster", points.len(), width, height);

    PointCloud::from_raster_parts(points, width, height)
}
