use depthcloud_image::Image;
use rayon::prelude::*;

use crate::calibration::ColorIntrinsics;
use crate::pointcloud::{ColorPoint3d, Point3d, PointCloud};

/// An RGB raster with 8-bit channels.
pub type ColorRaster = Image<u8, 3>;

/// How rounded pixel coordinates are turned into raster indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SamplingPolicy {
    /// Drop points projecting to a negative or out of bounds pixel.
    #[default]
    Discard,
    /// Mirror negative pixel coordinates to positive ones before the bounds check.
    ///
    /// This reproduces the `abs()` fold-over of legacy tools. Points that still land
    /// outside the raster after folding are dropped.
    FoldNegative,
}

/// Why a point was left out of the colorized cloud.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// The point has zero depth in the color camera frame.
    ZeroDepth,
    /// The projected pixel coordinates are NaN or infinite.
    NonFiniteProjection,
    /// The projected pixel falls outside the color raster.
    OutOfBounds,
}

/// Number of points kept and dropped by [`colorize_points`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ColorizeStats {
    /// Points that received a color.
    pub kept: usize,
    /// Points dropped because of a zero depth.
    pub zero_depth: usize,
    /// Points dropped because of a non-finite projection.
    pub non_finite: usize,
    /// Points dropped because they project outside the raster.
    pub out_of_bounds: usize,
}

impl ColorizeStats {
    /// Total number of dropped points.
    pub fn discarded(&self) -> usize {
        self.zero_depth + self.non_finite + self.out_of_bounds
    }

    fn record(&mut self, outcome: Result<(), DiscardReason>) {
        match outcome {
            Ok(()) => self.kept += 1,
            Err(DiscardReason::ZeroDepth) => self.zero_depth += 1,
            Err(DiscardReason::NonFiniteProjection) => self.non_finite += 1,
            Err(DiscardReason::OutOfBounds) => self.out_of_bounds += 1,
        }
    }
}

/// Project a point in the color camera frame to an integer pixel `(col, row)`.
///
/// The continuous projection is rounded half away from zero. The returned indices are
/// guaranteed to be inside a `width x height` raster.
///
/// # Errors
///
/// A [`DiscardReason`] when the point has no valid pixel.
pub fn project_to_pixel(
    point: &Point3d,
    intrinsics: &ColorIntrinsics,
    width: usize,
    height: usize,
    policy: SamplingPolicy,
) -> Result<(usize, usize), DiscardReason> {
    if point.z == 0.0 {
        return Err(DiscardReason::ZeroDepth);
    }

    let (px, py) = intrinsics.project(point.x, point.y, point.z);
    if !px.is_finite() || !py.is_finite() {
        return Err(DiscardReason::NonFiniteProjection);
    }

    let (mut col, mut row) = (px.round(), py.round());
    if policy == SamplingPolicy::FoldNegative {
        col = col.abs();
        row = row.abs();
    }

    if col < 0.0 || row < 0.0 || col >= width as f64 || row >= height as f64 {
        return Err(DiscardReason::OutOfBounds);
    }

    Ok((col as usize, row as usize))
}

/// Sample a color for every point of a cloud given in the color camera frame.
///
/// Points with no valid projection are dropped, so the output is an unorganized cloud
/// with at most as many points as the input. Output positions are the input positions.
///
/// # Arguments
///
/// * `cloud` - The point cloud in the color camera frame.
/// * `intrinsics` - The color camera intrinsics.
/// * `image` - The color raster.
/// * `policy` - The handling of negative pixel coordinates.
///
/// # Returns
///
/// The colorized cloud and the per-reason discard counts.
pub fn colorize_points(
    cloud: &PointCloud<Point3d>,
    intrinsics: &ColorIntrinsics,
    image: &ColorRaster,
    policy: SamplingPolicy,
) -> (PointCloud<ColorPoint3d>, ColorizeStats) {
    let (width, height) = (image.width(), image.height());

    let sampled = cloud
        .points()
        .par_iter()
        .map(|p| -> Result<ColorPoint3d, DiscardReason> {
            let (col, row) = project_to_pixel(p, intrinsics, width, height, policy)?;
            let rgb = image
                .pixel(col, row)
                .ok_or(DiscardReason::OutOfBounds)?;
            Ok(ColorPoint3d::new(*p, [rgb[0], rgb[1], rgb[2]]))
        })
        .collect::<Vec<_>>();

    let mut stats = ColorizeStats::default();
    let points = sampled
        .into_iter()
        .filter_map(|sample| {
            stats.record(sample.map(|_| ()));
            sample.ok()
        })
        .collect::<Vec<_>>();

    if stats.discarded() > 0 {
        log::debug!(
            "dropped {} of {} points while sampling colors \
             (zero depth: {}, non-finite: {}, out of bounds: {})",
            stats.discarded(),
            cloud.len(),
            stats.zero_depth,
            stats.non_finite,
            stats.out_of_bounds
        );
    }

    (PointCloud::unorganized(points), stats)
}
