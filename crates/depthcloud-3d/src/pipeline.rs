use depthcloud_image::ImageSize;

use crate::calibration::{CalibrationModel, ColorIntrinsics, ReprojectionParams};
use crate::colorize::{colorize_points, ColorRaster, ColorizeStats, SamplingPolicy};
use crate::linalg::transform_cloud;
use crate::pointcloud::AssembledCloud;
use crate::transforms::RigidTransform;
use crate::unproject::{unproject_depth, DepthRaster};

/// Error types for the pipeline module.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PipelineError {
    /// The depth raster has no pixel.
    #[error("Depth raster is empty: {0}")]
    EmptyDepthRaster(ImageSize),

    /// The color raster has no pixel.
    #[error("Color raster is empty: {0}")]
    EmptyColorRaster(ImageSize),

    /// Colorization was requested without a color camera calibration.
    #[error("Colorization requires the color camera matrix and the rotation translation matrix")]
    MissingColorCalibration,
}

/// The inputs needed to colorize a cloud.
#[derive(Debug, Clone, Copy)]
pub struct ColorInput<'a> {
    /// The color raster.
    pub image: &'a ColorRaster,
    /// The color camera intrinsics.
    pub intrinsics: &'a ColorIntrinsics,
    /// The transform from the depth camera frame to the color camera frame.
    pub depth_to_color: &'a RigidTransform,
}

/// Run the reprojection pipeline once.
///
/// Unprojects the depth raster and, when `color` is given, moves the cloud into the
/// color camera frame and samples a color for every valid point.
///
/// # Arguments
///
/// * `depth` - The depth raster.
/// * `params` - The reprojection parameters.
/// * `color` - The colorization inputs, if a colorized cloud is requested.
/// * `policy` - The handling of negative pixel coordinates during sampling.
///
/// # Returns
///
/// The assembled cloud and, on the colorized path, the sampling statistics.
///
/// # Errors
///
/// If any raster is empty.
pub fn assemble_cloud(
    depth: &DepthRaster,
    params: &ReprojectionParams,
    color: Option<ColorInput<'_>>,
    policy: SamplingPolicy,
) -> Result<(AssembledCloud, Option<ColorizeStats>), PipelineError> {
    if depth.size().is_empty() {
        return Err(PipelineError::EmptyDepthRaster(depth.size()));
    }

    if params.is_degenerate() {
        log::warn!(
            "focal length {} is degenerate, unprojected points will not be finite",
            params.f
        );
    }

    let start = std::time::Instant::now();
    let cloud = unproject_depth(depth, params);

    let Some(color) = color else {
        log::debug!("geometric cloud assembled in {:?}", start.elapsed());
        return Ok((AssembledCloud::Geometric(cloud), None));
    };

    if color.image.size().is_empty() {
        return Err(PipelineError::EmptyColorRaster(color.image.size()));
    }

    let cloud_in_color = transform_cloud(&cloud, color.depth_to_color);
    let (colored, stats) = colorize_points(&cloud_in_color, color.intrinsics, color.image, policy);

    log::debug!(
        "colorized cloud assembled in {:?}: {} of {} points kept",
        start.elapsed(),
        stats.kept,
        cloud.len()
    );

    Ok((AssembledCloud::Colorized(colored), Some(stats)))
}

/// Assembles point clouds from a fixed calibration.
#[derive(Debug, Clone)]
pub struct CloudAssembler {
    calibration: CalibrationModel,
    policy: SamplingPolicy,
}

impl CloudAssembler {
    /// Create an assembler with the default [`SamplingPolicy`].
    pub fn new(calibration: CalibrationModel) -> Self {
        Self {
            calibration,
            policy: SamplingPolicy::default(),
        }
    }

    /// Set the sampling policy used on the colorized path.
    pub fn with_policy(mut self, policy: SamplingPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Assemble a geometric cloud, or a colorized one when `color_image` is given.
    ///
    /// # Errors
    ///
    /// If any raster is empty, or if a colorized cloud is requested but the
    /// calibration has no color camera part.
    pub fn run(
        &self,
        depth: &DepthRaster,
        color_image: Option<&ColorRaster>,
    ) -> Result<(AssembledCloud, Option<ColorizeStats>), PipelineError> {
        let color = match color_image {
            Some(image) => {
                let calib = self
                    .calibration
                    .color
                    .as_ref()
                    .ok_or(PipelineError::MissingColorCalibration)?;
                Some(ColorInput {
                    image,
                    intrinsics: &calib.intrinsics,
                    depth_to_color: &calib.depth_to_color,
                })
            }
            None => None,
        };

        assemble_cloud(depth, &self.calibration.reprojection, color, self.policy)
    }
}
