use crate::transforms::RigidTransform;

/// Reprojection parameters extracted from the 4x4 disparity-to-depth matrix `Q`.
///
/// ```text
/// [[1, 0,   0,   cx],
///  [0, 1,   0,   cy],
///  [0, 0,   0,   f ],
///  [0, 0, 1/B,   0 ]]
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReprojectionParams {
    /// Focal length in pixels.
    pub f: f64,
    /// Horizontal principal point offset.
    pub cx: f64,
    /// Vertical principal point offset.
    pub cy: f64,
    /// Inverse baseline entry `Q[3][2]`. Not used by the projection.
    pub inv_baseline: f64,
}

impl ReprojectionParams {
    /// Extract the parameters from a row-major `Q` matrix.
    pub fn from_q_matrix(q: &[[f64; 4]; 4]) -> Self {
        Self {
            f: q[2][3],
            cx: q[0][3],
            cy: q[1][3],
            inv_baseline: q[3][2],
        }
    }

    /// Check if the focal length makes the unprojection degenerate.
    ///
    /// A degenerate focal length yields non-finite `x` and `y` coordinates.
    pub fn is_degenerate(&self) -> bool {
        self.f == 0.0 || !self.f.is_finite()
    }
}

/// Scale and offset used to map 3D points into the color camera pixel grid.
///
/// Read from a 2x2 matrix `[[sx, sy], [ox, oy]]`. No range or orthogonality check is made.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorIntrinsics {
    /// Horizontal scale.
    pub sx: f64,
    /// Vertical scale.
    pub sy: f64,
    /// Horizontal offset, subtracted after the perspective division.
    pub ox: f64,
    /// Vertical offset, subtracted after the perspective division.
    pub oy: f64,
}

impl ColorIntrinsics {
    /// Identity intrinsics: unit scale and no offset.
    pub fn identity() -> Self {
        Self {
            sx: 1.0,
            sy: 1.0,
            ox: 0.0,
            oy: 0.0,
        }
    }

    /// Extract the intrinsics from a row-major 2x2 matrix.
    pub fn from_matrix2(m: &[[f64; 2]; 2]) -> Self {
        Self {
            sx: m[0][0],
            sy: m[0][1],
            ox: m[1][0],
            oy: m[1][1],
        }
    }

    /// Project a point given in the color camera frame to continuous pixel coordinates.
    ///
    /// PRECONDITION: `z != 0`.
    #[inline]
    pub fn project(&self, x: f64, y: f64, z: f64) -> (f64, f64) {
        (x * self.sx / z - self.ox, y * self.sy / z - self.oy)
    }
}

/// Calibration of the color camera relative to the depth camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorCalibration {
    /// The color camera intrinsics.
    pub intrinsics: ColorIntrinsics,
    /// The transform from the depth camera frame to the color camera frame.
    pub depth_to_color: RigidTransform,
}

/// All the calibration needed by the pipeline.
///
/// Built once per run by the calibration loader and read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationModel {
    /// The raw row-major disparity-to-depth matrix.
    pub q_matrix: [[f64; 4]; 4],
    /// The parameters of `q_matrix` used for unprojection.
    pub reprojection: ReprojectionParams,
    /// The color camera calibration, if available.
    pub color: Option<ColorCalibration>,
}

impl CalibrationModel {
    /// Build the model from its raw matrices.
    ///
    /// # Arguments
    ///
    /// * `q_matrix` - The row-major 4x4 disparity-to-depth matrix.
    /// * `color_matrix` - The row-major 2x2 color camera matrix.
    /// * `rotation_translation` - The row-major 4x4 depth-to-color transform.
    pub fn from_matrices(
        q_matrix: [[f64; 4]; 4],
        color_matrix: Option<[[f64; 2]; 2]>,
        rotation_translation: Option<[[f64; 4]; 4]>,
    ) -> Self {
        let color = match (color_matrix, rotation_translation) {
            (Some(color_matrix), Some(rotation_translation)) => Some(ColorCalibration {
                intrinsics: ColorIntrinsics::from_matrix2(&color_matrix),
                depth_to_color: RigidTransform::from_matrix4(&rotation_translation),
            }),
            _ => None,
        };

        Self {
            reprojection: ReprojectionParams::from_q_matrix(&q_matrix),
            q_matrix,
            color,
        }
    }
}
