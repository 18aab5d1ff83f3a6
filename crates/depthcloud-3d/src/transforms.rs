use glam::{DAffine3, DMat3, DMat4, DVec3};

use crate::pointcloud::Point3d;

/// Error types for the transforms module.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TransformError {
    /// The rotation axis has no direction.
    #[error("cannot compute rotation matrix from a zero vector")]
    ZeroRotationAxis,
}

/// A rigid transform `dst_T_src` relating two camera frames.
///
/// Stored as an affine map, i.e. a 4x4 homogeneous matrix whose bottom row is
/// `[0, 0, 0, 1]` by construction. The transform is never mutated once built and can
/// be shared across threads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidTransform {
    dst_from_src: DAffine3,
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl RigidTransform {
    /// Create a transform from a rotation matrix and a translation.
    pub fn new(rotation: DMat3, translation: DVec3) -> Self {
        Self {
            dst_from_src: DAffine3::from_mat3_translation(rotation, translation),
        }
    }

    /// The identity transform.
    pub fn identity() -> Self {
        Self {
            dst_from_src: DAffine3::IDENTITY,
        }
    }

    /// A pure translation.
    pub fn from_translation(translation: [f64; 3]) -> Self {
        Self {
            dst_from_src: DAffine3::from_translation(DVec3::from_array(translation)),
        }
    }

    /// A rotation around `axis` by `angle` radians followed by a translation.
    ///
    /// The axis does not need to be normalized.
    pub fn from_axis_angle(
        axis: [f64; 3],
        angle: f64,
        translation: [f64; 3],
    ) -> Result<Self, TransformError> {
        let axis = DVec3::from_array(axis)
            .try_normalize()
            .ok_or(TransformError::ZeroRotationAxis)?;

        Ok(Self::new(
            DMat3::from_axis_angle(axis, angle),
            DVec3::from_array(translation),
        ))
    }

    /// Build the transform from a row-major 4x4 homogeneous matrix.
    ///
    /// Only the upper 3x4 block is read: the bottom row is taken as `[0, 0, 0, 1]`
    /// whatever the input holds. A different bottom row is reported with a warning.
    pub fn from_matrix4(matrix: &[[f64; 4]; 4]) -> Self {
        if matrix[3] != [0.0, 0.0, 0.0, 1.0] {
            log::warn!(
                "ignoring bottom row {:?} of the rigid transform, using [0, 0, 0, 1]",
                matrix[3]
            );
        }

        // glam matrices are column-major
        let m = DMat4::from_cols_array_2d(matrix).transpose();
        Self {
            dst_from_src: DAffine3::from_mat4(m),
        }
    }

    /// The row-major 4x4 homogeneous matrix of the transform.
    pub fn matrix(&self) -> [[f64; 4]; 4] {
        DMat4::from(self.dst_from_src).transpose().to_cols_array_2d()
    }

    /// The rotation block.
    pub fn rotation(&self) -> DMat3 {
        self.dst_from_src.matrix3
    }

    /// The translation vector.
    pub fn translation(&self) -> DVec3 {
        self.dst_from_src.translation
    }

    /// The inverse transform `src_T_dst`.
    pub fn inverse(&self) -> Self {
        Self {
            dst_from_src: self.dst_from_src.inverse(),
        }
    }

    /// Apply the transform to a single point: `T * [x, y, z, 1]^T`.
    #[inline]
    pub fn transform_point(&self, p: &Point3d) -> Point3d {
        self.dst_from_src.transform_point3(DVec3::from(*p)).into()
    }
}
