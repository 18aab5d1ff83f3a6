use rayon::prelude::*;

use crate::pointcloud::{Point3d, PointCloud};
use crate::transforms::RigidTransform;

/// Move a point cloud into another camera frame.
///
/// Each point `p` is replaced by `T * [p, 1]^T`. The output has the same cardinality,
/// ordering and layout metadata as the input; the input is left untouched.
///
/// # Arguments
///
/// * `cloud` - The point cloud in the source frame.
/// * `dst_t_src` - The transform from the source frame to the destination frame.
pub fn transform_cloud(cloud: &PointCloud<Point3d>, dst_t_src: &RigidTransform) -> PointCloud<Point3d> {
    let points = cloud
        .points()
        .par_iter()
        .map(|p| dst_t_src.transform_point(p))
        .collect::<Vec<_>>();

    PointCloud::from_raster_parts(points, cloud.width(), cloud.height())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_transform_cloud_roundtrip() -> Result<(), Box<dyn std::error::Error>> {
        let cloud = PointCloud::unorganized(vec![
            Point3d::new(2.0, 2.0, 2.0),
            Point3d::new(3.0, 4.0, 5.0),
        ]);
        let rot_x = RigidTransform::from_axis_angle(
            [1.0, 0.0, 0.0],
            std::f64::consts::FRAC_PI_2,
            [1.0, 2.0, 3.0],
        )?;

        let moved = transform_cloud(&cloud, &rot_x);
        // (2, 2, 2) -> (2, -2, 2) + t
        assert_relative_eq!(moved.points()[0].x, 3.0, epsilon = 1e-12);
        assert_relative_eq!(moved.points()[0].y, 0.0, epsilon = 1e-12);
        assert_relative_eq!(moved.points()[0].z, 5.0, epsilon = 1e-12);

        let back = transform_cloud(&moved, &rot_x.inverse());
        assert!(!back.is_organized());
        for (a, b) in cloud.points().iter().zip(back.points()) {
            assert_relative_eq!(a.x, b.x, epsilon = 1e-12);
            assert_relative_eq!(a.y, b.y, epsilon = 1e-12);
            assert_relative_eq!(a.z, b.z, epsilon = 1e-12);
        }

        Ok(())
    }

    #[test]
    fn test_transform_cloud_keeps_layout() -> Result<(), Box<dyn std::error::Error>> {
        let cloud = PointCloud::organized(
            vec![
                Point3d::new(0.0, 0.0, 1.0),
                Point3d::new(1.0, 0.0, 1.0),
                Point3d::new(0.0, 1.0, 1.0),
                Point3d::new(1.0, 1.0, 1.0),
            ],
            2,
            2,
        )
        .ok_or("invalid layout")?;

        let rot_z = RigidTransform::from_axis_angle(
            [0.0, 0.0, 1.0],
            std::f64::consts::FRAC_PI_2,
            [0.0, 0.0, 0.5],
        )?;
        let moved = transform_cloud(&cloud, &rot_z);

        assert_eq!((moved.width(), moved.height()), (2, 2));
        // (1, 0, 1) -> (0, 1, 1.5)
        let p = moved.points()[1];
        assert_relative_eq!(p.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(p.y, 1.0, epsilon = 1e-12);
        assert_relative_eq!(p.z, 1.5, epsilon = 1e-12);

        // the source cloud is untouched
        assert_eq!(cloud.points()[1], Point3d::new(1.0, 0.0, 1.0));

        Ok(())
    }
}
