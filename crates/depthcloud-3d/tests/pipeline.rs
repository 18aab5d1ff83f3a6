use approx::assert_relative_eq;
use rand::{rngs::StdRng, Rng, SeedableRng};

use depthcloud_3d::calibration::{CalibrationModel, ColorIntrinsics, ReprojectionParams};
use depthcloud_3d::colorize::{colorize_points, ColorRaster, SamplingPolicy};
use depthcloud_3d::io::config::parse_calibration_str;
use depthcloud_3d::io::pcd::{read_pcd, write_pcd_ascii, GenericPointCloud, PcdWriteOptions};
use depthcloud_3d::linalg::transform_cloud;
use depthcloud_3d::pipeline::CloudAssembler;
use depthcloud_3d::pointcloud::{AssembledCloud, Point3d, PointCloud};
use depthcloud_3d::transforms::RigidTransform;
use depthcloud_3d::unproject::{unproject_depth, DepthRaster};
use depthcloud_image::ImageSize;

fn params(f: f64, cx: f64, cy: f64) -> ReprojectionParams {
    ReprojectionParams {
        f,
        cx,
        cy,
        inv_baseline: 0.0,
    }
}

fn depth_raster(width: usize, height: usize, data: Vec<f64>) -> DepthRaster {
    DepthRaster::new(ImageSize { width, height }, data).unwrap()
}

fn color_raster(width: usize, height: usize) -> ColorRaster {
    let data = (0..width * height)
        .flat_map(|i| [(i % 256) as u8, (i / 256) as u8, 255])
        .collect();
    ColorRaster::new(ImageSize { width, height }, data).unwrap()
}

#[test]
fn scenario_two_pixel_raster() {
    let depth = depth_raster(2, 1, vec![1000.0, 2000.0]);
    let cloud = unproject_depth(&depth, &params(1.0, 0.0, 0.0));

    assert_eq!(cloud.len(), 2);
    assert_eq!(cloud.points()[0], Point3d::new(0.0, 0.0, 1.0));
    assert_eq!(cloud.points()[1], Point3d::new(2.0, 0.0, 2.0));
    assert_eq!((cloud.width(), cloud.height()), (2, 1));
}

#[test]
fn scenario_zero_focal_length_passes_through() {
    let depth = depth_raster(2, 1, vec![1000.0, 2000.0]);
    let cloud = unproject_depth(&depth, &params(0.0, 0.0, 0.0));

    // degenerate points are kept on the geometric path
    assert_eq!(cloud.len(), 2);
    for p in cloud.points() {
        assert!(!p.x.is_finite());
        assert!(!p.y.is_finite());
        assert!(p.z.is_finite());
    }
    assert!(cloud.min_bound().is_none());

    // and dropped on the colorized path
    let image = color_raster(4, 4);
    let (colored, stats) = colorize_points(
        &cloud,
        &ColorIntrinsics::identity(),
        &image,
        SamplingPolicy::Discard,
    );
    assert!(colored.is_empty());
    assert_eq!(stats.non_finite, 2);
}

#[test]
fn scenario_single_point_projection() {
    let image = color_raster(8, 8);
    let cloud = PointCloud::unorganized(vec![Point3d::new(10.0, 20.0, 5.0)]);
    let (colored, stats) = colorize_points(
        &cloud,
        &ColorIntrinsics::identity(),
        &image,
        SamplingPolicy::Discard,
    );

    assert_eq!(stats.kept, 1);
    // pixel (col=2, row=4) has linear index 4 * 8 + 2
    assert_eq!(colored.points()[0].rgb, [34, 0, 255]);
}

#[test]
fn cardinality_and_scan_order() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..8 {
        let width = rng.random_range(1..40);
        let height = rng.random_range(1..40);
        let data = (0..width * height)
            .map(|_| rng.random_range(0.0..5000.0))
            .collect::<Vec<f64>>();
        let depth = depth_raster(width, height, data.clone());
        let cloud = unproject_depth(&depth, &params(500.0, -10.0, -20.0));

        assert_eq!(cloud.len(), width * height);
        for (i, (p, d)) in cloud.points().iter().zip(data.iter()).enumerate() {
            let (col, row) = (i % width, i / width);
            assert_eq!(p.z, d / 1000.0);
            assert_relative_eq!(p.x, ((col as f64 - 10.0) / 500.0) * p.z);
            assert_relative_eq!(p.y, ((row as f64 - 20.0) / 500.0) * p.z);
        }
    }
}

#[test]
fn projection_roundtrip() {
    let mut rng = StdRng::seed_from_u64(42);
    let identity = RigidTransform::identity();

    for _ in 0..100 {
        let f = rng.random_range(100.0..1000.0);
        let cx = rng.random_range(-400.0..-100.0);
        let cy = rng.random_range(-300.0..-100.0);
        let col = rng.random_range(0..64usize);
        let row = rng.random_range(0..48usize);
        let d = rng.random_range(100.0..10000.0);

        let mut data = vec![0.0; 64 * 48];
        data[row * 64 + col] = d;
        let depth = depth_raster(64, 48, data);
        let cloud = unproject_depth(&depth, &params(f, cx, cy));
        let moved = transform_cloud(&cloud, &identity);

        let p = moved.points()[row * 64 + col];
        assert_relative_eq!(p.z, d / 1000.0, max_relative = 1e-9);

        // a color camera sharing the depth intrinsics maps the point back to its pixel
        let intr = ColorIntrinsics {
            sx: f,
            sy: f,
            ox: cx,
            oy: cy,
        };
        let (px, py) = intr.project(p.x, p.y, p.z);
        assert_relative_eq!(px, col as f64, max_relative = 1e-9, epsilon = 1e-9);
        assert_relative_eq!(py, row as f64, max_relative = 1e-9, epsilon = 1e-9);
    }
}

#[test]
fn point_to_depth_pixel_roundtrip() {
    let mut rng = StdRng::seed_from_u64(5);
    let (width, height) = (32, 24);

    for _ in 0..100 {
        let x = rng.random_range(-3.0..3.0);
        let y = rng.random_range(-2.0..2.0);
        let z = rng.random_range(0.2..8.0);
        let f = rng.random_range(100.0..1000.0);
        let col = rng.random_range(0..width);
        let row = rng.random_range(0..height);

        // offsets that put the projection of (x, y, z) on an integer pixel
        let cx = x * f / z - col as f64;
        let cy = y * f / z - row as f64;

        let mut data = vec![0.0; width * height];
        data[row * width + col] = z * 1000.0;
        let depth = depth_raster(width, height, data);
        let cloud = unproject_depth(&depth, &params(f, cx, cy));

        let p = cloud.points()[row * width + col];
        assert_relative_eq!(p.x, x, max_relative = 1e-9, epsilon = 1e-12);
        assert_relative_eq!(p.y, y, max_relative = 1e-9, epsilon = 1e-12);
        assert_relative_eq!(p.z, z, max_relative = 1e-9);
    }
}

#[test]
fn zero_depth_is_only_dropped_when_colorizing() {
    let depth = depth_raster(3, 2, vec![0.0, 1000.0, 0.0, 1000.0, 1000.0, 0.0]);
    let model = CalibrationModel::from_matrices(
        [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
            [0.0, 0.0, 1.0, 0.0],
        ],
        Some([[1.0, 1.0], [0.0, 0.0]]),
        Some(RigidTransform::identity().matrix()),
    );
    let assembler = CloudAssembler::new(model);

    let (geometric, _) = assembler.run(&depth, None).unwrap();
    assert_eq!(geometric.len(), 6);

    let image = color_raster(3, 2);
    let (colorized, stats) = assembler.run(&depth, Some(&image)).unwrap();
    let stats = stats.unwrap();
    assert_eq!(stats.zero_depth, 3);
    assert_eq!(colorized.len(), 3);

    let AssembledCloud::Colorized(cloud) = colorized else {
        panic!("expected a colorized cloud");
    };
    assert!(cloud.points().iter().all(|p| p.z != 0.0));
}

#[test]
fn identity_and_translation_transforms() {
    let mut rng = StdRng::seed_from_u64(3);
    let points = (0..256)
        .map(|_| {
            Point3d::new(
                rng.random_range(-5.0..5.0),
                rng.random_range(-5.0..5.0),
                rng.random_range(0.1..10.0),
            )
        })
        .collect::<Vec<_>>();
    let cloud = PointCloud::organized(points, 16, 16).unwrap();

    let same = transform_cloud(&cloud, &RigidTransform::identity());
    assert_eq!(same, cloud);

    let t = [0.5, -1.25, 3.0];
    let shifted = transform_cloud(&cloud, &RigidTransform::from_translation(t));
    for (a, b) in cloud.points().iter().zip(shifted.points()) {
        assert_relative_eq!(b.x - a.x, t[0], epsilon = 1e-12);
        assert_relative_eq!(b.y - a.y, t[1], epsilon = 1e-12);
        assert_relative_eq!(b.z - a.z, t[2], epsilon = 1e-12);
    }

    // relative spacing is unchanged
    let (a0, a1) = (cloud.points()[0], cloud.points()[1]);
    let (b0, b1) = (shifted.points()[0], shifted.points()[1]);
    assert_relative_eq!(a1.x - a0.x, b1.x - b0.x, epsilon = 1e-12);
    assert_relative_eq!(a1.y - a0.y, b1.y - b0.y, epsilon = 1e-12);
    assert_relative_eq!(a1.z - a0.z, b1.z - b0.z, epsilon = 1e-12);
}

#[test]
fn colorized_cardinality_is_bounded() {
    let mut rng = StdRng::seed_from_u64(11);
    let rotation = RigidTransform::from_axis_angle([0.0, 1.0, 0.0], 0.2, [0.05, 0.0, 0.0]).unwrap();
    let model = CalibrationModel::from_matrices(
        [
            [1.0, 0.0, 0.0, -16.0],
            [0.0, 1.0, 0.0, -12.0],
            [0.0, 0.0, 0.0, 30.0],
            [0.0, 0.0, 10.0, 0.0],
        ],
        Some([[30.0, 30.0], [-16.0, -12.0]]),
        Some(rotation.matrix()),
    );

    for policy in [SamplingPolicy::Discard, SamplingPolicy::FoldNegative] {
        let assembler = CloudAssembler::new(model.clone()).with_policy(policy);
        let data = (0..32 * 24)
            .map(|_| rng.random_range(0.0..3000.0))
            .collect::<Vec<f64>>();
        let depth = depth_raster(32, 24, data);
        let image = color_raster(32, 24);

        let (geometric, _) = assembler.run(&depth, None).unwrap();
        let (colorized, stats) = assembler.run(&depth, Some(&image)).unwrap();
        let stats = stats.unwrap();

        assert!(colorized.len() <= geometric.len());
        assert_eq!(stats.kept + stats.discarded(), geometric.len());
    }
}

#[test]
fn calibration_to_pcd_file() -> Result<(), Box<dyn std::error::Error>> {
    let model = parse_calibration_str(
        r#"
        Q_Matrix = "1,0,0,0, 0,1,0,0, 0,0,0,1, 0,0,1,0";
        Color_camera_Matrix = "1,1,0,0";
        Rotation_Translation_Matrix = "1,0,0,0, 0,1,0,0, 0,0,1,0, 0,0,0,1";
        "#,
    )?
    .into_model()?;

    let depth = depth_raster(2, 2, vec![1000.0, 1000.0, 1000.0, 1000.0]);
    let image = color_raster(2, 2);
    let (cloud, _) = CloudAssembler::new(model).run(&depth, Some(&image))?;
    let AssembledCloud::Colorized(cloud) = cloud else {
        return Err("expected a colorized cloud".into());
    };
    assert_eq!(cloud.len(), 4);

    let tmp_dir = tempfile::tempdir()?;
    let path = tmp_dir.path().join("RGBpointCloud.pcd");
    write_pcd_ascii(&path, &cloud, &PcdWriteOptions::default())?;

    let GenericPointCloud::XyzRgb(read) = read_pcd(&path)? else {
        return Err("expected a colored cloud".into());
    };
    assert_eq!(read, cloud);

    Ok(())
}
