use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::{rngs::StdRng, Rng, SeedableRng};

use depthcloud_3d::calibration::{ColorIntrinsics, ReprojectionParams};
use depthcloud_3d::colorize::{colorize_points, ColorRaster, SamplingPolicy};
use depthcloud_3d::linalg::transform_cloud;
use depthcloud_3d::transforms::RigidTransform;
use depthcloud_3d::unproject::{unproject_depth, DepthRaster};
use depthcloud_image::ImageSize;

fn random_depth(size: ImageSize, seed: u64) -> DepthRaster {
    let mut rng = StdRng::seed_from_u64(seed);
    let data = (0..size.area())
        .map(|_| rng.random_range(0.0..5000.0))
        .collect();
    DepthRaster::new(size, data).unwrap()
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");

    let params = ReprojectionParams {
        f: 525.0,
        cx: -319.5,
        cy: -239.5,
        inv_baseline: 0.0,
    };
    let intrinsics = ColorIntrinsics {
        sx: 525.0,
        sy: 525.0,
        ox: -319.5,
        oy: -239.5,
    };
    let depth_to_color =
        RigidTransform::from_axis_angle([0.0, 1.0, 0.0], 0.01, [0.025, 0.0, 0.0]).unwrap();

    for (width, height) in [(320, 240), (640, 480), (1280, 720)].iter() {
        let size = ImageSize {
            width: *width,
            height: *height,
        };
        group.throughput(Throughput::Elements(size.area() as u64));
        let parameter_string = format!("{}x{}", width, height);

        let depth = random_depth(size, 0);
        let image = ColorRaster::from_size_val(size, 128).unwrap();
        let cloud = unproject_depth(&depth, &params);
        let cloud_in_color = transform_cloud(&cloud, &depth_to_color);

        group.bench_with_input(
            BenchmarkId::new("unproject_depth", &parameter_string),
            &depth,
            |b, depth| b.iter(|| black_box(unproject_depth(depth, &params))),
        );

        group.bench_with_input(
            BenchmarkId::new("transform_cloud", &parameter_string),
            &cloud,
            |b, cloud| b.iter(|| black_box(transform_cloud(cloud, &depth_to_color))),
        );

        group.bench_with_input(
            BenchmarkId::new("colorize_points", &parameter_string),
            &cloud_in_color,
            |b, cloud| {
                b.iter(|| {
                    black_box(colorize_points(
                        cloud,
                        &intrinsics,
                        &image,
                        SamplingPolicy::Discard,
                    ))
                })
            },
        );
    }
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
