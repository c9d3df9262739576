//! Benchmarks for cf-blox extraction and spatial function evaluation.
//!
//! Run with: cargo bench -p cf-blox
//!
//! To compare against baseline:
//! 1. First run: cargo bench -p cf-blox -- --save-baseline main
//! 2. After changes: cargo bench -p cf-blox -- --baseline main

#![allow(clippy::unwrap_used)]
#![allow(clippy::cast_precision_loss)]

use cf_blox::{
    BoundaryPointExtractor, ConicShellFunction, ExtractionParams, ImageGeometry, ScalarImage,
    SpatialFunction, SphereFunction,
};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use nalgebra::{Point3, Vector3};

// =============================================================================
// Test Image Generation
// =============================================================================

/// A cube of side `size` holding a bright ball of radius `size / 3`.
fn ball_image(size: usize) -> ScalarImage<3> {
    let geometry = ImageGeometry::<3>::with_size([size, size, size]).unwrap();
    let c = (size as f64 - 1.0) / 2.0;
    let r = size as f64 / 3.0;
    ScalarImage::from_fn(geometry, |i| {
        let d = Vector3::new(i[0] as f64 - c, i[1] as f64 - c, i[2] as f64 - c);
        if d.norm() <= r { 100.0 } else { 0.0 }
    })
}

// =============================================================================
// Benchmarks
// =============================================================================

fn bench_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_boundary_points");

    for size in [16, 32, 64] {
        let image = ball_image(size);
        let field = image.gradient_image();
        group.throughput(Throughput::Elements((size * size * size) as u64));

        for parallel in [false, true] {
            let label = if parallel { "parallel" } else { "sequential" };
            group.bench_with_input(BenchmarkId::new(label, size), &field, |b, field| {
                b.iter(|| {
                    let mut extractor = BoundaryPointExtractor::<3>::with_params(
                        ExtractionParams::with_threshold(10.0).parallel(parallel),
                    )
                    .unwrap();
                    extractor.set_source_image(field);
                    extractor.update_source_parameters().unwrap();
                    black_box(extractor.find_boundary_points().unwrap())
                });
            });
        }
    }

    group.finish();
}

fn bench_spatial_functions(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate");

    let samples: Vec<Point3<f64>> = (0..1024)
        .map(|i| {
            let t = f64::from(i);
            Point3::new((t * 0.37).sin() * 40.0, (t * 0.11).cos() * 40.0, t * 0.05)
        })
        .collect();
    group.throughput(Throughput::Elements(samples.len() as u64));

    let sphere = SphereFunction::new(Point3::origin(), 25.0).unwrap();
    group.bench_function("sphere", |b| {
        b.iter(|| samples.iter().filter(|p| sphere.is_inside(black_box(p))).count());
    });

    let shell = ConicShellFunction::new(Point3::origin(), Vector3::new(1.0, 1.0, 0.0)).unwrap();
    group.bench_function("conic_shell", |b| {
        b.iter(|| samples.iter().filter(|p| shell.is_inside(black_box(p))).count());
    });

    group.finish();
}

criterion_group!(benches, bench_extraction, bench_spatial_functions);
criterion_main!(benches);
