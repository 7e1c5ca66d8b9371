//! Benchmarks for the preparation pipeline.
//!
//! Run with: cargo bench -p meshprep
//!
//! To compare against a baseline:
//! 1. cargo bench -p meshprep -- --save-baseline main
//! 2. cargo bench -p meshprep -- --baseline main

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use meshprep::{
    Cylinder, ExportQuality, ExportSettings, Exporter, Mesh, Model, Repairer, StlFormat,
    Tessellate, Validator, read_stl, stl_to_bytes,
};
use std::io::Cursor;

fn cylinder(quality: ExportQuality) -> Mesh {
    Cylinder::new(10.0, 20.0)
        .tessellate(quality.linear_tolerance(), quality.angular_tolerance())
        .unwrap_or_default()
}

/// Cylinder with its top cap removed, leaving one large hole.
fn open_cylinder(quality: ExportQuality) -> Mesh {
    let mut mesh = cylinder(quality);
    let mut i = 0;
    mesh.faces.retain(|_| {
        let keep = i % 4 != 2;
        i += 1;
        keep
    });
    mesh
}

fn bench_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("Validation");
    let validator = Validator::default();

    for quality in [ExportQuality::Draft, ExportQuality::High, ExportQuality::Ultra] {
        let mesh = cylinder(quality);
        group.throughput(Throughput::Elements(mesh.face_count() as u64));
        group.bench_with_input(BenchmarkId::new("cylinder", quality), &mesh, |b, mesh| {
            b.iter(|| validator.validate(black_box(mesh)))
        });
    }

    group.finish();
}

fn bench_repair(c: &mut Criterion) {
    let mut group = c.benchmark_group("Repair");
    let repairer = Repairer::default();

    for quality in [ExportQuality::Draft, ExportQuality::High] {
        let closed = cylinder(quality);
        group.bench_with_input(BenchmarkId::new("closed", quality), &closed, |b, mesh| {
            b.iter(|| repairer.repair(black_box(mesh)))
        });

        let open = open_cylinder(quality);
        group.bench_with_input(BenchmarkId::new("open_top", quality), &open, |b, mesh| {
            b.iter(|| repairer.repair(black_box(mesh)))
        });
    }

    group.finish();
}

fn bench_stl(c: &mut Criterion) {
    let mut group = c.benchmark_group("STL");
    let mesh = cylinder(ExportQuality::High);
    group.throughput(Throughput::Elements(mesh.face_count() as u64));

    for format in [StlFormat::Binary, StlFormat::Ascii] {
        group.bench_with_input(BenchmarkId::new("encode", format), &mesh, |b, mesh| {
            b.iter(|| stl_to_bytes(black_box(mesh), format, "bench"))
        });

        let Ok(bytes) = stl_to_bytes(&mesh, format, "bench") else {
            continue;
        };
        group.bench_with_input(BenchmarkId::new("decode", format), &bytes, |b, bytes| {
            b.iter(|| read_stl(Cursor::new(black_box(bytes.as_slice()))))
        });
    }

    group.finish();
}

fn bench_export_to_bytes(c: &mut Criterion) {
    let mut group = c.benchmark_group("Export");
    group.sample_size(20);
    let exporter = Exporter::default();

    for quality in [ExportQuality::Draft, ExportQuality::Standard, ExportQuality::High] {
        let settings = ExportSettings::default().with_quality(quality);
        group.bench_function(BenchmarkId::new("cylinder", quality), |b| {
            b.iter(|| {
                // Fresh model each time so tessellation is included.
                let model = Model::from_solid(Cylinder::new(10.0, 20.0));
                exporter.export_to_bytes(&model, black_box(&settings))
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_validation,
    bench_repair,
    bench_stl,
    bench_export_to_bytes,
);
criterion_main!(benches);
