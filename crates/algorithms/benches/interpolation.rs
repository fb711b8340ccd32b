//! Benchmarks for IDW grid interpolation

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use zgrid_algorithms::interpolation::{
    GridFileWriter, IdwInterpolator, IdwOptions, SearchStrategy, Vertex, VertexKind, VertexSet,
};
use zgrid_core::io::MemorySink;
use zgrid_core::{Extent, GridSpec};

/// Scattered samples over a 100 x 100 square plus one diagonal break line
fn create_vertices(count: usize) -> VertexSet {
    let mut vertices: Vec<Vertex> = (0..count)
        .map(|i| {
            let x = ((i * 37 + 11) % 1000) as f64 / 10.0;
            let y = ((i * 53 + 29) % 1000) as f64 / 10.0;
            let z = ((i * 7 + 13) % 100) as f64;
            Vertex::point(x, y, z)
        })
        .collect();
    for i in 0..=10 {
        let t = i as f64 * 10.0;
        vertices.push(Vertex::on_line(t, 100.0 - t, 50.0, VertexKind::BreakLine, 0));
    }
    VertexSet::from_vertices(vertices)
}

fn grid(size: usize) -> GridSpec {
    let extent = Extent::new(0.0, 100.0, 0.0, 100.0).expect("valid extent");
    GridSpec::with_dimensions(extent, size, size)
}

fn bench_global(c: &mut Criterion) {
    let mut group = c.benchmark_group("idw/global");
    for samples in [100, 1000] {
        let interpolator = IdwInterpolator::new(create_vertices(samples), IdwOptions::default()).unwrap();
        let writer = GridFileWriter::new(interpolator, grid(128));
        group.bench_with_input(BenchmarkId::from_parameter(samples), &samples, |b, _| {
            b.iter(|| {
                let mut sink = MemorySink::new();
                writer.write_file(black_box(&mut sink), &()).unwrap()
            })
        });
    }
    group.finish();
}

fn bench_nearest(c: &mut Criterion) {
    let mut group = c.benchmark_group("idw/nearest_12");
    let options = IdwOptions {
        search: SearchStrategy::Nearest(12),
        ..Default::default()
    };
    for samples in [1000, 10_000] {
        let interpolator = IdwInterpolator::new(create_vertices(samples), options).unwrap();
        let writer = GridFileWriter::new(interpolator, grid(256));
        group.bench_with_input(BenchmarkId::from_parameter(samples), &samples, |b, _| {
            b.iter(|| {
                let mut sink = MemorySink::new();
                writer.write_file(black_box(&mut sink), &()).unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_global, bench_nearest);
criterion_main!(benches);
