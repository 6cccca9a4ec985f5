use criterion::{criterion_group, criterion_main, Criterion};
use graver_core::Path;
use std::hint::black_box;

fn curve_path() -> Path {
    let mut path = Path::new();
    path.moveto(0.0, 0.0);
    path.curveto((25.0, 90.0), (75.0, -60.0), (100.0, 10.0));
    path.curveto((130.0, 80.0), (160.0, -40.0), (200.0, 0.0));
    path
}

fn bench_flatten(c: &mut Criterion) {
    let path = curve_path();
    c.bench_function("flatten two cubics, coarse", |b| {
        b.iter(|| black_box(&path).flatten(0.5))
    });
    c.bench_function("flatten two cubics, fine", |b| {
        b.iter(|| black_box(&path).flatten(0.01))
    });
}

criterion_group!(benches, bench_flatten);
criterion_main!(benches);
