//! Benchmarks for regression estimators

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use geolearn_algorithms::regression::{
    KNeighborsRegressor, Lasso, LinearRegression, RandomForestRegressor, Weights,
};
use geolearn_core::{Estimator, Predictor};
use ndarray::{Array1, Array2};

/// Housing-sized table: 8 features, target mixing linear and step terms
fn create_table(n: usize) -> (Array2<f64>, Array1<f64>) {
    let x = Array2::from_shape_fn((n, 8), |(i, j)| ((i * (j * 2 + 7) + j * 31) % 97) as f64 / 9.7);
    let y = Array1::from_shape_fn(n, |i| {
        0.5 * x[[i, 0]] - 0.2 * x[[i, 3]] + if x[[i, 5]] > 5.0 { 1.0 } else { 0.0 }
    });
    (x, y)
}

fn bench_linear(c: &mut Criterion) {
    let mut group = c.benchmark_group("regression/linear");
    for n in [1_000, 10_000, 20_000] {
        let (x, y) = create_table(n);
        group.bench_with_input(BenchmarkId::new("ols", n), &n, |b, _| {
            b.iter(|| LinearRegression::default().fit(black_box(x.view()), y.view()).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("lasso", n), &n, |b, _| {
            b.iter(|| Lasso::with_alpha(0.01).fit(black_box(x.view()), y.view()).unwrap())
        });
    }
    group.finish();
}

fn bench_knn_predict(c: &mut Criterion) {
    let mut group = c.benchmark_group("regression/knn_predict");
    for n in [1_000, 10_000, 20_000] {
        let (x, y) = create_table(n);
        let model = KNeighborsRegressor::new(5, Weights::Distance).fit(x.view(), y.view()).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| model.predict(black_box(x.view())).unwrap())
        });
    }
    group.finish();
}

fn bench_forest(c: &mut Criterion) {
    let mut group = c.benchmark_group("regression/forest_fit");
    group.sample_size(10);
    for n in [1_000, 5_000] {
        let (x, y) = create_table(n);
        let forest = RandomForestRegressor {
            n_estimators: 20,
            max_depth: Some(12),
            ..Default::default()
        };
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| forest.fit(black_box(x.view()), y.view()).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_linear, bench_knn_predict, bench_forest);
criterion_main!(benches);
