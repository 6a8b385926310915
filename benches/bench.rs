//! Criterion benchmarks for the restock pipeline.
//!
//! Covers the costly parts of training and reporting:
//! - Random forest fitting at several tree counts
//! - Forest prediction
//! - Feature standardization

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use restock::data::frame::FeatureMatrix;
use restock::model::forest::{ForestParams, RandomForest};
use restock::model::scaler::StandardScaler;
use std::hint::black_box;

/// Generate a supply-like feature matrix with a learnable restock label.
fn generate_dataset(rows: usize, features: usize) -> (FeatureMatrix, Vec<i64>) {
    let columns: Vec<String> = (0..features).map(|j| format!("feature_{j}")).collect();
    let mut data = Vec::with_capacity(rows);
    let mut labels = Vec::with_capacity(rows);

    for i in 0..rows {
        let row: Vec<f64> = (0..features)
            .map(|j| ((i * 31 + j * 17) % 97) as f64 + (i as f64 * 0.1 + j as f64).sin())
            .collect();
        // Restock when stock is low relative to the second column
        labels.push(i64::from(row[0] < row[1 % features]));
        data.push(row);
    }

    (FeatureMatrix::new(columns, data).unwrap(), labels)
}

/// Benchmark forest fitting.
fn bench_forest_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("forest_fit");
    group.sample_size(10);

    let (x, y) = generate_dataset(1000, 12);
    group.throughput(Throughput::Elements(x.num_rows() as u64));

    for n_estimators in [10, 50, 100] {
        let params = ForestParams {
            n_estimators,
            ..ForestParams::default()
        };
        group.bench_with_input(
            BenchmarkId::from_parameter(n_estimators),
            &params,
            |b, params| {
                b.iter(|| {
                    let forest = RandomForest::fit(black_box(&x), black_box(&y), params).unwrap();
                    black_box(forest)
                })
            },
        );
    }

    group.finish();
}

/// Benchmark prediction with a fitted forest.
fn bench_forest_predict(c: &mut Criterion) {
    let mut group = c.benchmark_group("forest_predict");

    let (x, y) = generate_dataset(1000, 12);
    let forest = RandomForest::fit(&x, &y, &ForestParams::default()).unwrap();

    group.throughput(Throughput::Elements(x.num_rows() as u64));
    group.bench_function("predict_1000_rows", |b| {
        b.iter(|| black_box(forest.predict(black_box(&x)).unwrap()))
    });

    group.finish();
}

/// Benchmark scaler fit and transform.
fn bench_scaler(c: &mut Criterion) {
    let mut group = c.benchmark_group("scaler");

    let (x, _) = generate_dataset(10_000, 20);
    group.throughput(Throughput::Elements(x.num_rows() as u64));
    group.bench_function("fit_transform", |b| {
        b.iter(|| black_box(StandardScaler::fit_transform(black_box(&x)).unwrap()))
    });

    group.finish();
}

criterion_group!(benches, bench_forest_fit, bench_forest_predict, bench_scaler);

criterion_main!(benches);
