//! Criterion benchmarks for the breadth hot paths.
//!
//! Benchmarks:
//! 1. Rolling mean over a single long column
//! 2. Full fast/slow breadth over universe-sized matrices
//! 3. Matrix assembly from per-batch close tables

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use breadthlab_core::breadth::{compute_breadth, BreadthParams};
use breadthlab_core::data::{assemble, CloseTable, SymbolNormalizer};
use breadthlab_core::indicators::rolling_mean;
use breadthlab_core::PriceMatrix;

// ── Helpers ──────────────────────────────────────────────────────────

fn make_column(n: usize, seed: usize) -> Vec<Option<f64>> {
    (0..n)
        .map(|i| {
            // Sparse gaps so the re-sum path is exercised too
            if (i + seed) % 97 == 0 {
                None
            } else {
                Some(100.0 + (seed as f64 * 10.0) + (i as f64 * 0.1).sin() * 10.0)
            }
        })
        .collect()
}

fn make_matrix(rows: usize, symbols: usize) -> PriceMatrix {
    let base_date = chrono::NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
    let dates = (0..rows)
        .map(|i| base_date + chrono::Duration::days(i as i64))
        .collect();
    let labels = (0..symbols).map(|i| format!("SYM{i}")).collect();
    let columns = (0..symbols).map(|s| make_column(rows, s)).collect();
    PriceMatrix::new(dates, labels, columns).unwrap()
}

fn make_tables(rows: usize, symbols: usize, batch_size: usize) -> Vec<CloseTable> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
    let dates: Vec<_> = (0..rows)
        .map(|i| base_date + chrono::Duration::days(i as i64))
        .collect();
    (0..symbols)
        .collect::<Vec<_>>()
        .chunks(batch_size)
        .map(|chunk| CloseTable {
            dates: dates.clone(),
            columns: chunk
                .iter()
                .map(|&s| (format!("SYM{s}.NS"), make_column(rows, s)))
                .collect(),
        })
        .collect()
}

// ── 1. Rolling Mean ──────────────────────────────────────────────────

fn bench_rolling_mean(c: &mut Criterion) {
    let mut group = c.benchmark_group("rolling_mean");
    let column = make_column(2520, 1);

    for &window in &[20, 50, 200] {
        group.bench_with_input(BenchmarkId::new("window", window), &window, |b, &w| {
            b.iter(|| rolling_mean(black_box(&column), w));
        });
    }
    group.finish();
}

// ── 2. Breadth ───────────────────────────────────────────────────────

fn bench_breadth(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_breadth");
    group.sample_size(20);

    for &symbols in &[50, 200, 500] {
        let matrix = make_matrix(504, symbols);
        group.bench_with_input(BenchmarkId::new("symbols", symbols), &matrix, |b, m| {
            b.iter(|| compute_breadth(black_box(m), BreadthParams::default()).unwrap());
        });
    }
    group.finish();
}

// ── 3. Assembly ──────────────────────────────────────────────────────

fn bench_assemble(c: &mut Criterion) {
    let normalizer = SymbolNormalizer::default();
    let tables = make_tables(504, 500, 50);

    c.bench_function("assemble_500x504", |b| {
        b.iter(|| assemble(black_box(&tables), &normalizer));
    });
}

criterion_group!(benches, bench_rolling_mean, bench_breadth, bench_assemble);
criterion_main!(benches);
