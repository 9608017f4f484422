//! End-to-end scenarios through the core pipeline:
//! symbols -> retrieval -> assembly -> coverage -> breadth.

use breadthlab_core::breadth::{compute_breadth, BreadthParams};
use breadthlab_core::coverage::filter_by_coverage;
use breadthlab_core::data::shape::{FlatFrame, LayeredFrame};
use breadthlab_core::data::{
    assemble, retrieve_closes, BatchRequest, BatchState, DataError, LayerOrder, QuoteFrame,
    QuoteProvider, RetrievalConfig, SymbolNormalizer,
};
use breadthlab_core::PriceMatrix;
use chrono::NaiveDate;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

// ── Helpers ──────────────────────────────────────────────────────────

fn day(n: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, n).unwrap()
}

fn present(values: &[f64]) -> Vec<Option<f64>> {
    values.iter().copied().map(Some).collect()
}

fn approx(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

/// Provider that replays responses in order.
struct ScriptedProvider {
    script: Mutex<VecDeque<Result<QuoteFrame, DataError>>>,
}

impl ScriptedProvider {
    fn new(script: Vec<Result<QuoteFrame, DataError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
        }
    }
}

impl QuoteProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn fetch_batch(&self, _request: &BatchRequest<'_>) -> Result<QuoteFrame, DataError> {
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(QuoteFrame::empty()))
    }
}

fn no_wait(batch_size: usize) -> RetrievalConfig {
    RetrievalConfig {
        batch_size,
        pause: Duration::ZERO,
        ..RetrievalConfig::default()
    }
}

/// Rising, falling and zig-zag closes over five days.
fn three_by_five() -> PriceMatrix {
    PriceMatrix::new(
        (1..=5).map(day).collect(),
        vec!["UP".into(), "DOWN".into(), "ZIG".into()],
        vec![
            present(&[10.0, 11.0, 12.0, 13.0, 14.0]),
            present(&[14.0, 13.0, 12.0, 11.0, 10.0]),
            present(&[10.0, 12.0, 10.0, 12.0, 10.0]),
        ],
    )
    .unwrap()
}

// ── Scenarios ────────────────────────────────────────────────────────

#[test]
fn three_symbols_five_days_fast_two() {
    let table = compute_breadth(&three_by_five(), BreadthParams::new(2, 3)).unwrap();

    // Slow window fills on day 3; earlier dates are dropped.
    let dates: Vec<NaiveDate> = table.rows.iter().map(|r| r.date).collect();
    assert_eq!(dates, vec![day(3), day(4), day(5)]);

    // UP is always above, DOWN never, ZIG alternates.
    let third = 100.0 / 3.0;
    let expected = [third, 2.0 * third, third];
    for (row, pct) in table.rows.iter().zip(expected) {
        approx(row.pct_fast, pct);
        approx(row.pct_slow, pct);
        assert_eq!(row.valid_fast, 3);
        assert_eq!(row.valid_slow, 3);
    }
}

#[test]
fn fast_only_series_starts_at_second_row() {
    let table = compute_breadth(&three_by_five(), BreadthParams::new(2, 2)).unwrap();
    assert_eq!(table.len(), 4);
    assert_eq!(table.first_date(), Some(day(2)));
    approx(table.rows[0].pct_fast, 200.0 / 3.0);
}

#[test]
fn low_coverage_symbol_is_excluded_before_averaging() {
    let m = PriceMatrix::new(
        (1..=4).map(day).collect(),
        vec!["A".into(), "B".into(), "SPARSE".into()],
        vec![
            present(&[1.0, 2.0, 3.0, 4.0]),
            present(&[4.0, 3.0, 2.0, 1.0]),
            vec![None, Some(5.0), None, Some(9.0)],
        ],
    )
    .unwrap();

    let (filtered, report) = filter_by_coverage(&m, 0.8).unwrap();
    assert_eq!(report.dropped().collect::<Vec<_>>(), vec!["SPARSE"]);

    let table = compute_breadth(&filtered, BreadthParams::new(2, 2)).unwrap();
    assert!(!table.is_empty());
    for row in &table.rows {
        assert_eq!(row.valid_fast, 2);
        assert_eq!(row.valid_slow, 2);
        approx(row.pct_fast, 50.0);
    }
}

#[test]
fn retried_batch_contributes_same_data_as_first_attempt_success() {
    let frame = QuoteFrame::Layered(LayeredFrame {
        order: LayerOrder::SymbolMajor,
        dates: vec![day(1), day(2)],
        columns: vec![
            (("A.NS".into(), "Close".into()), present(&[10.0, 11.0])),
            (("A.NS".into(), "Volume".into()), present(&[1e5, 2e5])),
            (("B.NS".into(), "Close".into()), present(&[20.0, 19.0])),
        ],
    });
    let symbols = vec!["A.NS".to_string(), "B.NS".to_string()];
    let normalizer = SymbolNormalizer::default();

    let direct = ScriptedProvider::new(vec![Ok(frame.clone())]);
    let flaky = ScriptedProvider::new(vec![
        Err(DataError::RateLimited {
            retry_after_secs: 1,
        }),
        Ok(frame),
    ]);

    let first = retrieve_closes(&direct, &symbols, &no_wait(10));
    let second = retrieve_closes(&flaky, &symbols, &no_wait(10));

    assert_eq!(first.tables, second.tables);
    assert_eq!(second.outcomes[0].state, BatchState::Succeeded);
    assert_eq!(second.outcomes[0].attempts, 2);
    assert!(second.outcomes[0].last_error.is_some());
    assert_eq!(
        assemble(&first.tables, &normalizer),
        assemble(&second.tables, &normalizer)
    );
}

#[test]
fn batches_assemble_into_one_breadth_series() {
    let a = QuoteFrame::Flat(FlatFrame {
        symbol: "A.NS".into(),
        dates: (1..=4).map(day).collect(),
        fields: vec![
            ("Open".into(), present(&[1.0, 2.0, 3.0, 4.0])),
            ("Close".into(), present(&[1.0, 2.0, 3.0, 4.0])),
        ],
    });
    // Second batch skips a day that the first one has.
    let b = QuoteFrame::Layered(LayeredFrame {
        order: LayerOrder::FieldMajor,
        dates: vec![day(1), day(2), day(4)],
        columns: vec![
            (("Close".into(), "B.NS".into()), present(&[5.0, 4.0, 3.0])),
            (("Close".into(), "C.NS".into()), present(&[1.0, 1.5, 2.5])),
        ],
    });
    let provider = ScriptedProvider::new(vec![Ok(a), Ok(b)]);
    let normalizer = SymbolNormalizer::default();
    let symbols = normalizer.normalize(["NSE:A", "B.NS", " C "]);

    let retrieval = retrieve_closes(&provider, &symbols, &no_wait(1));
    // Batch size 1 means three batches; the script only has two frames.
    assert_eq!(retrieval.outcomes.len(), 3);
    assert_eq!(retrieval.outcomes[2].columns, 0);

    let matrix = assemble(&retrieval.tables, &normalizer).unwrap();
    assert_eq!(matrix.dates(), &[day(1), day(2), day(3), day(4)]);
    assert_eq!(matrix.column("B").unwrap()[2], None);

    let table = compute_breadth(&matrix, BreadthParams::new(1, 1)).unwrap();
    // Window 1: close equals its own average, so nothing is ever above.
    assert!(table.rows.iter().all(|r| r.pct_fast == 0.0));
    assert_eq!(table.rows[2].valid_fast, 1);
}

#[test]
fn empty_symbol_list_yields_no_matrix() {
    let provider = ScriptedProvider::new(vec![]);
    let retrieval = retrieve_closes(&provider, &[], &no_wait(50));
    assert!(retrieval.is_empty());
    assert!(retrieval.outcomes.is_empty());
    assert!(assemble(&retrieval.tables, &SymbolNormalizer::default()).is_none());
}

#[test]
fn history_shorter_than_slow_window_gives_empty_result() {
    let table = compute_breadth(&three_by_five(), BreadthParams::new(2, 200)).unwrap();
    assert!(table.is_empty());
}
