//! BreadthLab Core: price matrix, symbol handling, batched retrieval, breadth engine.
//!
//! Pipeline pieces, in data-flow order:
//! - `data::symbols`: normalize raw ticker lists into fetchable symbols
//! - `data::retriever`: fetch closes batch by batch with retry/backoff
//! - `data::assemble`: merge batch tables into one [`PriceMatrix`]
//! - `coverage`: drop symbols with too many missing prices
//! - `breadth`: percentage of symbols above their fast/slow moving average

pub mod breadth;
pub mod coverage;
pub mod data;
pub mod indicators;
pub mod matrix;

pub use breadth::{compute_breadth, BreadthError, BreadthParams, BreadthRow, BreadthTable};
pub use coverage::{filter_by_coverage, CoverageError, CoverageReport};
pub use matrix::{MatrixError, PriceMatrix};
