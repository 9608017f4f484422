//! Rolling indicators over price columns with missing values.

pub mod sma;

pub use sma::rolling_mean;
