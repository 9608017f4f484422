//! Symbol lists, quote retrieval, and price-matrix assembly

pub mod assemble;
pub mod backoff;
pub mod ingest;
pub mod period;
pub mod provider;
pub mod retriever;
pub mod shape;
pub mod symbols;
pub mod yahoo;

pub use assemble::assemble;
pub use backoff::BackoffPolicy;
pub use ingest::{parse_date, read_price_matrix, write_price_matrix};
pub use period::LookbackPeriod;
pub use provider::{BatchRequest, DataError, Interval, QuoteProvider};
pub use retriever::{retrieve_closes, BatchOutcome, BatchState, Retrieval, RetrievalConfig};
pub use shape::{extract_close, CloseTable, FrameShape, LayerOrder, QuoteFrame};
pub use symbols::{read_symbol_list, MarketTokens, SymbolNormalizer};
pub use yahoo::YahooProvider;
