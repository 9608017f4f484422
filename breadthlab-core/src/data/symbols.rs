//! Symbol list loading and normalization.
//!
//! Raw universe lists mix notations (`NSE:INFY`, `INFY.NS`, ` INFY `). The
//! normalizer strips every known market token, re-appends the single suffix
//! the quote provider expects, and returns a sorted, de-duplicated list.

use super::provider::DataError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

/// Column read from a symbol list when present.
pub const SYMBOL_COLUMN: &str = "Symbol";

/// Cell values that stand for "no symbol" in exported spreadsheets.
const PLACEHOLDERS: [&str; 4] = ["nan", "<na>", "none", "null"];

/// Market notation tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketTokens {
    /// Exchange prefixes removed from raw entries (e.g. `NSE:`).
    pub prefixes: Vec<String>,
    /// Exchange suffixes removed from raw entries (e.g. `.NS`).
    pub suffixes: Vec<String>,
    /// Suffix appended for the quote provider and stripped from output labels.
    pub fetch_suffix: String,
}

impl Default for MarketTokens {
    fn default() -> Self {
        Self {
            prefixes: vec!["NSE:".into()],
            suffixes: vec![".NS".into()],
            fetch_suffix: ".NS".into(),
        }
    }
}

/// Canonicalizes ticker identifiers for one market.
#[derive(Debug, Clone, Default)]
pub struct SymbolNormalizer {
    tokens: MarketTokens,
}

impl SymbolNormalizer {
    pub fn new(tokens: MarketTokens) -> Self {
        Self { tokens }
    }

    /// Bare ticker with all market tokens removed, or `None` for blanks and placeholders.
    pub fn bare(&self, raw: &str) -> Option<String> {
        let cleaned = self.strip_tokens(raw.trim());
        let cleaned = cleaned.trim();
        if cleaned.is_empty() || is_placeholder(cleaned) {
            return None;
        }
        Some(cleaned.to_string())
    }

    /// Provider-ready symbols: unique, sorted, each carrying the fetch suffix.
    pub fn normalize<I, S>(&self, raw: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        raw.into_iter()
            .filter_map(|s| self.bare(s.as_ref()))
            .map(|bare| format!("{bare}{}", self.tokens.fetch_suffix))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Output label for a provider symbol (fetch suffix removed).
    pub fn display_label(&self, symbol: &str) -> String {
        if self.tokens.fetch_suffix.is_empty() {
            return symbol.to_string();
        }
        symbol.replace(&self.tokens.fetch_suffix, "")
    }

    /// Label for a price-matrix column header: market tokens removed, trimmed.
    ///
    /// Unlike [`bare`](Self::bare) this never rejects a header.
    pub fn column_label(&self, raw: &str) -> String {
        self.strip_tokens(raw).trim().to_string()
    }

    fn strip_tokens(&self, raw: &str) -> String {
        let mut out = raw.to_string();
        for token in self.tokens.prefixes.iter().chain(&self.tokens.suffixes) {
            if !token.is_empty() {
                out = out.replace(token.as_str(), "");
            }
        }
        out
    }
}

fn is_placeholder(s: &str) -> bool {
    PLACEHOLDERS.iter().any(|p| s.eq_ignore_ascii_case(p))
}

/// Read raw ticker strings from a CSV file with a header row.
///
/// Uses the `Symbol` column when present, otherwise the first column.
pub fn read_symbol_list(path: &Path) -> Result<Vec<String>, DataError> {
    let file = std::fs::File::open(path)?;
    read_symbol_list_from(file).map_err(|e| match e {
        DataError::InvalidInput { reason, .. } => DataError::InvalidInput {
            path: path.display().to_string(),
            reason,
        },
        other => other,
    })
}

/// Same as [`read_symbol_list`] over any reader.
pub fn read_symbol_list_from<R: Read>(reader: R) -> Result<Vec<String>, DataError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    if headers.is_empty() {
        return Err(DataError::InvalidInput {
            path: "<symbols>".into(),
            reason: "symbol list has no header columns".into(),
        });
    }
    let column = headers
        .iter()
        .position(|h| h.trim() == SYMBOL_COLUMN)
        .unwrap_or(0);

    let mut symbols = Vec::new();
    for record in rdr.records() {
        let record = record?;
        if let Some(cell) = record.get(column) {
            symbols.push(cell.to_string());
        }
    }
    Ok(symbols)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_prefixes_and_suffixes_then_reappends() {
        let n = SymbolNormalizer::default();
        let out = n.normalize(["NSE:INFY", "TCS.NS", " RELIANCE ", "INFY"]);
        assert_eq!(out, vec!["INFY.NS", "RELIANCE.NS", "TCS.NS"]);
    }

    #[test]
    fn drops_blanks_and_placeholders() {
        let n = SymbolNormalizer::default();
        let out = n.normalize(["", "   ", "nan", "NaN", "NSE:", ".NS", "HDFCBANK"]);
        assert_eq!(out, vec!["HDFCBANK.NS"]);
    }

    #[test]
    fn empty_input_gives_empty_output() {
        let n = SymbolNormalizer::default();
        assert!(n.normalize(Vec::<String>::new()).is_empty());
    }

    #[test]
    fn display_label_removes_fetch_suffix() {
        let n = SymbolNormalizer::default();
        assert_eq!(n.display_label("INFY.NS"), "INFY");
        assert_eq!(n.display_label("M&M.NS"), "M&M");
    }

    #[test]
    fn custom_market_tokens() {
        let n = SymbolNormalizer::new(MarketTokens {
            prefixes: vec!["BSE:".into()],
            suffixes: vec![".BO".into()],
            fetch_suffix: ".BO".into(),
        });
        assert_eq!(n.normalize(["BSE:500325", "500325.BO"]), vec!["500325.BO"]);
    }

    #[test]
    fn reads_symbol_column_when_present() {
        let csv = "Company,Symbol,Series\nInfosys,INFY,EQ\nTata,TCS,EQ\n";
        let raw = read_symbol_list_from(csv.as_bytes()).unwrap();
        assert_eq!(raw, vec!["INFY", "TCS"]);
    }

    #[test]
    fn falls_back_to_first_column() {
        let csv = "Ticker,Weight\nNSE:INFY,1.2\nTCS.NS,0.8\n";
        let raw = read_symbol_list_from(csv.as_bytes()).unwrap();
        assert_eq!(raw, vec!["NSE:INFY", "TCS.NS"]);
    }

    #[test]
    fn short_rows_are_skipped() {
        let csv = "Name,Symbol\nInfosys,INFY\nOrphan\n";
        let raw = read_symbol_list_from(csv.as_bytes()).unwrap();
        assert_eq!(raw, vec!["INFY"]);
    }
}
