//! Provider response shapes and close-price extraction.
//!
//! A batch response comes back in one of two layouts:
//! - **flat**: a single symbol, one column per price field
//! - **layered**: several symbols, columns keyed by a (outer, inner) pair that
//!   is either (field, symbol) or (symbol, field)
//!
//! The frame carries its shape as a tag, and each layout implements
//! [`CloseResolver`]. Extraction dispatches on the tag instead of probing
//! column structure.

use chrono::NaiveDate;

/// Name of the closing-price field in provider responses.
pub const CLOSE_FIELD: &str = "Close";

/// One price column aligned to a frame's date index.
pub type Series = Vec<Option<f64>>;

/// Which key sits on the outer level of a layered frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerOrder {
    /// `(field, symbol)`, e.g. `("Close", "INFY.NS")`.
    FieldMajor,
    /// `(symbol, field)`, e.g. `("INFY.NS", "Close")`.
    SymbolMajor,
}

/// Declared layout of a [`QuoteFrame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameShape {
    Flat,
    Layered(LayerOrder),
}

/// Single-symbol response.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatFrame {
    pub symbol: String,
    pub dates: Vec<NaiveDate>,
    pub fields: Vec<(String, Series)>,
}

/// Multi-symbol response.
#[derive(Debug, Clone, PartialEq)]
pub struct LayeredFrame {
    pub order: LayerOrder,
    pub dates: Vec<NaiveDate>,
    pub columns: Vec<((String, String), Series)>,
}

/// A provider response for one batch.
#[derive(Debug, Clone, PartialEq)]
pub enum QuoteFrame {
    Flat(FlatFrame),
    Layered(LayeredFrame),
}

impl QuoteFrame {
    /// A response that carries no data.
    pub fn empty() -> Self {
        QuoteFrame::Layered(LayeredFrame {
            order: LayerOrder::FieldMajor,
            dates: Vec::new(),
            columns: Vec::new(),
        })
    }

    pub fn shape(&self) -> FrameShape {
        match self {
            QuoteFrame::Flat(_) => FrameShape::Flat,
            QuoteFrame::Layered(frame) => FrameShape::Layered(frame.order),
        }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        match self {
            QuoteFrame::Flat(frame) => &frame.dates,
            QuoteFrame::Layered(frame) => &frame.dates,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.dates().is_empty()
    }

    fn resolver(&self) -> &dyn CloseResolver {
        match self {
            QuoteFrame::Flat(frame) => frame as &dyn CloseResolver,
            QuoteFrame::Layered(frame) => frame as &dyn CloseResolver,
        }
    }
}

/// Closing prices for one batch: date index plus one column per symbol.
///
/// The date index is taken as delivered; ordering and de-duplication happen
/// in the assembler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CloseTable {
    pub dates: Vec<NaiveDate>,
    pub columns: Vec<(String, Series)>,
}

impl CloseTable {
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty() || self.columns.is_empty()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(s, _)| s.as_str())
    }
}

/// Pulls one field out of a response as a symbol-keyed table.
pub trait CloseResolver {
    /// Returns an empty table when the field is absent.
    fn resolve(&self, field: &str) -> CloseTable;
}

impl CloseResolver for FlatFrame {
    fn resolve(&self, field: &str) -> CloseTable {
        match self.fields.iter().find(|(name, _)| name == field) {
            Some((_, series)) => CloseTable {
                dates: self.dates.clone(),
                columns: vec![(self.symbol.clone(), series.clone())],
            },
            None => CloseTable::default(),
        }
    }
}

impl CloseResolver for LayeredFrame {
    fn resolve(&self, field: &str) -> CloseTable {
        let columns: Vec<(String, Series)> = self
            .columns
            .iter()
            .filter_map(|((outer, inner), series)| {
                let (field_key, symbol) = match self.order {
                    LayerOrder::FieldMajor => (outer, inner),
                    LayerOrder::SymbolMajor => (inner, outer),
                };
                (field_key == field).then(|| (symbol.clone(), series.clone()))
            })
            .collect();

        if columns.is_empty() {
            return CloseTable::default();
        }
        CloseTable {
            dates: self.dates.clone(),
            columns,
        }
    }
}

/// Extract the closing-price table from a batch response.
pub fn extract_close(frame: &QuoteFrame) -> CloseTable {
    frame.resolver().resolve(CLOSE_FIELD)
}
