// =============================================================================
// Shared types used across the avg-rate service
// =============================================================================

use axum::body::Bytes;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Content type of every artifact produced by the SVG renderer.
pub const SVG_CONTENT_TYPE: &str = "image/svg+xml";

/// Ticker identifier, normalized once at construction.
///
/// Normalization trims surrounding whitespace, replaces `/` with `-` (the
/// form Tiingo expects for share classes such as `brk/b`) and lowercases.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().replace('/', "-").to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One trading day's closing price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawObservation {
    pub date: NaiveDate,
    pub close: f64,
}

/// Normalized rate of change on a given trading day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformedPoint {
    pub date: NaiveDate,
    pub rate: f64,
}

/// A symbol paired with its transformed series, in the order it is drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolSeries {
    pub symbol: Symbol,
    pub points: Vec<TransformedPoint>,
}

/// Rendered, immutable chart payload.
///
/// `Bytes` is reference counted, so handing an artifact to a response body
/// never copies the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    content_type: &'static str,
    bytes: Bytes,
}

impl Artifact {
    pub fn new(content_type: &'static str, bytes: impl Into<Bytes>) -> Self {
        Self {
            content_type,
            bytes: bytes.into(),
        }
    }

    pub fn content_type(&self) -> &'static str {
        self.content_type
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }
}
