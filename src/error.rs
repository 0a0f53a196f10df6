// =============================================================================
// Error taxonomy
// =============================================================================
//
// ConfigError is fatal at startup. Every other kind aborts a single refresh
// run and ends up published to the cache as that run's result.
// =============================================================================

use chrono::NaiveDate;
use thiserror::Error;

use crate::types::Symbol;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("tiingo token not found in env var {0}")]
    MissingToken(&'static str),
    #[error("interval must be at least {min} days, got {got}")]
    IntervalTooShort { got: usize, min: usize },
    #[error("{name} must be at least 1, got {got}")]
    NotPositive { name: &'static str, got: u32 },
    #[error("at least one symbol is required")]
    NoSymbols,
    #[error("symbol {0:?} is empty after normalization")]
    EmptySymbol(String),
    #[error("symbol {0} is configured more than once")]
    DuplicateSymbol(Symbol),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("tiingo error: symbol not found")]
    NotFound,
    #[error("tiingo error ({status}): {message}")]
    Upstream { status: u16, message: String },
    #[error("malformed tiingo response: {0}")]
    Malformed(String),
    #[error("tiingo request timed out")]
    Timeout,
    #[error("tiingo error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::Malformed(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ComputeError {
    #[error("lookback window {window} is shorter than the {min}-day recent window")]
    WindowTooShort { window: usize, min: usize },
    #[error("average close over the lookback window ending {date} is zero")]
    ZeroBaseline { date: NaiveDate },
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("nothing to plot: {0}")]
    NoData(String),
    #[error("unable to draw chart: {0}")]
    Draw(String),
}

/// The single failure a refresh run can produce.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{symbol}: {source}")]
    Fetch {
        symbol: Symbol,
        #[source]
        source: FetchError,
    },
    #[error("{symbol}: {source}")]
    Compute {
        symbol: Symbol,
        #[source]
        source: ComputeError,
    },
    #[error(transparent)]
    Render(#[from] RenderError),
}
