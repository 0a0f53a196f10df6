// =============================================================================
// Tiingo market data
// =============================================================================

pub mod client;

pub use client::{DataSource, TiingoClient};
