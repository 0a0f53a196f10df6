// =============================================================================
// Refresh Pipeline — fetch → transform → render, all or nothing
// =============================================================================
//
// Symbols are processed in configured order. The first failure (fetch or
// compute) aborts the run: later symbols are not fetched and nothing reaches
// the renderer. Only a complete set of series is ever rendered, so the
// published chart never shows a partial symbol list.
// =============================================================================

use std::sync::Arc;
use std::time::Instant;

use chrono::{NaiveDate, Utc};
use tracing::{debug, info};

use crate::config::{date_range, Config};
use crate::error::PipelineError;
use crate::indicators::avg_rate::calculate_avg_rate;
use crate::render::Renderer;
use crate::tiingo::DataSource;
use crate::types::{Artifact, Symbol, SymbolSeries};

pub struct Pipeline {
    source: Arc<dyn DataSource>,
    renderer: Arc<dyn Renderer>,
    symbols: Vec<Symbol>,
    lookback: usize,
    history_days: u64,
}

impl Pipeline {
    pub fn new(
        source: Arc<dyn DataSource>,
        renderer: Arc<dyn Renderer>,
        symbols: Vec<Symbol>,
        lookback: usize,
        history_days: u64,
    ) -> Self {
        Self {
            source,
            renderer,
            symbols,
            lookback,
            history_days,
        }
    }

    pub fn from_config(
        config: &Config,
        source: Arc<dyn DataSource>,
        renderer: Arc<dyn Renderer>,
    ) -> Self {
        Self::new(
            source,
            renderer,
            config.symbols.clone(),
            config.lookback,
            config.history_days(),
        )
    }

    /// Run once against today's (UTC) date range.
    pub async fn run(&self) -> Result<Artifact, PipelineError> {
        self.run_for(Utc::now().date_naive()).await
    }

    /// Run once with the history window ending at `today`.
    pub async fn run_for(&self, today: NaiveDate) -> Result<Artifact, PipelineError> {
        let started = Instant::now();
        let (from, to) = date_range(today, self.history_days);
        info!(%from, %to, symbols = self.symbols.len(), "refresh run starting");

        let mut series = Vec::with_capacity(self.symbols.len());
        for symbol in &self.symbols {
            let observations =
                self.source
                    .fetch(symbol, from, to)
                    .await
                    .map_err(|source| PipelineError::Fetch {
                        symbol: symbol.clone(),
                        source,
                    })?;
            let points = calculate_avg_rate(&observations, self.lookback).map_err(|source| {
                PipelineError::Compute {
                    symbol: symbol.clone(),
                    source,
                }
            })?;
            debug!(
                symbol = %symbol,
                observations = observations.len(),
                points = points.len(),
                "series computed"
            );
            series.push(SymbolSeries {
                symbol: symbol.clone(),
                points,
            });
        }

        let artifact = self.renderer.render(&series)?;
        info!(
            bytes = artifact.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "refresh run rendered"
        );
        Ok(artifact)
    }
}
