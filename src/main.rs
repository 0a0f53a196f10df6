// =============================================================================
// avg-rate — Main Entry Point
// =============================================================================
//
// Two long-lived tasks share one cache: the scheduler refreshes the chart in
// the background and the HTTP server serves whatever was last published.
// Configuration errors and a failed bind are fatal; everything that goes
// wrong inside a refresh run is published and served instead.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod cache;
mod config;
mod error;
mod indicators;
mod pipeline;
mod render;
mod scheduler;
mod tiingo;
mod types;

use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cache::ArtifactCache;
use crate::config::Config;
use crate::pipeline::Pipeline;
use crate::render::SvgRenderer;
use crate::scheduler::Scheduler;
use crate::tiingo::TiingoClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::load().context("invalid configuration")?;
    info!(
        symbols = ?config.symbols.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
        period_years = config.period_years,
        lookback = config.lookback,
        update_every_secs = config.update_every.as_secs(),
        "avg-rate starting"
    );

    // ── 2. Collaborators ─────────────────────────────────────────────────
    let source = Arc::new(TiingoClient::new(&config.token).context("building tiingo client")?);
    let renderer = Arc::new(SvgRenderer::new(config.lookback));
    let pipeline = Pipeline::from_config(&config, source, renderer);
    let cache = Arc::new(ArtifactCache::new());

    // ── 3. Bind before any work so a busy port fails fast ────────────────
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("unable to bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, path = api::rest::CHART_PATH, "HTTP server listening");

    // ── 4. Shutdown on Ctrl+C ────────────────────────────────────────────
    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("shutdown signal received, stopping gracefully");
                signal.cancel();
            }
            Err(e) => warn!(error = %e, "unable to listen for Ctrl+C"),
        }
    });

    // ── 5. Scheduler ─────────────────────────────────────────────────────
    let scheduler = Scheduler::new(pipeline, cache.clone(), config.update_every)
        .with_svg_output(config.write_svg.clone());
    let scheduler_task = tokio::spawn(scheduler.run(shutdown.clone()));

    // ── 6. Server (runs on this task until shutdown) ─────────────────────
    let served = api::rest::serve(listener, cache, shutdown.clone()).await;
    shutdown.cancel();
    if let Err(e) = scheduler_task.await {
        warn!(error = %e, "scheduler task ended abnormally");
    }
    served.context("HTTP server failed")?;

    info!("avg-rate shut down complete");
    Ok(())
}
