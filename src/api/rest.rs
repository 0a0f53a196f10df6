// =============================================================================
// HTTP API — Axum 0.7
// =============================================================================
//
// A single read-only endpoint serving whatever the cache holds. The handler
// does nothing beyond a cache read and a response write; all fetching and
// rendering cost lives in the scheduler's pipeline, off the request path.
//
//   200 image/svg+xml   latest successful chart
//   500 text/plain      latest run failed: "plotting error: <message>"
//   503 text/plain      no run has completed yet (Retry-After: 30)
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::State,
    http::{
        header::{CONTENT_TYPE, LAST_MODIFIED, RETRY_AFTER},
        StatusCode,
    },
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::cache::{ArtifactCache, CacheEntry};

pub const CHART_PATH: &str = "/avg_rate.svg";

const TEXT_PLAIN: &str = "text/plain";

/// Seconds a client should wait before asking again while pending.
const RETRY_AFTER_SECS: &str = "30";

/// Build the router with request tracing and the shared cache.
pub fn router(cache: Arc<ArtifactCache>) -> Router {
    Router::new()
        .route(CHART_PATH, get(avg_rate_svg))
        .layer(TraceLayer::new_for_http())
        .with_state(cache)
}

/// Serve until `shutdown` is cancelled, then drain in-flight requests.
pub async fn serve(
    listener: TcpListener,
    cache: Arc<ArtifactCache>,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    axum::serve(listener, router(cache))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

async fn avg_rate_svg(State(cache): State<Arc<ArtifactCache>>) -> Response {
    let snapshot = cache.read();
    match snapshot.entry {
        CacheEntry::Ready(artifact) => {
            debug!(generation = snapshot.generation, "served chart");
            let last_modified = snapshot
                .published_at
                .map(|at| at.format("%a, %d %b %Y %H:%M:%S GMT").to_string())
                .unwrap_or_default();
            (
                [
                    (CONTENT_TYPE, artifact.content_type().to_string()),
                    (LAST_MODIFIED, last_modified),
                ],
                artifact.bytes().clone(),
            )
                .into_response()
        }
        CacheEntry::Failed(message) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(CONTENT_TYPE, TEXT_PLAIN)],
            format!("plotting error: {message}"),
        )
            .into_response(),
        CacheEntry::Pending => (
            StatusCode::SERVICE_UNAVAILABLE,
            [(CONTENT_TYPE, TEXT_PLAIN), (RETRY_AFTER, RETRY_AFTER_SECS)],
            "avg rate chart not ready yet",
        )
            .into_response(),
    }
}
