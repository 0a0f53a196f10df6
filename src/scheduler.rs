// =============================================================================
// Refresh Scheduler — one pipeline run at a time on a period timer
// =============================================================================
//
// Runs the pipeline immediately, then again one period after each run
// completes. A run is awaited inline, so runs never overlap, and the timer is
// reset once it finishes, so ticks that fell due meanwhile are dropped rather
// than replayed. Consecutive completed refreshes are therefore at least one
// period apart whatever each run takes. Cancellation is only observed while
// idle.
// =============================================================================

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::cache::{ArtifactCache, CacheEntry};
use crate::pipeline::Pipeline;

pub struct Scheduler {
    pipeline: Pipeline,
    cache: Arc<ArtifactCache>,
    period: Duration,
    write_svg: Option<PathBuf>,
}

impl Scheduler {
    pub fn new(pipeline: Pipeline, cache: Arc<ArtifactCache>, period: Duration) -> Self {
        Self {
            pipeline,
            cache,
            period,
            write_svg: None,
        }
    }

    /// Also write each successful chart to `path`.
    pub fn with_svg_output(mut self, path: Option<PathBuf>) -> Self {
        self.write_svg = path;
        self
    }

    /// Drive refreshes until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) {
        // interval() rejects a zero period; config never produces one.
        let mut ticker = interval(self.period.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(period_secs = self.period.as_secs(), "scheduler started");

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!("scheduler stopping");
                    return;
                }
                _ = ticker.tick() => {}
            }
            self.refresh_once().await;
            ticker.reset();
        }
    }

    /// One full refresh: run the pipeline and publish whatever it produced.
    pub async fn refresh_once(&self) {
        let result = self.pipeline.run().await;

        let artifact = match &result {
            Ok(artifact) => Some(artifact.clone()),
            Err(e) => {
                error!(error = %e, "refresh run failed");
                None
            }
        };
        let generation = self.cache.publish(CacheEntry::from(result));
        info!(generation, ok = artifact.is_some(), "refresh published");

        if let (Some(artifact), Some(path)) = (artifact, &self.write_svg) {
            if let Err(e) = tokio::fs::write(path, artifact.bytes()).await {
                warn!(path = %path.display(), error = %e, "unable to write chart file");
            }
        }
    }
}
