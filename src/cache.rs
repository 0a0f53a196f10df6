// =============================================================================
// Artifact Cache — the single published refresh result
// =============================================================================
//
// Exactly one entry is held at a time. `publish` replaces it wholesale (a new
// failure discards a previously good chart) and `read` hands back a clone.
// Both run under one parking_lot::Mutex held only for the swap or the clone:
// artifacts are reference counted, so neither critical section scales with
// the size of the chart, and no I/O ever happens under the lock.
// =============================================================================

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::error::PipelineError;
use crate::types::Artifact;

/// What the endpoint currently serves.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheEntry {
    /// Nothing has been published yet.
    Pending,
    /// The latest run succeeded.
    Ready(Artifact),
    /// The latest run failed with this message.
    Failed(Arc<str>),
}

impl From<Result<Artifact, PipelineError>> for CacheEntry {
    fn from(result: Result<Artifact, PipelineError>) -> Self {
        match result {
            Ok(artifact) => Self::Ready(artifact),
            Err(e) => Self::Failed(Arc::from(e.to_string())),
        }
    }
}

/// A consistent view of the cache at one instant.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub entry: CacheEntry,
    /// Number of publishes so far; 0 while pending.
    pub generation: u64,
    pub published_at: Option<DateTime<Utc>>,
}

pub struct ArtifactCache {
    current: Mutex<Snapshot>,
}

impl Default for ArtifactCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ArtifactCache {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(Snapshot {
                entry: CacheEntry::Pending,
                generation: 0,
                published_at: None,
            }),
        }
    }

    /// Atomically replace the published entry and return its generation.
    pub fn publish(&self, entry: CacheEntry) -> u64 {
        let now = Utc::now();
        let previous = {
            let mut current = self.current.lock();
            let generation = current.generation + 1;
            std::mem::replace(
                &mut *current,
                Snapshot {
                    entry,
                    generation,
                    published_at: Some(now),
                },
            )
        };
        // The old entry is dropped here, outside the lock.
        previous.generation + 1
    }

    /// Clone of the currently published entry.
    pub fn read(&self) -> Snapshot {
        self.current.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenderError;
    use crate::types::SVG_CONTENT_TYPE;

    fn artifact(body: &str) -> Artifact {
        Artifact::new(SVG_CONTENT_TYPE, body.as_bytes().to_vec())
    }

    #[test]
    fn starts_pending() {
        let cache = ArtifactCache::new();
        let snap = cache.read();
        assert_eq!(snap.entry, CacheEntry::Pending);
        assert_eq!(snap.generation, 0);
        assert!(snap.published_at.is_none());
    }

    #[test]
    fn publish_replaces_unconditionally() {
        let cache = ArtifactCache::new();
        assert_eq!(cache.publish(CacheEntry::Ready(artifact("<svg/>"))), 1);
        assert_eq!(cache.read().entry, CacheEntry::Ready(artifact("<svg/>")));

        // A failure replaces the good chart; nothing of it survives.
        let err = PipelineError::Render(RenderError::NoData("empty".into()));
        let failed = CacheEntry::from(Err::<Artifact, _>(err));
        assert_eq!(cache.publish(failed), 2);
        let snap = cache.read();
        assert_eq!(snap.generation, 2);
        match snap.entry {
            CacheEntry::Failed(msg) => assert_eq!(&*msg, "nothing to plot: empty"),
            other => panic!("unexpected entry: {other:?}"),
        }

        let ok = CacheEntry::from(Ok::<_, PipelineError>(artifact("<svg>2</svg>")));
        assert_eq!(cache.publish(ok), 3);
        assert_eq!(cache.read().entry, CacheEntry::Ready(artifact("<svg>2</svg>")));
    }

    #[test]
    fn concurrent_reads_never_see_torn_entries() {
        const PUBLISHES: u64 = 2_000;
        const READERS: usize = 8;

        // Every entry encodes the generation it is published under, so a
        // reader can check that entry and generation came from one publish.
        fn entry_for(generation: u64) -> CacheEntry {
            if generation % 3 == 0 {
                CacheEntry::Failed(Arc::from(format!("failure {generation}")))
            } else {
                CacheEntry::Ready(artifact(&format!("<svg>{generation}:{generation}</svg>")))
            }
        }

        let cache = ArtifactCache::new();
        // Readers give up rather than spin if the publisher dies early.
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(30);
        std::thread::scope(|scope| {
            for _ in 0..READERS {
                scope.spawn(|| {
                    let mut last = 0;
                    loop {
                        assert!(
                            std::time::Instant::now() < deadline,
                            "publisher stalled at generation {last}"
                        );
                        let snap = cache.read();
                        assert!(snap.generation >= last, "generation went backwards");
                        last = snap.generation;
                        if snap.generation == 0 {
                            assert_eq!(snap.entry, CacheEntry::Pending);
                        } else {
                            assert_eq!(snap.entry, entry_for(snap.generation));
                            assert!(snap.published_at.is_some());
                        }
                        if last == PUBLISHES {
                            break;
                        }
                    }
                });
            }
            scope.spawn(|| {
                for g in 1..=PUBLISHES {
                    assert_eq!(cache.publish(entry_for(g)), g);
                }
            });
        });
        assert_eq!(cache.read().generation, PUBLISHES);
    }
}
