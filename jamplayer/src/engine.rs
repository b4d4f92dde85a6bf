//! The facade the command layer talks to.

use std::sync::Arc;

use jamcache::{CacheStats, CacheStore, MemoryStore, ResolutionCache};
use jamresolve::ResolutionPipeline;
use jamsource::{CatalogResolver, RequesterId, SessionId, StreamResolver};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::player::{Player, PlayerSnapshot};
use crate::progress::ProgressReport;
use crate::registry::PlayerRegistry;
use crate::sink::AudioSink;

/// What `enqueue` reports back to the command layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedTrackSummary {
    pub title: String,
    pub canonical_url: String,
    pub artist: Option<String>,
    pub duration_secs: u64,
    /// 1-based position in the session's queue at enqueue time.
    pub position: usize,
    /// Album/playlist entries still being resolved in the background.
    pub pending_count: usize,
}

/// Audio core entry point: resolution pipeline + player registry + sink
/// behind one API, one instance for the whole process.
pub struct AudioEngine {
    registry: PlayerRegistry,
    pipeline: Arc<ResolutionPipeline>,
    cache: ResolutionCache,
}

impl AudioEngine {
    /// Build an engine with an in-memory resolution cache.
    pub fn new(
        catalog: Arc<dyn CatalogResolver>,
        search: Arc<dyn StreamResolver>,
        sink: Arc<dyn AudioSink>,
        config: EngineConfig,
    ) -> Self {
        Self::with_cache_store(catalog, search, sink, Arc::new(MemoryStore::new()), config)
    }

    /// Build an engine over a specific cache backing store (e.g.
    /// [`jamcache::SqliteStore`] for persistence).
    pub fn with_cache_store(
        catalog: Arc<dyn CatalogResolver>,
        search: Arc<dyn StreamResolver>,
        sink: Arc<dyn AudioSink>,
        store: Arc<dyn CacheStore>,
        config: EngineConfig,
    ) -> Self {
        let cache = ResolutionCache::new(
            store,
            config.cache_ttls.clone(),
            config.max_cache_entries,
        );
        let pipeline = Arc::new(
            ResolutionPipeline::new(catalog, search, cache.clone())
                .with_page_limit(config.catalog_page_limit),
        );
        let registry = PlayerRegistry::new(sink, &config);
        Self {
            registry,
            pipeline,
            cache,
        }
    }

    /// Resolve `query` and append the result to the session's queue,
    /// creating the player on first use. Returns once the first track is
    /// playable; remaining album/playlist entries are resolved in the
    /// background and appended in listing order.
    pub async fn enqueue(
        &self,
        session: SessionId,
        query: &str,
        requester: RequesterId,
    ) -> Result<QueuedTrackSummary, EngineError> {
        let resolution = self.pipeline.resolve(query, requester).await?;
        let track = resolution.track;
        let summary_base = (
            track.title.clone(),
            track.canonical_url.clone(),
            track.artist().map(str::to_owned),
            track.duration_secs,
        );

        // the player may stop between lookup and enqueue (idle timeout
        // racing a command); one retry with a fresh instance is enough
        let mut position = None;
        for _ in 0..2 {
            let player = self.registry.get_or_create(session).await;
            match player.enqueue(track.clone()).await {
                Ok(p) => {
                    position = Some(p);
                    break;
                }
                Err(_) => continue,
            }
        }
        let position = position.ok_or(crate::error::PlayerError::Stopped)?;

        let pending_count = resolution.pending.len();
        if pending_count > 0 {
            let pipeline = Arc::clone(&self.pipeline);
            let registry = self.registry.clone();
            let pending = resolution.pending;
            tokio::spawn(async move {
                for entry in pending {
                    let resolved = match pipeline.resolve_pending(&entry).await {
                        Ok(resolved) => resolved,
                        Err(e) => {
                            warn!(title = %entry.hint.title, error = %e,
                                  "skipping unresolvable collection entry");
                            continue;
                        }
                    };
                    let Some(player) = registry.get(session).await else {
                        // session torn down, drop the rest of the batch
                        break;
                    };
                    if player.enqueue(resolved).await.is_err() {
                        break;
                    }
                }
            });
        }

        let (title, canonical_url, artist, duration_secs) = summary_base;
        info!(%session, %title, position, pending_count, "enqueued");
        Ok(QueuedTrackSummary {
            title,
            canonical_url,
            artist,
            duration_secs,
            position,
            pending_count,
        })
    }

    pub async fn pause(&self, session: SessionId) -> Result<(), EngineError> {
        Ok(self.live(session).await?.pause().await?)
    }

    pub async fn resume(&self, session: SessionId) -> Result<(), EngineError> {
        Ok(self.live(session).await?.resume().await?)
    }

    pub async fn skip(&self, session: SessionId) -> Result<(), EngineError> {
        Ok(self.live(session).await?.skip().await?)
    }

    /// Flip loop-current for the session; returns the new value.
    pub async fn toggle_loop(&self, session: SessionId) -> Result<bool, EngineError> {
        Ok(self.live(session).await?.toggle_loop().await?)
    }

    /// Volume in percent, `0..=100`.
    pub async fn set_volume(&self, session: SessionId, volume: u32) -> Result<(), EngineError> {
        if volume > 100 {
            return Err(EngineError::InvalidVolume(volume));
        }
        Ok(self
            .live(session)
            .await?
            .set_volume(volume as f32 / 100.0)
            .await?)
    }

    /// Stop the session's player and release its transport, regardless of
    /// queue state.
    pub async fn leave(&self, session: SessionId) -> Result<(), EngineError> {
        Ok(self.live(session).await?.stop().await?)
    }

    pub async fn snapshot(&self, session: SessionId) -> Result<PlayerSnapshot, EngineError> {
        Ok(self.live(session).await?.snapshot().await?)
    }

    /// Now-playing reports for every session.
    pub fn subscribe_progress(&self) -> broadcast::Receiver<ProgressReport> {
        self.registry.subscribe_progress()
    }

    /// Resolution cache maintenance: drop expired entries now.
    pub fn clear_expired_cache(&self) -> usize {
        self.cache.clear_expired()
    }

    /// Resolution cache occupancy.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// The registry, for direct lifecycle queries.
    pub fn registry(&self) -> &PlayerRegistry {
        &self.registry
    }

    async fn live(&self, session: SessionId) -> Result<Player, EngineError> {
        self.registry
            .get(session)
            .await
            .ok_or(EngineError::NoPlayer(session))
    }
}
