//! The resolution pipeline proper.

use std::sync::Arc;

use jamcache::ResolutionCache;
use jamsource::{
    CatalogMetadata, CatalogPage, CatalogResolver, CatalogTrack, RequesterId, ResolveError,
    ResolvedStream, ResolvedTrack, StreamResolver,
};
use tracing::{debug, info, warn};

use crate::classify::{classify, CatalogKind, CatalogRef, RequestKind};

/// Default page size when expanding an album or playlist link.
pub const DEFAULT_PAGE_LIMIT: usize = 50;

/// A catalog entry that has not been stream-resolved yet. Carries enough
/// metadata (title, artist, art) for queue display; the stream is resolved
/// lazily through [`ResolutionPipeline::resolve_pending`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTrack {
    pub hint: CatalogTrack,
    pub requester: RequesterId,
    /// Tag of the catalog the hint came from.
    pub source: String,
}

/// Outcome of resolving one user request. `track` is immediately playable;
/// `pending` holds the remainder of an album/playlist, in listing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub track: ResolvedTrack,
    pub pending: Vec<PendingTrack>,
}

/// Turns user input into playable tracks.
///
/// Catalog lookups go through the resolution cache; the final stream lookup
/// never does (stream URLs are short-lived). Either the whole pipeline
/// succeeds or the caller gets a typed [`ResolveError`] — no partial track
/// ever escapes.
pub struct ResolutionPipeline {
    catalog: Arc<dyn CatalogResolver>,
    search: Arc<dyn StreamResolver>,
    cache: ResolutionCache,
    page_limit: usize,
}

impl ResolutionPipeline {
    pub fn new(
        catalog: Arc<dyn CatalogResolver>,
        search: Arc<dyn StreamResolver>,
        cache: ResolutionCache,
    ) -> Self {
        Self {
            catalog,
            search,
            cache,
            page_limit: DEFAULT_PAGE_LIMIT,
        }
    }

    pub fn with_page_limit(mut self, limit: usize) -> Self {
        self.page_limit = limit.max(1);
        self
    }

    /// Resolve a free-text query or URL for `requester`.
    pub async fn resolve(
        &self,
        input: &str,
        requester: RequesterId,
    ) -> Result<Resolution, ResolveError> {
        match classify(input) {
            RequestKind::Catalog(cref) => self.resolve_catalog(cref, requester).await,
            RequestKind::MediaUrl(url) => {
                let stream = self.search.search(&url).await?;
                Ok(Resolution {
                    track: plain_track(stream, requester),
                    pending: Vec::new(),
                })
            }
            RequestKind::Search(text) => {
                if text.is_empty() {
                    return Err(ResolveError::Unsupported("empty query".into()));
                }
                let stream = self.search.search(&text).await?;
                Ok(Resolution {
                    track: plain_track(stream, requester),
                    pending: Vec::new(),
                })
            }
        }
    }

    /// Stream-resolve a track that was queued with metadata only.
    pub async fn resolve_pending(
        &self,
        pending: &PendingTrack,
    ) -> Result<ResolvedTrack, ResolveError> {
        self.resolve_hint(&pending.hint, pending.requester, &pending.source)
            .await
    }

    async fn resolve_catalog(
        &self,
        cref: CatalogRef,
        requester: RequesterId,
    ) -> Result<Resolution, ResolveError> {
        let source = self.catalog.source_name().to_string();
        match cref.kind {
            CatalogKind::Track => {
                let hint = self.catalog_track(&cref.url).await?;
                let track = self.resolve_hint(&hint, requester, &source).await?;
                info!(title = %track.title, url = %cref.url, "resolved catalog track");
                Ok(Resolution {
                    track,
                    pending: Vec::new(),
                })
            }
            CatalogKind::Album | CatalogKind::Playlist => {
                let page = self.catalog_page(cref.kind, &cref.url).await?;
                let Some((first, rest)) = page.tracks.split_first() else {
                    return Err(ResolveError::NotFound(cref.url));
                };
                let track = self.resolve_hint(first, requester, &source).await?;
                let pending: Vec<PendingTrack> = rest
                    .iter()
                    .map(|hint| PendingTrack {
                        hint: hint.clone(),
                        requester,
                        source: source.clone(),
                    })
                    .collect();
                info!(
                    collection = %page.title,
                    first = %track.title,
                    pending = pending.len(),
                    "resolved catalog collection"
                );
                Ok(Resolution { track, pending })
            }
        }
    }

    /// Cached single-track catalog lookup.
    async fn catalog_track(&self, url: &str) -> Result<CatalogTrack, ResolveError> {
        let key = format!("track:{url}");
        if let Some(hint) = self.cache.get::<CatalogTrack>(&key) {
            debug!(url, "catalog track cache hit");
            return Ok(hint);
        }
        let hint = self.catalog.resolve_track(url).await?;
        self.cache.set(&key, &hint);
        Ok(hint)
    }

    /// Cached album/playlist page lookup (first page only; deeper pages are
    /// the command layer's business).
    async fn catalog_page(&self, kind: CatalogKind, url: &str) -> Result<CatalogPage, ResolveError> {
        let prefix = match kind {
            CatalogKind::Album => "album",
            _ => "playlist",
        };
        let key = format!("{prefix}:{url}:0:{}", self.page_limit);
        if let Some(page) = self.cache.get::<CatalogPage>(&key) {
            debug!(url, "catalog page cache hit");
            return Ok(page);
        }
        let page = match kind {
            CatalogKind::Album => self.catalog.album_page(url, 0, self.page_limit).await?,
            _ => self.catalog.playlist_page(url, 0, self.page_limit).await?,
        };
        self.cache.set(&key, &page);
        Ok(page)
    }

    /// Search the media source with a catalog hint and merge the results.
    ///
    /// Catalog metadata wins for display (title, artist, album, art); the
    /// stream resolver is authoritative for the stream URL, the canonical
    /// page, and the duration when it knows one.
    async fn resolve_hint(
        &self,
        hint: &CatalogTrack,
        requester: RequesterId,
        source: &str,
    ) -> Result<ResolvedTrack, ResolveError> {
        let query = if hint.search_query.is_empty() {
            warn!(title = %hint.title, "catalog hint without search query, rebuilding");
            CatalogTrack::default_search_query(&hint.title, &hint.artist)
        } else {
            hint.search_query.clone()
        };
        let stream = self.search.search(&query).await?;
        Ok(ResolvedTrack {
            title: if hint.title.is_empty() {
                stream.title
            } else {
                hint.title.clone()
            },
            canonical_url: stream.canonical_url,
            stream_url: stream.stream_url,
            duration_secs: if stream.duration_secs > 0 {
                stream.duration_secs
            } else {
                hint.duration_secs
            },
            thumbnail_url: stream.thumbnail_url,
            requester,
            catalog: Some(CatalogMetadata {
                artist: hint.artist.clone(),
                album: hint.album.clone(),
                album_art_url: hint.album_art_url.clone(),
                source: source.to_string(),
            }),
        })
    }
}

fn plain_track(stream: ResolvedStream, requester: RequesterId) -> ResolvedTrack {
    ResolvedTrack {
        title: stream.title,
        canonical_url: stream.canonical_url,
        stream_url: stream.stream_url,
        duration_secs: stream.duration_secs,
        thumbnail_url: stream.thumbnail_url,
        requester,
        catalog: None,
    }
}
