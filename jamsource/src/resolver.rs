//! Pluggable resolver seams.
//!
//! Concrete implementations (the media search client, the catalog API
//! client) live outside the audio core and are injected through these
//! traits. Everything here is a pure function of its input: no resolver
//! mutates player state.

use async_trait::async_trait;

use crate::model::{CatalogPage, CatalogTrack, ResolvedStream};
use crate::Result;

/// Search-based lookup against the media source that actually serves audio.
///
/// Given free text (or a direct media URL), returns the playable stream and
/// the media source's own metadata. When the query was built from catalog
/// metadata the result is a best-effort match, not a guaranteed exact
/// rendition of the catalog entry.
#[async_trait]
pub trait StreamResolver: Send + Sync {
    async fn search(&self, query: &str) -> Result<ResolvedStream>;
}

/// Metadata-only lookup for catalog links (streaming-service track, album
/// and playlist URLs). None of these return a stream URL.
#[async_trait]
pub trait CatalogResolver: Send + Sync {
    /// Tag identifying the catalog, stamped on the metadata of every track
    /// resolved through it (e.g. `"spotify"`).
    fn source_name(&self) -> &str {
        "catalog"
    }

    /// Resolve a single catalog track URL into display metadata plus a
    /// search hint.
    async fn resolve_track(&self, url: &str) -> Result<CatalogTrack>;

    /// Fetch one page of an album listing.
    async fn album_page(&self, url: &str, offset: usize, limit: usize) -> Result<CatalogPage>;

    /// Fetch one page of a playlist listing.
    async fn playlist_page(&self, url: &str, offset: usize, limit: usize) -> Result<CatalogPage>;
}
