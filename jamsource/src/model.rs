//! Data model shared across the audio core.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Scope a player is keyed by (one guild / voice context).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session:{}", self.0)
    }
}

/// Identity of the user who requested a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequesterId(pub u64);

impl fmt::Display for RequesterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user:{}", self.0)
    }
}

/// Display metadata attached to a track that originated from a catalog link.
///
/// The catalog is authoritative for display (artist, album, art); it is never
/// authoritative for the stream itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogMetadata {
    pub artist: String,
    pub album: Option<String>,
    pub album_art_url: Option<String>,
    /// Catalog source tag, e.g. `"spotify"`.
    pub source: String,
}

/// A fully resolved, playable track. Immutable once created: it is built by
/// the resolution pipeline, owned by a queue entry, and discarded after
/// playback ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTrack {
    pub title: String,
    /// Canonical page URL for display/links.
    pub canonical_url: String,
    /// Opaque handle the audio sink can open.
    pub stream_url: String,
    /// Duration in seconds, `0` when unknown.
    pub duration_secs: u64,
    pub thumbnail_url: Option<String>,
    pub requester: RequesterId,
    /// Present when the track was requested through a catalog link.
    pub catalog: Option<CatalogMetadata>,
}

impl ResolvedTrack {
    /// Best display artist: catalog metadata when present.
    pub fn artist(&self) -> Option<&str> {
        self.catalog.as_ref().map(|c| c.artist.as_str())
    }

    /// Best artwork URL: album art from the catalog, falling back to the
    /// stream thumbnail.
    pub fn art_url(&self) -> Option<&str> {
        self.catalog
            .as_ref()
            .and_then(|c| c.album_art_url.as_deref())
            .or(self.thumbnail_url.as_deref())
    }
}

/// Result of a search resolution: the actually playable stream plus whatever
/// metadata the media source reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStream {
    pub title: String,
    pub canonical_url: String,
    pub stream_url: String,
    pub duration_secs: u64,
    pub thumbnail_url: Option<String>,
}

/// Metadata-only record for a single catalog track. This is what the catalog
/// resolver returns and what the resolution cache stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogTrack {
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub album_art_url: Option<String>,
    /// Duration in seconds as reported by the catalog, `0` when unknown.
    pub duration_secs: u64,
    /// Pre-built search hint for the stream resolver, e.g.
    /// `"<title> <artist> audio"`.
    pub search_query: String,
}

impl CatalogTrack {
    /// Standard search hint used when the catalog record does not carry one.
    pub fn default_search_query(title: &str, artist: &str) -> String {
        format!("{} {} audio", title, artist)
    }
}

/// One page of an album or playlist listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogPage {
    /// Album or playlist name.
    pub title: String,
    pub owner: Option<String>,
    pub tracks: Vec<CatalogTrack>,
    /// Total number of tracks in the collection, across all pages.
    pub total: usize,
    pub offset: usize,
}
