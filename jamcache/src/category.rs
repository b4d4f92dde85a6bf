//! Cache categories and their expiry table.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Entity category a cache key belongs to, derived from its prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheCategory {
    Track,
    Album,
    Playlist,
    Search,
    Artist,
    Recommendation,
}

impl CacheCategory {
    pub const ALL: [CacheCategory; 6] = [
        CacheCategory::Track,
        CacheCategory::Album,
        CacheCategory::Playlist,
        CacheCategory::Search,
        CacheCategory::Artist,
        CacheCategory::Recommendation,
    ];

    /// Key prefix including the separator, e.g. `"track:"`.
    pub fn prefix(self) -> &'static str {
        match self {
            CacheCategory::Track => "track:",
            CacheCategory::Album => "album:",
            CacheCategory::Playlist => "playlist:",
            CacheCategory::Search => "search:",
            CacheCategory::Artist => "artist:",
            CacheCategory::Recommendation => "recommendations:",
        }
    }

    /// Bare category name, used in stats breakdowns.
    pub fn name(self) -> &'static str {
        match self {
            CacheCategory::Track => "track",
            CacheCategory::Album => "album",
            CacheCategory::Playlist => "playlist",
            CacheCategory::Search => "search",
            CacheCategory::Artist => "artist",
            CacheCategory::Recommendation => "recommendations",
        }
    }

    /// Classify a key by its prefix. Keys without a known prefix have no
    /// category and fall back to the default TTL.
    pub fn of_key(key: &str) -> Option<CacheCategory> {
        CacheCategory::ALL
            .into_iter()
            .find(|c| key.starts_with(c.prefix()))
    }
}

const DAY: u64 = 60 * 60 * 24;

/// Per-category expiry table.
///
/// Tracks, albums and artists change rarely and keep a long TTL; playlists
/// and searches are short-lived; recommendations shorter still. This struct
/// is the single authoritative configuration surface for cache expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheTtls {
    pub track: Duration,
    pub album: Duration,
    pub playlist: Duration,
    pub search: Duration,
    pub artist: Duration,
    pub recommendation: Duration,
    /// Applied to keys with no recognized category prefix.
    pub default: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            track: Duration::from_secs(7 * DAY),
            album: Duration::from_secs(7 * DAY),
            playlist: Duration::from_secs(DAY),
            search: Duration::from_secs(DAY),
            artist: Duration::from_secs(7 * DAY),
            recommendation: Duration::from_secs(6 * 60 * 60),
            default: Duration::from_secs(DAY),
        }
    }
}

impl CacheTtls {
    /// TTL for a key, from its category prefix.
    pub fn for_key(&self, key: &str) -> Duration {
        match CacheCategory::of_key(key) {
            Some(CacheCategory::Track) => self.track,
            Some(CacheCategory::Album) => self.album,
            Some(CacheCategory::Playlist) => self.playlist,
            Some(CacheCategory::Search) => self.search,
            Some(CacheCategory::Artist) => self.artist,
            Some(CacheCategory::Recommendation) => self.recommendation,
            None => self.default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_classify_by_prefix() {
        assert_eq!(
            CacheCategory::of_key("track:https://x/t/1"),
            Some(CacheCategory::Track)
        );
        assert_eq!(
            CacheCategory::of_key("recommendations:seed"),
            Some(CacheCategory::Recommendation)
        );
        assert_eq!(CacheCategory::of_key("bogus:key"), None);
    }

    #[test]
    fn ttl_table_follows_category() {
        let ttls = CacheTtls::default();
        assert_eq!(ttls.for_key("album:a"), ttls.album);
        assert_eq!(ttls.for_key("playlist:p"), ttls.playlist);
        assert_eq!(ttls.for_key("no-prefix"), ttls.default);
        assert!(ttls.recommendation < ttls.playlist);
        assert!(ttls.playlist < ttls.track);
    }
}
