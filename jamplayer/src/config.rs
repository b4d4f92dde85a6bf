//! Engine configuration.

use std::time::Duration;

use jamcache::CacheTtls;
use serde::{Deserialize, Serialize};

/// The single configuration surface for the audio core.
///
/// Covers player lifecycle, progress reporting and the resolution cache.
/// Every field has a default, so `EngineConfig::default()` is a working
/// production configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How long a player waits on an empty queue before tearing itself
    /// down.
    pub idle_timeout: Duration,
    /// Interval between now-playing progress reports.
    pub progress_interval: Duration,
    /// Volume applied to a fresh player, `0.0..=1.0`.
    pub default_volume: f32,
    /// Page size when expanding an album or playlist link.
    pub catalog_page_limit: usize,
    /// Item ceiling of the resolution cache.
    pub max_cache_entries: usize,
    /// Per-category cache expiry table.
    pub cache_ttls: CacheTtls,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(300),
            progress_interval: Duration::from_secs(10),
            default_volume: 0.5,
            catalog_page_limit: 50,
            max_cache_entries: jamcache::DEFAULT_MAX_ENTRIES,
            cache_ttls: CacheTtls::default(),
        }
    }
}
