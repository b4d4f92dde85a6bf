//! # JamCache
//!
//! TTL-keyed resolution cache sitting in front of the catalog resolver.
//!
//! Keys are category-prefixed (`track:<url>`, `album:<url>:0:50`, ...) and
//! each category carries its own time-to-live, configured through
//! [`CacheTtls`]. Expiry is lazy: an expired entry is deleted on read and
//! reported as a miss, no background sweep is required (a
//! [`ResolutionCache::clear_expired`] maintenance call is exposed for
//! periodic invocation). A global item ceiling evicts the oldest-inserted
//! entries first.
//!
//! The backing store is pluggable through the [`CacheStore`] trait. Two
//! implementations ship with the crate: [`MemoryStore`] for in-process use
//! and tests, and [`SqliteStore`] for persistence across restarts. The
//! contract does not require cross-process atomicity.

mod cache;
mod category;
mod sqlite;
mod store;

pub use cache::{CacheStats, ResolutionCache, DEFAULT_MAX_ENTRIES};
pub use category::{CacheCategory, CacheTtls};
pub use sqlite::SqliteStore;
pub use store::{CacheStore, MemoryStore, StoredEntry};

use thiserror::Error;

/// Result type for cache store operations.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Errors raised by a cache backing store.
///
/// The front API ([`ResolutionCache`]) never surfaces these to resolution
/// callers: store failures are logged and degrade to a miss.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("cache payload error: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("cache store error: {0}")]
    Store(String),
}
