//! # JamSource
//!
//! Common types and traits for JamBot audio sources.
//!
//! This crate provides the foundational abstractions shared by the rest of
//! the audio core:
//!
//! - **Data model**: [`ResolvedTrack`] and the catalog metadata records that
//!   flow from the resolvers into the player queue.
//! - **Resolver seams**: [`StreamResolver`] (search-based lookup that yields a
//!   playable stream) and [`CatalogResolver`] (metadata-only lookup for
//!   catalog links). Concrete HTTP clients live outside the core and plug in
//!   through these traits.
//! - **Error taxonomy**: [`ResolveError`], shared by every resolution step.
//!
//! A catalog link (a streaming-service track/album/playlist URL) never yields
//! a playable stream by itself. The catalog resolver only returns display
//! metadata plus a search hint; the actual stream always comes from a
//! separate search resolution against the media source. Both traits exist so
//! that indirection stays visible in the types.

mod model;
mod resolver;

pub use model::{
    CatalogMetadata, CatalogPage, CatalogTrack, RequesterId, ResolvedStream, ResolvedTrack,
    SessionId,
};
pub use resolver::{CatalogResolver, StreamResolver};

use thiserror::Error;

/// Result type for resolution operations.
pub type Result<T> = std::result::Result<T, ResolveError>;

/// Errors produced while turning user input into a playable track.
///
/// Resolution either fully succeeds or fails with one of these variants;
/// a partially populated track is never handed to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// No match for the query or URL.
    #[error("no result found for `{0}`")]
    NotFound(String),

    /// The upstream service failed (network, API error). The pipeline does
    /// not retry across the resolver boundary; callers may re-issue.
    #[error("upstream resolver error: {0}")]
    Upstream(String),

    /// Input the pipeline cannot handle (malformed URL, unknown catalog
    /// entity).
    #[error("unsupported input: {0}")]
    Unsupported(String),
}
