//! # JamResolve
//!
//! Track resolution pipeline: free text or a URL in, a fully playable
//! [`jamsource::ResolvedTrack`] out.
//!
//! The pipeline classifies the input ([`classify`]), consults the resolution
//! cache for catalog lookups, and always finishes with a search resolution
//! against the media source — a catalog entry is never directly streamable,
//! so its metadata only ever serves as a search hint. See
//! [`ResolutionPipeline`] for the full flow.

mod classify;
mod pipeline;

pub use classify::{classify, CatalogKind, CatalogRef, RequestKind};
pub use pipeline::{PendingTrack, Resolution, ResolutionPipeline};
