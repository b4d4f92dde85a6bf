//! # JamPlayer
//!
//! Per-session audio playback engine.
//!
//! One [`Player`] per chat session owns an ordered queue of resolved tracks
//! and a single background loop task that drives the external audio sink.
//! Every mutation (enqueue, pause, skip, volume, leave) travels to that loop
//! over a command channel, so loop-owned state is never touched from another
//! task; the sink reports its one terminal event per handle over a channel
//! the loop selects on.
//!
//! The pieces, bottom up:
//!
//! - [`AudioSink`] — contract for the external audio transport.
//! - [`Player`] — cloneable handle over a session's playback loop.
//! - [`PlayerRegistry`] — session → player map with lifecycle (creation on
//!   first use, teardown on `leave` or idle timeout). An explicit object,
//!   injected where needed, never ambient state.
//! - [`ProgressReport`] — periodic now-playing snapshots on a broadcast
//!   channel, timer driven.
//! - [`AudioEngine`] — the facade the command layer talks to: resolution
//!   pipeline + registry + sink behind one API.

mod config;
mod engine;
mod error;
mod player;
mod progress;
mod registry;
mod sink;

pub use config::EngineConfig;
pub use engine::{AudioEngine, QueuedTrackSummary};
pub use error::{EngineError, PlayerError, SinkError};
pub use player::{Player, PlayerSnapshot, PlayerState, TrackSummary};
pub use progress::ProgressReport;
pub use registry::PlayerRegistry;
pub use sink::{AudioSink, SinkHandle, SinkOutcome};
