//! Error taxonomy of the playback engine.

use jamsource::{ResolveError, SessionId};
use thiserror::Error;

/// Failure reported by the external audio sink.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("audio sink error: {0}")]
pub struct SinkError(pub String);

/// Errors from a single player's command surface.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlayerError {
    /// Command not valid in the current state (e.g. `pause` with nothing
    /// playing). Rejected synchronously, no state change.
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    /// The player's loop task has terminated; the handle is dead.
    #[error("player is stopped")]
    Stopped,
}

/// Errors surfaced by the [`crate::AudioEngine`] facade.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error(transparent)]
    Resolution(#[from] ResolveError),

    #[error(transparent)]
    Player(#[from] PlayerError),

    /// Volume outside the accepted `0..=100` range.
    #[error("volume {0} out of range (expected 0..=100)")]
    InvalidVolume(u32),

    /// Control command against a session that has no live player.
    #[error("no active player for {0}")]
    NoPlayer(SessionId),
}
