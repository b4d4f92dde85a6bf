//! Contract for the external audio transport.

use async_trait::async_trait;
use jamsource::SessionId;
use tokio::sync::oneshot;

use crate::error::SinkError;

/// The single terminal event a sink emits for one opened handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkOutcome {
    /// The track played to the end (also sent after an explicit `stop`).
    Finished,
    /// Playback failed mid-track.
    Error(String),
}

/// Handle to one in-flight sink playback.
///
/// The terminal event travels over a oneshot channel so that sinks whose
/// completion callback fires on a foreign thread only ever *post* the event;
/// the playback loop observes it from its own select. A dropped sender is
/// treated as `Finished`.
#[derive(Debug)]
pub struct SinkHandle {
    id: u64,
    pub(crate) done: oneshot::Receiver<SinkOutcome>,
}

impl SinkHandle {
    pub fn new(id: u64, done: oneshot::Receiver<SinkOutcome>) -> Self {
        Self { id, done }
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

/// External component that actually emits audio given a stream handle.
///
/// Implementations must emit exactly one [`SinkOutcome`] per handle returned
/// from [`open`](AudioSink::open). All other methods are best-effort control
/// signals; the engine never calls them after the terminal event.
#[async_trait]
pub trait AudioSink: Send + Sync + 'static {
    /// Start playing `stream_url` for `session` at `volume` (`0.0..=1.0`).
    async fn open(
        &self,
        session: SessionId,
        stream_url: &str,
        volume: f32,
    ) -> Result<SinkHandle, SinkError>;

    /// Suspend playback for the handle.
    async fn pause(&self, handle: &SinkHandle) -> Result<(), SinkError>;

    /// Resume a suspended handle.
    async fn resume(&self, handle: &SinkHandle) -> Result<(), SinkError>;

    /// Stop the handle; the sink still emits its terminal event.
    async fn stop(&self, handle: &SinkHandle) -> Result<(), SinkError>;

    /// Apply a new volume (`0.0..=1.0`) to an active handle.
    async fn set_volume(&self, handle: &SinkHandle, volume: f32) -> Result<(), SinkError>;

    /// Tear down the session's transport (e.g. leave the voice channel).
    async fn disconnect(&self, session: SessionId) -> Result<(), SinkError>;
}
