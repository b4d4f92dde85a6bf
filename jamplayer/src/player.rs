//! Per-session player: command surface and the playback loop task.
//!
//! [`Player`] is a cheap cloneable handle; the state itself lives inside
//! [`PlayerTask`], which is owned by exactly one spawned loop per live
//! session. Commands are serialized through an unbounded channel and
//! answered over oneshots, so concurrent command dispatch for the same
//! session is race-free by construction.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use jamsource::{RequesterId, ResolvedTrack, SessionId};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

use crate::error::PlayerError;
use crate::registry::PlayerRegistry;
use crate::sink::{AudioSink, SinkHandle, SinkOutcome};

/// Player lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    /// No current track; the loop is waiting for work (or for the idle
    /// timeout).
    Idle,
    /// A track has been dequeued and handed to the sink, which has not
    /// accepted it yet.
    Resolving,
    Playing,
    Paused,
    /// Terminal. The registry drops the player on this transition.
    Stopped,
}

/// A queued track plus the moment it was enqueued.
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub track: ResolvedTrack,
    pub enqueued_at: DateTime<Utc>,
}

/// Condensed track info for snapshots and queue listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackSummary {
    pub title: String,
    pub canonical_url: String,
    pub duration_secs: u64,
    pub requester: RequesterId,
    pub artist: Option<String>,
    /// When the track was added to the queue.
    pub enqueued_at: DateTime<Utc>,
}

impl TrackSummary {
    fn of(entry: &QueueEntry) -> Self {
        let track = &entry.track;
        Self {
            title: track.title.clone(),
            canonical_url: track.canonical_url.clone(),
            duration_secs: track.duration_secs,
            requester: track.requester,
            artist: track.artist().map(str::to_owned),
            enqueued_at: entry.enqueued_at,
        }
    }
}

/// Point-in-time view of a player, for display.
#[derive(Debug, Clone)]
pub struct PlayerSnapshot {
    pub session: SessionId,
    pub state: PlayerState,
    pub current: Option<TrackSummary>,
    pub queue: Vec<TrackSummary>,
    pub volume: f32,
    pub loop_current: bool,
    /// Play time of the current track, excluding paused intervals. `None`
    /// when nothing is current.
    pub elapsed: Option<Duration>,
}

impl PlayerSnapshot {
    /// Duration of the current track in seconds; `0` means unknown, `None`
    /// means nothing is current.
    pub fn duration_secs(&self) -> Option<u64> {
        self.current.as_ref().map(|c| c.duration_secs)
    }
}

pub(crate) enum PlayerCommand {
    Enqueue {
        track: ResolvedTrack,
        reply: oneshot::Sender<usize>,
    },
    Pause {
        reply: oneshot::Sender<Result<(), PlayerError>>,
    },
    Resume {
        reply: oneshot::Sender<Result<(), PlayerError>>,
    },
    Skip {
        reply: oneshot::Sender<Result<(), PlayerError>>,
    },
    SetVolume {
        volume: f32,
        reply: oneshot::Sender<()>,
    },
    ToggleLoop {
        reply: oneshot::Sender<bool>,
    },
    Stop {
        reply: oneshot::Sender<()>,
    },
    Snapshot {
        reply: oneshot::Sender<PlayerSnapshot>,
    },
}

/// Handle to one session's playback loop.
#[derive(Clone)]
pub struct Player {
    session: SessionId,
    tx: mpsc::UnboundedSender<PlayerCommand>,
    stopped: Arc<AtomicBool>,
}

impl Player {
    /// Spawn the loop task for `session` and return its handle. Called by
    /// the registry only.
    pub(crate) fn spawn(
        session: SessionId,
        sink: Arc<dyn AudioSink>,
        registry: PlayerRegistry,
        idle_timeout: Duration,
        volume: f32,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let stopped = Arc::new(AtomicBool::new(false));

        let task = PlayerTask {
            session,
            rx,
            sink,
            registry,
            stopped: Arc::clone(&stopped),
            queue: VecDeque::new(),
            current: None,
            state: PlayerState::Idle,
            volume,
            loop_current: false,
            started_at: None,
            paused_since: None,
            paused_accumulated: Duration::ZERO,
            idle_timeout,
        };
        tokio::spawn(task.run());
        info!(%session, "player created");

        Self {
            session,
            tx,
            stopped,
        }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Whether the loop task has reached its terminal state.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Whether this handle belongs to the loop task identified by `flag`.
    pub(crate) fn shares_loop(&self, flag: &Arc<AtomicBool>) -> bool {
        Arc::ptr_eq(&self.stopped, flag)
    }

    async fn call<R>(
        &self,
        make: impl FnOnce(oneshot::Sender<R>) -> PlayerCommand,
    ) -> Result<R, PlayerError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(make(reply_tx))
            .map_err(|_| PlayerError::Stopped)?;
        reply_rx.await.map_err(|_| PlayerError::Stopped)
    }

    /// Append a resolved track; returns its 1-based position in the queue.
    pub async fn enqueue(&self, track: ResolvedTrack) -> Result<usize, PlayerError> {
        self.call(|reply| PlayerCommand::Enqueue { track, reply })
            .await
    }

    pub async fn pause(&self) -> Result<(), PlayerError> {
        self.call(|reply| PlayerCommand::Pause { reply }).await?
    }

    pub async fn resume(&self) -> Result<(), PlayerError> {
        self.call(|reply| PlayerCommand::Resume { reply }).await?
    }

    pub async fn skip(&self) -> Result<(), PlayerError> {
        self.call(|reply| PlayerCommand::Skip { reply }).await?
    }

    /// Set the volume, clamped to `0.0..=1.0`; applied to the sink
    /// immediately when a track is active.
    pub async fn set_volume(&self, volume: f32) -> Result<(), PlayerError> {
        self.call(|reply| PlayerCommand::SetVolume {
            volume: volume.clamp(0.0, 1.0),
            reply,
        })
        .await
    }

    /// Flip loop-current mode; returns the new value.
    pub async fn toggle_loop(&self) -> Result<bool, PlayerError> {
        self.call(|reply| PlayerCommand::ToggleLoop { reply }).await
    }

    /// Force the terminal transition regardless of queue state.
    pub async fn stop(&self) -> Result<(), PlayerError> {
        self.call(|reply| PlayerCommand::Stop { reply }).await
    }

    pub async fn snapshot(&self) -> Result<PlayerSnapshot, PlayerError> {
        self.call(|reply| PlayerCommand::Snapshot { reply }).await
    }
}

/// What the loop should do after handling a command.
enum Flow {
    Continue,
    SkipTrack,
    Stop,
}

struct PlayerTask {
    session: SessionId,
    rx: mpsc::UnboundedReceiver<PlayerCommand>,
    sink: Arc<dyn AudioSink>,
    registry: PlayerRegistry,
    stopped: Arc<AtomicBool>,

    queue: VecDeque<QueueEntry>,
    current: Option<QueueEntry>,
    state: PlayerState,
    volume: f32,
    loop_current: bool,

    started_at: Option<Instant>,
    paused_since: Option<Instant>,
    paused_accumulated: Duration,

    idle_timeout: Duration,
}

impl PlayerTask {
    async fn run(mut self) {
        'outer: loop {
            let next = if self.loop_current && self.current.is_some() {
                self.current.clone()
            } else {
                self.queue.pop_front()
            };

            let Some(entry) = next else {
                match self.idle_wait().await {
                    Flow::Continue => continue 'outer,
                    Flow::SkipTrack | Flow::Stop => break 'outer,
                }
            };

            if self.play_one(entry).await == PlayState::StopRequested {
                break 'outer;
            }
        }
        self.finish().await;
    }

    /// Block on {new-enqueue, idle-timeout}. Returns `Continue` when there
    /// is work again, `Stop` on timeout or an explicit stop.
    async fn idle_wait(&mut self) -> Flow {
        self.state = PlayerState::Idle;
        self.current = None;
        self.started_at = None;
        self.paused_since = None;
        self.paused_accumulated = Duration::ZERO;

        let deadline = Instant::now() + self.idle_timeout;
        loop {
            tokio::select! {
                _ = time::sleep_until(deadline) => {
                    info!(session = %self.session, "idle timeout, tearing down player");
                    return Flow::Stop;
                }
                cmd = self.rx.recv() => {
                    let Some(cmd) = cmd else {
                        // every handle dropped
                        return Flow::Stop;
                    };
                    match self.handle_command(cmd, None).await {
                        Flow::Stop => return Flow::Stop,
                        _ => {
                            if !self.queue.is_empty() {
                                return Flow::Continue;
                            }
                        }
                    }
                }
            }
        }
    }

    /// Drive one track through the sink until its terminal event, a skip,
    /// or a stop.
    async fn play_one(&mut self, entry: QueueEntry) -> PlayState {
        self.state = PlayerState::Resolving;
        self.current = Some(entry.clone());
        let track = entry.track;

        let mut handle = match self
            .sink
            .open(self.session, &track.stream_url, self.volume)
            .await
        {
            Ok(handle) => handle,
            Err(e) => {
                warn!(session = %self.session, title = %track.title, error = %e,
                      "sink refused track, advancing");
                // also cleared under loop_current: never retry a failing track
                self.current = None;
                return PlayState::Advance;
            }
        };

        self.state = PlayerState::Playing;
        self.started_at = Some(Instant::now());
        self.paused_since = None;
        self.paused_accumulated = Duration::ZERO;
        debug!(session = %self.session, title = %track.title, sink_handle = handle.id(),
               "playback started");

        loop {
            tokio::select! {
                outcome = &mut handle.done => {
                    match outcome {
                        Ok(SinkOutcome::Finished) | Err(_) => {
                            debug!(session = %self.session, title = %track.title, "track finished");
                            if !self.loop_current {
                                self.current = None;
                            }
                        }
                        Ok(SinkOutcome::Error(reason)) => {
                            warn!(session = %self.session, title = %track.title, %reason,
                                  "sink error, advancing to next track");
                            self.current = None;
                        }
                    }
                    return PlayState::Advance;
                }
                cmd = self.rx.recv() => {
                    let Some(cmd) = cmd else {
                        let _ = self.sink.stop(&handle).await;
                        return PlayState::StopRequested;
                    };
                    match self.handle_command(cmd, Some(&handle)).await {
                        Flow::Continue => {}
                        Flow::SkipTrack => {
                            let _ = self.sink.stop(&handle).await;
                            if !self.loop_current {
                                self.current = None;
                            }
                            return PlayState::Advance;
                        }
                        Flow::Stop => {
                            let _ = self.sink.stop(&handle).await;
                            return PlayState::StopRequested;
                        }
                    }
                }
            }
        }
    }

    async fn handle_command(&mut self, cmd: PlayerCommand, active: Option<&SinkHandle>) -> Flow {
        match cmd {
            PlayerCommand::Enqueue { track, reply } => {
                debug!(session = %self.session, title = %track.title, "track enqueued");
                self.queue.push_back(QueueEntry {
                    track,
                    enqueued_at: Utc::now(),
                });
                let _ = reply.send(self.queue.len());
                Flow::Continue
            }
            PlayerCommand::Pause { reply } => {
                let result = match (self.state, active) {
                    (PlayerState::Playing, Some(handle)) => {
                        if let Err(e) = self.sink.pause(handle).await {
                            warn!(session = %self.session, error = %e, "sink pause failed");
                        }
                        self.paused_since = Some(Instant::now());
                        self.state = PlayerState::Paused;
                        Ok(())
                    }
                    _ => Err(PlayerError::InvalidCommand(
                        "nothing is playing".to_string(),
                    )),
                };
                let _ = reply.send(result);
                Flow::Continue
            }
            PlayerCommand::Resume { reply } => {
                let result = match (self.state, active) {
                    (PlayerState::Paused, Some(handle)) => {
                        if let Err(e) = self.sink.resume(handle).await {
                            warn!(session = %self.session, error = %e, "sink resume failed");
                        }
                        if let Some(paused_since) = self.paused_since.take() {
                            self.paused_accumulated += paused_since.elapsed();
                        }
                        self.state = PlayerState::Playing;
                        Ok(())
                    }
                    _ => Err(PlayerError::InvalidCommand(
                        "nothing is paused".to_string(),
                    )),
                };
                let _ = reply.send(result);
                Flow::Continue
            }
            PlayerCommand::Skip { reply } => {
                if active.is_some() {
                    let _ = reply.send(Ok(()));
                    Flow::SkipTrack
                } else {
                    let _ = reply.send(Err(PlayerError::InvalidCommand(
                        "nothing to skip".to_string(),
                    )));
                    Flow::Continue
                }
            }
            PlayerCommand::SetVolume { volume, reply } => {
                self.volume = volume;
                if let Some(handle) = active {
                    if let Err(e) = self.sink.set_volume(handle, volume).await {
                        warn!(session = %self.session, error = %e, "sink volume change failed");
                    }
                }
                let _ = reply.send(());
                Flow::Continue
            }
            PlayerCommand::ToggleLoop { reply } => {
                self.loop_current = !self.loop_current;
                debug!(session = %self.session, loop_current = self.loop_current, "loop toggled");
                let _ = reply.send(self.loop_current);
                Flow::Continue
            }
            PlayerCommand::Stop { reply } => {
                let _ = reply.send(());
                Flow::Stop
            }
            PlayerCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
                Flow::Continue
            }
        }
    }

    fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            session: self.session,
            state: self.state,
            current: self.current.as_ref().map(TrackSummary::of),
            queue: self.queue.iter().map(TrackSummary::of).collect(),
            volume: self.volume,
            loop_current: self.loop_current,
            elapsed: self.elapsed(),
        }
    }

    /// `now - started_at - paused_accumulated`, with paused time frozen at
    /// the moment of pausing.
    fn elapsed(&self) -> Option<Duration> {
        let started_at = self.started_at?;
        self.current.as_ref()?;
        let gross = match self.paused_since {
            Some(paused_since) => paused_since.duration_since(started_at),
            None => started_at.elapsed(),
        };
        Some(gross.saturating_sub(self.paused_accumulated))
    }

    /// Terminal transition: flag the handle, drop the registry entry and
    /// release the transport.
    async fn finish(&mut self) {
        self.state = PlayerState::Stopped;
        self.current = None;
        self.queue.clear();
        self.stopped.store(true, Ordering::SeqCst);
        self.rx.close();
        if let Err(e) = self.sink.disconnect(self.session).await {
            warn!(session = %self.session, error = %e, "sink disconnect failed");
        }
        self.registry.remove_player(self.session, &self.stopped).await;
        info!(session = %self.session, "player stopped");
    }
}

#[derive(PartialEq, Eq)]
enum PlayState {
    /// Move on to the next loop iteration.
    Advance,
    /// A stop was requested; terminate the loop.
    StopRequested,
}
