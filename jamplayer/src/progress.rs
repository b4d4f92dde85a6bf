//! Timer-driven now-playing progress reports.

use std::time::Duration;

use jamsource::SessionId;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::trace;

use crate::player::{Player, PlayerState};

/// Periodic snapshot of the active track, for "now playing" displays.
///
/// Push-based on a timer, not on playback events: subscribers receive one
/// report per interval while a track is playing or paused, and nothing once
/// the player is gone.
#[derive(Debug, Clone)]
pub struct ProgressReport {
    pub session: SessionId,
    pub state: PlayerState,
    pub title: String,
    /// Play time excluding paused intervals.
    pub elapsed: Duration,
    /// Track duration in seconds, `0` when unknown.
    pub duration_secs: u64,
    /// `elapsed / duration`, clamped to `1.0`. `None` when the duration is
    /// unknown (never a division by zero).
    pub fraction: Option<f32>,
}

/// Start the ticker for one player. The task ends on its own as soon as the
/// player's command channel closes, so it never outlives the loop it
/// observes.
pub(crate) fn spawn_reporter(
    player: Player,
    interval: Duration,
    tx: broadcast::Sender<ProgressReport>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // the first tick fires immediately; skip it
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let Ok(snapshot) = player.snapshot().await else {
                trace!(session = %player.session(), "player gone, progress ticker ending");
                break;
            };
            if !matches!(snapshot.state, PlayerState::Playing | PlayerState::Paused) {
                continue;
            }
            let Some(current) = snapshot.current else {
                continue;
            };
            let elapsed = snapshot.elapsed.unwrap_or_default();
            let fraction = if current.duration_secs == 0 {
                None
            } else {
                Some((elapsed.as_secs_f32() / current.duration_secs as f32).min(1.0))
            };
            // no subscribers is fine
            let _ = tx.send(ProgressReport {
                session: player.session(),
                state: snapshot.state,
                title: current.title,
                elapsed,
                duration_secs: current.duration_secs,
                fraction,
            });
        }
    })
}
