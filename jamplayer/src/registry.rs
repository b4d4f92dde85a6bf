//! Session → player registry.

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use jamsource::SessionId;
use tokio::sync::broadcast;
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::EngineConfig;
use crate::player::Player;
use crate::progress::{self, ProgressReport};
use crate::sink::AudioSink;

struct RegistryInner {
    players: RwLock<HashMap<SessionId, Player>>,
    sink: Arc<dyn AudioSink>,
    idle_timeout: Duration,
    default_volume: f32,
    progress_interval: Duration,
    progress_tx: broadcast::Sender<ProgressReport>,
}

/// Owns every live [`Player`] and their lifecycles.
///
/// An explicit object injected into the command layer; registry access is
/// safe under concurrent dispatch, while same-session commands serialize
/// through the player's own command channel.
#[derive(Clone)]
pub struct PlayerRegistry {
    inner: Arc<RegistryInner>,
}

impl PlayerRegistry {
    pub fn new(sink: Arc<dyn AudioSink>, config: &EngineConfig) -> Self {
        let (progress_tx, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(RegistryInner {
                players: RwLock::new(HashMap::new()),
                sink,
                idle_timeout: config.idle_timeout,
                default_volume: config.default_volume.clamp(0.0, 1.0),
                progress_interval: config.progress_interval,
                progress_tx,
            }),
        }
    }

    /// Return the session's player, creating it (and starting its loop and
    /// progress ticker) on first use. A player whose loop has already
    /// terminated is replaced by a fresh instance.
    pub async fn get_or_create(&self, session: SessionId) -> Player {
        let mut players = self.inner.players.write().await;
        if let Some(player) = players.get(&session) {
            if !player.is_stopped() {
                return player.clone();
            }
            debug!(%session, "replacing stopped player");
        }

        let player = Player::spawn(
            session,
            Arc::clone(&self.inner.sink),
            self.clone(),
            self.inner.idle_timeout,
            self.inner.default_volume,
        );
        progress::spawn_reporter(
            player.clone(),
            self.inner.progress_interval,
            self.inner.progress_tx.clone(),
        );
        players.insert(session, player.clone());
        player
    }

    /// Live player for the session, if any.
    pub async fn get(&self, session: SessionId) -> Option<Player> {
        let players = self.inner.players.read().await;
        players.get(&session).filter(|p| !p.is_stopped()).cloned()
    }

    /// Drop the session's entry, called by the player loop on its terminal
    /// transition. The removal is conditioned on `flag` still identifying
    /// the stored player: a stopped player may already have been replaced
    /// by a fresh one while its teardown awaited the sink, and teardown
    /// must never remove its successor.
    pub(crate) async fn remove_player(&self, session: SessionId, flag: &Arc<AtomicBool>) {
        let mut players = self.inner.players.write().await;
        if players.get(&session).is_some_and(|p| p.shares_loop(flag)) {
            players.remove(&session);
            debug!(%session, "player removed from registry");
        }
    }

    /// Sessions with a live player.
    pub async fn sessions(&self) -> Vec<SessionId> {
        let players = self.inner.players.read().await;
        players
            .iter()
            .filter(|(_, p)| !p.is_stopped())
            .map(|(session, _)| *session)
            .collect()
    }

    /// Subscribe to the progress reports of every player in this registry.
    pub fn subscribe_progress(&self) -> broadcast::Receiver<ProgressReport> {
        self.inner.progress_tx.subscribe()
    }
}
