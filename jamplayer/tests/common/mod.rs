//! Shared test doubles: a scriptable audio sink and canned resolvers.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use jamplayer::{AudioSink, SinkError, SinkHandle, SinkOutcome};
use jamsource::{
    CatalogPage, CatalogResolver, CatalogTrack, ResolveError, ResolvedStream, SessionId,
    StreamResolver,
};
use tokio::sync::{oneshot, Semaphore};
use tokio::time;

#[derive(Default)]
struct StubState {
    opened: Vec<String>,
    live: HashMap<u64, oneshot::Sender<SinkOutcome>>,
    last_handle: Option<u64>,
    volumes: Vec<f32>,
    pause_calls: usize,
    resume_calls: usize,
    disconnected: Vec<SessionId>,
}

/// Sink double. `instant()` completes every track as soon as it is opened;
/// `manual()` holds the terminal event until the test fires it.
pub struct StubSink {
    instant_finish: bool,
    next_id: AtomicU64,
    disconnect_gate: Option<Semaphore>,
    state: Mutex<StubState>,
}

impl StubSink {
    fn build(instant_finish: bool, disconnect_gate: Option<Semaphore>) -> Arc<Self> {
        Arc::new(Self {
            instant_finish,
            next_id: AtomicU64::new(1),
            disconnect_gate,
            state: Mutex::new(StubState::default()),
        })
    }

    pub fn instant() -> Arc<Self> {
        Self::build(true, None)
    }

    pub fn manual() -> Arc<Self> {
        Self::build(false, None)
    }

    /// Manual sink whose `disconnect` parks until [`Self::release_disconnect`]
    /// is called, one permit per call.
    pub fn manual_with_held_disconnect() -> Arc<Self> {
        Self::build(false, Some(Semaphore::new(0)))
    }

    pub fn release_disconnect(&self) {
        if let Some(gate) = &self.disconnect_gate {
            gate.add_permits(1);
        }
    }

    /// Emit `Finished` for the most recently opened handle.
    pub fn finish_current(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        let Some(id) = state.last_handle else {
            return false;
        };
        match state.live.remove(&id) {
            Some(tx) => tx.send(SinkOutcome::Finished).is_ok(),
            None => false,
        }
    }

    /// Emit `Error(reason)` for the most recently opened handle.
    pub fn fail_current(&self, reason: &str) -> bool {
        let mut state = self.state.lock().unwrap();
        let Some(id) = state.last_handle else {
            return false;
        };
        match state.live.remove(&id) {
            Some(tx) => tx.send(SinkOutcome::Error(reason.to_string())).is_ok(),
            None => false,
        }
    }

    pub fn opened(&self) -> Vec<String> {
        self.state.lock().unwrap().opened.clone()
    }

    pub fn volumes(&self) -> Vec<f32> {
        self.state.lock().unwrap().volumes.clone()
    }

    pub fn pause_calls(&self) -> usize {
        self.state.lock().unwrap().pause_calls
    }

    pub fn resume_calls(&self) -> usize {
        self.state.lock().unwrap().resume_calls
    }

    pub fn disconnected(&self) -> Vec<SessionId> {
        self.state.lock().unwrap().disconnected.clone()
    }
}

#[async_trait]
impl AudioSink for StubSink {
    async fn open(
        &self,
        _session: SessionId,
        stream_url: &str,
        volume: f32,
    ) -> Result<SinkHandle, SinkError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (done_tx, done_rx) = oneshot::channel();
        let mut state = self.state.lock().unwrap();
        state.opened.push(stream_url.to_string());
        state.volumes.push(volume);
        state.last_handle = Some(id);
        if self.instant_finish {
            let _ = done_tx.send(SinkOutcome::Finished);
        } else {
            state.live.insert(id, done_tx);
        }
        Ok(SinkHandle::new(id, done_rx))
    }

    async fn pause(&self, _handle: &SinkHandle) -> Result<(), SinkError> {
        self.state.lock().unwrap().pause_calls += 1;
        Ok(())
    }

    async fn resume(&self, _handle: &SinkHandle) -> Result<(), SinkError> {
        self.state.lock().unwrap().resume_calls += 1;
        Ok(())
    }

    async fn stop(&self, handle: &SinkHandle) -> Result<(), SinkError> {
        let mut state = self.state.lock().unwrap();
        if let Some(tx) = state.live.remove(&handle.id()) {
            // the player may already have moved on; that is fine
            let _ = tx.send(SinkOutcome::Finished);
        }
        Ok(())
    }

    async fn set_volume(&self, _handle: &SinkHandle, volume: f32) -> Result<(), SinkError> {
        self.state.lock().unwrap().volumes.push(volume);
        Ok(())
    }

    async fn disconnect(&self, session: SessionId) -> Result<(), SinkError> {
        if let Some(gate) = &self.disconnect_gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|_| SinkError("disconnect gate closed".into()))?;
            permit.forget();
        }
        self.state.lock().unwrap().disconnected.push(session);
        Ok(())
    }
}

/// Stream resolver double: fabricates a deterministic stream per query.
#[derive(Default)]
pub struct CannedSearch;

#[async_trait]
impl StreamResolver for CannedSearch {
    async fn search(&self, query: &str) -> Result<ResolvedStream, ResolveError> {
        Ok(ResolvedStream {
            title: query.to_string(),
            canonical_url: format!("https://media.example/watch/{query}"),
            stream_url: format!("stream://{query}"),
            duration_secs: 100,
            thumbnail_url: None,
        })
    }
}

/// Catalog resolver double serving a fixed album.
pub struct CannedCatalog {
    pub album_tracks: Vec<CatalogTrack>,
}

pub fn catalog_track(title: &str) -> CatalogTrack {
    CatalogTrack {
        title: title.to_string(),
        artist: "Artist".into(),
        album: Some("Album".into()),
        album_art_url: None,
        duration_secs: 120,
        search_query: format!("{title} Artist audio"),
    }
}

#[async_trait]
impl CatalogResolver for CannedCatalog {
    fn source_name(&self) -> &str {
        "spotify"
    }

    async fn resolve_track(&self, _url: &str) -> Result<CatalogTrack, ResolveError> {
        Ok(catalog_track("Single"))
    }

    async fn album_page(
        &self,
        _url: &str,
        offset: usize,
        _limit: usize,
    ) -> Result<CatalogPage, ResolveError> {
        Ok(CatalogPage {
            title: "Album".into(),
            owner: None,
            tracks: self.album_tracks.clone(),
            total: self.album_tracks.len(),
            offset,
        })
    }

    async fn playlist_page(
        &self,
        url: &str,
        offset: usize,
        limit: usize,
    ) -> Result<CatalogPage, ResolveError> {
        self.album_page(url, offset, limit).await
    }
}

/// A resolved track ready to hand to a player directly.
pub fn make_track(title: &str) -> jamsource::ResolvedTrack {
    jamsource::ResolvedTrack {
        title: title.to_string(),
        canonical_url: format!("https://media.example/watch/{title}"),
        stream_url: format!("stream://{title}"),
        duration_secs: 100,
        thumbnail_url: None,
        requester: jamsource::RequesterId(1),
        catalog: None,
    }
}

/// Poll until `cond` holds, advancing (virtual) time in small steps.
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..2000 {
        if cond() {
            return;
        }
        time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}
