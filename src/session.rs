//! Per-session synthesis state.
//!
//! [`SynthesisSession`] tracks one synthesis request at a time
//! (`Idle → Loading → Success | Error`) and owns the playback handle derived
//! from the produced audio. Handles are revoked exactly once: when a new
//! request is submitted, on [`SynthesisSession::reset`], or when the session
//! is dropped.
//!
//! Superseded requests are not cancelled. Each submission returns a
//! [`Ticket`]; only the ticket of the latest submission may resolve the
//! session, older results are discarded.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::{SynthesisEngine, SynthesisResult, DEFAULT_DOWNLOAD_NAME};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SynthesisStatus {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

/// Identifies one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// Transient reference to audio held by a [`PlaybackStore`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlaybackHandle(String);

impl PlaybackHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlaybackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Issues and revokes playback handles.
///
/// `revoke` takes the handle by value so a handle cannot be revoked twice.
pub trait PlaybackStore {
    fn create(&mut self, audio: &[u8]) -> PlaybackHandle;

    fn revoke(&mut self, handle: PlaybackHandle);
}

/// In-memory store handing out `blob:` style URLs.
#[derive(Debug, Default)]
pub struct MemoryPlaybackStore {
    next_id: u64,
    entries: HashMap<PlaybackHandle, Arc<[u8]>>,
}

impl MemoryPlaybackStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Audio behind a live handle.
    pub fn get(&self, handle: &PlaybackHandle) -> Option<Arc<[u8]>> {
        self.entries.get(handle).cloned()
    }

    /// Number of handles not yet revoked.
    pub fn live_handles(&self) -> usize {
        self.entries.len()
    }
}

impl PlaybackStore for MemoryPlaybackStore {
    fn create(&mut self, audio: &[u8]) -> PlaybackHandle {
        self.next_id += 1;
        let handle = PlaybackHandle(format!("blob:azure-tts/{}", self.next_id));
        self.entries.insert(handle.clone(), Arc::from(audio));
        handle
    }

    fn revoke(&mut self, handle: PlaybackHandle) {
        if self.entries.remove(&handle).is_none() {
            log::warn!("Revoking unknown playback handle {handle}");
        }
    }
}

/// State machine for a single user's synthesis requests.
pub struct SynthesisSession<S: PlaybackStore = MemoryPlaybackStore> {
    store: S,
    status: SynthesisStatus,
    generation: u64,
    audio: Option<Vec<u8>>,
    handle: Option<PlaybackHandle>,
    duration_ms: f64,
    error: Option<String>,
}

impl Default for SynthesisSession {
    fn default() -> Self {
        Self::new()
    }
}

impl SynthesisSession {
    pub fn new() -> Self {
        Self::with_store(MemoryPlaybackStore::new())
    }
}

impl<S: PlaybackStore> SynthesisSession<S> {
    pub fn with_store(store: S) -> Self {
        Self {
            store,
            status: SynthesisStatus::Idle,
            generation: 0,
            audio: None,
            handle: None,
            duration_ms: 0.0,
            error: None,
        }
    }

    pub fn status(&self) -> SynthesisStatus {
        self.status
    }

    pub fn is_loading(&self) -> bool {
        self.status == SynthesisStatus::Loading
    }

    pub fn audio(&self) -> Option<&[u8]> {
        self.audio.as_deref()
    }

    pub fn playback_handle(&self) -> Option<&PlaybackHandle> {
        self.handle.as_ref()
    }

    pub fn duration_ms(&self) -> f64 {
        self.duration_ms
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Enter `Loading` for a request whose synthesis the caller drives
    /// itself, then hand the outcome to [`resolve`](Self::resolve). Any
    /// result of an earlier submission that arrives later is ignored.
    ///
    /// Use [`run`](Self::run) to submit a request and synthesize it in one
    /// step.
    pub fn submit(&mut self) -> Ticket {
        self.release_handle();
        self.generation += 1;
        self.status = SynthesisStatus::Loading;
        self.error = None;
        self.audio = None;
        self.duration_ms = 0.0;
        Ticket(self.generation)
    }

    /// Apply the outcome of a submission.
    ///
    /// Returns `false` (and changes nothing) when `ticket` is not the latest
    /// submission or the session is no longer loading.
    pub fn resolve<D: fmt::Display>(
        &mut self,
        ticket: Ticket,
        outcome: Result<SynthesisResult, D>,
    ) -> bool {
        if ticket.0 != self.generation || self.status != SynthesisStatus::Loading {
            log::debug!(
                "Discarding result of superseded request {} (current {})",
                ticket.0,
                self.generation
            );
            return false;
        }

        match outcome {
            Ok(result) => {
                self.handle = Some(self.store.create(&result.audio));
                self.audio = Some(result.audio);
                self.duration_ms = result.duration_ms;
                self.status = SynthesisStatus::Success;
            }
            Err(e) => {
                let message = e.to_string();
                log::warn!("Synthesis failed: {message}");
                self.error = Some(message);
                self.status = SynthesisStatus::Error;
            }
        }
        true
    }

    /// Submit `request`: release any previous audio, synthesize it with
    /// `engine` and apply the outcome. Returns the resulting status.
    pub async fn run<E: SynthesisEngine>(
        &mut self,
        engine: &E,
        request: &E::Request,
    ) -> SynthesisStatus {
        let ticket = self.submit();
        let outcome = engine.synthesize(request).await;
        self.resolve(ticket, outcome);
        self.status
    }

    /// Return to `Idle`, releasing audio and the playback handle.
    pub fn reset(&mut self) {
        self.release_handle();
        self.status = SynthesisStatus::Idle;
        self.audio = None;
        self.duration_ms = 0.0;
        self.error = None;
    }

    /// Save the held audio. Uses `speech.mp3` when no path is given.
    ///
    /// Returns `Ok(false)` when there is no audio to save.
    pub fn download(&self, path: Option<&Path>) -> std::io::Result<bool> {
        let Some(audio) = self.audio.as_ref() else {
            return Ok(false);
        };
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_DOWNLOAD_NAME));
        std::fs::write(path, audio)?;
        log::info!("Saved {} bytes to {}", audio.len(), path.display());
        Ok(true)
    }

    fn release_handle(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.store.revoke(handle);
        }
    }
}

impl<S: PlaybackStore> Drop for SynthesisSession<S> {
    fn drop(&mut self) {
        self.release_handle();
    }
}
