// Playback adapter trait and event taxonomy
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Class of a fatal playback error.
///
/// Network and media failures are recovered inside the adapter; the
/// controller only tears down on `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatalKind {
    Network,
    Media,
    Other,
}

/// Closed set of events a playback session can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    ManifestReady,
    Ended,
    Fatal(FatalKind),
}

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("manifest request failed: {0}")]
    Network(String),
    #[error("manifest is not playable media: {0}")]
    Media(String),
    #[error("playback failed: {0}")]
    Other(String),
}

/// Handle to one attached playback session.
///
/// Detaching is idempotent and also happens on drop, so an aborted consumer
/// task can never leak the adapter's watcher.
pub struct PlaybackSession {
    events: mpsc::Receiver<PlaybackEvent>,
    watcher: Option<JoinHandle<()>>,
}

impl PlaybackSession {
    pub fn new(events: mpsc::Receiver<PlaybackEvent>) -> Self {
        Self {
            events,
            watcher: None,
        }
    }

    pub fn with_watcher(events: mpsc::Receiver<PlaybackEvent>, watcher: JoinHandle<()>) -> Self {
        Self {
            events,
            watcher: Some(watcher),
        }
    }

    /// Next playback event, or `None` once the session is detached and
    /// drained.
    pub async fn next_event(&mut self) -> Option<PlaybackEvent> {
        self.events.recv().await
    }

    /// Stop the adapter's watcher and close the event channel. Safe to call
    /// repeatedly or when nothing is attached.
    pub fn detach(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
        self.events.close();
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.detach();
    }
}

#[async_trait]
pub trait PlaybackAdapter: Send + Sync {
    /// Attach playback to a manifest URL. Resolves once playback is
    /// confirmed (manifest fetched and parsed) or has definitively failed.
    async fn attach(&self, manifest_url: &str) -> Result<PlaybackSession, PlaybackError>;
}
