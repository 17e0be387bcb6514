// Playback adapter probing the HLS manifest endpoint
//
// Actual media decoding lives in the viewer; from the controller's point of
// view a stream is "playing" while its manifest stays fetchable and live.
// Attach confirms the manifest parses, then a watcher re-fetches it on a
// fixed cadence and reports the end of the stream or unrecoverable failure.
use crate::application::playback::{
    FatalKind, PlaybackAdapter, PlaybackError, PlaybackEvent, PlaybackSession,
};
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;

const EVENT_BUFFER: usize = 16;
// Consecutive watcher failures tolerated before giving up on the session.
const MAX_STRIKES: u32 = 3;

#[derive(Debug, Clone)]
pub struct HlsPlayback {
    client: reqwest::Client,
    poll_interval: Duration,
    attach_retries: u32,
    retry_delay: Duration,
}

enum FetchOutcome {
    Manifest(String),
    Gone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ManifestState {
    Live,
    Ended,
    NotMedia,
}

fn classify_manifest(body: &str) -> ManifestState {
    if !body.trim_start().starts_with("#EXTM3U") {
        return ManifestState::NotMedia;
    }
    if body.contains("#EXT-X-ENDLIST") {
        return ManifestState::Ended;
    }
    ManifestState::Live
}

impl HlsPlayback {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            poll_interval,
            attach_retries: 2,
            retry_delay: Duration::from_secs(2),
        }
    }

    async fn fetch_manifest(&self, url: &str) -> Result<FetchOutcome, String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| err.to_string())?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::GONE {
            return Ok(FetchOutcome::Gone);
        }
        if !status.is_success() {
            return Err(format!("manifest fetch returned {status}"));
        }
        let body = response.text().await.map_err(|err| err.to_string())?;
        Ok(FetchOutcome::Manifest(body))
    }

    async fn watch_manifest(self, url: String, events: mpsc::Sender<PlaybackEvent>) {
        let mut strikes = 0u32;
        loop {
            tokio::time::sleep(self.poll_interval).await;
            match self.fetch_manifest(&url).await {
                Ok(FetchOutcome::Manifest(body)) => match classify_manifest(&body) {
                    ManifestState::Live => strikes = 0,
                    ManifestState::Ended => {
                        let _ = events.send(PlaybackEvent::Ended).await;
                        return;
                    }
                    ManifestState::NotMedia => {
                        // Recovered by re-fetching next tick, like a media
                        // error recovery in a client-side player.
                        strikes += 1;
                        tracing::warn!(url = %url, "manifest no longer parses as HLS");
                        let _ = events.send(PlaybackEvent::Fatal(FatalKind::Media)).await;
                        if strikes >= MAX_STRIKES {
                            let _ = events.send(PlaybackEvent::Fatal(FatalKind::Other)).await;
                            return;
                        }
                    }
                },
                Ok(FetchOutcome::Gone) => {
                    let _ = events.send(PlaybackEvent::Ended).await;
                    return;
                }
                Err(err) => {
                    strikes += 1;
                    tracing::warn!(url = %url, error = %err, strikes, "manifest re-fetch failed");
                    let _ = events.send(PlaybackEvent::Fatal(FatalKind::Network)).await;
                    if strikes >= MAX_STRIKES {
                        let _ = events.send(PlaybackEvent::Fatal(FatalKind::Other)).await;
                        return;
                    }
                }
            }
        }
    }
}

impl Default for HlsPlayback {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

#[async_trait]
impl PlaybackAdapter for HlsPlayback {
    async fn attach(&self, manifest_url: &str) -> Result<PlaybackSession, PlaybackError> {
        let mut attempt = 0u32;
        let body = loop {
            match self.fetch_manifest(manifest_url).await {
                Ok(FetchOutcome::Manifest(body)) => break body,
                Ok(FetchOutcome::Gone) => {
                    return Err(PlaybackError::Other("manifest not found".to_string()));
                }
                Err(err) if attempt < self.attach_retries => {
                    attempt += 1;
                    tracing::warn!(
                        url = manifest_url,
                        error = %err,
                        attempt,
                        "manifest fetch failed, retrying"
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(err) => return Err(PlaybackError::Network(err)),
            }
        };

        if classify_manifest(&body) == ManifestState::NotMedia {
            return Err(PlaybackError::Media("missing #EXTM3U header".to_string()));
        }

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let _ = tx.try_send(PlaybackEvent::ManifestReady);
        if classify_manifest(&body) == ManifestState::Ended {
            let _ = tx.try_send(PlaybackEvent::Ended);
            return Ok(PlaybackSession::new(rx));
        }

        let watcher = tokio::spawn(self.clone().watch_manifest(manifest_url.to_string(), tx));
        Ok(PlaybackSession::with_watcher(rx, watcher))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_manifest() {
        assert_eq!(
            classify_manifest("#EXTM3U\n#EXT-X-VERSION:3\nseg0.ts\n"),
            ManifestState::Live
        );
        assert_eq!(
            classify_manifest("\n#EXTM3U\nseg0.ts\n#EXT-X-ENDLIST\n"),
            ManifestState::Ended
        );
        assert_eq!(classify_manifest("<html>404</html>"), ManifestState::NotMedia);
        assert_eq!(classify_manifest(""), ManifestState::NotMedia);
    }
}
