// Camera channel domain models
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct ChannelConfig {
    pub id: String,
    pub name: String,
    pub manifest_url: String,
}

impl ChannelConfig {
    pub fn new(id: String, name: String, manifest_url: String) -> Self {
        Self {
            id,
            name,
            manifest_url,
        }
    }
}

/// Lifecycle phase of one camera channel.
///
/// `Ended` and `Error` are retryable: the next play action starts a fresh
/// stream. `Starting` rejects further play actions until it resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelPhase {
    Ready,
    Starting,
    Streaming,
    Ended,
    Error,
}

impl ChannelPhase {
    pub fn accepts_start(&self) -> bool {
        matches!(
            self,
            ChannelPhase::Ready | ChannelPhase::Ended | ChannelPhase::Error
        )
    }

    pub fn default_detail(&self) -> &'static str {
        match self {
            ChannelPhase::Ready => "Ready to stream",
            ChannelPhase::Starting => "Starting…",
            ChannelPhase::Streaming => "Streaming",
            ChannelPhase::Ended => "Stream ended",
            ChannelPhase::Error => "Error",
        }
    }
}

/// Serializable snapshot of a channel, published on every transition.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelStatus {
    pub id: String,
    pub name: String,
    pub phase: ChannelPhase,
    pub detail: String,
    pub is_streaming: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub epoch: u64,
}

impl ChannelStatus {
    pub fn initial(config: &ChannelConfig) -> Self {
        Self {
            id: config.id.clone(),
            name: config.name.clone(),
            phase: ChannelPhase::Ready,
            detail: ChannelPhase::Ready.default_detail().to_string(),
            is_streaming: false,
            started_at: None,
            epoch: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_phases_accept_start() {
        assert!(ChannelPhase::Ready.accepts_start());
        assert!(ChannelPhase::Ended.accepts_start());
        assert!(ChannelPhase::Error.accepts_start());
        assert!(!ChannelPhase::Starting.accepts_start());
        assert!(!ChannelPhase::Streaming.accepts_start());
    }

    #[test]
    fn test_initial_status() {
        let config = ChannelConfig::new(
            "cam1".to_string(),
            "Camera 1".to_string(),
            "https://example.com/manifest/video.m3u8".to_string(),
        );
        let status = ChannelStatus::initial(&config);
        assert_eq!(status.phase, ChannelPhase::Ready);
        assert_eq!(status.detail, "Ready to stream");
        assert!(!status.is_streaming);
        assert!(status.started_at.is_none());
    }
}
