// Client trait for the remote stream service
use async_trait::async_trait;

/// Remote stream service operations.
///
/// Every method fails soft: network and parse errors are logged by the
/// implementation and surfaced as `false`, never as an error the lifecycle
/// controller has to unwind.
#[async_trait]
pub trait StreamApi: Send + Sync {
    /// Ask the remote service to begin pushing the channel's stream.
    /// `true` iff the remote reports "started", "starting" or
    /// "already_running".
    async fn start(&self, channel: &str) -> bool;

    /// Whether the remote reports the channel actively streaming. A missing
    /// field or any request failure degrades to `false`.
    async fn status(&self, channel: &str) -> bool;

    /// Best-effort stop. Remote streams self-idle, so the lifecycle never
    /// depends on this succeeding.
    async fn stop(&self, channel: &str) -> bool;
}
