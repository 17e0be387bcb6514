// HTTP client for the remote stream service
use crate::application::stream_api::StreamApi;
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct HttpStreamClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct StartResponse {
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    stream_active: bool,
}

/// The remote reports "started" on a cold start, "starting" while the ingest
/// is still warming up, and "already_running" for a duplicate request. All
/// three mean the stream is (or will be) live.
fn start_accepted(status: Option<&str>) -> bool {
    matches!(status, Some("started" | "starting" | "already_running"))
}

impl HttpStreamClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, action: &str, channel: &str) -> String {
        format!(
            "{}/stream/{}/{}?api_key={}",
            self.base_url,
            action,
            channel,
            urlencoding::encode(&self.api_key)
        )
    }
}

#[async_trait]
impl StreamApi for HttpStreamClient {
    async fn start(&self, channel: &str) -> bool {
        let url = self.endpoint("start", channel);
        let response = match self.client.post(&url).send().await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(channel, error = %err, "stream start request failed");
                return false;
            }
        };
        match response.json::<StartResponse>().await {
            Ok(body) => {
                tracing::info!(channel, status = ?body.status, "stream start response");
                start_accepted(body.status.as_deref())
            }
            Err(err) => {
                tracing::warn!(channel, error = %err, "stream start response unreadable");
                false
            }
        }
    }

    async fn status(&self, channel: &str) -> bool {
        let url = self.endpoint("status", channel);
        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(channel, error = %err, "stream status request failed");
                return false;
            }
        };
        match response.json::<StatusResponse>().await {
            Ok(body) => body.stream_active,
            Err(err) => {
                tracing::warn!(channel, error = %err, "stream status response unreadable");
                false
            }
        }
    }

    async fn stop(&self, channel: &str) -> bool {
        let url = self.endpoint("stop", channel);
        match self.client.post(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(err) => {
                tracing::warn!(channel, error = %err, "stream stop request failed");
                false
            }
        }
    }
}
