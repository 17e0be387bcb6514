// Configuration loading
use crate::domain::channel::ChannelConfig;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub stream_api: StreamApiConfig,
    pub sensor_api: SensorApiConfig,
    #[serde(default)]
    pub cameras: Vec<CameraConfig>,
    #[serde(default)]
    pub timings: TimingsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct StreamApiConfig {
    pub base_url: String,
    pub api_key: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SensorApiConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CameraConfig {
    pub id: String,
    pub name: String,
    pub manifest_url: String,
}

impl CameraConfig {
    pub fn channel_config(&self) -> ChannelConfig {
        ChannelConfig::new(self.id.clone(), self.name.clone(), self.manifest_url.clone())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TimingsConfig {
    #[serde(default = "default_stream_duration_secs")]
    pub stream_duration_secs: u64,
    #[serde(default = "default_startup_delay_secs")]
    pub startup_delay_secs: u64,
    #[serde(default = "default_status_check_interval_secs")]
    pub status_check_interval_secs: u64,
    #[serde(default = "default_sensor_update_interval_secs")]
    pub sensor_update_interval_secs: u64,
    #[serde(default = "default_end_grace_secs")]
    pub end_grace_secs: u64,
}

fn default_stream_duration_secs() -> u64 {
    300
}

fn default_startup_delay_secs() -> u64 {
    15
}

fn default_status_check_interval_secs() -> u64 {
    10
}

fn default_sensor_update_interval_secs() -> u64 {
    10
}

fn default_end_grace_secs() -> u64 {
    5
}

impl Default for TimingsConfig {
    fn default() -> Self {
        Self {
            stream_duration_secs: default_stream_duration_secs(),
            startup_delay_secs: default_startup_delay_secs(),
            status_check_interval_secs: default_status_check_interval_secs(),
            sensor_update_interval_secs: default_sensor_update_interval_secs(),
            end_grace_secs: default_end_grace_secs(),
        }
    }
}

impl TimingsConfig {
    pub fn stream_timings(&self) -> StreamTimings {
        StreamTimings {
            stream_duration: Duration::from_secs(self.stream_duration_secs),
            startup_delay: Duration::from_secs(self.startup_delay_secs),
            status_check_interval: Duration::from_secs(self.status_check_interval_secs),
            end_grace: Duration::from_secs(self.end_grace_secs),
        }
    }

    pub fn sensor_update_interval(&self) -> Duration {
        Duration::from_secs(self.sensor_update_interval_secs)
    }
}

/// Durations driving one channel's lifecycle.
#[derive(Debug, Clone, Copy)]
pub struct StreamTimings {
    pub stream_duration: Duration,
    pub startup_delay: Duration,
    pub status_check_interval: Duration,
    pub end_grace: Duration,
}

impl Default for StreamTimings {
    fn default() -> Self {
        TimingsConfig::default().stream_timings()
    }
}

pub fn load_dashboard_config() -> anyhow::Result<DashboardConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/dashboard"))
        .add_source(config::Environment::with_prefix("DASHBOARD").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timings_defaults() {
        let timings: TimingsConfig = toml::from_str("").unwrap();
        let stream = timings.stream_timings();
        assert_eq!(stream.stream_duration, Duration::from_secs(300));
        assert_eq!(stream.startup_delay, Duration::from_secs(15));
        assert_eq!(stream.status_check_interval, Duration::from_secs(10));
        assert_eq!(timings.sensor_update_interval(), Duration::from_secs(10));
    }

    #[test]
    fn test_full_config_parses() {
        let raw = r#"
            [server]
            listen_addr = "127.0.0.1:9000"

            [stream_api]
            base_url = "https://stream-api.example.org"
            api_key = "secret"

            [sensor_api]
            base_url = "https://stream-api.example.org"

            [[cameras]]
            id = "cam1"
            name = "Camera 1"
            manifest_url = "https://video.example.org/cam1/manifest/video.m3u8"

            [timings]
            stream_duration_secs = 120
        "#;
        let config: DashboardConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.server.listen_addr, "127.0.0.1:9000");
        assert_eq!(config.cameras.len(), 1);
        assert_eq!(config.cameras[0].channel_config().id, "cam1");
        assert_eq!(
            config.timings.stream_timings().stream_duration,
            Duration::from_secs(120)
        );
        // Unset fields keep their defaults.
        assert_eq!(config.timings.startup_delay_secs, 15);
    }
}
