// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use axum::{
    Router,
    routing::{get, post},
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::channel_controller::ChannelController;
use crate::application::playback::PlaybackAdapter;
use crate::application::sensor_service::SensorService;
use crate::application::stream_api::StreamApi;
use crate::infrastructure::config::load_dashboard_config;
use crate::infrastructure::hls_playback::HlsPlayback;
use crate::infrastructure::sensor_client::HttpSensorClient;
use crate::infrastructure::stream_client::HttpStreamClient;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    channel_events, channel_status, health_check, list_channels, play_channel, sensor_cards,
    sensor_chart, sensor_events, stop_channel,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,canopy_dashboard=debug"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Load configuration
    let config = load_dashboard_config()?;
    let timings = config.timings.stream_timings();

    // Create remote clients (infrastructure layer)
    let stream_api: Arc<dyn StreamApi> = Arc::new(HttpStreamClient::new(
        &config.stream_api.base_url,
        &config.stream_api.api_key,
    ));
    let playback: Arc<dyn PlaybackAdapter> =
        Arc::new(HlsPlayback::new(timings.status_check_interval));
    let sensor_api = Arc::new(HttpSensorClient::new(&config.sensor_api.base_url));

    // Create per-channel controllers and the sensor poller (application layer)
    let channels: Vec<ChannelController> = config
        .cameras
        .iter()
        .map(|camera| {
            ChannelController::new(
                camera.channel_config(),
                timings,
                Arc::clone(&stream_api),
                Arc::clone(&playback),
            )
        })
        .collect();
    for controller in &channels {
        controller.probe_remote();
    }

    let sensor = SensorService::new(sensor_api, config.timings.sensor_update_interval());
    let _sensor_poller = sensor.spawn_poller();

    // Create application state
    let state = Arc::new(AppState { channels, sensor });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/channels", get(list_channels))
        .route("/channels/:id/status", get(channel_status))
        .route("/channels/:id/play", post(play_channel))
        .route("/channels/:id/stop", post(stop_channel))
        .route("/channels/:id/events", get(channel_events))
        .route("/sensor/cards", get(sensor_cards))
        .route("/sensor/chart", get(sensor_chart))
        .route("/sensor/events", get(sensor_events))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config.server.listen_addr.parse()?;
    tracing::info!(%addr, cameras = config.cameras.len(), "starting canopy-dashboard");

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
