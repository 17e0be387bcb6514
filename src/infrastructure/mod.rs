// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod hls_playback;
pub mod sensor_client;
pub mod stream_client;
