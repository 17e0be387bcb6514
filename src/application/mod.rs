// Application layer - Use cases and trait seams
pub mod channel_controller;
pub mod playback;
pub mod sensor_api;
pub mod sensor_service;
pub mod stream_api;
