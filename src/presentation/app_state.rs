// Application state for HTTP handlers
use crate::application::channel_controller::ChannelController;
use crate::application::sensor_service::SensorService;

pub struct AppState {
    pub channels: Vec<ChannelController>,
    pub sensor: SensorService,
}

impl AppState {
    pub fn channel(&self, id: &str) -> Option<&ChannelController> {
        self.channels.iter().find(|c| c.id() == id)
    }
}
