// Client trait for the remote sensor service
use crate::domain::sensor::SensorReading;
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Failure modes the cards distinguish: a reachable service with nothing to
/// report reads differently from a dead connection.
#[derive(Debug, Error)]
pub enum SensorApiError {
    #[error("sensor service returned no data")]
    NoData,
    #[error("sensor service unreachable: {0}")]
    Unreachable(String),
}

impl SensorApiError {
    pub fn card_message(&self) -> &'static str {
        match self {
            SensorApiError::NoData => "No data available",
            SensorApiError::Unreachable(_) => "Connection error",
        }
    }
}

#[async_trait]
pub trait SensorApi: Send + Sync {
    /// Fetch the latest single reading.
    async fn latest(&self) -> Result<SensorReading, SensorApiError>;

    /// Fetch a history window for the chart. `None` means the full history.
    /// Entries are returned raw; normalization and range filtering happen in
    /// the chart builder.
    async fn history(&self, limit: Option<usize>) -> Result<Vec<Value>, SensorApiError>;
}
