// Sensor polling service - cards snapshot plus on-demand chart windows
use crate::application::sensor_api::{SensorApi, SensorApiError};
use crate::domain::sensor::{build_series, ChartSeries, HistoryWindow, SensorCards};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Clone)]
pub struct SensorService {
    api: Arc<dyn SensorApi>,
    update_interval: Duration,
    cards_tx: Arc<watch::Sender<SensorCards>>,
}

impl SensorService {
    pub fn new(api: Arc<dyn SensorApi>, update_interval: Duration) -> Self {
        let (cards_tx, _) = watch::channel(SensorCards::waiting());
        Self {
            api,
            update_interval,
            cards_tx: Arc::new(cards_tx),
        }
    }

    pub fn cards(&self) -> SensorCards {
        self.cards_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SensorCards> {
        self.cards_tx.subscribe()
    }

    /// Refresh once immediately, then on the configured cadence.
    pub fn spawn_poller(&self) -> JoinHandle<()> {
        let service = self.clone();
        tokio::spawn(async move {
            loop {
                service.refresh_cards().await;
                tokio::time::sleep(service.update_interval).await;
            }
        })
    }

    /// Fetch the latest reading and publish a new cards snapshot. Failures
    /// become an inline error card, never a panic or a stale success.
    pub async fn refresh_cards(&self) {
        let cards = match self.api.latest().await {
            Ok(reading) => SensorCards::from_reading(&reading),
            Err(err) => {
                tracing::warn!(error = %err, "sensor data fetch failed");
                SensorCards::unavailable(err.card_message())
            }
        };
        self.cards_tx.send_replace(cards);
    }

    /// Fetch the selected history window and build a fresh chart series.
    /// Each request re-fetches; there is no cached series to re-slice.
    pub async fn chart(&self, window: HistoryWindow) -> ChartSeries {
        match self.api.history(window.limit()).await {
            Ok(history) => {
                let series = build_series(&history);
                tracing::debug!(points = series.point_count, "chart series rebuilt");
                series
            }
            Err(err) => {
                tracing::warn!(error = %err, "sensor history fetch failed");
                ChartSeries::empty()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sensor::SensorReading;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Mutex;

    #[derive(Clone, Copy)]
    enum Script {
        Healthy,
        Empty,
        NoData,
        Offline,
    }

    struct ScriptedSensorApi {
        script: Mutex<Script>,
        last_limit: Mutex<Option<Option<usize>>>,
    }

    impl ScriptedSensorApi {
        fn new(script: Script) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script),
                last_limit: Mutex::new(None),
            })
        }

        fn script(&self) -> Script {
            *self.script.lock().unwrap()
        }
    }

    #[async_trait]
    impl SensorApi for ScriptedSensorApi {
        async fn latest(&self) -> Result<SensorReading, SensorApiError> {
            match self.script() {
                Script::Healthy => Ok(SensorReading {
                    temperature: Some(21.52),
                    humidity: Some(55.0),
                    last_update: chrono::DateTime::from_timestamp_millis(1700000000000),
                    sample_count: 7,
                }),
                Script::Empty => Ok(SensorReading {
                    temperature: None,
                    humidity: None,
                    last_update: None,
                    sample_count: 0,
                }),
                Script::NoData => Err(SensorApiError::NoData),
                Script::Offline => Err(SensorApiError::Unreachable("connection refused".into())),
            }
        }

        async fn history(&self, limit: Option<usize>) -> Result<Vec<Value>, SensorApiError> {
            *self.last_limit.lock().unwrap() = Some(limit);
            match self.script() {
                Script::Healthy => Ok(vec![
                    json!({"temperature": 21.0, "humidity": 50.0, "timestamp": 1700000000000i64}),
                    json!({"temperature": 21.5, "humidity": 150.0, "timestamp": 1700000060000i64}),
                ]),
                Script::Empty => Ok(Vec::new()),
                Script::NoData => Err(SensorApiError::NoData),
                Script::Offline => Err(SensorApiError::Unreachable("connection refused".into())),
            }
        }
    }

    #[tokio::test]
    async fn test_refresh_publishes_rounded_cards() {
        let api = ScriptedSensorApi::new(Script::Healthy);
        let service = SensorService::new(api, Duration::from_secs(10));

        service.refresh_cards().await;

        let cards = service.cards();
        assert_eq!(cards.temperature.as_deref(), Some("21.5"));
        assert_eq!(cards.humidity.as_deref(), Some("55.0"));
        assert!(cards.status_line.contains("7 samples"));
        assert!(!cards.error);
    }

    #[tokio::test]
    async fn test_refresh_transport_failure_reads_connection_error() {
        let api = ScriptedSensorApi::new(Script::Offline);
        let service = SensorService::new(api, Duration::from_secs(10));

        service.refresh_cards().await;

        let cards = service.cards();
        assert!(cards.error);
        assert_eq!(cards.status_line, "Error: Connection error");
    }

    #[tokio::test]
    async fn test_refresh_empty_answer_reads_no_data() {
        let api = ScriptedSensorApi::new(Script::NoData);
        let service = SensorService::new(api, Duration::from_secs(10));

        service.refresh_cards().await;

        let cards = service.cards();
        assert!(cards.error);
        assert_eq!(cards.status_line, "Error: No data available");
    }

    #[tokio::test]
    async fn test_refresh_null_reading_keeps_waiting_card() {
        let api = ScriptedSensorApi::new(Script::Empty);
        let service = SensorService::new(api, Duration::from_secs(10));

        service.refresh_cards().await;

        let cards = service.cards();
        assert!(!cards.error);
        assert_eq!(cards.status_line, "Waiting for sensor data.");
        assert!(cards.temperature.is_none());
    }

    #[tokio::test]
    async fn test_chart_passes_window_limit_and_filters() {
        let api = ScriptedSensorApi::new(Script::Healthy);
        let service = SensorService::new(api.clone(), Duration::from_secs(10));

        let series = service.chart(HistoryWindow::LastSamples(60)).await;
        assert_eq!(*api.last_limit.lock().unwrap(), Some(Some(60)));
        // The 150% humidity sample is filtered out.
        assert_eq!(series.point_count, 1);

        service.chart(HistoryWindow::All).await;
        assert_eq!(*api.last_limit.lock().unwrap(), Some(None));
    }

    #[tokio::test]
    async fn test_chart_fails_soft_to_empty_series() {
        let api = ScriptedSensorApi::new(Script::Offline);
        let service = SensorService::new(api, Duration::from_secs(10));

        let series = service.chart(HistoryWindow::All).await;
        assert_eq!(series.point_count, 0);
    }
}
