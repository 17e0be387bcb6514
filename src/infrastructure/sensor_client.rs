// HTTP client for the remote sensor service
use crate::application::sensor_api::{SensorApi, SensorApiError};
use crate::domain::sensor::{coerce_timestamp, SensorReading};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct HttpSensorClient {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    status: String,
    #[serde(default = "Option::default")]
    data: Option<T>,
}

impl<T> Envelope<T> {
    /// A reachable service answering with a non-ok status or an empty payload
    /// is `NoData`; transport and decode failures are mapped by the caller.
    fn into_data(self) -> Result<T, SensorApiError> {
        if self.status != "ok" {
            return Err(SensorApiError::NoData);
        }
        self.data.ok_or(SensorApiError::NoData)
    }
}

#[derive(Debug, Deserialize)]
struct ReadingBody {
    #[serde(default)]
    temperature: Option<f64>,
    #[serde(default)]
    humidity: Option<f64>,
    #[serde(default)]
    last_update: Option<Value>,
    #[serde(default)]
    sample_count: u64,
}

impl ReadingBody {
    fn into_reading(self) -> SensorReading {
        SensorReading {
            temperature: self.temperature,
            humidity: self.humidity,
            last_update: self.last_update.as_ref().and_then(coerce_timestamp),
            sample_count: self.sample_count,
        }
    }
}

impl HttpSensorClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    async fn fetch<T>(&self, url: &str) -> Result<Envelope<T>, SensorApiError>
    where
        T: serde::de::DeserializeOwned,
    {
        self.client
            .get(url)
            .send()
            .await
            .map_err(|err| SensorApiError::Unreachable(err.to_string()))?
            .json::<Envelope<T>>()
            .await
            .map_err(|err| SensorApiError::Unreachable(err.to_string()))
    }
}

#[async_trait]
impl SensorApi for HttpSensorClient {
    async fn latest(&self) -> Result<SensorReading, SensorApiError> {
        let url = format!("{}/sensor/data", self.base_url);
        let envelope: Envelope<ReadingBody> = self.fetch(&url).await?;
        Ok(envelope.into_data()?.into_reading())
    }

    async fn history(&self, limit: Option<usize>) -> Result<Vec<Value>, SensorApiError> {
        let mut url = format!("{}/sensor/history", self.base_url);
        if let Some(limit) = limit {
            url.push_str(&format!("?limit={limit}"));
        }
        let envelope: Envelope<Vec<Value>> = self.fetch(&url).await?;
        envelope.into_data()
    }
}
