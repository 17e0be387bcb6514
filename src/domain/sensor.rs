// Sensor data domain models and chart series building
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

// Readings outside these bounds are sensor glitches, not weather.
const TEMP_MIN_C: f64 = -40.0;
const TEMP_MAX_C: f64 = 80.0;
const HUMIDITY_MIN: f64 = 0.0;
const HUMIDITY_MAX: f64 = 100.0;

/// Latest reading reported by the sensor service. Values are optional: a
/// freshly booted service answers ok before its first sample arrives.
#[derive(Debug, Clone)]
pub struct SensorReading {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub last_update: Option<DateTime<Utc>>,
    pub sample_count: u64,
}

/// Textual card content for the temperature/humidity displays.
#[derive(Debug, Clone, Serialize)]
pub struct SensorCards {
    pub temperature: Option<String>,
    pub humidity: Option<String>,
    pub status_line: String,
    pub error: bool,
}

impl SensorCards {
    pub fn waiting() -> Self {
        Self {
            temperature: None,
            humidity: None,
            status_line: "Waiting for sensor data.".to_string(),
            error: false,
        }
    }

    pub fn from_reading(reading: &SensorReading) -> Self {
        // A reading with a missing value is not an error; the service just
        // has no sample yet. Keep the neutral waiting card.
        let (Some(temperature), Some(humidity)) = (reading.temperature, reading.humidity) else {
            return Self::waiting();
        };
        let status_line = match reading.last_update {
            Some(ts) => format!(
                "Last updated: {} ({} samples)",
                ts.format("%H:%M:%S"),
                reading.sample_count
            ),
            None => "Waiting for sensor data.".to_string(),
        };
        Self {
            temperature: Some(format!("{temperature:.1}")),
            humidity: Some(format!("{humidity:.1}")),
            status_line,
            error: false,
        }
    }

    pub fn unavailable(message: &str) -> Self {
        Self {
            temperature: None,
            humidity: None,
            status_line: format!("Error: {}", message),
            error: true,
        }
    }
}

/// History window selected for the chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryWindow {
    LastSamples(usize),
    All,
}

impl HistoryWindow {
    pub fn limit(&self) -> Option<usize> {
        match self {
            HistoryWindow::LastSamples(n) => Some(*n),
            HistoryWindow::All => None,
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        if raw.eq_ignore_ascii_case("all") {
            return Some(HistoryWindow::All);
        }
        match raw.parse::<usize>() {
            Ok(n) if n > 0 => Some(HistoryWindow::LastSamples(n)),
            _ => None,
        }
    }
}

/// One validated chart sample.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartPoint {
    pub timestamp_ms: i64,
    pub label: String,
    pub temperature: f64,
    pub humidity: f64,
}

/// Full chart payload, rebuilt from scratch on every refresh.
#[derive(Debug, Clone, Serialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub temperature: Vec<f64>,
    pub humidity: Vec<f64>,
    pub point_count: usize,
}

impl ChartSeries {
    pub fn empty() -> Self {
        Self {
            labels: Vec::new(),
            temperature: Vec::new(),
            humidity: Vec::new(),
            point_count: 0,
        }
    }

    fn from_points(points: Vec<ChartPoint>) -> Self {
        let mut series = ChartSeries::empty();
        series.point_count = points.len();
        for point in points {
            series.labels.push(point.label);
            series.temperature.push(point.temperature);
            series.humidity.push(point.humidity);
        }
        series
    }
}

/// Coerce a loosely-typed JSON value to a finite float.
///
/// The sensor firmware has shipped numbers both as JSON numbers and as
/// strings; accept either, reject everything else.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Coerce a timestamp given as epoch milliseconds or an RFC 3339 string.
pub fn coerce_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => DateTime::from_timestamp_millis(n.as_i64()?),
        Value::String(s) => {
            if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
                return Some(ts.with_timezone(&Utc));
            }
            DateTime::from_timestamp_millis(s.trim().parse::<i64>().ok()?)
        }
        _ => None,
    }
}

fn field<'a>(entry: &'a Value, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| entry.get(name))
}

fn normalize_entry(entry: &Value) -> Option<ChartPoint> {
    let temperature = coerce_number(field(entry, &["temperature", "temp", "t"])?)?;
    let humidity = coerce_number(field(entry, &["humidity", "hum", "h"])?)?;
    let timestamp = field(entry, &["timestamp", "time"])
        .and_then(coerce_timestamp)
        .unwrap_or_else(Utc::now);

    if temperature <= TEMP_MIN_C || temperature >= TEMP_MAX_C {
        return None;
    }
    if !(HUMIDITY_MIN..=HUMIDITY_MAX).contains(&humidity) {
        return None;
    }

    Some(ChartPoint {
        timestamp_ms: timestamp.timestamp_millis(),
        label: timestamp.format("%H:%M").to_string(),
        temperature,
        humidity,
    })
}

/// Build a chart series from a raw history array.
///
/// Malformed entries (missing fields, non-numeric values, readings outside
/// plausible physical ranges) are dropped individually; one bad sample never
/// aborts the refresh. Input order is preserved.
pub fn build_series(history: &[Value]) -> ChartSeries {
    let points: Vec<ChartPoint> = history.iter().filter_map(normalize_entry).collect();
    if points.is_empty() {
        return ChartSeries::empty();
    }
    ChartSeries::from_points(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_window_parse() {
        assert_eq!(HistoryWindow::parse("60"), Some(HistoryWindow::LastSamples(60)));
        assert_eq!(HistoryWindow::parse("all"), Some(HistoryWindow::All));
        assert_eq!(HistoryWindow::parse("All"), Some(HistoryWindow::All));
        assert_eq!(HistoryWindow::parse("0"), None);
        assert_eq!(HistoryWindow::parse("soon"), None);
        assert_eq!(HistoryWindow::All.limit(), None);
        assert_eq!(HistoryWindow::LastSamples(30).limit(), Some(30));
    }

    #[test]
    fn test_build_series_normalizes_field_aliases() {
        let history = vec![
            json!({"temperature": 21.5, "humidity": 55.0, "timestamp": 1700000000000i64}),
            json!({"temp": "22.1", "hum": "54", "time": 1700000060000i64}),
            json!({"t": 20.9, "h": 60.2, "time": "2023-11-14T22:15:00Z"}),
        ];
        let series = build_series(&history);
        assert_eq!(series.point_count, 3);
        assert_eq!(series.temperature, vec![21.5, 22.1, 20.9]);
        assert_eq!(series.humidity, vec![55.0, 54.0, 60.2]);
        assert_eq!(series.labels.len(), 3);
    }

    #[test]
    fn test_build_series_rejects_out_of_range_values() {
        let history = vec![
            json!({"temp": "21.5", "hum": "150", "time": 1000}),
            json!({"temperature": -40.0, "humidity": 50.0, "time": 1000}),
            json!({"temperature": 80.0, "humidity": 50.0, "time": 1000}),
            json!({"temperature": 25.0, "humidity": -0.1, "time": 1000}),
        ];
        let series = build_series(&history);
        assert_eq!(series.point_count, 0);
        assert!(series.humidity.iter().all(|h| (0.0..=100.0).contains(h)));
    }

    #[test]
    fn test_build_series_boundary_humidity_kept() {
        let history = vec![
            json!({"temperature": 25.0, "humidity": 0.0, "time": 1000}),
            json!({"temperature": 25.0, "humidity": 100.0, "time": 2000}),
        ];
        let series = build_series(&history);
        assert_eq!(series.point_count, 2);
    }

    #[test]
    fn test_build_series_drops_malformed_entries_individually() {
        let history = vec![
            json!({"temperature": "not-a-number", "humidity": 50.0}),
            json!({"humidity": 50.0}),
            json!("not even an object"),
            json!({"temperature": 21.0, "humidity": 50.0, "time": 1700000000000i64}),
            json!({"temperature": f64::NAN.to_string(), "humidity": 50.0, "time": 1}),
        ];
        let series = build_series(&history);
        assert_eq!(series.point_count, 1);
        assert_eq!(series.temperature, vec![21.0]);
    }

    #[test]
    fn test_build_series_preserves_input_order() {
        let history = vec![
            json!({"temperature": 1.0, "humidity": 10.0, "time": 3000}),
            json!({"temperature": 2.0, "humidity": 20.0, "time": 1000}),
        ];
        let series = build_series(&history);
        assert_eq!(series.temperature, vec![1.0, 2.0]);
    }

    #[test]
    fn test_coerce_timestamp_accepts_millis_and_rfc3339() {
        let from_millis = coerce_timestamp(&json!(1700000000000i64)).unwrap();
        let from_string = coerce_timestamp(&json!("2023-11-14T22:13:20Z")).unwrap();
        assert_eq!(from_millis, from_string);
        assert!(coerce_timestamp(&json!(true)).is_none());
    }

    #[test]
    fn test_cards_from_reading_rounds_to_one_decimal() {
        let reading = SensorReading {
            temperature: Some(21.456),
            humidity: Some(55.04),
            last_update: DateTime::from_timestamp_millis(1700000000000),
            sample_count: 42,
        };
        let cards = SensorCards::from_reading(&reading);
        assert_eq!(cards.temperature.as_deref(), Some("21.5"));
        assert_eq!(cards.humidity.as_deref(), Some("55.0"));
        assert!(cards.status_line.contains("42 samples"));
        assert!(!cards.error);
    }

    #[test]
    fn test_cards_from_reading_without_values_stays_waiting() {
        let reading = SensorReading {
            temperature: None,
            humidity: None,
            last_update: None,
            sample_count: 0,
        };
        let cards = SensorCards::from_reading(&reading);
        assert!(cards.temperature.is_none());
        assert!(cards.humidity.is_none());
        assert_eq!(cards.status_line, "Waiting for sensor data.");
        assert!(!cards.error);
    }

    #[test]
    fn test_cards_unavailable() {
        let cards = SensorCards::unavailable("Connection error");
        assert!(cards.error);
        assert_eq!(cards.status_line, "Error: Connection error");
        assert!(cards.temperature.is_none());
    }
}
