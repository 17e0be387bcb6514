// HTTP request handlers
use crate::domain::channel::ChannelStatus;
use crate::domain::sensor::HistoryWindow;
use crate::presentation::app_state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    response::{IntoResponse, Response},
};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio_stream::wrappers::WatchStream;

// Default chart window matches the frontend's initial range button.
const DEFAULT_CHART_SAMPLES: usize = 60;

#[derive(Deserialize)]
pub struct ChartQuery {
    pub window: Option<String>,
}

fn unknown_channel(id: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"error": format!("unknown channel {id:?}")})),
    )
        .into_response()
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// List all channels with their current status snapshots
pub async fn list_channels(State(state): State<Arc<AppState>>) -> Json<Vec<ChannelStatus>> {
    Json(state.channels.iter().map(|c| c.status()).collect())
}

pub async fn channel_status(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match state.channel(&id) {
        Some(controller) => Json(controller.status()).into_response(),
        None => unknown_channel(&id),
    }
}

/// Play action: starts the channel, or stops it if it is already streaming.
/// A click while the channel is starting is ignored.
pub async fn play_channel(Path(id): Path<String>, State(state): State<Arc<AppState>>) -> Response {
    match state.channel(&id) {
        Some(controller) => Json(controller.play()).into_response(),
        None => unknown_channel(&id),
    }
}

pub async fn stop_channel(Path(id): Path<String>, State(state): State<Arc<AppState>>) -> Response {
    match state.channel(&id) {
        Some(controller) => Json(controller.stop()).into_response(),
        None => unknown_channel(&id),
    }
}

/// SSE stream of channel status snapshots, one event per transition.
pub async fn channel_events(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let Some(controller) = state.channel(&id) else {
        return unknown_channel(&id);
    };
    let mut rx = controller.subscribe();
    let stream = async_stream::stream! {
        loop {
            let status = rx.borrow_and_update().clone();
            yield Event::default().event("status").json_data(&status);
            if rx.changed().await.is_err() {
                break;
            }
        }
    };
    Sse::new(stream)
        .keep_alive(KeepAlive::default())
        .into_response()
}

/// Latest sensor cards (temperature, humidity, status line).
pub async fn sensor_cards(State(state): State<Arc<AppState>>) -> Response {
    Json(state.sensor.cards()).into_response()
}

/// Chart series for the selected window. Each request re-fetches history.
pub async fn sensor_chart(
    Query(query): Query<ChartQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let window = match query.window.as_deref() {
        None => HistoryWindow::LastSamples(DEFAULT_CHART_SAMPLES),
        Some(raw) => match HistoryWindow::parse(raw) {
            Some(window) => window,
            None => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"error": format!("invalid window {raw:?}")})),
                )
                    .into_response();
            }
        },
    };
    Json(state.sensor.chart(window).await).into_response()
}

/// SSE stream of sensor card snapshots on the poll cadence.
pub async fn sensor_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let stream = WatchStream::new(state.sensor.subscribe())
        .map(|cards| Event::default().event("cards").json_data(&cards));
    Sse::new(stream).keep_alive(KeepAlive::default())
}
