// HTTP request handlers
use crate::application::engine_service::EngineError;
use crate::domain::calibration::CalibrationUpdate;
use crate::domain::link::CommandMessage;
use crate::presentation::app_state::AppState;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::wrappers::WatchStream;

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        tracing::error!("Engine request failed: {}", self);
        (StatusCode::SERVICE_UNAVAILABLE, self.to_string()).into_response()
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Current engine snapshot
pub async fn get_snapshot(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.engine.snapshot();
    Json(snapshot.as_ref().clone())
}

/// Snapshot stream for live dashboards (server-sent events)
pub async fn stream_snapshots(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = WatchStream::new(state.engine.subscribe()).filter_map(|snapshot| async move {
        match Event::default().event("snapshot").json_data(snapshot.as_ref()) {
            Ok(event) => Some(Ok::<_, Infallible>(event)),
            Err(e) => {
                tracing::warn!("Could not encode snapshot event: {}", e);
                None
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Recorded samples, alarm history and session summary for export
pub async fn get_recording(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, EngineError> {
    Ok(Json(state.engine.export().await?))
}

pub async fn start_recording(State(state): State<Arc<AppState>>) -> Result<StatusCode, EngineError> {
    state.engine.start_recording().await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn stop_recording(State(state): State<Arc<AppState>>) -> Result<StatusCode, EngineError> {
    state.engine.stop_recording().await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn clear_recording(State(state): State<Arc<AppState>>) -> Result<StatusCode, EngineError> {
    state.engine.clear_recording().await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn acknowledge_alarms(
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, EngineError> {
    state.engine.acknowledge_alarms().await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_calibration(
    State(state): State<Arc<AppState>>,
    Json(update): Json<CalibrationUpdate>,
) -> Result<StatusCode, EngineError> {
    state.engine.update_calibration(update).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn clear_history(State(state): State<Arc<AppState>>) -> Result<StatusCode, EngineError> {
    state.engine.clear_history().await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn force_cleanup(State(state): State<Arc<AppState>>) -> Result<StatusCode, EngineError> {
    state.engine.force_cleanup().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Relay a command to the device
pub async fn send_command(
    State(state): State<Arc<AppState>>,
    Json(command): Json<CommandMessage>,
) -> Result<StatusCode, EngineError> {
    state.engine.send_command(command).await?;
    Ok(StatusCode::ACCEPTED)
}
