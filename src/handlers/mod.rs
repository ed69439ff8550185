//! HTTP endpoint handlers for the service.
//!
//! This module provides handlers for all HTTP endpoints:
//! - `/`: Landing page listing the endpoints
//! - `/kfetch`, `/kfetch/{id}`: Info device sessions (open, write, read, close)
//! - `/kfetch_risk`: Per-process risk report
//! - `/health`: Service statistics

pub mod health;
pub mod info;
pub mod risk;
pub mod root;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use kfetch_telemetry::TelemetryError;
use tracing::{debug, error};

use crate::state::AppState;

// Re-export handlers
pub use health::health_handler;
pub use info::{close_handler, open_handler, read_handler, write_handler};
pub use risk::risk_handler;
pub use root::root_handler;

pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// HTTP status for a failed device or report call.
pub fn status_for(err: &TelemetryError) -> StatusCode {
    match err {
        TelemetryError::Allocation(_) => StatusCode::SERVICE_UNAVAILABLE,
        TelemetryError::Transfer(_) => StatusCode::BAD_REQUEST,
        TelemetryError::UnknownSession(_) => StatusCode::NOT_FOUND,
        TelemetryError::DeviceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        TelemetryError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Counts the failure and renders it as a plain-text response.
pub fn error_response(state: &AppState, err: TelemetryError) -> Response {
    state.stats.record_error(&err);
    let status = status_for(&err);
    if status.is_server_error() {
        error!("Request failed: {}", err);
    } else {
        debug!("Request rejected: {}", err);
    }
    (status, [(header::CONTENT_TYPE, TEXT_PLAIN)], format!("{}\n", err)).into_response()
}

/// Runs a synchronous device call on the blocking pool.
pub async fn blocking<T, F>(f: F) -> kfetch_telemetry::Result<T>
where
    F: FnOnce() -> kfetch_telemetry::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| TelemetryError::Io(std::io::Error::other(format!("worker failed: {}", e))))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&TelemetryError::Allocation("full".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_for(&TelemetryError::Transfer("short".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&TelemetryError::UnknownSession(3)),
            StatusCode::NOT_FOUND
        );
    }
}
