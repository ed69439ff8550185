//! Root endpoint handler for the landing page.
//!
//! This module provides the `/` endpoint handler that lists all available
//! endpoints and the field bits accepted by the info device.

use axum::{extract::State, http::header, response::IntoResponse};
use kfetch_telemetry::fields::RENDER_ORDER;
use kfetch_telemetry::FULL_INFO;
use std::fmt::Write as FmtWrite;
use tracing::{debug, instrument};

use crate::state::SharedState;

/// Handler for the root `/` endpoint.
#[instrument(skip(state))]
pub async fn root_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing / request");

    let version = env!("CARGO_PKG_VERSION");

    let uptime_secs = state.start_time.elapsed().as_secs();
    let hours = uptime_secs / 3600;
    let minutes = (uptime_secs % 3600) / 60;
    let seconds = uptime_secs % 60;

    let mut out = String::new();
    writeln!(out, "kfetch-telemetry {}", version).ok();
    writeln!(out, "Uptime: {}h {}m {}s", hours, minutes, seconds).ok();
    writeln!(out).ok();
    writeln!(out, "ENDPOINTS").ok();
    writeln!(out, "---------").ok();
    writeln!(out, "  POST   /kfetch              open an info session, returns its id").ok();
    writeln!(out, "  PUT    /kfetch/{{id}}         write a 4-byte native-endian field mask").ok();
    writeln!(out, "  GET    /kfetch/{{id}}?len=N   read the report (empty body = end of data)").ok();
    writeln!(out, "  DELETE /kfetch/{{id}}         close the session").ok();
    writeln!(out, "  GET    /kfetch_risk         per-process risk report").ok();
    if state.config.enable_health.unwrap_or(true) {
        writeln!(out, "  GET    /health              service statistics").ok();
    }
    writeln!(out).ok();
    writeln!(out, "FIELD BITS").ok();
    writeln!(out, "----------").ok();
    for field in RENDER_ORDER {
        writeln!(out, "  {:>3}  {}", field.bit(), field.name()).ok();
    }
    writeln!(out, "  {:>3}  all", FULL_INFO).ok();

    ([(header::CONTENT_TYPE, crate::handlers::TEXT_PLAIN)], out)
}
