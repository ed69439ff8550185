//! Health check endpoint handler.
//!
//! This module provides the `/health` endpoint handler that returns
//! service statistics and session table occupancy.

use axum::{extract::State, http::header, response::IntoResponse};
use std::fmt::Write as FmtWrite;
use tracing::{debug, instrument};

use crate::handlers::TEXT_PLAIN;
use crate::state::SharedState;

// Time conversion constants
const SECONDS_PER_HOUR: f64 = 3600.0;
const MINUTES_PER_HOUR: f64 = 60.0;
const HOURS_PER_DAY: f64 = 24.0;

/// Handler for the /health endpoint.
#[instrument(skip(state))]
pub async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing /health request");

    let uptime_seconds = state.stats.get_uptime_seconds();
    let uptime_hours = uptime_seconds as f64 / SECONDS_PER_HOUR;
    let uptime_str = if uptime_hours < 1.0 {
        format!("{:.1} minutes", uptime_hours * MINUTES_PER_HOUR)
    } else if uptime_hours < HOURS_PER_DAY {
        format!("{:.1} hours", uptime_hours)
    } else {
        format!("{:.1} days", uptime_hours / HOURS_PER_DAY)
    };

    let table = state.stats.render_table();

    let sessions = state.sessions.stats();
    let mut session_section = String::new();
    writeln!(session_section, "SESSION TABLE").ok();
    writeln!(session_section, "=============").ok();
    writeln!(
        session_section,
        "{:25} | {:>10}",
        "open_sessions", sessions.open_sessions
    )
    .ok();
    writeln!(
        session_section,
        "{:25} | {:>10}",
        "max_sessions", sessions.max_sessions
    )
    .ok();
    writeln!(
        session_section,
        "{:25} | {:>10}",
        "total_opened", sessions.total_opened
    )
    .ok();
    writeln!(
        session_section,
        "{:25} | {:>10}",
        "total_expired", sessions.total_expired
    )
    .ok();

    (
        [(header::CONTENT_TYPE, TEXT_PLAIN)],
        format!("OK\n\nUptime: {uptime_str}\n\n{table}\n{session_section}"),
    )
}
