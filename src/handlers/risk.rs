//! Risk report endpoint handler.

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use kfetch_telemetry::RiskReport;
use std::time::Instant;
use tracing::{debug, instrument};

use crate::handlers::{blocking, error_response, TEXT_PLAIN};
use crate::state::SharedState;

/// Handler for `GET /kfetch_risk`. Every request walks the process list afresh.
#[instrument(skip(state))]
pub async fn risk_handler(State(state): State<SharedState>) -> Response {
    debug!("Processing /kfetch_risk request");
    let start = Instant::now();
    let proc_root = state.paths.proc_root.clone();

    match blocking(move || RiskReport::collect(&proc_root)).await {
        Ok(report) => {
            let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
            state.stats.record_risk_read(report.rows.len(), elapsed_ms);
            ([(header::CONTENT_TYPE, TEXT_PLAIN)], report.render()).into_response()
        }
        Err(e) => error_response(&state, e),
    }
}
