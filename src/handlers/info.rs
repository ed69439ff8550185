//! Info device endpoints.
//!
//! A session is opened with `POST /kfetch`, which returns its id. The id then
//! stands in for the open handle: `PUT` writes a raw mask, `GET` reads the
//! report and `DELETE` closes it.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::handlers::{blocking, error_response, TEXT_PLAIN};
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct ReadParams {
    /// Caller buffer size; defaults to the configured read buffer.
    pub len: Option<usize>,
}

/// Handler for `POST /kfetch`.
#[instrument(skip(state))]
pub async fn open_handler(State(state): State<SharedState>) -> Response {
    debug!("Processing open request");
    let s = state.clone();
    match blocking(move || s.sessions.open()).await {
        Ok(id) => {
            state.stats.record_open();
            (
                StatusCode::CREATED,
                [(header::CONTENT_TYPE, TEXT_PLAIN)],
                format!("{}\n", id),
            )
                .into_response()
        }
        Err(e) => error_response(&state, e),
    }
}

/// Handler for `PUT /kfetch/{id}`; the body is the raw mask.
#[instrument(skip(state, body), fields(body_len = body.len()))]
pub async fn write_handler(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
    body: Bytes,
) -> Response {
    let handle = match state.sessions.get(id) {
        Ok(h) => h,
        Err(e) => return error_response(&state, e),
    };
    match handle.write(&body) {
        Ok(n) => {
            state.stats.record_write();
            ([(header::CONTENT_TYPE, TEXT_PLAIN)], format!("{}\n", n)).into_response()
        }
        Err(e) => error_response(&state, e),
    }
}

/// Handler for `GET /kfetch/{id}`. An empty body means end of data.
#[instrument(skip(state))]
pub async fn read_handler(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
    Query(params): Query<ReadParams>,
) -> Response {
    let handle = match state.sessions.get(id) {
        Ok(h) => h,
        Err(e) => return error_response(&state, e),
    };
    let len = params
        .len
        .unwrap_or_else(|| state.config.read_buffer_bytes());

    let result = blocking(move || {
        let mut out = Vec::new();
        handle.read_to(&mut out, len)?;
        Ok(out)
    })
    .await;

    match result {
        Ok(bytes) => {
            state.stats.record_info_read(bytes.len());
            debug!("Session {} read returned {} bytes", id, bytes.len());
            ([(header::CONTENT_TYPE, TEXT_PLAIN)], bytes).into_response()
        }
        Err(e) => error_response(&state, e),
    }
}

/// Handler for `DELETE /kfetch/{id}`.
#[instrument(skip(state))]
pub async fn close_handler(State(state): State<SharedState>, Path(id): Path<u64>) -> Response {
    match state.sessions.close(id) {
        Ok(()) => {
            state.stats.record_close();
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => error_response(&state, e),
    }
}
