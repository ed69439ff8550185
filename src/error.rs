//! Error taxonomy shared by the info device and the risk report.
//!
//! Every variant fails a single call only. Nothing here is fatal to the
//! service: other sessions and the process walk are never touched by a
//! failed call.

use thiserror::Error;

/// Errors surfaced by device and report operations.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A session slot or scratch buffer could not be obtained.
    #[error("allocation failed: {0}")]
    Allocation(String),

    /// The caller-provided buffer could not be read from or written to.
    #[error("transfer failed: {0}")]
    Transfer(String),

    /// The handle does not name an open session (never opened or already closed).
    #[error("unknown session handle {0}")]
    UnknownSession(u64),

    /// The proc root backing the device is not accessible.
    #[error("device unavailable: {path}: {source}")]
    DeviceUnavailable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TelemetryError>;
