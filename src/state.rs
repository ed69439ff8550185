//! Application state management for the HTTP service.
//!
//! This module defines the shared application state that is passed
//! to HTTP handlers.

use kfetch_telemetry::{HostPaths, InfoDevice, ServiceStats, SessionTable};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::Config;

/// Type alias for shared application state.
pub type SharedState = Arc<AppState>;

/// Application state shared across requests.
pub struct AppState {
    pub config: Arc<Config>,
    pub paths: HostPaths,
    /// Open info sessions keyed by id.
    pub sessions: SessionTable,
    pub stats: Arc<ServiceStats>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let paths = config.host_paths();
        let sessions = SessionTable::new(InfoDevice::new(paths.clone()), config.max_sessions())
            .with_idle_timeout(Duration::from_secs(config.session_idle_secs()));
        Self {
            config: Arc::new(config),
            paths,
            sessions,
            stats: Arc::new(ServiceStats::new()),
            start_time: Instant::now(),
        }
    }
}
