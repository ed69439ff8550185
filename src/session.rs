//! Info device sessions.
//!
//! Each open handle owns a selection mask and a read position behind one
//! lock. Writes replace the mask; reads render a fresh report for the mask
//! captured at read time. Handles never share state with each other.

use dashmap::DashMap;
use std::io::Write;
use std::mem::size_of;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::error::{Result, TelemetryError};
use crate::fields::FULL_INFO;
use crate::paths::HostPaths;
use crate::report::{render_info, PAGE_SIZE};
use crate::system::SystemSnapshot;

/// Bytes one mask write consumes.
pub const MASK_BYTES: usize = size_of::<i32>();

/// Default bound on concurrently open sessions in a [`SessionTable`].
pub const DEFAULT_MAX_SESSIONS: usize = 1024;

/// Default idle time after which an unused table session is evicted.
pub const DEFAULT_SESSION_IDLE_SECS: u64 = 300;

/// Decodes a native-endian `i32` mask from the start of `buf`.
///
/// Trailing bytes are ignored. Undefined bits are kept; the renderer
/// ignores them.
pub fn decode_mask(buf: &[u8]) -> Result<i32> {
    let bytes: [u8; MASK_BYTES] = buf
        .get(..MASK_BYTES)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| {
            TelemetryError::Transfer(format!(
                "mask write needs {} bytes, got {}",
                MASK_BYTES,
                buf.len()
            ))
        })?;
    Ok(i32::from_ne_bytes(bytes))
}

#[derive(Debug)]
struct SessionState {
    mask: i32,
    /// Bytes handed out since the last write; non-zero means end of data.
    position: usize,
}

impl SessionState {
    fn render(&self, paths: &HostPaths, capacity: usize) -> Result<String> {
        let snap = SystemSnapshot::collect(paths, self.mask);
        render_info(&snap, self.mask, capacity)
    }
}

/// Per-handle selection state.
#[derive(Debug)]
pub struct Session {
    state: Mutex<SessionState>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SessionState {
                mask: FULL_INFO,
                position: 0,
            }),
        }
    }

    // A panic while rendering leaves the state consistent, so a poisoned
    // lock is still usable.
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn mask(&self) -> i32 {
        self.lock().mask
    }

    /// Replaces the mask and rewinds the read position.
    pub fn set_mask(&self, mask: i32) {
        let mut state = self.lock();
        state.mask = mask;
        state.position = 0;
    }

    /// Renders the report for the current mask without touching the position.
    pub fn render(&self, paths: &HostPaths, capacity: usize) -> Result<String> {
        self.lock().render(paths, capacity)
    }
}

/// Factory for info handles backed by one host view.
#[derive(Debug, Clone)]
pub struct InfoDevice {
    paths: Arc<HostPaths>,
}

impl InfoDevice {
    pub fn new(paths: HostPaths) -> Self {
        Self {
            paths: Arc::new(paths),
        }
    }

    /// Opens a new handle with every field selected.
    pub fn open(&self) -> Result<InfoHandle> {
        let root = &self.paths.proc_root;
        match std::fs::metadata(root) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(TelemetryError::DeviceUnavailable {
                    path: root.display().to_string(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        "proc root is not a directory",
                    ),
                })
            }
            Err(source) => {
                return Err(TelemetryError::DeviceUnavailable {
                    path: root.display().to_string(),
                    source,
                })
            }
        }
        Ok(InfoHandle {
            session: Session::new(),
            paths: Arc::clone(&self.paths),
        })
    }
}

/// One open handle to the info device.
#[derive(Debug)]
pub struct InfoHandle {
    session: Session,
    paths: Arc<HostPaths>,
}

impl InfoHandle {
    /// Sets the selection mask from the first four bytes of `buf`.
    ///
    /// Returns the number of bytes consumed. A short buffer leaves the
    /// session untouched.
    pub fn write(&self, buf: &[u8]) -> Result<usize> {
        let mask = decode_mask(buf)?;
        self.session.set_mask(mask);
        debug!("Session mask set to {:#x}", mask);
        Ok(MASK_BYTES)
    }

    /// Copies the rendered report into `buf`.
    ///
    /// Returns 0 once the report has been read, until the next write.
    pub fn read(&self, buf: &mut [u8]) -> Result<usize> {
        let capacity = buf.len();
        self.read_with(capacity, |bytes| {
            buf[..bytes.len()].copy_from_slice(bytes);
            Ok(())
        })
    }

    /// Streams at most `len` bytes of the report into `out`.
    pub fn read_to<W: Write>(&self, out: &mut W, len: usize) -> Result<usize> {
        self.read_with(len, |bytes| {
            out.write_all(bytes)
                .map_err(|e| TelemetryError::Transfer(format!("copy to caller failed: {}", e)))
        })
    }

    fn read_with<F>(&self, len: usize, deliver: F) -> Result<usize>
    where
        F: FnOnce(&[u8]) -> Result<()>,
    {
        let mut state = self.session.lock();
        if state.position > 0 {
            return Ok(0);
        }
        let capacity = len.min(PAGE_SIZE);
        let text = state.render(&self.paths, capacity)?;
        deliver(text.as_bytes())?;
        state.position = text.len();
        debug!(
            "Session read {} bytes (mask {:#x}, capacity {})",
            text.len(),
            state.mask,
            capacity
        );
        Ok(text.len())
    }

    pub fn mask(&self) -> i32 {
        self.session.mask()
    }
}

/// Snapshot of session table occupancy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTableStats {
    pub open_sessions: usize,
    pub max_sessions: usize,
    pub total_opened: u64,
    pub total_expired: u64,
}

struct TableEntry {
    handle: Arc<InfoHandle>,
    last_used: Instant,
}

/// Id-keyed table of open handles for callers that cannot hold a handle
/// across calls.
///
/// Callers may vanish without closing, so with an idle timeout set, entries
/// not touched for that long are evicted before each open.
pub struct SessionTable {
    device: InfoDevice,
    sessions: DashMap<u64, TableEntry, ahash::RandomState>,
    next_id: AtomicU64,
    open: AtomicUsize,
    expired: AtomicU64,
    max_sessions: usize,
    idle_timeout: Option<Duration>,
}

impl SessionTable {
    pub fn new(device: InfoDevice, max_sessions: usize) -> Self {
        Self {
            device,
            sessions: DashMap::with_hasher(ahash::RandomState::new()),
            next_id: AtomicU64::new(1),
            open: AtomicUsize::new(0),
            expired: AtomicU64::new(0),
            max_sessions,
            idle_timeout: None,
        }
    }

    /// Evicts sessions left unused for longer than `idle`.
    pub fn with_idle_timeout(mut self, idle: Duration) -> Self {
        self.idle_timeout = Some(idle);
        self
    }

    /// Drops every session idle for longer than the timeout and returns
    /// how many were dropped.
    pub fn evict_idle(&self) -> usize {
        let Some(idle) = self.idle_timeout else {
            return 0;
        };
        let mut evicted = 0;
        self.sessions.retain(|id, entry| {
            let keep = entry.last_used.elapsed() < idle;
            if !keep {
                debug!("Evicting idle info session {}", id);
                evicted += 1;
            }
            keep
        });
        if evicted > 0 {
            self.open.fetch_sub(evicted, Ordering::AcqRel);
            self.expired.fetch_add(evicted as u64, Ordering::Relaxed);
            info!("Evicted {} idle info sessions", evicted);
        }
        evicted
    }

    /// Opens a session and returns its id.
    pub fn open(&self) -> Result<u64> {
        self.evict_idle();

        // Reserve a slot first so concurrent opens cannot overshoot the bound.
        let reserved = self
            .open
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.max_sessions).then_some(n + 1)
            });
        if reserved.is_err() {
            warn!("Session table full ({} sessions)", self.max_sessions);
            return Err(TelemetryError::Allocation(format!(
                "session table full ({} open)",
                self.max_sessions
            )));
        }

        let handle = match self.device.open() {
            Ok(h) => h,
            Err(e) => {
                self.open.fetch_sub(1, Ordering::AcqRel);
                return Err(e);
            }
        };
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.sessions.insert(
            id,
            TableEntry {
                handle: Arc::new(handle),
                last_used: Instant::now(),
            },
        );
        info!("Opened info session {}", id);
        Ok(id)
    }

    /// Looks up a session and marks it as used.
    pub fn get(&self, id: u64) -> Result<Arc<InfoHandle>> {
        self.sessions
            .get_mut(&id)
            .map(|mut entry| {
                entry.last_used = Instant::now();
                Arc::clone(&entry.handle)
            })
            .ok_or(TelemetryError::UnknownSession(id))
    }

    /// Closes a session. Closing an id twice reports it as unknown.
    pub fn close(&self, id: u64) -> Result<()> {
        match self.sessions.remove(&id) {
            Some(_) => {
                self.open.fetch_sub(1, Ordering::AcqRel);
                info!("Closed info session {}", id);
                Ok(())
            }
            None => Err(TelemetryError::UnknownSession(id)),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn stats(&self) -> SessionTableStats {
        SessionTableStats {
            open_sessions: self.len(),
            max_sessions: self.max_sessions,
            total_opened: self.next_id.load(Ordering::Relaxed) - 1,
            total_expired: self.expired.load(Ordering::Relaxed),
        }
    }
}
