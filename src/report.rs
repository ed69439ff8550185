//! Info report formatting.
//!
//! Every line is a logo cell padded to [`PAD_WIDTH`], a space, and a value.
//! Output is bounded by a capacity; a line that does not fit whole is
//! dropped, so truncation never leaves a partial line.

use crate::error::{Result, TelemetryError};
use crate::fields::{self, Field};
use crate::system::SystemSnapshot;

/// Scratch size of one rendered report.
pub const PAGE_SIZE: usize = 4096;

/// Width of the decorative left column.
pub const PAD_WIDTH: usize = 32;

/// Separator printed under the hostname.
pub const SEPARATOR: &str = "----------------------------------";

/// Decorative rows. Rows past the end are rendered as blank padding.
pub const LOGO: [&str; 6] = [
    "   ____ _____ ",
    "  / ___|___  |",
    " | |  _   / / ",
    " | |_| | / /  ",
    "  \\____|/_/   ",
    "              ",
];

/// Capacity-bounded text buffer that only accepts whole lines.
///
/// Once a line is rejected every later line is rejected too, so the
/// content is always a prefix of the untruncated output.
#[derive(Debug)]
pub struct LineBuffer {
    buf: String,
    capacity: usize,
    dropped: usize,
}

impl LineBuffer {
    /// Reserves scratch space up front; fails with an allocation error
    /// instead of aborting when memory is short.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        let mut buf = String::new();
        buf.try_reserve(capacity.min(PAGE_SIZE))
            .map_err(|e| TelemetryError::Allocation(format!("report buffer: {}", e)))?;
        Ok(Self {
            buf,
            capacity,
            dropped: 0,
        })
    }

    /// Appends `line` plus a newline if it fits entirely.
    pub fn push_line(&mut self, line: &str) -> bool {
        if self.dropped > 0 || self.buf.len() + line.len() + 1 > self.capacity {
            self.dropped += 1;
            return false;
        }
        self.buf.push_str(line);
        self.buf.push('\n');
        true
    }

    /// Lines rejected for lack of room.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn into_string(self) -> String {
        self.buf
    }
}

/// Hands out logo rows in order, then blank padding.
struct LogoColumn {
    next: usize,
}

impl LogoColumn {
    fn new() -> Self {
        Self { next: 0 }
    }

    fn cell(&mut self) -> &'static str {
        let cell = LOGO.get(self.next).copied().unwrap_or("");
        self.next += 1;
        cell
    }
}

fn field_text(field: Field, snap: &SystemSnapshot) -> String {
    match field {
        Field::KernelRelease => format!("Kernel: {}", snap.release),
        Field::CpuModel => format!("CPU: {}", snap.cpu_model),
        Field::CpuCount => format!("CPUs: {}/{}", snap.cpus_online, snap.cpus_possible),
        Field::Memory => format!("Mem: {}MB/{}MB", snap.mem_free_mb, snap.mem_total_mb),
        Field::ProcessCount => format!("Proc: {}", snap.process_count),
        Field::Uptime => format!("Uptime: {} min", snap.uptime_minutes),
    }
}

/// Renders the info report for `mask` into at most `capacity` bytes.
///
/// The hostname and separator lines are always present; one line follows
/// per enabled field in [`fields::RENDER_ORDER`].
pub fn render_info(snap: &SystemSnapshot, mask: i32, capacity: usize) -> Result<String> {
    let mut out = LineBuffer::with_capacity(capacity)?;
    let mut logo = LogoColumn::new();

    out.push_line(&format!("{:<PAD_WIDTH$} {}", logo.cell(), snap.hostname));
    out.push_line(&format!("{:<PAD_WIDTH$} {}", logo.cell(), SEPARATOR));

    for field in fields::selected(mask) {
        let text = field_text(field, snap);
        out.push_line(&format!("{:<PAD_WIDTH$} {}", logo.cell(), text));
    }

    if out.dropped() > 0 {
        tracing::debug!(
            "Info report truncated: {} line(s) dropped at capacity {}",
            out.dropped(),
            capacity
        );
    }
    Ok(out.into_string())
}
