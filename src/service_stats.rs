//! Service statistics for the HTTP front end.
//!
//! Counters and running min/avg/max values for the info sessions and the
//! risk walk, rendered as a plain-text table.

use std::fmt::Write as FmtWrite;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use crate::error::TelemetryError;

/// Running statistics for a single metric.
#[derive(Clone, Copy, Default)]
pub struct RunningStat {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
    last: f64,
}

impl RunningStat {
    pub fn add(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
            self.last = value;
            self.sum = value;
            self.count = 1;
            return;
        }
        self.count += 1;
        self.sum += value;
        self.last = value;
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
    }

    pub fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / (self.count as f64)
        }
    }
}

/// Thread-safe wrapper for running statistics.
#[derive(Default)]
pub struct Stat {
    inner: Mutex<RunningStat>,
}

impl Stat {
    pub fn add_sample(&self, value: f64) {
        if let Ok(mut s) = self.inner.lock() {
            s.add(value);
        }
    }

    /// Returns (last, avg, max, min, count).
    pub fn snapshot(&self) -> (f64, f64, f64, f64, u64) {
        if let Ok(s) = self.inner.lock() {
            (s.last, s.avg(), s.max, s.min, s.count)
        } else {
            (0.0, 0.0, 0.0, 0.0, 0)
        }
    }
}

/// Counters for the info device and the risk report.
pub struct ServiceStats {
    pub sessions_opened: AtomicU64,
    pub sessions_closed: AtomicU64,
    pub mask_writes: AtomicU64,
    pub info_reads: AtomicU64,
    pub info_read_bytes: Stat,
    pub risk_reads: AtomicU64,
    pub risk_walk_ms: Stat,
    pub risk_rows: Stat,

    pub transfer_failures: AtomicU64,
    pub allocation_failures: AtomicU64,
    pub unknown_session_errors: AtomicU64,
    pub unavailable_errors: AtomicU64,

    pub start_time: Instant,
}

impl Default for ServiceStats {
    fn default() -> Self {
        Self {
            sessions_opened: AtomicU64::new(0),
            sessions_closed: AtomicU64::new(0),
            mask_writes: AtomicU64::new(0),
            info_reads: AtomicU64::new(0),
            info_read_bytes: Stat::default(),
            risk_reads: AtomicU64::new(0),
            risk_walk_ms: Stat::default(),
            risk_rows: Stat::default(),
            transfer_failures: AtomicU64::new(0),
            allocation_failures: AtomicU64::new(0),
            unknown_session_errors: AtomicU64::new(0),
            unavailable_errors: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }
}

impl ServiceStats {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn record_open(&self) {
        self.sessions_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_close(&self) {
        self.sessions_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write(&self) {
        self.mask_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_info_read(&self, bytes: usize) {
        self.info_reads.fetch_add(1, Ordering::Relaxed);
        self.info_read_bytes.add_sample(bytes as f64);
    }

    pub fn record_risk_read(&self, rows: usize, walk_ms: f64) {
        self.risk_reads.fetch_add(1, Ordering::Relaxed);
        self.risk_rows.add_sample(rows as f64);
        self.risk_walk_ms.add_sample(walk_ms);
    }

    /// Counts a failed call by error kind.
    pub fn record_error(&self, err: &TelemetryError) {
        let counter = match err {
            TelemetryError::Allocation(_) => &self.allocation_failures,
            TelemetryError::Transfer(_) => &self.transfer_failures,
            TelemetryError::UnknownSession(_) => &self.unknown_session_errors,
            TelemetryError::DeviceUnavailable { .. } | TelemetryError::Io(_) => {
                &self.unavailable_errors
            }
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Sessions opened and not yet closed.
    pub fn open_sessions(&self) -> u64 {
        let opened = self.sessions_opened.load(Ordering::Relaxed);
        let closed = self.sessions_closed.load(Ordering::Relaxed);
        opened.saturating_sub(closed)
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn render_table(&self) -> String {
        let (rb_cur, rb_avg, rb_max, rb_min, _) = self.info_read_bytes.snapshot();
        let (rw_cur, rw_avg, rw_max, rw_min, _) = self.risk_walk_ms.snapshot();
        let (rr_cur, rr_avg, rr_max, rr_min, _) = self.risk_rows.snapshot();

        let left_col = 26usize;
        let col_w = 12usize;

        let mut out = String::new();

        writeln!(out, "HEALTH ENDPOINT - SERVICE STATS").ok();
        writeln!(out, "===============================").ok();
        writeln!(out).ok();

        writeln!(
            out,
            "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
            "",
            "current",
            "average",
            "max",
            "min",
            left = left_col,
            col = col_w
        )
        .ok();

        writeln!(out).ok();
        writeln!(out, "INFO DEVICE").ok();
        writeln!(out, "-----------").ok();

        writeln!(
            out,
            "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
            "read_size (bytes)",
            format!("{:.0}", rb_cur),
            format!("{:.1}", rb_avg),
            format!("{:.0}", rb_max),
            format!("{:.0}", rb_min),
            left = left_col,
            col = col_w
        )
        .ok();

        writeln!(out).ok();
        writeln!(out, "RISK REPORT").ok();
        writeln!(out, "-----------").ok();

        writeln!(
            out,
            "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
            "walk_duration (ms)",
            format!("{:.2}", rw_cur),
            format!("{:.2}", rw_avg),
            format!("{:.2}", rw_max),
            format!("{:.2}", rw_min),
            left = left_col,
            col = col_w
        )
        .ok();

        writeln!(
            out,
            "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
            "rows_per_walk",
            format!("{:.0}", rr_cur),
            format!("{:.1}", rr_avg),
            format!("{:.0}", rr_max),
            format!("{:.0}", rr_min),
            left = left_col,
            col = col_w
        )
        .ok();

        writeln!(out).ok();
        writeln!(out, "COUNTERS").ok();
        writeln!(out, "--------").ok();

        let counters = [
            ("sessions_opened", self.sessions_opened.load(Ordering::Relaxed)),
            ("sessions_closed", self.sessions_closed.load(Ordering::Relaxed)),
            ("sessions_open", self.open_sessions()),
            ("mask_writes", self.mask_writes.load(Ordering::Relaxed)),
            ("info_reads", self.info_reads.load(Ordering::Relaxed)),
            ("risk_reads", self.risk_reads.load(Ordering::Relaxed)),
            ("transfer_failures", self.transfer_failures.load(Ordering::Relaxed)),
            ("allocation_failures", self.allocation_failures.load(Ordering::Relaxed)),
            ("unknown_session_errors", self.unknown_session_errors.load(Ordering::Relaxed)),
            ("device_unavailable", self.unavailable_errors.load(Ordering::Relaxed)),
            ("uptime_seconds", self.get_uptime_seconds()),
        ];
        for (name, value) in counters {
            writeln!(out, "{:left$} | {:>col$}", name, value, left = left_col, col = col_w).ok();
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stat_tracks_extremes() {
        let mut s = RunningStat::default();
        s.add(10.0);
        s.add(2.0);
        s.add(6.0);
        assert_eq!(s.min, 2.0);
        assert_eq!(s.max, 10.0);
        assert_eq!(s.last, 6.0);
        assert!((s.avg() - 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_stat_snapshot() {
        let stat = Stat::default();
        assert_eq!(stat.snapshot(), (0.0, 0.0, 0.0, 0.0, 0));
    }

    #[test]
    fn test_record_error_by_kind() {
        let stats = ServiceStats::new();
        stats.record_error(&TelemetryError::Transfer("short".into()));
        stats.record_error(&TelemetryError::Transfer("short".into()));
        stats.record_error(&TelemetryError::Allocation("full".into()));
        stats.record_error(&TelemetryError::UnknownSession(9));

        assert_eq!(stats.transfer_failures.load(Ordering::Relaxed), 2);
        assert_eq!(stats.allocation_failures.load(Ordering::Relaxed), 1);
        assert_eq!(stats.unknown_session_errors.load(Ordering::Relaxed), 1);
        assert_eq!(stats.unavailable_errors.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_open_sessions_never_negative() {
        let stats = ServiceStats::new();
        stats.record_open();
        stats.record_close();
        stats.record_close();
        assert_eq!(stats.open_sessions(), 0);
    }

    #[test]
    fn test_render_table_sections() {
        let stats = ServiceStats::new();
        stats.record_info_read(512);
        stats.record_risk_read(120, 3.5);

        let table = stats.render_table();
        assert!(table.starts_with("HEALTH ENDPOINT - SERVICE STATS"));
        assert!(table.contains("INFO DEVICE"));
        assert!(table.contains("RISK REPORT"));
        let reads = table
            .lines()
            .find(|l| l.starts_with("info_reads"))
            .expect("info_reads row");
        assert!(reads.trim_end().ends_with('1'));
    }
}
