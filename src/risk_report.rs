//! Tabular per-process risk report.
//!
//! Each render walks the proc root afresh: header, one row per live
//! process, then a legend. There is no selection state.

use std::fmt::Write as FmtWrite;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

use crate::error::{Result, TelemetryError};
use crate::process::{collect_snapshots, score, ProcessSnapshot, RiskScore, CLK_TCK};
use crate::process::risk::{CPU_LIMIT_THRESHOLD_SECS, IO_THRESHOLD_BYTES, LOW_MAX, MEDIUM_MAX};

/// Widest command name the kernel keeps (TASK_COMM_LEN - 1).
const COMM_WIDTH: usize = 15;

/// One scored process.
#[derive(Debug, Clone)]
pub struct RiskRow {
    pub process: ProcessSnapshot,
    pub risk: RiskScore,
}

/// Rows of one walk, ordered by pid.
#[derive(Debug, Clone, Default)]
pub struct RiskReport {
    pub rows: Vec<RiskRow>,
}

impl RiskReport {
    /// Walks `proc_root`, scoring every process that stays alive for the
    /// duration of its own extraction.
    pub fn collect(proc_root: &Path) -> Result<Self> {
        let start = Instant::now();
        let snapshots =
            collect_snapshots(proc_root).map_err(|source| TelemetryError::DeviceUnavailable {
                path: proc_root.display().to_string(),
                source,
            })?;

        let rows: Vec<RiskRow> = snapshots
            .into_iter()
            .map(|process| RiskRow {
                risk: score(&process),
                process,
            })
            .collect();

        info!(
            "Risk walk scored {} processes in {:.2}ms",
            rows.len(),
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(Self { rows })
    }

    pub fn render(&self) -> String {
        let mut out = String::with_capacity(128 * (self.rows.len() + 12));
        out.push_str(&header());
        out.push('\n');
        out.push_str(&"-".repeat(header().len()));
        out.push('\n');
        for row in &self.rows {
            out.push_str(&format_row(row));
            out.push('\n');
        }
        out.push_str(&legend());
        debug!("Rendered risk report: {} bytes", out.len());
        out
    }
}

fn header() -> String {
    format!(
        "{:<8} {:<COMM_WIDTH$} {:<4} {:>12} {:>10} {:>14} {:>14} {:>4} {:>3} {:>4} {:>6} {:>9} {:>5} {}",
        "PID",
        "COMM",
        "TYPE",
        "CPU_TICKS",
        "RSS_KB",
        "READ_BYTES",
        "WRITE_BYTES",
        "PRIO",
        "RUN",
        "EXIT",
        "EUID",
        "CPU_LIMIT",
        "SCORE",
        "RISK"
    )
}

fn yes_no(v: bool) -> &'static str {
    if v {
        "Y"
    } else {
        "N"
    }
}

fn format_row(row: &RiskRow) -> String {
    let p = &row.process;
    let comm: String = p.comm.chars().take(COMM_WIDTH).collect();
    let euid = p.euid.map(|u| u.to_string()).unwrap_or_else(|| "-".into());
    format!(
        "{:<8} {:<COMM_WIDTH$} {:<4} {:>12} {:>10} {:>14} {:>14} {:>4} {:>3} {:>4} {:>6} {:>9} {:>5} {}",
        p.pid,
        comm,
        if p.kernel_thread { "kern" } else { "user" },
        p.cpu_ticks,
        p.rss_kb,
        p.read_bytes,
        p.write_bytes,
        p.priority,
        yes_no(p.running),
        yes_no(p.exiting),
        euid,
        p.cpu_limit.to_string(),
        row.risk.score,
        row.risk.bucket
    )
}

fn legend() -> String {
    let io_mib = IO_THRESHOLD_BYTES / (1024 * 1024);
    let mut out = String::new();
    writeln!(out).ok();
    writeln!(out, "Legend:").ok();
    writeln!(
        out,
        "  CPU_TICKS  user+system time in clock ticks ({} per second)",
        *CLK_TCK
    )
    .ok();
    writeln!(out, "  PRIO       kernel priority, lower is scheduled first").ok();
    writeln!(out, "  RUN        running or on a run queue; EXIT exiting").ok();
    writeln!(out, "  EUID       effective uid, '-' for kernel threads").ok();
    writeln!(
        out,
        "  CPU_LIMIT  soft CPU-time limit in seconds, 'unlimited', or 'n/a' for kernel threads"
    )
    .ok();
    writeln!(out, "Scoring:").ok();
    writeln!(out, "  kern: +1 running, +1 exiting").ok();
    writeln!(
        out,
        "  user: +1 CPU limit < {}s, +1 running, +1 read > {} MiB, +1 written > {} MiB,",
        CPU_LIMIT_THRESHOLD_SECS, io_mib, io_mib
    )
    .ok();
    writeln!(out, "        +2 euid 0, +2 exiting").ok();
    writeln!(
        out,
        "  RISK: score <= {} LOW, <= {} MEDIUM, otherwise HIGH",
        LOW_MAX, MEDIUM_MAX
    )
    .ok();
    writeln!(out, "Note: scores are heuristics for triage, not a security control.").ok();
    out
}
