//! Additive risk scoring for process snapshots.
//!
//! Two disjoint policies apply: one for kernel threads and one for user
//! processes. The score is a heuristic classifier and must never be used
//! to gate access.

use std::fmt;

use crate::process::metrics::{CpuLimit, ProcessSnapshot};

/// A finite CPU-time limit below this many seconds adds to the score.
pub const CPU_LIMIT_THRESHOLD_SECS: u64 = 10;
/// Cumulative read or written bytes above this add to the score.
pub const IO_THRESHOLD_BYTES: u64 = 100 * 1024 * 1024;

pub const RUNNING_WEIGHT: u32 = 1;
pub const EXITING_KTHREAD_WEIGHT: u32 = 1;
pub const EXITING_USER_WEIGHT: u32 = 2;
pub const LOW_CPU_LIMIT_WEIGHT: u32 = 1;
pub const HEAVY_IO_WEIGHT: u32 = 1;
pub const PRIVILEGED_WEIGHT: u32 = 2;

/// Highest score still bucketed as Low.
pub const LOW_MAX: u32 = 1;
/// Highest score still bucketed as Medium.
pub const MEDIUM_MAX: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RiskBucket {
    Low,
    Medium,
    High,
}

impl RiskBucket {
    pub fn from_score(score: u32) -> Self {
        if score <= LOW_MAX {
            RiskBucket::Low
        } else if score <= MEDIUM_MAX {
            RiskBucket::Medium
        } else {
            RiskBucket::High
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskBucket::Low => "LOW",
            RiskBucket::Medium => "MEDIUM",
            RiskBucket::High => "HIGH",
        }
    }
}

impl fmt::Display for RiskBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiskScore {
    pub score: u32,
    pub bucket: RiskBucket,
}

impl RiskScore {
    fn new(score: u32) -> Self {
        Self {
            score,
            bucket: RiskBucket::from_score(score),
        }
    }
}

/// Scores one process.
pub fn score(p: &ProcessSnapshot) -> RiskScore {
    if p.kernel_thread {
        RiskScore::new(kernel_thread_score(p))
    } else {
        RiskScore::new(user_process_score(p))
    }
}

fn kernel_thread_score(p: &ProcessSnapshot) -> u32 {
    let mut s = 0;
    if p.running {
        s += RUNNING_WEIGHT;
    }
    if p.exiting {
        s += EXITING_KTHREAD_WEIGHT;
    }
    s
}

fn user_process_score(p: &ProcessSnapshot) -> u32 {
    let mut s = 0;
    if matches!(p.cpu_limit, CpuLimit::Seconds(secs) if secs < CPU_LIMIT_THRESHOLD_SECS) {
        s += LOW_CPU_LIMIT_WEIGHT;
    }
    if p.running {
        s += RUNNING_WEIGHT;
    }
    if p.read_bytes > IO_THRESHOLD_BYTES {
        s += HEAVY_IO_WEIGHT;
    }
    if p.write_bytes > IO_THRESHOLD_BYTES {
        s += HEAVY_IO_WEIGHT;
    }
    if p.is_privileged() {
        s += PRIVILEGED_WEIGHT;
    }
    if p.exiting {
        s += EXITING_USER_WEIGHT;
    }
    s
}
