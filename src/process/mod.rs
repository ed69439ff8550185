//! Process-related modules for the risk report.
//!
//! This module provides:
//! - `scanner`: Process discovery and pinning under the proc root
//! - `metrics`: Per-process attribute extraction from /proc/<pid>
//! - `risk`: Additive risk scoring and bucketing

pub mod metrics;
pub mod risk;
pub mod scanner;

// Re-export commonly used types
pub use metrics::{collect_snapshots, extract_snapshot, CpuLimit, ProcessSnapshot, StatFields, CLK_TCK};
pub use risk::{score, RiskBucket, RiskScore};
pub use scanner::{PinnedProcess, ProcEntry, ProcessWalk};
