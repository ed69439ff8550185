//! Per-process attribute extraction.
//!
//! This module parses `/proc/<pid>/{stat,status,io,limits}` into a
//! [`ProcessSnapshot`]. Snapshots are built, scored and dropped within a
//! single report pass.

use once_cell::sync::Lazy;
use rayon::prelude::*;
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;

use crate::process::scanner::{PinnedProcess, ProcEntry, ProcessWalk};
use crate::system::parse_kb_value;

/// `PF_EXITING` from include/linux/sched.h.
pub const PF_EXITING: u64 = 0x0000_0004;
/// `PF_KTHREAD` from include/linux/sched.h.
pub const PF_KTHREAD: u64 = 0x0020_0000;
/// `MAX_RT_PRIO`; /proc/<pid>/stat reports `prio - MAX_RT_PRIO`.
pub const MAX_RT_PRIO: i64 = 100;

/// Get system clock ticks per second (usually 100, but can vary).
fn get_clk_tck() -> u64 {
    #[cfg(unix)]
    {
        // SAFETY: sysconf is safe to call with _SC_CLK_TCK
        // Returns -1 on error, 0 if undefined - both are handled by the > 0 check
        unsafe {
            let tck = libc::sysconf(libc::_SC_CLK_TCK);
            if tck > 0 {
                return tck as u64;
            }
        }
    }
    100
}

/// System clock ticks per second (unit of the CPU time column).
pub static CLK_TCK: Lazy<u64> = Lazy::new(get_clk_tck);

/// Soft CPU-time resource limit of a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CpuLimit {
    Seconds(u64),
    #[default]
    Unlimited,
    /// Kernel threads carry no meaningful limit.
    NotApplicable,
}

impl std::fmt::Display for CpuLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CpuLimit::Seconds(s) => write!(f, "{}", s),
            CpuLimit::Unlimited => f.write_str("unlimited"),
            CpuLimit::NotApplicable => f.write_str("n/a"),
        }
    }
}

/// Attributes of one process at one instant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessSnapshot {
    pub pid: u32,
    pub comm: String,
    /// Cumulative user + system time in clock ticks.
    pub cpu_ticks: u64,
    pub rss_kb: u64,
    pub read_bytes: u64,
    pub write_bytes: u64,
    /// Raw kernel priority; lower value means higher scheduling priority.
    pub priority: i64,
    pub running: bool,
    pub exiting: bool,
    pub kernel_thread: bool,
    /// Effective uid; `None` for kernel threads.
    pub euid: Option<u32>,
    pub cpu_limit: CpuLimit,
}

impl ProcessSnapshot {
    pub fn is_privileged(&self) -> bool {
        self.euid == Some(0)
    }
}

/// Fields of interest from one `/proc/<pid>/stat` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatFields {
    pub comm: String,
    pub state: char,
    pub flags: u64,
    pub utime: u64,
    pub stime: u64,
    /// `prio - MAX_RT_PRIO` as printed by the kernel.
    pub priority: i64,
    pub start_ticks: u64,
}

impl StatFields {
    pub fn read(proc_path: &Path) -> io::Result<Self> {
        let content = fs::read_to_string(proc_path.join("stat"))?;
        Self::parse(&content)
    }

    /// Parses a stat line. The command name may contain spaces and
    /// parentheses, so fields are located relative to the last `)`.
    pub fn parse(content: &str) -> io::Result<Self> {
        let open = content
            .find('(')
            .ok_or_else(|| io::Error::other("Invalid stat format: no '('"))?;
        let close = content
            .rfind(')')
            .ok_or_else(|| io::Error::other("Invalid stat format: no ')'"))?;
        if close < open {
            return Err(io::Error::other("Invalid stat format"));
        }
        let comm = content[open + 1..close].to_string();

        // rest[0] is field 3 (state)
        let rest: Vec<&str> = content[close + 1..].split_whitespace().collect();
        if rest.len() < 20 {
            return Err(io::Error::other("Invalid stat format"));
        }

        let num = |idx: usize, name: &str| -> io::Result<u64> {
            rest[idx]
                .parse()
                .map_err(|_| io::Error::other(format!("Failed to parse {} field", name)))
        };

        Ok(Self {
            comm,
            state: rest[0].chars().next().unwrap_or('?'),
            flags: num(6, "flags")?,
            utime: num(11, "utime")?,
            stime: num(12, "stime")?,
            priority: rest[15]
                .parse()
                .map_err(|_| io::Error::other("Failed to parse priority field"))?,
            start_ticks: num(19, "starttime")?,
        })
    }

    pub fn is_kernel_thread(&self) -> bool {
        self.flags & PF_KTHREAD != 0
    }

    pub fn is_exiting(&self) -> bool {
        self.flags & PF_EXITING != 0
    }

    /// On a run queue or currently executing.
    pub fn is_running(&self) -> bool {
        self.state == 'R'
    }
}

/// Values taken from `/proc/<pid>/status`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusFields {
    pub rss_kb: u64,
    pub euid: Option<u32>,
}

/// Reads VmRSS and the effective uid from /proc/<pid>/status.
/// VmRSS is absent for processes without a memory map and reads as 0.
pub fn read_status(proc_path: &Path) -> io::Result<StatusFields> {
    let content = fs::read_to_string(proc_path.join("status"))?;
    Ok(parse_status(&content))
}

fn parse_status(content: &str) -> StatusFields {
    let mut out = StatusFields::default();
    for line in content.lines() {
        if let Some(v) = line.strip_prefix("VmRSS:") {
            out.rss_kb = parse_kb_value(v).unwrap_or(0);
        } else if let Some(v) = line.strip_prefix("Uid:") {
            // real, effective, saved, filesystem
            out.euid = v.split_whitespace().nth(1).and_then(|s| s.parse().ok());
        }
    }
    out
}

/// Reads cumulative storage I/O from /proc/<pid>/io.
/// Returns (read_bytes, write_bytes).
/// Note: Requires appropriate permissions (usually root or CAP_SYS_PTRACE).
pub fn read_block_io(proc_path: &Path) -> Result<(u64, u64), std::io::Error> {
    let content = fs::read_to_string(proc_path.join("io"))?;

    let mut read_bytes = 0u64;
    let mut write_bytes = 0u64;
    let mut found_read = false;
    let mut found_write = false;

    for line in content.lines() {
        if let Some(v) = line.strip_prefix("read_bytes:") {
            read_bytes = v.trim().parse().unwrap_or(0);
            found_read = true;
        } else if let Some(v) = line.strip_prefix("write_bytes:") {
            write_bytes = v.trim().parse().unwrap_or(0);
            found_write = true;
        }

        if found_read && found_write {
            break;
        }
    }

    Ok((read_bytes, write_bytes))
}

/// Reads the soft `Max cpu time` limit from /proc/<pid>/limits.
pub fn read_cpu_limit(proc_path: &Path) -> io::Result<CpuLimit> {
    let content = fs::read_to_string(proc_path.join("limits"))?;
    parse_cpu_limit(&content).ok_or_else(|| io::Error::other("No 'Max cpu time' row in limits"))
}

fn parse_cpu_limit(content: &str) -> Option<CpuLimit> {
    let row = content.lines().find_map(|l| l.strip_prefix("Max cpu time"))?;
    let soft = row.split_whitespace().next()?;
    if soft == "unlimited" {
        Some(CpuLimit::Unlimited)
    } else {
        soft.parse().ok().map(CpuLimit::Seconds)
    }
}

/// Builds the snapshot of a pinned process.
///
/// Fails when the process disappears while its files are being read; the
/// caller drops such processes from the report.
pub fn extract_snapshot(pinned: &PinnedProcess) -> io::Result<ProcessSnapshot> {
    let stat = &pinned.stat;
    let path = pinned.path();
    let kernel_thread = stat.is_kernel_thread();

    let status = read_status(path)?;

    let (read_bytes, write_bytes) = match read_block_io(path) {
        Ok(v) => v,
        Err(e) => {
            debug!("I/O counters unavailable for pid {}: {}", pinned.pid(), e);
            (0, 0)
        }
    };

    let (euid, cpu_limit) = if kernel_thread {
        (None, CpuLimit::NotApplicable)
    } else {
        (status.euid, read_cpu_limit(path)?)
    };

    Ok(ProcessSnapshot {
        pid: pinned.pid(),
        comm: stat.comm.clone(),
        cpu_ticks: stat.utime + stat.stime,
        rss_kb: if kernel_thread { 0 } else { status.rss_kb },
        read_bytes,
        write_bytes,
        priority: stat.priority + MAX_RT_PRIO,
        running: stat.is_running(),
        exiting: stat.is_exiting(),
        kernel_thread,
        euid,
        cpu_limit,
    })
}

/// Pins, extracts and releases one process. `None` if it vanished.
fn snapshot_entry(entry: &ProcEntry) -> Option<ProcessSnapshot> {
    let pinned = match entry.pin() {
        Ok(p) => p,
        Err(e) => {
            debug!("Skipping pid {}: {}", entry.pid, e);
            return None;
        }
    };
    let snapshot = match extract_snapshot(&pinned) {
        Ok(s) => s,
        Err(e) => {
            debug!("Skipping pid {}: {}", entry.pid, e);
            return None;
        }
    };
    if !pinned.still_valid() {
        debug!("Skipping pid {}: exited or reused during extraction", entry.pid);
        return None;
    }
    Some(snapshot)
}

/// Walks the proc root and returns one snapshot per live process, by pid.
pub fn collect_snapshots(proc_root: &Path) -> io::Result<Vec<ProcessSnapshot>> {
    let mut entries: Vec<ProcEntry> = ProcessWalk::new(proc_root)?.collect();
    entries.sort_unstable_by_key(|e| e.pid);

    Ok(entries.par_iter().filter_map(snapshot_entry).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const STAT: &str = "1234 (test_process) R 1 1234 1234 0 -1 4194304 100 0 0 0 1000 500 0 0 20 0 1 0 12345 12345678 1234 18446744073709551615 4194304 4238788 140736466511168 0 0 0 0 0 0 0 0 0 17 1 0 0 0 0 0";

    const LIMITS: &str = "Limit                     Soft Limit           Hard Limit           Units     \n\
Max cpu time              5                    unlimited            seconds   \n\
Max file size             unlimited            unlimited            bytes     \n";

    #[test]
    fn test_parse_stat() {
        let stat = StatFields::parse(STAT).expect("stat should parse");
        assert_eq!(stat.comm, "test_process");
        assert_eq!(stat.state, 'R');
        assert_eq!(stat.utime, 1000);
        assert_eq!(stat.stime, 500);
        assert_eq!(stat.priority, 20);
        assert_eq!(stat.start_ticks, 12345);
        assert!(stat.is_running());
        assert!(!stat.is_kernel_thread());
        assert!(!stat.is_exiting());
    }

    #[test]
    fn test_parse_stat_comm_with_parens_and_spaces() {
        let line = "99 (my (odd) proc) S 1 99 99 0 -1 2097156 0 0 0 0 7 8 0 0 20 0 1 0 555 0 0";
        let stat = StatFields::parse(line).expect("stat should parse");
        assert_eq!(stat.comm, "my (odd) proc");
        assert_eq!(stat.state, 'S');
        assert!(stat.is_kernel_thread());
        assert!(stat.is_exiting());
        assert_eq!(stat.start_ticks, 555);
    }

    #[test]
    fn test_parse_stat_invalid() {
        assert!(StatFields::parse("1234 (test) S 1 2 3").is_err());
        assert!(StatFields::parse("garbage").is_err());
    }

    #[test]
    fn test_parse_status() {
        let status = "Name:\tbash\nUid:\t1000\t0\t1000\t1000\nGid:\t1000\t1000\t1000\t1000\nVmRSS:\t    5120 kB\n";
        let fields = parse_status(status);
        assert_eq!(fields.rss_kb, 5120);
        assert_eq!(fields.euid, Some(0));

        // Kernel threads have no VmRSS line
        let fields = parse_status("Name:\tkworker/0:1\nUid:\t0\t0\t0\t0\n");
        assert_eq!(fields.rss_kb, 0);
    }

    #[test]
    fn test_parse_cpu_limit() {
        assert_eq!(parse_cpu_limit(LIMITS), Some(CpuLimit::Seconds(5)));
        let unlimited = LIMITS.replace("Max cpu time              5 ", "Max cpu time              unlimited ");
        assert_eq!(parse_cpu_limit(&unlimited), Some(CpuLimit::Unlimited));
        assert_eq!(parse_cpu_limit("Limit Soft Hard Units\n"), None);
    }

    #[test]
    fn test_read_block_io_missing_file() {
        let dir = tempdir().expect("Failed to create temp dir");
        assert!(read_block_io(dir.path()).is_err());
    }

    #[test]
    fn test_extract_snapshot_user_process() {
        let dir = tempdir().expect("Failed to create temp dir");
        let p = dir.path();
        fs::write(p.join("stat"), STAT).unwrap();
        fs::write(p.join("status"), "Uid:\t1000\t1000\t1000\t1000\nVmRSS:\t  2048 kB\n").unwrap();
        fs::write(p.join("io"), "rchar: 1\nwchar: 2\nread_bytes: 4096\nwrite_bytes: 8192\n").unwrap();
        fs::write(p.join("limits"), LIMITS).unwrap();

        let entry = ProcEntry {
            pid: 1234,
            proc_path: p.to_path_buf(),
        };
        let snap = extract_snapshot(&entry.pin().unwrap()).expect("extract should succeed");
        assert_eq!(snap.pid, 1234);
        assert_eq!(snap.comm, "test_process");
        assert_eq!(snap.cpu_ticks, 1500);
        assert_eq!(snap.rss_kb, 2048);
        assert_eq!((snap.read_bytes, snap.write_bytes), (4096, 8192));
        assert_eq!(snap.priority, 120);
        assert!(snap.running);
        assert_eq!(snap.euid, Some(1000));
        assert_eq!(snap.cpu_limit, CpuLimit::Seconds(5));
    }

    #[test]
    fn test_extract_snapshot_kernel_thread_without_io() {
        let dir = tempdir().expect("Failed to create temp dir");
        let p = dir.path();
        let stat = STAT.replace(" 4194304 100 ", " 2097152 100 ");
        fs::write(p.join("stat"), stat).unwrap();
        fs::write(p.join("status"), "Uid:\t0\t0\t0\t0\n").unwrap();

        let entry = ProcEntry {
            pid: 1234,
            proc_path: p.to_path_buf(),
        };
        let snap = extract_snapshot(&entry.pin().unwrap()).expect("extract should succeed");
        assert!(snap.kernel_thread);
        assert_eq!(snap.euid, None);
        assert_eq!(snap.cpu_limit, CpuLimit::NotApplicable);
        assert_eq!(snap.rss_kb, 0);
        assert_eq!((snap.read_bytes, snap.write_bytes), (0, 0));
    }

    #[test]
    fn test_cpu_limit_display() {
        assert_eq!(CpuLimit::Seconds(3).to_string(), "3");
        assert_eq!(CpuLimit::Unlimited.to_string(), "unlimited");
        assert_eq!(CpuLimit::NotApplicable.to_string(), "n/a");
    }
}
