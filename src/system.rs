//! System-wide vitals for the info report.
//!
//! This module reads host-level values (release, CPU model and counts,
//! memory, process count, uptime) from procfs and sysfs and aggregates
//! them into a [`SystemSnapshot`]. Nothing is cached between calls.

use std::fs;
use std::io;
use tracing::{debug, warn};

use crate::fields::Field;
use crate::paths::HostPaths;
use crate::process::ProcessWalk;

/// Placeholder used when a string value cannot be read.
pub const UNKNOWN: &str = "unknown";

/// Point-in-time host values rendered by the info report.
///
/// Fields whose [`Field`] was not requested are left at their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemSnapshot {
    pub hostname: String,
    pub release: String,
    pub cpu_model: String,
    pub cpus_online: u32,
    pub cpus_possible: u32,
    pub mem_free_mb: u64,
    pub mem_total_mb: u64,
    pub process_count: usize,
    pub uptime_minutes: u64,
}

impl SystemSnapshot {
    /// Reads the hostname plus every value selected by `mask`.
    ///
    /// Unreadable sources degrade to `unknown` / zero and are logged; a
    /// snapshot is always produced.
    pub fn collect(paths: &HostPaths, mask: i32) -> Self {
        let mut snap = SystemSnapshot {
            hostname: read_hostname(paths).unwrap_or_else(|e| {
                warn!("Failed to read hostname: {}", e);
                UNKNOWN.to_string()
            }),
            ..Default::default()
        };

        if Field::KernelRelease.is_set(mask) {
            snap.release = read_release(paths).unwrap_or_else(|e| {
                warn!("Failed to read kernel release: {}", e);
                UNKNOWN.to_string()
            });
        }
        if Field::CpuModel.is_set(mask) {
            snap.cpu_model = read_cpu_model(paths).unwrap_or_else(|e| {
                warn!("Failed to read CPU model: {}", e);
                UNKNOWN.to_string()
            });
        }
        if Field::CpuCount.is_set(mask) {
            let (online, possible) = read_cpu_counts(paths);
            snap.cpus_online = online;
            snap.cpus_possible = possible;
        }
        if Field::Memory.is_set(mask) {
            match read_memory_mb(paths) {
                Ok((free, total)) => {
                    snap.mem_free_mb = free;
                    snap.mem_total_mb = total;
                }
                Err(e) => warn!("Failed to read memory info: {}", e),
            }
        }
        if Field::ProcessCount.is_set(mask) {
            snap.process_count = count_processes(paths);
        }
        if Field::Uptime.is_set(mask) {
            snap.uptime_minutes = match read_uptime_seconds(paths) {
                Ok(secs) => (secs / 60.0) as u64,
                Err(e) => {
                    warn!("Failed to read uptime: {}", e);
                    0
                }
            };
        }

        debug!("Collected system snapshot for mask {}: {:?}", mask, snap);
        snap
    }
}

fn read_trimmed(path: std::path::PathBuf) -> io::Result<String> {
    Ok(fs::read_to_string(path)?.trim().to_string())
}

/// Reads the node name from /proc/sys/kernel/hostname.
pub fn read_hostname(paths: &HostPaths) -> io::Result<String> {
    read_trimmed(paths.proc("sys/kernel/hostname"))
}

/// Reads the kernel release string from /proc/sys/kernel/osrelease.
pub fn read_release(paths: &HostPaths) -> io::Result<String> {
    read_trimmed(paths.proc("sys/kernel/osrelease"))
}

/// Reads the model string of the first logical CPU from /proc/cpuinfo.
///
/// x86 exposes `model name`; other architectures use `Processor`,
/// `cpu model` or `Hardware`. Only the first processor block is inspected.
pub fn read_cpu_model(paths: &HostPaths) -> io::Result<String> {
    let content = fs::read_to_string(paths.proc("cpuinfo"))?;
    Ok(parse_cpu_model(&content).unwrap_or_else(|| UNKNOWN.to_string()))
}

fn parse_cpu_model(cpuinfo: &str) -> Option<String> {
    const KEYS: [&str; 4] = ["model name", "Processor", "cpu model", "Hardware"];

    let first_block = cpuinfo.split("\n\n").next().unwrap_or("");
    for key in KEYS {
        for line in first_block.lines() {
            if let Some((k, v)) = line.split_once(':') {
                if k.trim() == key && !v.trim().is_empty() {
                    return Some(v.trim().to_string());
                }
            }
        }
    }
    // Some kernels put Hardware after the per-CPU blocks
    cpuinfo.lines().find_map(|line| {
        let (k, v) = line.split_once(':')?;
        (k.trim() == "Hardware" && !v.trim().is_empty()).then(|| v.trim().to_string())
    })
}

/// Counts CPUs in a sysfs cpulist such as `0-3,6,8-9`.
pub fn parse_cpu_list(list: &str) -> Option<u32> {
    let list = list.trim();
    if list.is_empty() {
        return Some(0);
    }
    let mut count = 0u32;
    for part in list.split(',') {
        match part.split_once('-') {
            Some((lo, hi)) => {
                let lo: u32 = lo.trim().parse().ok()?;
                let hi: u32 = hi.trim().parse().ok()?;
                if hi < lo {
                    return None;
                }
                count = count.checked_add((hi - lo).checked_add(1)?)?;
            }
            None => {
                part.trim().parse::<u32>().ok()?;
                count = count.checked_add(1)?;
            }
        }
    }
    Some(count)
}

/// Returns (online, possible) CPU counts.
///
/// Falls back to counting `processor` entries in /proc/cpuinfo for both
/// values when the sysfs cpulists are not available.
pub fn read_cpu_counts(paths: &HostPaths) -> (u32, u32) {
    let from_sys = |name: &str| -> Option<u32> {
        let content = fs::read_to_string(paths.sys(format!("devices/system/cpu/{name}"))).ok()?;
        parse_cpu_list(&content)
    };

    let fallback = || -> u32 {
        fs::read_to_string(paths.proc("cpuinfo"))
            .map(|c| {
                c.lines()
                    .filter(|l| l.split(':').next().map(str::trim) == Some("processor"))
                    .count() as u32
            })
            .unwrap_or(0)
    };

    let online = from_sys("online").unwrap_or_else(|| {
        debug!("sysfs online cpulist unavailable, counting /proc/cpuinfo");
        fallback()
    });
    let possible = from_sys("possible").unwrap_or(online);
    (online, possible)
}

/// Reads free and total RAM from /proc/meminfo, in megabytes.
pub fn read_memory_mb(paths: &HostPaths) -> io::Result<(u64, u64)> {
    let content = fs::read_to_string(paths.proc("meminfo"))?;

    let mut free_kb: Option<u64> = None;
    let mut total_kb: Option<u64> = None;

    for line in content.lines() {
        if let Some(v) = line.strip_prefix("MemTotal:") {
            total_kb = parse_kb_value(v);
        } else if let Some(v) = line.strip_prefix("MemFree:") {
            free_kb = parse_kb_value(v);
        }
        if free_kb.is_some() && total_kb.is_some() {
            break;
        }
    }

    match (free_kb, total_kb) {
        (Some(free), Some(total)) => Ok((free / 1024, total / 1024)),
        _ => Err(io::Error::other(
            "MemFree/MemTotal missing from /proc/meminfo",
        )),
    }
}

/// Parses kilobyte values from `Key:   1234 kB` lines.
pub fn parse_kb_value(v: &str) -> Option<u64> {
    v.split_whitespace().next()?.parse().ok()
}

/// Counts the processes currently listed under the proc root.
pub fn count_processes(paths: &HostPaths) -> usize {
    match ProcessWalk::new(&paths.proc_root) {
        Ok(walk) => walk.count(),
        Err(e) => {
            warn!("Failed to scan {}: {}", paths.proc_root.display(), e);
            0
        }
    }
}

/// Reads time since boot from /proc/uptime, in seconds.
pub fn read_uptime_seconds(paths: &HostPaths) -> io::Result<f64> {
    let content = fs::read_to_string(paths.proc("uptime"))?;
    content
        .split_whitespace()
        .next()
        .ok_or_else(|| io::Error::other("empty /proc/uptime"))?
        .parse::<f64>()
        .map_err(|e| io::Error::other(format!("Failed to parse uptime: {}", e)))
}
