//! Synthetic procfs/sysfs trees for integration tests.

#![allow(dead_code)]

use kfetch_telemetry::process::metrics::{PF_EXITING, PF_KTHREAD};
use kfetch_telemetry::HostPaths;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub const HOSTNAME: &str = "fakehost";
pub const RELEASE: &str = "6.8.0-test";
pub const CPU_MODEL: &str = "Test CPU @ 3.00GHz";

/// A temporary host with fixed vitals and no processes.
pub struct FakeHost {
    pub dir: TempDir,
    pub paths: HostPaths,
}

impl FakeHost {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let proc_root = dir.path().join("proc");
        let sys_root = dir.path().join("sys");

        fs::create_dir_all(proc_root.join("sys/kernel")).unwrap();
        fs::create_dir_all(sys_root.join("devices/system/cpu")).unwrap();

        fs::write(proc_root.join("sys/kernel/hostname"), format!("{HOSTNAME}\n")).unwrap();
        fs::write(proc_root.join("sys/kernel/osrelease"), format!("{RELEASE}\n")).unwrap();

        let mut cpuinfo = String::new();
        for n in 0..4 {
            cpuinfo.push_str(&format!(
                "processor\t: {n}\nvendor_id\t: TestVendor\nmodel name\t: {CPU_MODEL}\n\n"
            ));
        }
        fs::write(proc_root.join("cpuinfo"), cpuinfo).unwrap();

        fs::write(
            proc_root.join("meminfo"),
            "MemTotal:       16384000 kB\nMemFree:         2048000 kB\nMemAvailable:    8192000 kB\n",
        )
        .unwrap();
        fs::write(proc_root.join("uptime"), "3600.50 14000.00\n").unwrap();
        fs::create_dir_all(proc_root.join("self")).unwrap();

        fs::write(sys_root.join("devices/system/cpu/online"), "0-3\n").unwrap();
        fs::write(sys_root.join("devices/system/cpu/possible"), "0-7\n").unwrap();

        Self {
            dir,
            paths: HostPaths::new(proc_root, sys_root),
        }
    }

    pub fn proc_dir(&self, pid: u32) -> PathBuf {
        self.paths.proc(pid.to_string())
    }

    pub fn add(&self, p: &FakeProcess) {
        let dir = self.proc_dir(p.pid);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("stat"), p.stat_line()).unwrap();
        fs::write(dir.join("status"), p.status()).unwrap();
        if let Some((read, write)) = p.io {
            fs::write(
                dir.join("io"),
                format!(
                    "rchar: 0\nwchar: 0\nsyscr: 0\nsyscw: 0\nread_bytes: {read}\nwrite_bytes: {write}\ncancelled_write_bytes: 0\n"
                ),
            )
            .unwrap();
        }
        if !p.kernel_thread {
            fs::write(dir.join("limits"), p.limits()).unwrap();
        }
    }

    pub fn remove(&self, pid: u32) {
        fs::remove_dir_all(self.proc_dir(pid)).unwrap();
    }
}

/// Attributes of one synthetic process.
#[derive(Debug, Clone)]
pub struct FakeProcess {
    pub pid: u32,
    pub comm: String,
    pub state: char,
    pub kernel_thread: bool,
    pub exiting: bool,
    pub utime: u64,
    pub stime: u64,
    /// Raw stat priority (the kernel's prio minus 100).
    pub priority: i64,
    pub start: u64,
    pub rss_kb: u64,
    pub euid: u32,
    pub io: Option<(u64, u64)>,
    /// `None` means unlimited.
    pub cpu_limit: Option<u64>,
}

impl FakeProcess {
    pub fn user(pid: u32, comm: &str, euid: u32) -> Self {
        Self {
            pid,
            comm: comm.to_string(),
            state: 'S',
            kernel_thread: false,
            exiting: false,
            utime: 10,
            stime: 5,
            priority: 20,
            start: 1000 + pid as u64,
            rss_kb: 4096,
            euid,
            io: Some((0, 0)),
            cpu_limit: None,
        }
    }

    pub fn kthread(pid: u32, comm: &str) -> Self {
        Self {
            kernel_thread: true,
            rss_kb: 0,
            euid: 0,
            ..Self::user(pid, comm, 0)
        }
    }

    pub fn running(mut self) -> Self {
        self.state = 'R';
        self
    }

    pub fn exiting(mut self) -> Self {
        self.exiting = true;
        self
    }

    fn flags(&self) -> u64 {
        let mut flags = 0x0040_0000;
        if self.kernel_thread {
            flags |= PF_KTHREAD;
        }
        if self.exiting {
            flags |= PF_EXITING;
        }
        flags
    }

    pub fn stat_line(&self) -> String {
        format!(
            "{pid} ({comm}) {state} 1 {pid} {pid} 0 -1 {flags} 0 0 0 0 {utime} {stime} 0 0 {prio} 0 1 0 {start} 1000 10 18446744073709551615 0 0 0 0 0 0 0 0 0 0 0 0 17 0 0 0 0 0 0\n",
            pid = self.pid,
            comm = self.comm,
            state = self.state,
            flags = self.flags(),
            utime = self.utime,
            stime = self.stime,
            prio = self.priority,
            start = self.start,
        )
    }

    fn status(&self) -> String {
        let mut s = format!(
            "Name:\t{}\nState:\t{}\nUid:\t{u}\t{u}\t{u}\t{u}\n",
            self.comm,
            self.state,
            u = self.euid
        );
        if !self.kernel_thread {
            s.push_str(&format!("VmRSS:\t{} kB\n", self.rss_kb));
        }
        s
    }

    fn limits(&self) -> String {
        let soft = self
            .cpu_limit
            .map(|s| s.to_string())
            .unwrap_or_else(|| "unlimited".to_string());
        format!(
            "Limit                     Soft Limit           Hard Limit           Units     \n\
             Max cpu time              {soft:<20} unlimited            seconds   \n\
             Max file size             unlimited            unlimited            bytes     \n"
        )
    }
}
