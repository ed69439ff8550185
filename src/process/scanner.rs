//! Process discovery under the proc root.
//!
//! The walk is a lazy directory iteration: it never blocks process creation
//! or teardown, so a process that appears or exits mid-walk may or may not
//! be visited. Each visited process is pinned by (pid, start time) for the
//! duration of its own extraction.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::process::metrics::StatFields;

/// Process entry representing a numeric directory under the proc root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcEntry {
    pub pid: u32,
    pub proc_path: PathBuf,
}

/// Lazy iterator over the processes listed under a proc root.
///
/// Restartable per call by constructing a new walk; not resumable.
pub struct ProcessWalk {
    entries: fs::ReadDir,
}

impl ProcessWalk {
    pub fn new(root: &Path) -> io::Result<Self> {
        Ok(Self {
            entries: fs::read_dir(root)?,
        })
    }
}

impl Iterator for ProcessWalk {
    type Item = ProcEntry;

    fn next(&mut self) -> Option<ProcEntry> {
        for entry in self.entries.by_ref() {
            let entry = match entry {
                Ok(e) => e,
                // Entry vanished between readdir and stat
                Err(_) => continue,
            };
            let p = entry.path();
            let name = match p.file_name().and_then(|s| s.to_str()) {
                Some(v) => v,
                None => continue,
            };
            if name.is_empty() || !name.chars().all(|c| c.is_ascii_digit()) {
                continue;
            }
            let pid: u32 = match name.parse() {
                Ok(v) => v,
                Err(_) => continue,
            };
            return Some(ProcEntry { pid, proc_path: p });
        }
        None
    }
}

/// A process held for the duration of one extraction.
///
/// Holds the stat line read at pin time; [`PinnedProcess::still_valid`]
/// re-reads the start time to detect exit or pid reuse.
#[derive(Debug, Clone)]
pub struct PinnedProcess {
    pub entry: ProcEntry,
    pub stat: StatFields,
}

impl ProcEntry {
    /// Pins the process by reading its stat line.
    pub fn pin(&self) -> io::Result<PinnedProcess> {
        let stat = StatFields::read(&self.proc_path)?;
        Ok(PinnedProcess {
            entry: self.clone(),
            stat,
        })
    }
}

impl PinnedProcess {
    pub fn pid(&self) -> u32 {
        self.entry.pid
    }

    pub fn path(&self) -> &Path {
        &self.entry.proc_path
    }

    /// True if the same process still occupies this pid.
    pub fn still_valid(&self) -> bool {
        match StatFields::read(&self.entry.proc_path) {
            Ok(now) => now.start_ticks == self.stat.start_ticks,
            Err(e) => {
                debug!("pid {} vanished during extraction: {}", self.entry.pid, e);
                false
            }
        }
    }
}
