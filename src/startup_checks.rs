//! Startup requirement validation for kfetch-telemetry.
//!
//! This module validates that the service can read the kernel views it
//! reports on before starting.

use kfetch_telemetry::HostPaths;
use nix::unistd::geteuid;
use std::fs;
use tracing::{error, info, warn};

/// Outcome of the individual checks, for the `check` subcommand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequirementReport {
    pub running_as_root: bool,
    pub init_io_readable: bool,
}

/// Validate all runtime requirements
pub fn validate_requirements(paths: &HostPaths) -> Result<RequirementReport, ValidationError> {
    info!("🔍 Validating runtime requirements...");

    let running_as_root = check_user_privileges();
    check_proc_access(paths)?;
    let init_io_readable = check_io_counters(paths);

    info!("✅ Runtime requirements validated");
    Ok(RequirementReport {
        running_as_root,
        init_io_readable,
    })
}

/// Check if running with sufficient privileges
fn check_user_privileges() -> bool {
    if !geteuid().is_root() {
        warn!("⚠️  Not running as root - IO counters of other users' processes read as 0");
        warn!("   Recommendation: Run as root for a complete risk report");
        false
    } else {
        info!("✅ Running as root (uid=0)");
        true
    }
}

/// The proc root must be a readable directory.
fn check_proc_access(paths: &HostPaths) -> Result<(), ValidationError> {
    let root = &paths.proc_root;
    match fs::read_dir(root) {
        Ok(_) => {
            info!("✅ {} is readable", root.display());
            Ok(())
        }
        Err(e) => {
            error!("❌ Cannot read {}: {}", root.display(), e);
            error!("   The info device and the risk report are unavailable");
            Err(ValidationError::ProcUnreadable(format!(
                "{}: {}",
                root.display(),
                e
            )))
        }
    }
}

/// IO counters of pid 1 are only readable with elevated privileges.
fn check_io_counters(paths: &HostPaths) -> bool {
    let test_file = paths.proc("1/io");
    match fs::read_to_string(&test_file) {
        Ok(_) => {
            info!("✅ {} readable: IO counters available", test_file.display());
            true
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            warn!(
                "⚠️  Cannot read {} - IO counters of foreign processes read as 0",
                test_file.display()
            );
            warn!("   Solution: run as root or grant cap_sys_ptrace");
            false
        }
        Err(e) => {
            warn!("⚠️  Could not test IO counter access: {}", e);
            false
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("proc root unreadable: {0}")]
    ProcUnreadable(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_proc_root_fails() {
        let dir = tempdir().expect("Failed to create temp dir");
        let paths = HostPaths::new(dir.path().join("missing"), dir.path());
        assert!(matches!(
            validate_requirements(&paths),
            Err(ValidationError::ProcUnreadable(_))
        ));
    }

    #[test]
    fn test_synthetic_root_with_io_counters() {
        let dir = tempdir().expect("Failed to create temp dir");
        fs::create_dir_all(dir.path().join("1")).unwrap();
        fs::write(dir.path().join("1/io"), "read_bytes: 0\nwrite_bytes: 0\n").unwrap();
        let paths = HostPaths::new(dir.path(), dir.path());

        let report = validate_requirements(&paths).unwrap();
        assert!(report.init_io_readable);
    }
}
