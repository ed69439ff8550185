//! Risk command implementation.

use anyhow::Context;
use kfetch_telemetry::{HostPaths, RiskReport};

/// Walks the proc root once and prints the risk report.
pub fn command_risk(paths: &HostPaths) -> anyhow::Result<()> {
    let report = RiskReport::collect(&paths.proc_root)
        .with_context(|| format!("Failed to walk {}", paths.proc_root.display()))?;
    print!("{}", report.render());
    Ok(())
}
