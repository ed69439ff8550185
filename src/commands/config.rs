//! Config command implementation.
//!
//! Generates configuration files in various formats.

use anyhow::anyhow;
use std::fs;
use std::path::PathBuf;

use crate::cli::ConfigFormat;
use crate::config::{render_config, Config};

/// Generates configuration files.
pub fn command_config(
    output: Option<PathBuf>,
    format: ConfigFormat,
    commented: bool,
) -> anyhow::Result<()> {
    let content = generate_config(&format, commented)?;
    let output = output.unwrap_or_else(|| PathBuf::from("kfetch.yaml"));

    if output.to_string_lossy() == "-" {
        print!("{}", content);
    } else {
        fs::write(&output, content)?;
        println!("✅ Configuration written to: {}", output.display());
    }

    Ok(())
}

/// Default configuration, with a comment header for YAML if requested.
pub fn generate_config(format: &ConfigFormat, commented: bool) -> anyhow::Result<String> {
    let config = Config::default();
    let mut content = render_config(&config, format).map_err(|e| anyhow!("{}", e))?;
    if commented && matches!(format, ConfigFormat::Yaml) {
        content = add_config_comments(content);
    }
    Ok(content)
}

/// Adds comments to YAML configuration.
fn add_config_comments(yaml: String) -> String {
    let comments = r#"# kfetch-telemetry Configuration
# ==============================
#
# Server Configuration
# --------------------
# bind: "127.0.0.1"            # Bind IP (0.0.0.0 = all interfaces)
# port: 9216                   # HTTP port
#
# Kernel Views
# ------------
# proc_root: "/proc"           # procfs root (point at a copy for testing)
# sys_root: "/sys"             # sysfs root
#
# Info Device
# -----------
# max_sessions: 1024           # Concurrently open HTTP sessions
# session_idle_secs: 300       # Evict sessions unused for this long
# read_buffer_bytes: 4096      # Read length when a request omits ?len= (1-65536)
#
# Feature Flags
# -------------
# enable_health: true          # Enable /health endpoint
#
# Logging
# -------
# log_level: "info"            # off, error, warn, info, debug, trace
"#;

    format!("{comments}\n{yaml}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commented_yaml_parses() {
        let content = generate_config(&ConfigFormat::Yaml, true).unwrap();
        assert!(content.starts_with("# kfetch-telemetry Configuration"));
        let parsed: Config = serde_yaml::from_str(&content).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_comments_only_for_yaml() {
        let content = generate_config(&ConfigFormat::Json, true).unwrap();
        assert!(content.trim_start().starts_with('{'));
    }
}
