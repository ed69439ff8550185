//! Configuration management for kfetch-telemetry.
//!
//! This module handles loading, merging, and validating configuration from files
//! and CLI arguments. It supports YAML, JSON, and TOML formats.

use crate::cli::{Args, ConfigFormat, LogLevel};
use kfetch_telemetry::paths::{DEFAULT_PROC_ROOT, DEFAULT_SYS_ROOT};
use kfetch_telemetry::report::PAGE_SIZE;
use kfetch_telemetry::session::{DEFAULT_MAX_SESSIONS, DEFAULT_SESSION_IDLE_SECS};
use kfetch_telemetry::HostPaths;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

// Default configuration constants
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 9216;
pub const MAX_READ_BUFFER_BYTES: usize = 65536;

/// Configuration file search order when `--config` is not given.
pub const DEFAULT_CONFIG_PATHS: [&str; 6] = [
    "/etc/kfetch/kfetch.yaml",
    "/etc/kfetch/kfetch.yml",
    "/etc/kfetch/kfetch.json",
    "./kfetch.yaml",
    "./kfetch.yml",
    "./kfetch.json",
];

/// Service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub port: Option<u16>,
    pub bind: Option<String>,

    // Kernel views
    #[serde(alias = "proc-root")]
    pub proc_root: Option<PathBuf>,
    #[serde(alias = "sys-root")]
    pub sys_root: Option<PathBuf>,

    // Info device
    /// Upper bound on concurrently open HTTP sessions
    #[serde(alias = "max-sessions")]
    pub max_sessions: Option<usize>,
    /// Seconds an HTTP session may sit unused before it is evicted
    #[serde(alias = "session-idle-secs")]
    pub session_idle_secs: Option<u64>,
    /// Read length used when a request does not pass `len`
    #[serde(alias = "read-buffer-bytes")]
    pub read_buffer_bytes: Option<usize>,

    // Feature flags
    #[serde(alias = "enable-health")]
    pub enable_health: Option<bool>,

    // Logging
    #[serde(alias = "log-level")]
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: Some(DEFAULT_BIND_ADDR.to_string()),
            port: Some(DEFAULT_PORT),
            proc_root: Some(PathBuf::from(DEFAULT_PROC_ROOT)),
            sys_root: Some(PathBuf::from(DEFAULT_SYS_ROOT)),
            max_sessions: Some(DEFAULT_MAX_SESSIONS),
            session_idle_secs: Some(DEFAULT_SESSION_IDLE_SECS),
            read_buffer_bytes: Some(PAGE_SIZE),
            enable_health: Some(true),
            log_level: Some("info".into()),
        }
    }
}

impl Config {
    /// Proc and sys roots with defaults filled in.
    pub fn host_paths(&self) -> HostPaths {
        HostPaths::new(
            self.proc_root
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PROC_ROOT)),
            self.sys_root
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SYS_ROOT)),
        )
    }

    pub fn max_sessions(&self) -> usize {
        self.max_sessions.unwrap_or(DEFAULT_MAX_SESSIONS)
    }

    pub fn session_idle_secs(&self) -> u64 {
        self.session_idle_secs.unwrap_or(DEFAULT_SESSION_IDLE_SECS)
    }

    pub fn read_buffer_bytes(&self) -> usize {
        self.read_buffer_bytes.unwrap_or(PAGE_SIZE)
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    if cfg.port == Some(0) {
        return Err("port must be between 1 and 65535".into());
    }

    if let Some(bind) = cfg.bind.as_deref() {
        if bind.parse::<std::net::IpAddr>().is_err() {
            return Err(format!("Invalid bind address '{}'", bind).into());
        }
    }

    if cfg.max_sessions == Some(0) {
        return Err("max_sessions must be at least 1".into());
    }

    if cfg.session_idle_secs == Some(0) {
        return Err("session_idle_secs must be at least 1".into());
    }

    if let Some(n) = cfg.read_buffer_bytes {
        if n == 0 || n > MAX_READ_BUFFER_BYTES {
            return Err(format!(
                "read_buffer_bytes must be between 1 and {}, got {}",
                MAX_READ_BUFFER_BYTES, n
            )
            .into());
        }
    }

    if let Some(level) = cfg.log_level.as_deref() {
        if LogLevel::from_name(level).is_none() {
            return Err(format!(
                "Invalid log_level '{}', expected off/error/warn/info/debug/trace",
                level
            )
            .into());
        }
    }

    Ok(())
}

/// Resolves configuration from CLI args, config file, and defaults.
/// This enforces precedence: CLI (if provided) > config file > default.
pub fn resolve_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    if let Some(bind_ip) = args.bind {
        config.bind = Some(bind_ip.to_string());
    }

    // Only override port if the user supplied it on the CLI.
    if let Some(cli_port) = args.port {
        config.port = Some(cli_port);
    }

    if let Some(root) = &args.proc_root {
        config.proc_root = Some(root.clone());
    }
    if let Some(root) = &args.sys_root {
        config.sys_root = Some(root.clone());
    }

    if args.disable_health {
        config.enable_health = Some(false);
    }

    Ok(config)
}

/// Loads a config file, or the first default location that exists.
///
/// Missing fields keep their defaults; no file at all yields [`Config::default`].
pub fn load_config(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    let path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => DEFAULT_CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|p| p.exists()),
    };

    let path = match path {
        Some(p) if p.exists() => p,
        Some(p) => return Err(format!("Config file not found: {}", p.display()).into()),
        None => return Ok(Config::default()),
    };

    let content = fs::read_to_string(&path)?;

    let loaded: Config = match path.extension().and_then(|s| s.to_str()) {
        Some("json") => {
            let config = serde_json::from_str(&content)?;
            info!("Loaded JSON configuration from: {}", path.display());
            config
        }
        Some("toml") => {
            let config = toml::from_str(&content)?;
            info!("Loaded TOML configuration from: {}", path.display());
            config
        }
        _ => {
            // Default to YAML
            let config = serde_yaml::from_str(&content)?;
            info!("Loaded YAML configuration from: {}", path.display());
            config
        }
    };

    Ok(merge_defaults(loaded))
}

/// Fills fields absent from a loaded file with their defaults.
fn merge_defaults(loaded: Config) -> Config {
    let defaults = Config::default();
    Config {
        port: loaded.port.or(defaults.port),
        bind: loaded.bind.or(defaults.bind),
        proc_root: loaded.proc_root.or(defaults.proc_root),
        sys_root: loaded.sys_root.or(defaults.sys_root),
        max_sessions: loaded.max_sessions.or(defaults.max_sessions),
        session_idle_secs: loaded.session_idle_secs.or(defaults.session_idle_secs),
        read_buffer_bytes: loaded.read_buffer_bytes.or(defaults.read_buffer_bytes),
        enable_health: loaded.enable_health.or(defaults.enable_health),
        log_level: loaded.log_level.or(defaults.log_level),
    }
}

/// Renders configuration in the requested format.
pub fn render_config(
    config: &Config,
    format: &ConfigFormat,
) -> Result<String, Box<dyn std::error::Error>> {
    Ok(match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    })
}

/// Shows configuration in requested format
pub fn show_config(config: &Config, format: ConfigFormat) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", render_config(config, &format)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = Config::default();
        assert!(validate_effective_config(&cfg).is_ok());
        assert_eq!(cfg.port, Some(9216));
        assert_eq!(cfg.host_paths(), HostPaths::default());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut cfg = Config::default();
        cfg.port = Some(0);
        assert!(validate_effective_config(&cfg).is_err());

        let mut cfg = Config::default();
        cfg.max_sessions = Some(0);
        assert!(validate_effective_config(&cfg).is_err());

        for n in [0, MAX_READ_BUFFER_BYTES + 1] {
            let mut cfg = Config::default();
            cfg.read_buffer_bytes = Some(n);
            assert!(validate_effective_config(&cfg).is_err(), "{} accepted", n);
        }

        let mut cfg = Config::default();
        cfg.session_idle_secs = Some(0);
        assert!(validate_effective_config(&cfg).is_err());

        let mut cfg = Config::default();
        cfg.log_level = Some("loud".into());
        assert!(validate_effective_config(&cfg).is_err());
    }

    #[test]
    fn test_log_level_case_insensitive() {
        for level in ["DEBUG", "Warn", "off", "TRACE"] {
            let mut cfg = Config::default();
            cfg.log_level = Some(level.into());
            assert!(validate_effective_config(&cfg).is_ok(), "{} rejected", level);
        }
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("kfetch.yaml");
        fs::write(&path, "port: 9300\nmax-sessions: 8\nlog_level: DEBUG\n").unwrap();

        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg.port, Some(9300));
        assert_eq!(cfg.max_sessions, Some(8));
        assert_eq!(cfg.read_buffer_bytes, Some(PAGE_SIZE));
        assert_eq!(cfg.session_idle_secs, Some(DEFAULT_SESSION_IDLE_SECS));
        assert!(validate_effective_config(&cfg).is_ok());
        assert_eq!(cfg.bind.as_deref(), Some(DEFAULT_BIND_ADDR));
    }

    #[test]
    fn test_json_and_toml_formats() {
        let dir = tempdir().expect("Failed to create temp dir");

        let json = dir.path().join("kfetch.json");
        fs::write(&json, r#"{"proc_root": "/srv/proc"}"#).unwrap();
        let cfg = load_config(Some(&json)).unwrap();
        assert_eq!(cfg.proc_root, Some(PathBuf::from("/srv/proc")));

        let toml_path = dir.path().join("kfetch.toml");
        fs::write(&toml_path, "read_buffer_bytes = 512\n").unwrap();
        let cfg = load_config(Some(&toml_path)).unwrap();
        assert_eq!(cfg.read_buffer_bytes, Some(512));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempdir().expect("Failed to create temp dir");
        assert!(load_config(Some(&dir.path().join("absent.yaml"))).is_err());
    }

    #[test]
    fn test_cli_overrides_file() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("kfetch.yaml");
        fs::write(&path, "port: 9300\nproc_root: /file/proc\n").unwrap();

        let args = Args::parse_from([
            "kfetch-telemetry",
            "--config",
            path.to_str().unwrap(),
            "--port",
            "9400",
            "--disable-health",
        ]);
        let cfg = resolve_config(&args).unwrap();
        assert_eq!(cfg.port, Some(9400));
        assert_eq!(cfg.proc_root, Some(PathBuf::from("/file/proc")));
        assert_eq!(cfg.enable_health, Some(false));
    }

    #[test]
    fn test_rendered_yaml_round_trips() {
        let cfg = Config::default();
        let yaml = render_config(&cfg, &ConfigFormat::Yaml).unwrap();
        let back: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, cfg);
    }
}
