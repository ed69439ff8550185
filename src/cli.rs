//! CLI arguments and subcommands for kfetch-telemetry.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, and subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use std::net::IpAddr;
use std::path::PathBuf;

use kfetch_telemetry::FULL_INFO;

/// Log level options for CLI parsing
#[derive(Debug, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Parses a config file value; unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        LogLevel::from_str(name, true).ok()
    }
}

/// Configuration format options for output
#[derive(Debug, Clone, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "kfetch-telemetry",
    about = "Host vitals and per-process risk reports from procfs",
    long_about = "Host vitals and per-process risk reports from procfs.\n\n\
                  Serves a field-selectable system summary (kernel release, CPU model and \
                  count, memory, process count, uptime) through per-session handles, and a \
                  per-process risk table scored Low/Medium/High. Runs as an HTTP service or \
                  as a one-shot CLI.",
    version,
    propagate_version = true,
    after_help = "Field bits: 1 kernel, 2 cpus, 4 cpu model, 8 memory, 16 uptime, 32 procs (63 = all)"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// HTTP listen port
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Bind to specific interface/IP
    #[arg(long)]
    pub bind: Option<IpAddr>,

    /// Log level (overrides log_level from the config file)
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Read process data below this directory instead of /proc
    #[arg(long)]
    pub proc_root: Option<PathBuf>,

    /// Read sysfs data below this directory instead of /sys
    #[arg(long)]
    pub sys_root: Option<PathBuf>,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,

    /// Disable /health endpoint
    #[arg(long)]
    pub disable_health: bool,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the info report for a field mask
    Fetch {
        /// Field selection mask (0-63; undefined bits are ignored)
        #[arg(default_value_t = FULL_INFO, allow_negative_numbers = true)]
        mask: i32,
    },

    /// Print the per-process risk report
    Risk,

    /// Run the HTTP service (default)
    Serve,

    /// Validate configuration and system requirements
    Check {
        /// Check /proc filesystem
        #[arg(long)]
        proc: bool,

        /// Check all system requirements
        #[arg(long)]
        all: bool,
    },

    /// Generate configuration files
    Config {
        /// Output file path
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,

        /// Include comments and examples
        #[arg(long)]
        commented: bool,
    },
}
