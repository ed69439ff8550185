//! CLI command implementations for kfetch-telemetry.
//!
//! This module provides implementations for all CLI subcommands:
//! - `fetch`: One-shot info report for a field mask
//! - `risk`: One-shot risk report
//! - `check`: System validation
//! - `config`: Configuration file generation

pub mod check;
pub mod config;
pub mod fetch;
pub mod risk;

// Re-export command functions
pub use check::command_check;
pub use config::command_config;
pub use fetch::command_fetch;
pub use risk::command_risk;
