//! Check command implementation.
//!
//! Validates system requirements and configuration.

use kfetch_telemetry::fields::FULL_INFO;
use kfetch_telemetry::process::collect_snapshots;
use kfetch_telemetry::report::{render_info, PAGE_SIZE};
use kfetch_telemetry::SystemSnapshot;

use crate::config::{validate_effective_config, Config};
use crate::startup_checks::validate_requirements;

/// Validates system requirements and configuration.
pub fn command_check(proc: bool, all: bool, config: &Config) -> anyhow::Result<()> {
    println!("🔍 kfetch-telemetry - System Check");
    println!("==================================");

    let paths = config.host_paths();
    let mut all_ok = true;

    if proc || all {
        println!("\n📁 Checking {} ...", paths.proc_root.display());
        match validate_requirements(&paths) {
            Ok(report) => {
                println!("   ✅ proc root readable");
                if report.running_as_root {
                    println!("   ✅ running as root");
                } else {
                    println!("   ⚠️  not running as root");
                }
                if report.init_io_readable {
                    println!("   ✅ IO counters readable");
                } else {
                    println!("   ⚠️  IO counters of foreign processes will read as 0");
                }
            }
            Err(e) => {
                println!("   ❌ {}", e);
                all_ok = false;
            }
        }

        match collect_snapshots(&paths.proc_root) {
            Ok(rows) if !rows.is_empty() => {
                println!("   ✅ Risk walk extracted {} processes", rows.len());
            }
            Ok(_) => {
                println!("   ❌ Risk walk found no processes");
                all_ok = false;
            }
            Err(e) => {
                println!("   ❌ Risk walk failed: {}", e);
                all_ok = false;
            }
        }
    }

    if all {
        println!("\n🖥️  Rendering info report...");
        let snap = SystemSnapshot::collect(&paths, FULL_INFO);
        match render_info(&snap, FULL_INFO, PAGE_SIZE) {
            Ok(text) => println!("   ✅ {} bytes, {} lines", text.len(), text.lines().count()),
            Err(e) => {
                println!("   ❌ {}", e);
                all_ok = false;
            }
        }
    }

    println!("\n⚙️  Checking configuration...");
    match validate_effective_config(config) {
        Ok(_) => {
            println!("   ✅ Configuration is valid");
        }
        Err(e) => {
            println!("   ❌ Configuration invalid: {}", e);
            all_ok = false;
        }
    }

    println!("\n📋 Summary:");
    if all_ok {
        println!("   ✅ All checks passed - system is ready");
        Ok(())
    } else {
        println!("   ❌ Some checks failed - please review warnings");
        std::process::exit(1);
    }
}
