//! kfetch telemetry library
//!
//! Host vitals and per-process risk reporting read from procfs and sysfs.
//! The library is independent of any transport; the `kfetch-telemetry`
//! binary wraps it in a CLI and an HTTP front end.
//!
//! # Features
//!
//! - **Info device**: per-session field selection and a fixed-width report
//!   of kernel release, CPU model and count, memory, process count and uptime
//! - **Risk report**: one scored row per live process with a Low/Medium/High
//!   bucket
//! - **Synthetic roots**: every reader takes its proc and sys roots from
//!   [`HostPaths`], so tests run against a temporary tree
//!
//! # Usage
//!
//! ```no_run
//! use kfetch_telemetry::{fields, HostPaths, InfoDevice, RiskReport};
//!
//! let device = InfoDevice::new(HostPaths::default());
//! let handle = device.open().expect("open info device");
//! handle
//!     .write(&(fields::KERNEL_RELEASE | fields::UPTIME).to_ne_bytes())
//!     .expect("set mask");
//!
//! let mut buf = [0u8; 4096];
//! let n = handle.read(&mut buf).expect("read report");
//! print!("{}", String::from_utf8_lossy(&buf[..n]));
//!
//! let report = RiskReport::collect(&HostPaths::default().proc_root).expect("walk /proc");
//! print!("{}", report.render());
//! ```

pub mod error;
pub mod fields;
pub mod paths;
pub mod process;
pub mod report;
pub mod risk_report;
pub mod service_stats;
pub mod session;
pub mod system;

// Re-export main types for convenience
pub use error::{Result, TelemetryError};
pub use fields::{Field, FULL_INFO};
pub use paths::HostPaths;
pub use risk_report::{RiskReport, RiskRow};
pub use service_stats::ServiceStats;
pub use session::{InfoDevice, InfoHandle, Session, SessionTable};
pub use system::SystemSnapshot;
