//! Fetch command implementation.
//!
//! Opens the info device, writes the mask, reads once with a page-sized
//! buffer and prints the bytes verbatim followed by a newline.

use anyhow::Context;
use kfetch_telemetry::report::PAGE_SIZE;
use kfetch_telemetry::{InfoDevice, InfoHandle};
use std::io::{self, Write};
use tracing::debug;

/// Prints the info report for `mask`. Exits 1 if the device cannot be opened.
pub fn command_fetch(device: &InfoDevice, mask: i32) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match fetch_into(device, mask, &mut out) {
        Ok(()) => Ok(()),
        Err(FetchError::Open(e)) => {
            eprintln!("kfetch: cannot open info device: {}", e);
            std::process::exit(1);
        }
        Err(FetchError::Other(e)) => Err(e),
    }
}

#[derive(Debug)]
pub enum FetchError {
    Open(kfetch_telemetry::TelemetryError),
    Other(anyhow::Error),
}

/// Runs one open/write/read/close cycle and copies the report to `out`.
pub fn fetch_into<W: Write>(device: &InfoDevice, mask: i32, out: &mut W) -> Result<(), FetchError> {
    let handle = device.open().map_err(FetchError::Open)?;

    copy_report(&handle, mask, out).map_err(FetchError::Other)
}

fn copy_report<W: Write>(handle: &InfoHandle, mask: i32, out: &mut W) -> anyhow::Result<()> {
    handle
        .write(&mask.to_ne_bytes())
        .context("Failed to set field mask")?;

    let mut buf = vec![0u8; PAGE_SIZE];
    let n = handle.read(&mut buf).context("Failed to read report")?;
    debug!("Read {} bytes for mask {}", n, mask);

    out.write_all(&buf[..n]).context("Failed to write report")?;
    out.write_all(b"\n").context("Failed to write report")?;
    out.flush().context("Failed to flush output")?;
    Ok(())
}
