//! Field-selection flags for the info report.
//!
//! Bit values are part of the device contract and must stay stable:
//! `1` kernel release, `2` CPU count, `4` CPU model, `8` memory,
//! `16` uptime, `32` process count, `63` everything.

/// One selectable line of the info report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    KernelRelease,
    CpuCount,
    CpuModel,
    Memory,
    Uptime,
    ProcessCount,
}

pub const KERNEL_RELEASE: i32 = 1 << 0;
pub const CPU_COUNT: i32 = 1 << 1;
pub const CPU_MODEL: i32 = 1 << 2;
pub const MEMORY: i32 = 1 << 3;
pub const UPTIME: i32 = 1 << 4;
pub const PROCESS_COUNT: i32 = 1 << 5;

/// Number of defined fields.
pub const FIELD_COUNT: u32 = 6;

/// Composite mask with every defined field enabled.
pub const FULL_INFO: i32 = (1 << FIELD_COUNT) - 1;

/// Order in which enabled fields are emitted. Output compatibility depends on it.
pub const RENDER_ORDER: [Field; 6] = [
    Field::KernelRelease,
    Field::CpuModel,
    Field::CpuCount,
    Field::Memory,
    Field::ProcessCount,
    Field::Uptime,
];

impl Field {
    pub const fn bit(self) -> i32 {
        match self {
            Field::KernelRelease => KERNEL_RELEASE,
            Field::CpuCount => CPU_COUNT,
            Field::CpuModel => CPU_MODEL,
            Field::Memory => MEMORY,
            Field::Uptime => UPTIME,
            Field::ProcessCount => PROCESS_COUNT,
        }
    }

    /// Short name used in logs and CLI help.
    pub const fn name(self) -> &'static str {
        match self {
            Field::KernelRelease => "kernel",
            Field::CpuCount => "cpus",
            Field::CpuModel => "cpu-model",
            Field::Memory => "memory",
            Field::Uptime => "uptime",
            Field::ProcessCount => "procs",
        }
    }

    pub fn is_set(self, mask: i32) -> bool {
        mask & self.bit() != 0
    }
}

/// Enabled fields of `mask` in render order. Undefined bits are ignored.
pub fn selected(mask: i32) -> impl Iterator<Item = Field> {
    RENDER_ORDER.into_iter().filter(move |f| f.is_set(mask))
}
