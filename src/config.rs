//! # Kernel Configuration
//!
//! Compile-time limits shared by the scheduler, the serial engine and the
//! boot sequence. Everything here is `const` so the values are usable in
//! array lengths and in `static` initializers.

use crate::devices::serial::Device;
use log::LevelFilter;

/// Longest allowed process name, in bytes.
pub const PCB_MAX_NAME_LEN: usize = 8;

/// Highest (least urgent) process priority. Zero is the most urgent.
pub const PCB_MAX_PRIORITY: u8 = 9;

/// Size of the stack each process owns.
pub const PCB_STACK_SIZE: usize = 16 * 1024;

/// Capacity of the per-device buffer for unsolicited input.
pub const RING_BUFFER_LEN: usize = 150;

/// Bytes collected after ESC before an escape sequence is abandoned.
pub const ESCAPE_SEQUENCE_LEN: usize = 15;

/// Number of previously entered lines kept per device.
pub const HISTORY_LEN: usize = 5;

/// Longest line stored in the history; longer lines are truncated.
pub const HISTORY_LINE_LEN: usize = 128;

/// Software interrupt vector used for system requests.
pub const SYSCALL_VECTOR: u8 = 0x60;

/// Code segment selector loaded into fresh process contexts.
pub const KERNEL_CODE_SELECTOR: u64 = 0x08;

/// Stack segment selector loaded into fresh process contexts.
pub const KERNEL_DATA_SELECTOR: u64 = 0x10;

/// RFLAGS for a fresh process: reserved bit 1 plus IF.
pub const INITIAL_RFLAGS: u64 = 0x0202;

/// Line speed used when a console is opened at boot.
pub const DEFAULT_BAUD_RATE: u32 = 19200;

/// Settings consumed once by the boot sequence.
#[derive(Debug, Clone, Copy)]
pub struct BootConfig {
    /// Port the command handler talks on.
    pub console: Device,
    /// Port kernel log lines are written to with polled output. Must not
    /// be the console.
    pub log_port: Device,
    pub baud_rate: u32,
    pub log_level: LevelFilter,
    pub heap_size: usize,
}

pub const BOOT_CONFIG: BootConfig = BootConfig {
    console: Device::Com1,
    log_port: Device::Com2,
    baud_rate: DEFAULT_BAUD_RATE,
    log_level: LevelFilter::Info,
    heap_size: 4 * 1024 * 1024,
};
