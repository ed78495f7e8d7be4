//! # LessonOS Core
//!
//! The hardware independent half of the kernel: process control blocks and
//! the ready queue, the interrupt driven serial engine with its line editor,
//! and the system request dispatcher that switches between processes.
//!
//! The bootable image in `main.rs` wires this to the real CPU: it owns the
//! descriptor tables, the heap, the trap trampoline and the built-in
//! processes. Everything here reaches hardware only through
//! [`devices::PortIo`], so it also builds and tests on the host.
//!
//! ## Modules
//!
//! | module            | contents                                         |
//! |-------------------|--------------------------------------------------|
//! | `process`         | PCBs, register contexts, the PCB registry        |
//! | `devices`         | port access, DCBs, ring buffer, line editor      |
//! | `scheduler`       | dispatch decisions and context switching         |
//! | `syscalls`        | request decoding and the IDLE/EXIT/READ/WRITE handlers |
//! | `shell`           | the command handler's command set                |
//! | `data_structures` | the sorted list behind the ready queue           |
//! | `commands`        | command names used for completion and coloring   |
//! | `config`          | limits and boot settings                         |
//! | `error`           | error classification                             |

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod commands;
pub mod config;
pub mod data_structures;
pub mod devices;
pub mod error;
pub mod process;
pub mod scheduler;
pub mod shell;
pub mod syscalls;

pub use error::ErrorKind;
pub use process::{Context, Pid, ProcessClass};
pub use scheduler::Scheduler;
