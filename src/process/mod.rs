//! # Process Module
//!
//! Process control blocks, their saved register state and the registry
//! that owns them.
//!
//! ## Modules
//!
//! - `context`: register snapshot restored by the syscall trap
//! - `pcb`: the control block, its states and validation
//! - `registry`: PCB arena and the single ready/blocked queue

pub mod context;
pub mod pcb;
pub mod registry;

pub use context::{Context, ProcessEntry};
pub use pcb::{DispatchState, ExecState, Pcb, Pid, ProcessClass, ProcessError};
pub use registry::PcbRegistry;
