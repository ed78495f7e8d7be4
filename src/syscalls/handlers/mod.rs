//! # System Request Handlers
//!
//! ## Modules
//!
//! - `io`: READ and WRITE on a serial device
//! - `process`: IDLE and EXIT
//!
//! ## Handler Signature
//!
//! Each handler gets the scheduler, the caller's registers and the process
//! the dispatcher picked, and returns the registers to restore:
//! ```ignore
//! fn sys_idle(sched: &mut Scheduler<P>, current: &Context, next: Option<Pid>) -> Context
//! ```

pub mod io;
pub mod process;
