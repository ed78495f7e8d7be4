//! Device Subsystem
//!
//! Port I/O and the interrupt driven serial engine:
//! - `port`: raw port access and UART register definitions
//! - `io_buffer`: caller memory a transfer reads into or writes from
//! - `ring_buffer`: fixed buffer for input nobody has asked for yet
//! - `serial`: device control blocks, request queueing and line editing

pub mod io_buffer;
pub mod port;
pub mod ring_buffer;
pub mod serial;

pub use io_buffer::IoBuffer;
pub use port::{HardwarePorts, PortIo};
pub use serial::{Completion, Device, IoRequestResult, SerialDevices, SerialError};
