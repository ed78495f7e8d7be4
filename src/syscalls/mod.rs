//! # System Requests
//!
//! The trap interface processes use to give up the CPU or do serial I/O.
//!
//! ## ABI
//!
//! | register | meaning                              |
//! |----------|--------------------------------------|
//! | `rax`    | action ([`Action`])                  |
//! | `rdi`    | device port (READ/WRITE)             |
//! | `rsi`    | buffer pointer (READ/WRITE)          |
//! | `rdx`    | buffer length (READ/WRITE)           |
//!
//! On return `rax` holds the bytes transferred or a negative errno.

pub mod dispatcher;
pub mod handlers;
pub mod numbers;

pub use dispatcher::{SyscallError, SyscallRequest};
pub use numbers::Action;
