//! # Kernel Bootstrap Module
//!
//! ## Submodules
//!
//! - `init`: initialization sequence, one phase per subsystem
//! - `state`: the shared scheduler instance
//! - `status`: component status tracking for the boot report

pub mod init;
pub mod state;
pub mod status;

pub use init::init_kernel;
pub use status::for_each_component;
