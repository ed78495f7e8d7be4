//! # Data Structures Module
//!
//! Containers used by the scheduler that `alloc` does not provide directly.
//!
//! ## Modules
//!
//! - `sorted_list`: insertion-ordered list kept sorted by a caller comparator
//!
//! ## Overview
//!
//! Since this is a `no_std` kernel, every container here reports allocation
//! failure to its caller instead of aborting, so a full heap turns into an
//! error value at the public operation that needed the memory.

pub mod sorted_list;

pub use sorted_list::{AllocError, SortedList};
