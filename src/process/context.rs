//! Saved register snapshot of a process.
//!
//! The field order matches the frame built by the syscall trap: fifteen
//! general purpose registers pushed by the trampoline (so `r15` ends up at
//! the lowest address), followed by the five words the CPU pushes when it
//! takes the interrupt. Restoring a context is a matter of copying one of
//! these over the trap frame and letting `iretq` run.

use crate::config::{INITIAL_RFLAGS, KERNEL_CODE_SELECTOR, KERNEL_DATA_SELECTOR};

/// Entry point of a process. The single argument arrives in `rdi`.
pub type ProcessEntry = extern "C" fn(usize) -> !;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Context {
    pub r15: u64,
    pub r14: u64,
    pub r13: u64,
    pub r12: u64,
    pub r11: u64,
    pub r10: u64,
    pub r9: u64,
    pub r8: u64,
    pub rbp: u64,
    pub rdi: u64,
    pub rsi: u64,
    pub rdx: u64,
    pub rcx: u64,
    pub rbx: u64,
    pub rax: u64,
    pub rip: u64,
    pub cs: u64,
    pub rflags: u64,
    pub rsp: u64,
    pub ss: u64,
}

impl Context {
    /// Context that starts `entry(arg)` on a stack whose highest usable
    /// address is `stack_top`.
    ///
    /// The stack pointer is placed so that, on entry, `rsp + 8` is 16-byte
    /// aligned, which is what a `call` would have produced.
    pub fn initial(entry: ProcessEntry, arg: usize, stack_top: u64) -> Self {
        let rsp = (stack_top & !0xF) - 8;
        Self {
            rdi: arg as u64,
            rbp: rsp,
            rip: entry as usize as u64,
            cs: KERNEL_CODE_SELECTOR,
            rflags: INITIAL_RFLAGS,
            rsp,
            ss: KERNEL_DATA_SELECTOR,
            ..Self::default()
        }
    }

    /// Stores a syscall return value where the caller will read it.
    pub fn set_return(&mut self, value: i64) {
        self.rax = value as u64;
    }

    pub fn return_value(&self) -> i64 {
        self.rax as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    extern "C" fn never_runs(_: usize) -> ! {
        loop {
            core::hint::spin_loop();
        }
    }

    #[test]
    fn test_initial_context_layout() {
        let ctx = Context::initial(never_runs, 42, 0x1_0000 + 7);
        assert_eq!(ctx.rdi, 42);
        assert_eq!(ctx.rip, never_runs as usize as u64);
        assert_eq!(ctx.rsp, 0x1_0000 - 8);
        assert_eq!((ctx.rsp + 8) % 16, 0);
        assert_eq!(ctx.rflags & 0x200, 0x200);
        assert_eq!(ctx.cs, KERNEL_CODE_SELECTOR);
        assert_eq!(ctx.ss, KERNEL_DATA_SELECTOR);
    }

    #[test]
    fn test_frame_size_matches_trampoline() {
        // 15 pushed registers + 5 words of interrupt frame.
        assert_eq!(core::mem::size_of::<Context>(), 20 * 8);
    }

    #[test]
    fn test_return_value_round_trips_negative() {
        let mut ctx = Context::default();
        ctx.set_return(-22);
        assert_eq!(ctx.return_value(), -22);
    }
}
