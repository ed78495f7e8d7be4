//! The one scheduler instance, shared by the trap handlers and the
//! built-in processes.
//!
//! Interrupt handlers run with interrupts off, so they may lock it
//! directly. Process code must go through [`with_kernel`], otherwise a
//! serial IRQ arriving while the lock is held would spin forever.

use spin::Mutex;

use lessonos::commands::SHELL_COMMANDS;
use lessonos::devices::HardwarePorts;
use lessonos::Scheduler;

pub static KERNEL: Mutex<Scheduler<HardwarePorts>> = Mutex::new(Scheduler::new(HardwarePorts, &SHELL_COMMANDS));

pub fn with_kernel<R>(f: impl FnOnce(&mut Scheduler<HardwarePorts>) -> R) -> R {
    x86_64::instructions::interrupts::without_interrupts(|| f(&mut KERNEL.lock()))
}
