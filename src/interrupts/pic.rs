//! # Programmable Interrupt Controller (8259 PIC)
//!
//! ## Vector Remapping
//!
//! - PIC 1: vectors 32-39 (IRQ 0-7)
//! - PIC 2: vectors 40-47 (IRQ 8-15)
//!
//! ## Interrupt Assignments
//!
//! | IRQ | Vector | Device      |
//! |-----|--------|-------------|
//! | 3   | 35     | COM2 / COM4 |
//! | 4   | 36     | COM1 / COM3 |
//!
//! Every line starts masked; opening a serial device unmasks its IRQ.

use pic8259::ChainedPics;
use spin::Mutex;

use lessonos::config::SYSCALL_VECTOR;

pub const PIC_1_OFFSET: u8 = 32;
pub const PIC_2_OFFSET: u8 = 40;

pub static PICS: Mutex<ChainedPics> =
    Mutex::new(unsafe { ChainedPics::new(PIC_1_OFFSET, PIC_2_OFFSET) });

#[derive(Debug, Clone, Copy)]
#[repr(u8)]
pub enum InterruptIndex {
    Com2 = PIC_1_OFFSET + 3,
    Com1 = PIC_1_OFFSET + 4,
    Syscall = SYSCALL_VECTOR,
}

impl InterruptIndex {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// IRQ line on the master PIC.
    pub fn irq(self) -> u8 {
        self.as_u8() - PIC_1_OFFSET
    }
}

/// Remaps both PICs and masks every line except the cascade.
pub fn init() {
    let mut pics = PICS.lock();
    unsafe {
        pics.initialize();
        pics.write_masks(0b1111_1011, 0b1111_1111);
    }
}
