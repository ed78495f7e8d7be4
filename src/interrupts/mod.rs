//! # Interrupt Handling Module
//!
//! - **GDT**: Global Descriptor Table with TSS for the double fault stack
//! - **IDT**: exceptions, the serial IRQs and the system request gate
//! - **PIC**: 8259 initialization and EOI
//!
//! ## Interrupt Vector Layout
//!
//! | Vector | Type               | Handler                |
//! |--------|--------------------|------------------------|
//! | 0-31   | CPU Exceptions     | divide, page fault,... |
//! | 0x23   | COM2/COM4 (IRQ3)   | com2_interrupt_handler |
//! | 0x24   | COM1/COM3 (IRQ4)   | com1_interrupt_handler |
//! | 0x60   | System request     | syscall_trampoline     |

pub mod gdt;
pub mod interrupts;
pub mod pic;

pub fn init() -> Result<(), &'static str> {
    gdt::init()?;
    interrupts::init_idt();
    pic::init();
    Ok(())
}
