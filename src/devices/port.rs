//! Raw port I/O and the UART register map.

use bitflags::bitflags;
use x86_64::instructions::port::Port;

/// Single-byte access to x86 I/O ports.
pub trait PortIo {
    fn read_u8(&mut self, port: u16) -> u8;
    fn write_u8(&mut self, port: u16, value: u8);
}

/// Real port I/O through `in`/`out`.
#[derive(Debug, Default, Clone, Copy)]
pub struct HardwarePorts;

impl PortIo for HardwarePorts {
    fn read_u8(&mut self, port: u16) -> u8 {
        // SAFETY: callers only address the UART and PIC registers owned by
        // the serial engine.
        unsafe { Port::<u8>::new(port).read() }
    }

    fn write_u8(&mut self, port: u16, value: u8) {
        unsafe { Port::<u8>::new(port).write(value) }
    }
}

/// Register offsets from a UART base port.
pub mod uart {
    /// Receive/transmit holding register, divisor low byte while DLAB is set.
    pub const DATA: u16 = 0;
    /// Interrupt enable, divisor high byte while DLAB is set.
    pub const IER: u16 = 1;
    /// Interrupt identification (read).
    pub const IIR: u16 = 2;
    pub const LCR: u16 = 3;
    pub const MCR: u16 = 4;
    pub const LSR: u16 = 5;
    pub const MSR: u16 = 6;

    /// Input clock of the divisor latch.
    pub const CLOCK_HZ: u32 = 115_200;
}

/// Master PIC data port (interrupt mask).
pub const PIC1_DATA: u16 = 0x21;

bitflags! {
    /// Interrupt enable register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct InterruptEnable: u8 {
        const RECEIVED_DATA = 1 << 0;
        const TRANSMIT_EMPTY = 1 << 1;
        const LINE_STATUS = 1 << 2;
        const MODEM_STATUS = 1 << 3;
    }
}

bitflags! {
    /// Modem control register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ModemControl: u8 {
        const DATA_TERMINAL_READY = 1 << 0;
        const REQUEST_TO_SEND = 1 << 1;
        const AUX_OUTPUT_1 = 1 << 2;
        /// Gates the UART interrupt line onto the bus.
        const AUX_OUTPUT_2 = 1 << 3;
        const LOOPBACK = 1 << 4;
    }
}

bitflags! {
    /// Line control register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LineControl: u8 {
        const WORD_LEN_8 = 0b11;
        const TWO_STOP_BITS = 1 << 2;
        const PARITY = 1 << 3;
        const DIVISOR_LATCH = 1 << 7;
    }
}

bitflags! {
    /// Line status register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LineStatus: u8 {
        const DATA_READY = 1 << 0;
        const OVERRUN = 1 << 1;
        /// Holding register can take another byte.
        const TRANSMIT_EMPTY = 1 << 5;
    }
}

const TRANSMIT_POLL_LIMIT: usize = 100_000;

/// Spins until the UART at `base` can take a byte. Gives up after a bounded
/// number of polls so a missing UART cannot hang an interrupt handler.
pub fn wait_transmit_empty<P: PortIo + ?Sized>(ports: &mut P, base: u16) -> bool {
    for _ in 0..TRANSMIT_POLL_LIMIT {
        let status = LineStatus::from_bits_retain(ports.read_u8(base + uart::LSR));
        if status.contains(LineStatus::TRANSMIT_EMPTY) {
            return true;
        }
        core::hint::spin_loop();
    }
    false
}

/// Pending interrupt source decoded from the low three IIR bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptId {
    ModemStatus,
    TransmitEmpty,
    ReceivedData,
    LineStatus,
}

impl InterruptId {
    /// `None` when bit 0 is set, i.e. the UART has nothing pending.
    pub fn from_iir(iir: u8) -> Option<Self> {
        if iir & 0x01 != 0 {
            return None;
        }
        match (iir >> 1) & 0b11 {
            0 => Some(Self::ModemStatus),
            1 => Some(Self::TransmitEmpty),
            2 => Some(Self::ReceivedData),
            _ => Some(Self::LineStatus),
        }
    }
}

#[cfg(test)]
pub use mock::MockPorts;


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupt_id_decoding() {
        assert_eq!(InterruptId::from_iir(0b001), None);
        assert_eq!(InterruptId::from_iir(0b000), Some(InterruptId::ModemStatus));
        assert_eq!(InterruptId::from_iir(0b010), Some(InterruptId::TransmitEmpty));
        assert_eq!(InterruptId::from_iir(0b100), Some(InterruptId::ReceivedData));
        assert_eq!(InterruptId::from_iir(0b110), Some(InterruptId::LineStatus));
        // FIFO bits in the high nibble are ignored.
        assert_eq!(InterruptId::from_iir(0xC4), Some(InterruptId::ReceivedData));
    }

    #[test]
    fn test_mock_ports() {
        let mut ports = MockPorts::new();
        ports.queue_read(0x3F8, b'x');
        assert_eq!(ports.read_u8(0x3F8), b'x');
        assert_eq!(ports.read_u8(0x3F8), 0);
        ports.write_u8(0x21, 0xEF);
        assert_eq!(ports.last_write(0x21), Some(0xEF));
        assert!(wait_transmit_empty(&mut ports, 0x2F8));
    }

    #[test]
    fn test_wait_transmit_empty_gives_up() {
        let mut ports = MockPorts::new();
        for _ in 0..TRANSMIT_POLL_LIMIT {
            ports.queue_read(0x3F8 + uart::LSR, LineStatus::DATA_READY.bits());
        }
        assert!(!wait_transmit_empty(&mut ports, 0x3F8));
        assert!(wait_transmit_empty(&mut ports, 0x3F8));
    }
}
