//! # Serial I/O Engine
//!
//! Interrupt driven I/O on the four legacy COM ports. Each port has a
//! [`Dcb`]; requests that arrive while a port is busy wait in that DCB's
//! queue and are started one by one as earlier requests complete.
//!
//! The engine never switches processes itself. Interrupt handlers only
//! move bytes and raise a DCB's event flag; the dispatcher notices the flag
//! through [`SerialDevices::check_completed`] on the next system request.

pub mod dcb;
pub mod echo;
pub mod history;
pub mod line_editor;

use core::fmt;

use crate::commands::CommandRegistry;
use crate::devices::io_buffer::IoBuffer;
use crate::devices::port::{uart, InterruptId, PortIo};
use crate::error::ErrorKind;
use crate::process::Pid;
use crate::syscalls::Action;

pub use dcb::{Dcb, DcbState, Iocb, Orphans};
pub use line_editor::EditorOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u16)]
pub enum Device {
    Com1 = 0x3F8,
    Com2 = 0x2F8,
    Com3 = 0x3E8,
    Com4 = 0x2E8,
}

impl Device {
    pub const ALL: [Device; 4] = [Device::Com1, Device::Com2, Device::Com3, Device::Com4];

    pub const fn port(self) -> u16 {
        self as u16
    }

    pub const fn index(self) -> usize {
        match self {
            Device::Com1 => 0,
            Device::Com2 => 1,
            Device::Com3 => 2,
            Device::Com4 => 3,
        }
    }

    /// IRQ line on the master PIC. COM1/COM3 share one, COM2/COM4 the other.
    pub const fn irq(self) -> u8 {
        match self {
            Device::Com1 | Device::Com3 => 4,
            Device::Com2 | Device::Com4 => 3,
        }
    }

    /// IDT vector the IRQ is remapped to.
    pub const fn vector(self) -> u8 {
        0x20 + self.irq()
    }

    pub fn from_port(port: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|dev| dev.port() == port)
    }

    /// Device id as passed in a syscall register.
    pub fn from_raw(raw: u64) -> Option<Self> {
        u16::try_from(raw).ok().and_then(Self::from_port)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoOperation {
    Read,
    Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialError {
    InvalidDevice,
    InvalidBaudRate,
    PortAlreadyOpen,
    NotOpen,
    OutOfMemory,
}

impl SerialError {
    /// Driver error number.
    pub fn code(self) -> i32 {
        match self {
            SerialError::InvalidDevice => -1,
            SerialError::InvalidBaudRate => -102,
            SerialError::PortAlreadyOpen => -103,
            SerialError::NotOpen => -201,
            SerialError::OutOfMemory => -12,
        }
    }

    pub fn kind(self) -> ErrorKind {
        match self {
            SerialError::InvalidDevice | SerialError::InvalidBaudRate => ErrorKind::Validation,
            SerialError::PortAlreadyOpen | SerialError::NotOpen => ErrorKind::DeviceState,
            SerialError::OutOfMemory => ErrorKind::AllocationFailure,
        }
    }
}

impl fmt::Display for SerialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            SerialError::InvalidDevice => "invalid serial device",
            SerialError::InvalidBaudRate => "invalid baud rate divisor",
            SerialError::PortAlreadyOpen => "port already open",
            SerialError::NotOpen => "serial port not open",
            SerialError::OutOfMemory => "out of memory",
        };
        write!(f, "error {}: {}", self.code(), msg)
    }
}

/// Outcome of [`SerialDevices::io_request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoRequestResult {
    InvalidParams,
    DeviceClosed,
    /// Queued behind the running request.
    DeviceBusy,
    /// Started; completion is reported by `check_completed`.
    PartiallyServiced,
    /// Completed synchronously with this many bytes.
    Serviced(usize),
    /// No memory to queue the request.
    OutOfMemory,
}

impl IoRequestResult {
    pub fn kind(self) -> Option<ErrorKind> {
        match self {
            IoRequestResult::InvalidParams => Some(ErrorKind::Validation),
            IoRequestResult::DeviceClosed | IoRequestResult::DeviceBusy => Some(ErrorKind::DeviceState),
            IoRequestResult::OutOfMemory => Some(ErrorKind::AllocationFailure),
            IoRequestResult::PartiallyServiced | IoRequestResult::Serviced(_) => None,
        }
    }
}

/// A finished request reported to the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub pid: Pid,
    pub transferred: usize,
}

pub struct SerialDevices {
    dcbs: [Dcb; 4],
    commands: &'static dyn CommandRegistry,
}

impl SerialDevices {
    pub const fn new(commands: &'static dyn CommandRegistry) -> Self {
        Self {
            dcbs: [
                Dcb::new(Device::Com1),
                Dcb::new(Device::Com2),
                Dcb::new(Device::Com3),
                Dcb::new(Device::Com4),
            ],
            commands,
        }
    }

    pub fn dcb(&self, dev: Device) -> &Dcb {
        &self.dcbs[dev.index()]
    }

    fn dcb_mut(&mut self, dev: Device) -> &mut Dcb {
        &mut self.dcbs[dev.index()]
    }

    pub fn is_open(&self, dev: Device) -> bool {
        self.dcb(dev).is_open()
    }

    pub fn open<P: PortIo>(&mut self, ports: &mut P, dev: Device, baud: u32) -> Result<(), SerialError> {
        self.dcb_mut(dev).open(ports, baud)?;
        log::info!(target: "serial", "{:?} open at {} baud", dev, baud);
        Ok(())
    }

    /// Closes `dev` and returns the requests that were waiting on it.
    pub fn close<P: PortIo>(&mut self, ports: &mut P, dev: Device) -> Result<Orphans, SerialError> {
        let shared = Device::ALL
            .into_iter()
            .any(|other| other != dev && other.irq() == dev.irq() && self.is_open(other));
        let orphans = self.dcb_mut(dev).close(ports, !shared)?;
        log::info!(target: "serial", "{:?} closed", dev);
        if !orphans.is_empty() {
            log::warn!(target: "serial", "{:?} closed with requests outstanding", dev);
        }
        Ok(orphans)
    }

    pub fn set_editor_options(&mut self, dev: Device, options: EditorOptions) {
        self.dcb_mut(dev).editor.options = options;
    }

    pub fn editor_options(&self, dev: Device) -> EditorOptions {
        self.dcb(dev).editor.options
    }

    /// Starts or queues a transfer for `pid`.
    pub fn io_request<P: PortIo>(
        &mut self,
        ports: &mut P,
        pid: Option<Pid>,
        action: Action,
        device: u64,
        buffer: Option<IoBuffer>,
    ) -> IoRequestResult {
        let Some(dev) = Device::from_raw(device) else {
            return IoRequestResult::InvalidParams;
        };
        let Some(buffer) = buffer.filter(|b| !b.is_empty()) else {
            return IoRequestResult::InvalidParams;
        };
        let op = match action {
            Action::Read => IoOperation::Read,
            Action::Write => IoOperation::Write,
            _ => return IoRequestResult::InvalidParams,
        };

        let commands = self.commands;
        let dcb = self.dcb_mut(dev);
        if !dcb.is_open() {
            return IoRequestResult::DeviceClosed;
        }

        if dcb.is_busy() {
            return match dcb.enqueue(Iocb { pid, op, buffer }) {
                Ok(()) => IoRequestResult::DeviceBusy,
                Err(_) => IoRequestResult::OutOfMemory,
            };
        }

        if dcb.start(ports, pid, op, buffer, commands) {
            IoRequestResult::Serviced(dcb.acknowledge())
        } else {
            IoRequestResult::PartiallyServiced
        }
    }

    /// Reports the first device whose request has finished, starting the
    /// next request queued on it.
    pub fn check_completed<P: PortIo>(&mut self, ports: &mut P) -> Option<Completion> {
        let commands = self.commands;
        self.dcbs
            .iter_mut()
            .find_map(|dcb| dcb.collect(ports, commands))
            .map(|(pid, transferred)| Completion { pid, transferred })
    }

    /// Whether `pid` still waits on any device.
    pub fn has_request(&self, pid: Pid) -> bool {
        self.dcbs.iter().any(|dcb| dcb.serves(pid))
    }

    /// Removes every request made by `pid` from every device.
    pub fn cancel_requests<P: PortIo>(&mut self, ports: &mut P, pid: Pid) -> usize {
        let commands = self.commands;
        let cancelled: usize = self
            .dcbs
            .iter_mut()
            .filter(|dcb| dcb.is_open())
            .map(|dcb| dcb.cancel(ports, pid, commands))
            .sum();
        if cancelled > 0 {
            log::debug!(target: "serial", "cancelled {} request(s) of {}", cancelled, pid);
        }
        cancelled
    }

    /// Services one UART interrupt on `dev`. Does not acknowledge the PIC.
    pub fn handle_interrupt<P: PortIo>(&mut self, ports: &mut P, dev: Device) {
        let commands = self.commands;
        let dcb = self.dcb_mut(dev);
        if !dcb.is_open() {
            return;
        }
        match InterruptId::from_iir(ports.read_u8(dev.port() + uart::IIR)) {
            Some(InterruptId::ModemStatus) => {
                ports.read_u8(dev.port() + uart::MSR);
            }
            Some(InterruptId::TransmitEmpty) => dcb.output_isr(ports),
            Some(InterruptId::ReceivedData) => dcb.input_isr(ports, commands),
            Some(InterruptId::LineStatus) => {
                ports.read_u8(dev.port() + uart::LSR);
            }
            None => {}
        }
    }

    /// Services every open device wired to `irq`.
    pub fn handle_irq<P: PortIo>(&mut self, ports: &mut P, irq: u8) {
        for dev in Device::ALL {
            if dev.irq() == irq {
                self.handle_interrupt(ports, dev);
            }
        }
    }
}
