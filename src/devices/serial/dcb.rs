//! Device control block: the per-port state machine behind interrupt
//! driven serial I/O.

use alloc::collections::VecDeque;

use crate::commands::CommandRegistry;
use crate::devices::io_buffer::IoBuffer;
use crate::devices::port::{uart, wait_transmit_empty, InterruptEnable, LineControl, ModemControl, PortIo, PIC1_DATA};
use crate::devices::ring_buffer::RingBuffer;
use crate::devices::serial::echo::{echo_line, PortWriter};
use crate::devices::serial::line_editor::{is_newline, Line, LineEditor};
use crate::devices::serial::{Device, IoOperation, SerialError};
use crate::process::Pid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DcbState {
    Idling,
    Reading,
    Writing,
}

/// A request that arrived while its device was busy.
#[derive(Debug, Clone, Copy)]
pub struct Iocb {
    pub pid: Option<Pid>,
    pub op: IoOperation,
    pub buffer: IoBuffer,
}

/// Requests left without a device when it is closed.
#[derive(Debug)]
pub struct Orphans {
    pub owner: Option<Pid>,
    pub pending: VecDeque<Iocb>,
}

impl Orphans {
    pub fn pids(&self) -> impl Iterator<Item = Pid> + '_ {
        self.owner
            .into_iter()
            .chain(self.pending.iter().filter_map(|iocb| iocb.pid))
    }

    pub fn is_empty(&self) -> bool {
        self.pids().next().is_none()
    }
}

pub struct Dcb {
    device: Device,
    open: bool,
    state: DcbState,
    /// Set when an operation finishes; cleared once the dispatcher sees it.
    event: bool,
    owner: Option<Pid>,
    buffer: Option<IoBuffer>,
    requested: usize,
    io_bytes: usize,
    line_pos: usize,
    pub(crate) editor: LineEditor,
    ring: RingBuffer,
    pending: VecDeque<Iocb>,
}

impl Dcb {
    pub const fn new(device: Device) -> Self {
        Self {
            device,
            open: false,
            state: DcbState::Idling,
            event: false,
            owner: None,
            buffer: None,
            requested: 0,
            io_bytes: 0,
            line_pos: 0,
            editor: LineEditor::new(),
            ring: RingBuffer::new(),
            pending: VecDeque::new(),
        }
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn state(&self) -> DcbState {
        self.state
    }

    pub fn owner(&self) -> Option<Pid> {
        self.owner
    }

    pub fn event(&self) -> bool {
        self.event
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn buffered_input(&self) -> usize {
        self.ring.len()
    }

    /// Bytes moved by the current or last operation.
    pub fn transferred(&self) -> usize {
        self.io_bytes
    }

    /// Whether `pid` has a request running or queued here.
    pub fn serves(&self, pid: Pid) -> bool {
        self.owner == Some(pid) || self.pending.iter().any(|iocb| iocb.pid == Some(pid))
    }

    /// An operation is running, or one has finished and not been collected.
    pub fn is_busy(&self) -> bool {
        self.state != DcbState::Idling || self.event
    }

    fn reg(&self, offset: u16) -> u16 {
        self.device.port() + offset
    }

    pub fn open<P: PortIo>(&mut self, ports: &mut P, baud: u32) -> Result<(), SerialError> {
        if self.open {
            return Err(SerialError::PortAlreadyOpen);
        }
        let divisor = uart::CLOCK_HZ.checked_div(baud).ok_or(SerialError::InvalidBaudRate)?;
        if divisor == 0 || divisor > u16::MAX as u32 {
            return Err(SerialError::InvalidBaudRate);
        }

        self.open = true;
        self.state = DcbState::Idling;
        self.event = false;
        self.owner = None;
        self.buffer = None;
        self.ring.clear();
        self.pending.clear();

        ports.write_u8(self.reg(uart::LCR), LineControl::DIVISOR_LATCH.bits());
        ports.write_u8(self.reg(uart::DATA), (divisor & 0xFF) as u8);
        ports.write_u8(self.reg(uart::IER), (divisor >> 8) as u8);
        ports.write_u8(self.reg(uart::LCR), LineControl::WORD_LEN_8.bits());

        let mask = ports.read_u8(PIC1_DATA);
        ports.write_u8(PIC1_DATA, mask & !(1 << self.device.irq()));

        ports.write_u8(self.reg(uart::MCR), ModemControl::AUX_OUTPUT_2.bits());
        ports.write_u8(self.reg(uart::IER), InterruptEnable::RECEIVED_DATA.bits());
        Ok(())
    }

    /// Shuts the UART interrupts off and hands back every request that
    /// was still waiting on this device. `mask_irq` is false while another
    /// open port shares the IRQ line.
    pub fn close<P: PortIo>(&mut self, ports: &mut P, mask_irq: bool) -> Result<Orphans, SerialError> {
        if !self.open {
            return Err(SerialError::NotOpen);
        }
        let orphans = Orphans {
            owner: self.owner,
            pending: core::mem::take(&mut self.pending),
        };
        self.abort();
        self.open = false;

        if mask_irq {
            let mask = ports.read_u8(PIC1_DATA);
            ports.write_u8(PIC1_DATA, mask | (1 << self.device.irq()));
        }
        ports.write_u8(self.reg(uart::MCR), 0);
        ports.write_u8(self.reg(uart::IER), 0);
        Ok(orphans)
    }

    /// Forgets the running operation without signalling completion.
    fn abort(&mut self) {
        self.state = DcbState::Idling;
        self.event = false;
        self.owner = None;
        self.buffer = None;
        self.editor.begin_line();
    }

    /// Marks the running operation complete.
    fn finish(&mut self) {
        self.state = DcbState::Idling;
        self.event = true;
    }

    /// Starts `op` for `owner`. Returns true if it completed synchronously.
    pub fn start<P: PortIo>(
        &mut self,
        ports: &mut P,
        owner: Option<Pid>,
        op: IoOperation,
        buffer: IoBuffer,
        commands: &dyn CommandRegistry,
    ) -> bool {
        self.owner = owner;
        match op {
            IoOperation::Read => self.read(ports, buffer, commands),
            IoOperation::Write => self.write(ports, buffer),
        }
    }

    /// Queues a request behind the running one.
    pub fn enqueue(&mut self, iocb: Iocb) -> Result<(), SerialError> {
        self.pending
            .try_reserve(1)
            .map_err(|_| SerialError::OutOfMemory)?;
        self.pending.push_back(iocb);
        Ok(())
    }

    /// Issues the oldest pending request, if any.
    pub fn start_next<P: PortIo>(&mut self, ports: &mut P, commands: &dyn CommandRegistry) {
        if let Some(iocb) = self.pending.pop_front() {
            self.start(ports, iocb.pid, iocb.op, iocb.buffer, commands);
        }
    }

    /// Reports a finished operation and starts the next queued one.
    /// Returns the owner of the finished operation and its byte count.
    pub fn collect<P: PortIo>(&mut self, ports: &mut P, commands: &dyn CommandRegistry) -> Option<(Pid, usize)> {
        if !self.event {
            return None;
        }
        let finished = self.owner.take();
        let transferred = self.io_bytes;
        self.event = false;
        self.start_next(ports, commands);
        finished.map(|pid| (pid, transferred))
    }

    /// Marks a synchronously finished operation as already reported.
    pub fn acknowledge(&mut self) -> usize {
        self.event = false;
        self.owner = None;
        self.io_bytes
    }

    /// Drops every request made by `pid`. If `pid` owns the running
    /// operation it is aborted and the next queued request starts.
    pub fn cancel<P: PortIo>(&mut self, ports: &mut P, pid: Pid, commands: &dyn CommandRegistry) -> usize {
        let before = self.pending.len();
        self.pending.retain(|iocb| iocb.pid != Some(pid));
        let mut cancelled = before - self.pending.len();

        if self.owner == Some(pid) {
            if self.state == DcbState::Writing {
                self.disable_transmit_interrupt(ports);
            }
            let was_running = self.is_busy();
            self.abort();
            if was_running {
                cancelled += 1;
            }
            self.start_next(ports, commands);
        }
        cancelled
    }

    fn read<P: PortIo>(&mut self, ports: &mut P, mut buffer: IoBuffer, commands: &dyn CommandRegistry) -> bool {
        self.event = false;
        self.buffer = Some(buffer);
        self.requested = buffer.len();
        self.io_bytes = 0;
        self.line_pos = 0;
        self.state = DcbState::Reading;
        self.editor.begin_line();

        let mut terminated = false;
        // SAFETY: the requester leaves its buffer alone until this request is
        // collected or cancelled, and the DCB holds the only copy of the handle.
        let mut line = Line::new(unsafe { buffer.as_mut_slice() });
        while line.len < self.requested {
            let Some(byte) = self.ring.pop() else { break };
            if is_newline(byte) {
                terminated = true;
                break;
            }
            self.editor.handle_byte(byte, &mut line, commands);
        }
        self.io_bytes = line.len;
        self.line_pos = line.pos;

        let mut out = PortWriter::new(ports, self.device.port());
        if line.len > 0 {
            echo_line(&mut out, line.bytes(), line.pos, 0, self.editor.options, commands);
        }
        if terminated {
            out.write_bytes(b"\n");
            self.editor.finish_line(line.bytes());
        }

        if terminated || self.io_bytes >= self.requested {
            self.finish();
            return true;
        }
        false
    }

    fn write<P: PortIo>(&mut self, ports: &mut P, buffer: IoBuffer) -> bool {
        self.event = false;
        self.buffer = Some(buffer);
        self.requested = buffer.len();
        self.io_bytes = 1;
        self.state = DcbState::Writing;

        // SAFETY: as in `read`; the slice lives only for this statement.
        if let Some(first) = unsafe { buffer.as_slice() }.first() {
            wait_transmit_empty(ports, self.device.port());
            ports.write_u8(self.reg(uart::DATA), *first);
        }
        let ier = InterruptEnable::from_bits_retain(ports.read_u8(self.reg(uart::IER)));
        ports.write_u8(self.reg(uart::IER), (ier | InterruptEnable::TRANSMIT_EMPTY).bits());
        false
    }

    fn disable_transmit_interrupt<P: PortIo>(&self, ports: &mut P) {
        let ier = InterruptEnable::from_bits_retain(ports.read_u8(self.reg(uart::IER)));
        ports.write_u8(self.reg(uart::IER), (ier - InterruptEnable::TRANSMIT_EMPTY).bits());
    }

    /// Transmitter-empty interrupt: sends the next byte or completes.
    pub fn output_isr<P: PortIo>(&mut self, ports: &mut P) {
        if self.state != DcbState::Writing {
            return;
        }
        let Some(buffer) = self.buffer else { return };

        if self.io_bytes < self.requested {
            // SAFETY: as in `read`; no slice over the buffer is held between
            // interrupts.
            let byte = unsafe { buffer.as_slice() }[self.io_bytes];
            ports.write_u8(self.reg(uart::DATA), byte);
            self.io_bytes += 1;
            return;
        }
        self.disable_transmit_interrupt(ports);
        self.finish();
    }

    /// Received-data interrupt: feeds the line editor while a read is
    /// running, otherwise buffers the byte.
    pub fn input_isr<P: PortIo>(&mut self, ports: &mut P, commands: &dyn CommandRegistry) {
        let byte = ports.read_u8(self.reg(uart::DATA));

        let Some(mut buffer) = self.buffer.filter(|_| self.state == DcbState::Reading) else {
            if !self.ring.push(byte) {
                log::warn!(target: "serial", "{:?}: input buffer full, dropped {:#04x}", self.device, byte);
            }
            return;
        };

        // SAFETY: as in `read`; the slice is dropped before the ISR returns.
        let mut line = Line {
            buf: unsafe { buffer.as_mut_slice() },
            len: self.io_bytes,
            pos: self.line_pos,
        };
        let mut out = PortWriter::new(ports, self.device.port());

        if is_newline(byte) {
            out.write_bytes(b"\n");
            self.editor.finish_line(line.bytes());
            self.finish();
            return;
        }

        let start_pos = line.pos;
        self.editor.handle_byte(byte, &mut line, commands);
        self.io_bytes = line.len;
        self.line_pos = line.pos;
        echo_line(&mut out, line.bytes(), line.pos, start_pos, self.editor.options, commands);

        if self.io_bytes >= self.requested {
            self.finish();
        }
    }
}
