use core::fmt;

use crate::devices::PortIo;
use crate::error::ErrorKind;
use crate::process::{Context, ExecState};
use crate::scheduler::Scheduler;
use crate::syscalls::handlers;
use crate::syscalls::numbers::Action;

/// System request errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallError {
    InvalidSyscall,
    InvalidArgument,
    BadDevice,
    NoMemory,
    IoError,
    /// The request was queued but the caller resumed before it finished.
    /// Its byte count arrives as the result of a later request.
    InProgress,
}

impl SyscallError {
    pub fn as_errno(self) -> i64 {
        match self {
            Self::InvalidSyscall => -1,
            Self::InvalidArgument => -22, // EINVAL
            Self::BadDevice => -19,       // ENODEV
            Self::NoMemory => -12,        // ENOMEM
            Self::IoError => -5,          // EIO
            Self::InProgress => -115,     // EINPROGRESS
        }
    }

    pub fn kind(self) -> ErrorKind {
        match self {
            Self::InvalidSyscall | Self::InvalidArgument => ErrorKind::Validation,
            Self::BadDevice | Self::IoError | Self::InProgress => ErrorKind::DeviceState,
            Self::NoMemory => ErrorKind::AllocationFailure,
        }
    }
}

impl fmt::Display for SyscallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSyscall => write!(f, "invalid system request"),
            Self::InvalidArgument => write!(f, "invalid argument"),
            Self::BadDevice => write!(f, "device not open"),
            Self::NoMemory => write!(f, "out of memory"),
            Self::IoError => write!(f, "I/O error"),
            Self::InProgress => write!(f, "request in progress"),
        }
    }
}

/// Decoded request registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyscallRequest {
    pub action: Action,
    pub device: u64,
    pub buffer: u64,
    pub len: usize,
}

impl SyscallRequest {
    ///   rax = action
    ///   rdi = device
    ///   rsi = buffer
    ///   rdx = length
    pub fn from_context(ctx: &Context) -> Self {
        Self {
            action: Action::from(ctx.rax),
            device: ctx.rdi,
            buffer: ctx.rsi,
            len: ctx.rdx as usize,
        }
    }
}

impl<P: PortIo> Scheduler<P> {
    /// Handles one system request trapped with `current` as the caller's
    /// registers and returns the registers to restore.
    pub fn sys_call(&mut self, current: &Context) -> Context {
        if self.bootstrap.is_none() {
            self.bootstrap = Some(*current);
        }
        self.reap();

        let request = SyscallRequest::from_context(current);
        let next = self.get_next_pcb();
        log::trace!(target: "syscall", "{:?} from {:?}, next {:?}", request.action, self.active, next);

        match request.action {
            Action::Read | Action::Write => handlers::io::sys_io(self, &request, current, next),
            Action::Idle => handlers::process::sys_idle(self, current, next),
            Action::Exit => handlers::process::sys_exit(self, current, next),
            Action::Unknown => {
                let err = SyscallError::InvalidSyscall;
                log::warn!(target: "syscall", "{} from {:?}: rax={:#x} ({})", err, self.active, current.rax, err.kind());
                let mut saved = *current;
                saved.set_return(err.as_errno());
                self.switch_from(next, &saved, ExecState::Ready)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::NO_COMMANDS;
    use crate::devices::port::{uart, MockPorts};
    use crate::devices::Device;
    use crate::process::{Pid, ProcessClass};
    use alloc::boxed::Box;

    const COM1: u64 = 0x3F8;

    extern "C" fn parked(_: usize) -> ! {
        loop {
            core::hint::spin_loop();
        }
    }

    fn boot_context() -> Context {
        Context {
            rax: Action::Idle as u64,
            rip: 0xB007,
            rsp: 0x7000,
            ..Context::default()
        }
    }

    fn request(mut ctx: Context, action: Action, device: u64, data: &[u8]) -> Context {
        let buffer: &'static mut [u8] = Box::leak(data.to_vec().into_boxed_slice());
        ctx.rax = action as u64;
        ctx.rdi = device;
        ctx.rsi = buffer.as_mut_ptr() as u64;
        ctx.rdx = buffer.len() as u64;
        ctx
    }

    fn with_action(mut ctx: Context, action: Action) -> Context {
        ctx.rax = action as u64;
        ctx
    }

    fn scheduler() -> Scheduler<MockPorts> {
        let mut sched = Scheduler::new(MockPorts::new(), &NO_COMMANDS);
        sched.ports_mut().queue_read(0x21, 0xFF);
        sched.open_device(Device::Com1, 19200).unwrap();
        sched
    }

    fn context_of(sched: &Scheduler<MockPorts>, pid: Pid) -> Context {
        *sched.registry().get(pid).unwrap().context()
    }

    fn transmit_done(sched: &mut Scheduler<MockPorts>) {
        sched.ports_mut().queue_read(COM1 as u16 + uart::IIR, 0b010);
        sched.serial_interrupt(4);
    }

    fn receive(sched: &mut Scheduler<MockPorts>, bytes: &[u8]) {
        for b in bytes {
            sched.ports_mut().queue_read(COM1 as u16 + uart::IIR, 0b100);
            sched.ports_mut().queue_read(COM1 as u16, *b);
            sched.serial_interrupt(4);
        }
    }

    const IN_PROGRESS: i64 = -115;

    #[test]
    fn test_request_decoding() {
        let ctx = Context {
            rax: 3,
            rdi: COM1,
            rsi: 0x1000,
            rdx: 12,
            ..Context::default()
        };
        let req = SyscallRequest::from_context(&ctx);
        assert_eq!(req.action, Action::Write);
        assert_eq!(req.device, COM1);
        assert_eq!(req.buffer, 0x1000);
        assert_eq!(req.len, 12);
    }

    #[test]
    fn test_first_request_enters_highest_priority() {
        let mut sched = scheduler();
        sched.spawn("low", ProcessClass::User, 5, parked, 0).unwrap();
        let high = sched.spawn("high", ProcessClass::User, 1, parked, 0).unwrap();

        let boot = boot_context();
        let restored = sched.sys_call(&boot);
        assert_eq!(sched.bootstrap(), Some(&boot));
        assert_eq!(sched.active(), Some(high));
        assert_eq!(restored, context_of(&sched, high));
        // The boot context is never queued.
        assert_eq!(sched.registry().queued(), 1);
    }

    #[test]
    fn test_exit_with_empty_queue_returns_bootstrap() {
        let mut sched = scheduler();
        let only = sched.spawn("only", ProcessClass::User, 3, parked, 0).unwrap();

        let boot = boot_context();
        let running = sched.sys_call(&boot);
        assert_eq!(sched.active(), Some(only));

        let restored = sched.sys_call(&with_action(running, Action::Exit));
        assert_eq!(restored, boot);
        assert_eq!(sched.active(), None);
        assert!(sched.registry().get(only).is_none());
        assert!(sched.zombie().is_some());

        // The next request frees the exited process's stack.
        sched.sys_call(&boot);
        assert!(sched.zombie().is_none());
    }

    #[test]
    fn test_exit_switches_without_requeue() {
        let mut sched = scheduler();
        let a = sched.spawn("a", ProcessClass::User, 1, parked, 0).unwrap();
        let b = sched.spawn("b", ProcessClass::User, 2, parked, 0).unwrap();

        let running = sched.sys_call(&boot_context());
        let restored = sched.sys_call(&with_action(running, Action::Exit));
        assert_eq!(sched.active(), Some(b));
        assert_eq!(restored, context_of(&sched, b));
        assert!(sched.registry().get(a).is_none());
        assert_eq!(sched.registry().queued(), 0);
    }

    #[test]
    fn test_idle_rotates_equal_priorities() {
        let mut sched = scheduler();
        let a = sched.spawn("a", ProcessClass::User, 4, parked, 0).unwrap();
        let b = sched.spawn("b", ProcessClass::User, 4, parked, 0).unwrap();

        let ctx_a = sched.sys_call(&boot_context());
        assert_eq!(sched.active(), Some(a));
        let ctx_b = sched.sys_call(&with_action(ctx_a, Action::Idle));
        assert_eq!(sched.active(), Some(b));
        sched.sys_call(&with_action(ctx_b, Action::Idle));
        assert_eq!(sched.active(), Some(a));
    }

    #[test]
    fn test_busy_device_blocks_until_completion() {
        let mut sched = scheduler();
        let a = sched.spawn("a", ProcessClass::User, 1, parked, 0).unwrap();
        let b = sched.spawn("b", ProcessClass::User, 2, parked, 0).unwrap();
        let idle = sched.spawn("idle", ProcessClass::System, 9, parked, 0).unwrap();

        let ctx_a = sched.sys_call(&boot_context());
        let ctx_b = sched.sys_call(&request(ctx_a, Action::Write, COM1, b"ab"));
        assert_eq!(sched.active(), Some(b));
        assert_eq!(sched.registry().get(a).unwrap().exec_state(), ExecState::Blocked);

        // Second writer finds the port busy and blocks too.
        let ctx_idle = sched.sys_call(&request(ctx_b, Action::Write, COM1, b"cd"));
        assert_eq!(sched.active(), Some(idle));
        assert_eq!(sched.devices().dcb(Device::Com1).pending_len(), 1);

        transmit_done(&mut sched);
        transmit_done(&mut sched);

        let restored = sched.sys_call(&with_action(ctx_idle, Action::Idle));
        assert_eq!(sched.active(), Some(a));
        assert_eq!(restored.return_value(), 2);
        let pcb = sched.registry().get(a).unwrap();
        assert_eq!(pcb.exec_state(), ExecState::Running);
        assert!(!sched.registry().is_queued(a));

        // b's write was started by the completion of a's.
        assert_eq!(sched.devices().dcb(Device::Com1).owner(), Some(b));
        assert_eq!(sched.registry().get(b).unwrap().exec_state(), ExecState::Blocked);
    }

    #[test]
    fn test_closed_device_error_reaches_caller() {
        let mut sched = scheduler();
        let a = sched.spawn("a", ProcessClass::User, 1, parked, 0).unwrap();
        let b = sched.spawn("b", ProcessClass::User, 2, parked, 0).unwrap();

        let ctx_a = sched.sys_call(&boot_context());
        sched.sys_call(&request(ctx_a, Action::Write, 0x2F8, b"x"));
        assert_eq!(sched.active(), Some(b));

        let pcb = sched.registry().get(a).unwrap();
        assert_eq!(pcb.exec_state(), ExecState::Ready);
        assert_eq!(pcb.context().return_value(), SyscallError::BadDevice.as_errno());
    }

    #[test]
    fn test_serviced_read_returns_count() {
        let mut sched = scheduler();
        let a = sched.spawn("a", ProcessClass::User, 1, parked, 0).unwrap();
        for b in b"hi" {
            sched.ports_mut().queue_read(COM1 as u16 + uart::IIR, 0b100);
            sched.ports_mut().queue_read(COM1 as u16, *b);
            sched.serial_interrupt(4);
        }

        let ctx_a = sched.sys_call(&boot_context());
        let restored = sched.sys_call(&request(ctx_a, Action::Read, COM1, &[0, 0]));
        // Nobody else to run: the caller continues with its result.
        assert_eq!(sched.active(), Some(a));
        assert_eq!(restored.return_value(), 2);
    }

    #[test]
    fn test_unknown_action() {
        let mut sched = scheduler();
        let a = sched.spawn("a", ProcessClass::User, 1, parked, 0).unwrap();
        let ctx_a = sched.sys_call(&boot_context());
        let restored = sched.sys_call(&with_action(ctx_a, Action::Unknown));
        assert_eq!(sched.active(), Some(a));
        assert_eq!(restored.return_value(), SyscallError::InvalidSyscall.as_errno());
    }

    #[test]
    fn test_blocked_request_without_switch_reports_in_progress() {
        let mut sched = scheduler();
        let a = sched.spawn("a", ProcessClass::User, 1, parked, 0).unwrap();
        let ctx_a = sched.sys_call(&boot_context());

        let resumed = sched.sys_call(&request(ctx_a, Action::Read, COM1, &[0; 8]));
        assert_eq!(sched.active(), Some(a));
        assert_eq!(resumed.return_value(), IN_PROGRESS);
        assert_eq!(IN_PROGRESS, SyscallError::InProgress.as_errno());

        // Still waiting: idling changes nothing.
        let resumed = sched.sys_call(&with_action(resumed, Action::Idle));
        assert_eq!(resumed.return_value(), IN_PROGRESS);

        receive(&mut sched, b"x\r");
        let resumed = sched.sys_call(&with_action(resumed, Action::Idle));
        assert_eq!(sched.active(), Some(a));
        assert_eq!(resumed.return_value(), 1);
        assert_eq!(sched.registry().get(a).unwrap().exec_state(), ExecState::Running);

        let resumed = sched.sys_call(&with_action(resumed, Action::Idle));
        assert_eq!(resumed.return_value(), 0);
    }

    #[test]
    fn test_exit_after_own_completion_dispatches_queue() {
        let mut sched = scheduler();
        let a = sched.spawn("a", ProcessClass::User, 1, parked, 0).unwrap();
        let ctx_a = sched.sys_call(&boot_context());
        let ctx_a = sched.sys_call(&request(ctx_a, Action::Read, COM1, &[0; 8]));
        assert_eq!(sched.active(), Some(a));

        let b = sched.spawn("b", ProcessClass::User, 2, parked, 0).unwrap();
        receive(&mut sched, b"x\r");

        let restored = sched.sys_call(&with_action(ctx_a, Action::Exit));
        assert_eq!(sched.active(), Some(b));
        assert_eq!(restored, context_of(&sched, b));
        assert!(sched.registry().get(a).is_none());
        assert_eq!(sched.registry().queued(), 0);
    }

    #[test]
    fn test_exit_while_writing_starts_queued_request() {
        let mut sched = scheduler();
        let a = sched.spawn("a", ProcessClass::User, 1, parked, 0).unwrap();
        let ctx_a = sched.sys_call(&boot_context());
        let ctx_a = sched.sys_call(&request(ctx_a, Action::Write, COM1, b"abc"));
        assert_eq!(ctx_a.return_value(), IN_PROGRESS);

        let b = sched.spawn("b", ProcessClass::User, 2, parked, 0).unwrap();
        let idle = sched.spawn("idle", ProcessClass::System, 9, parked, 0).unwrap();

        let ctx_b = sched.sys_call(&with_action(ctx_a, Action::Idle));
        assert_eq!(sched.active(), Some(b));
        // b queues behind a's running write; a is dispatched again.
        let ctx_a = sched.sys_call(&request(ctx_b, Action::Write, COM1, b"d"));
        assert_eq!(sched.active(), Some(a));
        assert_eq!(sched.devices().dcb(Device::Com1).pending_len(), 1);

        let ctx_idle = sched.sys_call(&with_action(ctx_a, Action::Exit));
        assert_eq!(sched.active(), Some(idle));
        assert!(sched.registry().get(a).is_none());
        let dcb = sched.devices().dcb(Device::Com1);
        assert_eq!(dcb.owner(), Some(b));
        assert_eq!(dcb.pending_len(), 0);
        assert_eq!(sched.ports_mut().last_write(COM1 as u16), Some(b'd'));

        transmit_done(&mut sched);
        let restored = sched.sys_call(&with_action(ctx_idle, Action::Idle));
        assert_eq!(sched.active(), Some(b));
        assert_eq!(restored.return_value(), 1);
    }

    #[test]
    fn test_busy_read_blocks_until_completion() {
        let mut sched = scheduler();
        let a = sched.spawn("a", ProcessClass::User, 1, parked, 0).unwrap();
        let b = sched.spawn("b", ProcessClass::User, 2, parked, 0).unwrap();
        let idle = sched.spawn("idle", ProcessClass::System, 9, parked, 0).unwrap();

        let ctx_a = sched.sys_call(&boot_context());
        let ctx_b = sched.sys_call(&request(ctx_a, Action::Read, COM1, &[0; 4]));
        assert_eq!(sched.active(), Some(b));
        let ctx_idle = sched.sys_call(&request(ctx_b, Action::Read, COM1, &[0; 4]));
        assert_eq!(sched.active(), Some(idle));
        assert_eq!(sched.registry().get(b).unwrap().exec_state(), ExecState::Blocked);
        assert_eq!(sched.devices().dcb(Device::Com1).pending_len(), 1);

        receive(&mut sched, b"hi\r");
        let ctx_a = sched.sys_call(&with_action(ctx_idle, Action::Idle));
        assert_eq!(sched.active(), Some(a));
        assert_eq!(ctx_a.return_value(), 2);
        assert_eq!(sched.registry().get(a).unwrap().exec_state(), ExecState::Running);
        assert!(!sched.registry().is_queued(a));

        // b's read started when a's was collected.
        let dcb = sched.devices().dcb(Device::Com1);
        assert_eq!(dcb.owner(), Some(b));
        assert_eq!(dcb.state(), crate::devices::serial::DcbState::Reading);

        receive(&mut sched, b"ok\r");
        let ctx_b = sched.sys_call(&with_action(ctx_a, Action::Idle));
        assert_eq!(sched.active(), Some(b));
        assert_eq!(ctx_b.return_value(), 2);
        assert_eq!(sched.registry().get(b).unwrap().exec_state(), ExecState::Running);
    }
}
