//! # I/O System Request Handlers
//!
//! | result               | caller's `rax`          | caller becomes |
//! |----------------------|-------------------------|----------------|
//! | serviced             | bytes transferred       | READY          |
//! | partially serviced   | set on completion       | BLOCKED        |
//! | device busy          | set on completion       | BLOCKED        |
//! | either, no switch    | `-EINPROGRESS`          | keeps running  |
//! | invalid parameters   | `-EINVAL`               | READY          |
//! | device closed        | `-ENODEV`               | READY          |
//! | out of memory        | `-ENOMEM`               | READY          |

use crate::devices::{IoBuffer, IoRequestResult, PortIo};
use crate::process::{Context, ExecState, Pid};
use crate::scheduler::Scheduler;
use crate::syscalls::dispatcher::{SyscallError, SyscallRequest};

/// READ or WRITE
pub fn sys_io<P: PortIo>(
    sched: &mut Scheduler<P>,
    request: &SyscallRequest,
    current: &Context,
    next: Option<Pid>,
) -> Context {
    // SAFETY: requests come from kernel processes, whose buffers stay valid
    // until the request is collected. Exiting cancels the request.
    let buffer = unsafe { IoBuffer::from_raw(request.buffer as *mut u8, request.len) };
    let result = sched.devices.io_request(
        &mut sched.ports,
        sched.active,
        request.action,
        request.device,
        buffer,
    );

    let mut saved = *current;
    let state = match result {
        IoRequestResult::Serviced(count) => {
            saved.set_return(count as i64);
            ExecState::Ready
        }
        IoRequestResult::PartiallyServiced | IoRequestResult::DeviceBusy => {
            // Seen only if nobody else can run; a completion overwrites it.
            saved.set_return(SyscallError::InProgress.as_errno());
            ExecState::Blocked
        }
        IoRequestResult::InvalidParams => {
            saved.set_return(SyscallError::InvalidArgument.as_errno());
            ExecState::Ready
        }
        IoRequestResult::DeviceClosed => {
            saved.set_return(SyscallError::BadDevice.as_errno());
            ExecState::Ready
        }
        IoRequestResult::OutOfMemory => {
            saved.set_return(SyscallError::NoMemory.as_errno());
            ExecState::Ready
        }
    };
    match result.kind() {
        Some(kind) => log::debug!(target: "syscall", "{:?} on {:#x}: {:?} ({})", request.action, request.device, result, kind),
        None => log::trace!(target: "syscall", "{:?} on {:#x}: {:?}", request.action, request.device, result),
    }

    sched.switch_from(next, &saved, state)
}
