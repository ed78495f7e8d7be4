use crate::devices::PortIo;
use crate::process::{Context, ExecState, Pid};
use crate::scheduler::{Outgoing, Scheduler};
use crate::syscalls::dispatcher::SyscallError;

/// Give up the CPU.
///
/// Returns 0, or `-EINPROGRESS` while the caller still waits on a device.
/// A byte count delivered in the meantime replaces either.
pub fn sys_idle<P: PortIo>(sched: &mut Scheduler<P>, current: &Context, next: Option<Pid>) -> Context {
    let mut saved = *current;
    let waiting = sched.active.is_some_and(|pid| sched.devices.has_request(pid));
    saved.set_return(if waiting { SyscallError::InProgress.as_errno() } else { 0 });
    sched.switch_from(next, &saved, ExecState::Ready)
}

/// Terminate the calling process.
///
/// Its pending I/O is cancelled and the PCB is parked until the next
/// request, since the trap frame still lives on its stack.
pub fn sys_exit<P: PortIo>(sched: &mut Scheduler<P>, current: &Context, next: Option<Pid>) -> Context {
    let Some(active) = sched.active else {
        // Nothing to terminate; put the candidate back.
        if let Some(pid) = next {
            let requeued = sched
                .registry
                .update(pid, |pcb| pcb.exec_state = ExecState::Ready)
                .and_then(|()| sched.registry.insert(pid));
            if let Err(err) = requeued {
                log::error!(target: "syscall", "could not requeue {}: {}", pid, err);
            }
        }
        return *current;
    };

    sched.devices.cancel_requests(&mut sched.ports, active);
    sched.zombie = sched.registry.destroy(active);
    sched.active = None;
    sched.delivered = None;
    log::debug!(target: "syscall", "{} exited", active);

    // The candidate may be the exiting process itself if its own I/O
    // finished while it ran; look again without it.
    let next = match next {
        Some(pid) if pid != active => Some(pid),
        _ => sched.get_next_pcb(),
    };
    let bootstrap = sched.bootstrap.unwrap_or(*current);
    sched
        .next_pcb(next, Outgoing::Discard, ExecState::Ready)
        .unwrap_or(bootstrap)
}
