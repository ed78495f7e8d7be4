//! Process Scheduling
//!
//! Cooperative scheduler driven entirely by system requests. A process
//! runs until it traps with IDLE, READ, WRITE or EXIT; the trap handler
//! ([`Scheduler::sys_call`]) then decides who runs next.
//!
//! # Dispatch order
//! 1. A process whose I/O just completed always wins.
//! 2. Otherwise the queue head, unless it is blocked or suspended.
//! 3. Otherwise nobody: the trapping process keeps running.
//!
//! # State
//! - `active`: the process whose registers are live on the CPU. It is
//!   never in the queue.
//! - `bootstrap`: the context that made the very first system request,
//!   returned to once no process is left.
//! - `zombie`: a process that exited during the current request. Its stack
//!   is still in use by the trap frame, so it is freed on the next request.
//! - `delivered`: a byte count for the active process whose own I/O finished
//!   while it kept running. It becomes the `rax` of the request being served.

use crate::commands::CommandRegistry;
use crate::devices::serial::{EditorOptions, SerialDevices, SerialError};
use crate::devices::{Device, PortIo};
use crate::process::{
    Context, DispatchState, ExecState, Pcb, PcbRegistry, Pid, ProcessClass, ProcessEntry, ProcessError,
};
use crate::syscalls::SyscallError;

/// What happens to the outgoing process's registers on a switch.
#[derive(Debug, Clone, Copy)]
pub enum Outgoing<'a> {
    /// Save them into the active PCB and queue it again.
    Save(&'a Context),
    /// The active PCB no longer exists.
    Discard,
}

pub struct Scheduler<P: PortIo> {
    pub(crate) registry: PcbRegistry,
    pub(crate) devices: SerialDevices,
    pub(crate) ports: P,
    pub(crate) active: Option<Pid>,
    pub(crate) bootstrap: Option<Context>,
    pub(crate) zombie: Option<Pcb>,
    pub(crate) delivered: Option<i64>,
}

impl<P: PortIo> Scheduler<P> {
    pub const fn new(ports: P, commands: &'static dyn CommandRegistry) -> Self {
        Self {
            registry: PcbRegistry::new(),
            devices: SerialDevices::new(commands),
            ports,
            active: None,
            bootstrap: None,
            zombie: None,
            delivered: None,
        }
    }

    pub fn active(&self) -> Option<Pid> {
        self.active
    }

    pub fn bootstrap(&self) -> Option<&Context> {
        self.bootstrap.as_ref()
    }

    pub fn registry(&self) -> &PcbRegistry {
        &self.registry
    }

    pub fn devices(&self) -> &SerialDevices {
        &self.devices
    }

    pub fn zombie(&self) -> Option<&Pcb> {
        self.zombie.as_ref()
    }

    /// Frees the process that exited on the previous request.
    pub fn reap(&mut self) {
        if let Some(pcb) = self.zombie.take() {
            log::debug!(target: "sched", "reaped {} '{}'", pcb.pid(), pcb.name());
        }
    }

    /// Picks the process to run next, removing it from the queue.
    pub fn get_next_pcb(&mut self) -> Option<Pid> {
        if let Some(done) = self.devices.check_completed(&mut self.ports) {
            let pid = done.pid;
            let transferred = done.transferred as i64;
            match self.registry.get(pid).map(Pcb::dispatch_state) {
                Some(DispatchState::Suspended) => {
                    // Stays queued; runs once resumed.
                    let updated = self.registry.update(pid, |pcb| {
                        pcb.exec_state = ExecState::Ready;
                        pcb.context.set_return(transferred);
                    });
                    if let Err(err) = updated {
                        log::error!(target: "sched", "could not requeue suspended {}: {}", pid, err);
                    }
                }
                Some(DispatchState::NotSuspended) => {
                    if self.active == Some(pid) {
                        // Its registers are live in the trap frame, not in the PCB.
                        self.delivered = Some(transferred);
                    } else {
                        self.registry.remove(pid);
                    }
                    if let Some(pcb) = self.registry.get_mut(pid) {
                        pcb.exec_state = ExecState::Running;
                        pcb.context.set_return(transferred);
                    }
                    log::trace!(target: "sched", "{} completed I/O ({} bytes)", pid, transferred);
                    return Some(pid);
                }
                None => log::warn!(target: "sched", "completion for unknown process {}", pid),
            }
        }

        let head = self.registry.peek_head()?;
        if head.exec_state() == ExecState::Blocked || head.dispatch_state() == DispatchState::Suspended {
            return None;
        }
        let pid = self.registry.poll_head()?;
        if let Some(pcb) = self.registry.get_mut(pid) {
            pcb.exec_state = ExecState::Running;
        }
        Some(pid)
    }

    /// Switches to `next`. Returns the context to restore, or `None` when
    /// the caller should resume with its own context.
    pub fn next_pcb(&mut self, next: Option<Pid>, outgoing: Outgoing<'_>, state: ExecState) -> Option<Context> {
        let next = next?;
        if self.active == Some(next) {
            if let Some(pcb) = self.registry.get_mut(next) {
                pcb.exec_state = ExecState::Running;
            }
            return None;
        }

        if let (Outgoing::Save(current), Some(active)) = (outgoing, self.active) {
            let saved = self.registry.update(active, |pcb| {
                pcb.context = *current;
                pcb.exec_state = state;
            });
            if let Err(err) = saved.and_then(|()| self.registry.insert(active)) {
                log::error!(target: "sched", "could not requeue {}: {}", active, err);
            }
        }

        let context = *self.registry.get(next)?.context();
        log::trace!(target: "sched", "switch {:?} -> {}", self.active, next);
        self.active = Some(next);
        Some(context)
    }

    /// Saves `current` for the active process and switches away from it.
    /// Without a switch the caller resumes with `current`, carrying any
    /// byte count delivered to it during this request.
    pub(crate) fn switch_from(&mut self, next: Option<Pid>, current: &Context, state: ExecState) -> Context {
        match self.next_pcb(next, Outgoing::Save(current), state) {
            Some(context) => context,
            None => {
                let mut resumed = *current;
                if let Some(count) = self.delivered.take() {
                    resumed.set_return(count);
                }
                resumed
            }
        }
    }

    pub fn spawn(
        &mut self,
        name: &str,
        class: ProcessClass,
        priority: i32,
        entry: ProcessEntry,
        arg: usize,
    ) -> Result<Pid, ProcessError> {
        self.registry.spawn(name, class, priority, entry, arg)
    }

    pub fn suspend(&mut self, name: &str) -> Result<(), ProcessError> {
        self.registry.suspend(name)
    }

    pub fn resume(&mut self, name: &str) -> Result<(), ProcessError> {
        self.registry.resume(name)
    }

    pub fn set_priority(&mut self, name: &str, priority: i32) -> Result<(), ProcessError> {
        self.registry.set_priority(name, priority)
    }

    /// Deletes a queued USER process after cancelling its I/O.
    pub fn delete(&mut self, name: &str) -> Result<(), ProcessError> {
        let pid = self.registry.check_deletable(name)?;
        self.devices.cancel_requests(&mut self.ports, pid);
        self.registry.destroy(pid).ok_or(ProcessError::NotFound)?;
        Ok(())
    }

    /// Destroys every queued process so the next EXIT of the active one
    /// falls back to the bootstrap context. Returns how many were dropped.
    pub fn drain_queue(&mut self) -> usize {
        let mut dropped = 0;
        while let Some(pid) = self.registry.poll_head() {
            self.devices.cancel_requests(&mut self.ports, pid);
            if self.registry.destroy(pid).is_some() {
                dropped += 1;
            }
        }
        log::info!(target: "sched", "dropped {} queued processes", dropped);
        dropped
    }

    pub fn open_device(&mut self, dev: Device, baud: u32) -> Result<(), SerialError> {
        self.devices.open(&mut self.ports, dev, baud)
    }

    /// Closes `dev`. Processes left waiting on it are made ready with an
    /// I/O error as their result.
    pub fn close_device(&mut self, dev: Device) -> Result<usize, SerialError> {
        let orphans = self.devices.close(&mut self.ports, dev)?;
        let errno = SyscallError::IoError.as_errno();
        let mut released = 0;
        for pid in orphans.pids() {
            if Some(pid) == self.active {
                self.delivered = Some(errno);
                released += 1;
                continue;
            }
            let updated = self.registry.update(pid, |pcb| {
                pcb.exec_state = ExecState::Ready;
                pcb.context.set_return(errno);
            });
            if updated.is_ok() {
                released += 1;
            }
        }
        Ok(released)
    }

    pub fn set_editor_options(&mut self, dev: Device, options: EditorOptions) {
        self.devices.set_editor_options(dev, options);
    }

    /// Entry for the serial IRQ handlers.
    pub fn serial_interrupt(&mut self, irq: u8) {
        self.devices.handle_irq(&mut self.ports, irq);
    }

    #[cfg(test)]
    pub(crate) fn ports_mut(&mut self) -> &mut P {
        &mut self.ports
    }
}
