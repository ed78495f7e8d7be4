//! PCB arena plus the single ordered queue holding every non-active process.
//!
//! The arena owns the PCBs; the queue only stores `(pid, key)` pairs. The
//! key is captured when an entry is inserted, so a state change must go
//! through [`PcbRegistry::update`], which takes the entry out, mutates the
//! PCB and puts it back at its new position.

use alloc::vec::Vec;
use core::cmp::Ordering;

use crate::data_structures::SortedList;
use crate::process::context::{Context, ProcessEntry};
use crate::process::pcb::{
    validate_priority, DispatchState, ExecState, Pcb, Pid, ProcessClass, ProcessError, SortKey,
};

#[derive(Debug, Clone, Copy)]
struct QueueEntry {
    pid: Pid,
    key: SortKey,
}

fn by_key(a: &QueueEntry, b: &QueueEntry) -> Ordering {
    a.key.cmp(&b.key)
}

pub struct PcbRegistry {
    pcbs: Vec<Pcb>,
    queue: SortedList<QueueEntry>,
    next_pid: u32,
}

impl PcbRegistry {
    pub const fn new() -> Self {
        Self {
            pcbs: Vec::new(),
            queue: SortedList::new(by_key),
            next_pid: 1,
        }
    }

    /// Number of live PCBs, queued or not.
    pub fn len(&self) -> usize {
        self.pcbs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pcbs.is_empty()
    }

    /// Number of PCBs currently waiting in the queue.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn is_queued(&self, pid: Pid) -> bool {
        self.queue.contains(|entry| entry.pid == pid)
    }

    pub fn get(&self, pid: Pid) -> Option<&Pcb> {
        self.pcbs.iter().find(|pcb| pcb.pid() == pid)
    }

    pub fn get_mut(&mut self, pid: Pid) -> Option<&mut Pcb> {
        self.pcbs.iter_mut().find(|pcb| pcb.pid() == pid)
    }

    /// Any live PCB with this name, queued or active.
    pub fn lookup(&self, name: &str) -> Option<Pid> {
        self.pcbs.iter().find(|pcb| pcb.name() == name).map(Pcb::pid)
    }

    /// Allocates a fresh PCB in the arena. It is not queued until
    /// [`insert`](Self::insert) is called.
    pub fn create(&mut self, name: &str, class: ProcessClass, priority: i32) -> Result<Pid, ProcessError> {
        let priority = Pcb::validate(name, priority)?;
        if self.lookup(name).is_some() {
            return Err(ProcessError::DuplicateName);
        }

        self.pcbs
            .try_reserve(1)
            .map_err(|_| ProcessError::OutOfMemory)?;
        let pid = Pid(self.next_pid);
        let pcb = Pcb::alloc(pid, name, class, priority)?;
        self.next_pid = self.next_pid.wrapping_add(1).max(1);
        self.pcbs.push(pcb);

        log::debug!(target: "pcb", "created {} '{}' {:?} priority {}", pid, name, class, priority);
        Ok(pid)
    }

    /// Creates a PCB that starts at `entry(arg)` on its own stack and queues
    /// it READY.
    pub fn spawn(
        &mut self,
        name: &str,
        class: ProcessClass,
        priority: i32,
        entry: ProcessEntry,
        arg: usize,
    ) -> Result<Pid, ProcessError> {
        let pid = self.create(name, class, priority)?;
        if let Some(pcb) = self.get_mut(pid) {
            pcb.context = Context::initial(entry, arg, pcb.stack_top());
        }
        if let Err(err) = self.insert(pid) {
            self.destroy(pid);
            return Err(err);
        }
        Ok(pid)
    }

    /// Puts `pid` into the queue at its sorted position. Equal keys keep
    /// insertion order. Re-inserting a queued PCB moves it instead of
    /// duplicating it.
    pub fn insert(&mut self, pid: Pid) -> Result<(), ProcessError> {
        let key = self.get(pid).ok_or(ProcessError::NotFound)?.sort_key();
        self.remove(pid);
        self.queue
            .insert(QueueEntry { pid, key })
            .map_err(|_| ProcessError::OutOfMemory)
    }

    /// Takes `pid` out of the queue. Returns false if it was not queued.
    pub fn remove(&mut self, pid: Pid) -> bool {
        self.queue.remove_by(|entry| entry.pid == pid).is_some()
    }

    /// Linear scan of the queue by name.
    pub fn find(&self, name: &str) -> Option<Pid> {
        self.queue
            .iter()
            .map(|entry| entry.pid)
            .find(|pid| self.get(*pid).is_some_and(|pcb| pcb.name() == name))
    }

    pub fn peek_head(&self) -> Option<&Pcb> {
        self.queue.peek().and_then(|entry| self.get(entry.pid))
    }

    /// Removes the queue head without looking at its state.
    pub fn poll_head(&mut self) -> Option<Pid> {
        self.queue.poll().map(|entry| entry.pid)
    }

    /// Mutates a PCB and keeps the queue sorted if the PCB is queued.
    pub fn update<F>(&mut self, pid: Pid, f: F) -> Result<(), ProcessError>
    where
        F: FnOnce(&mut Pcb),
    {
        let queued = self.remove(pid);
        let pcb = self.get_mut(pid).ok_or(ProcessError::NotFound)?;
        f(pcb);
        if queued {
            self.insert(pid)?;
        }
        Ok(())
    }

    /// Drops a PCB from both the queue and the arena and hands it back.
    /// The caller must not be running on its stack.
    pub fn destroy(&mut self, pid: Pid) -> Option<Pcb> {
        self.remove(pid);
        let index = self.pcbs.iter().position(|pcb| pcb.pid() == pid)?;
        let pcb = self.pcbs.swap_remove(index);
        log::debug!(target: "pcb", "destroyed {} '{}'", pid, pcb.name());
        Some(pcb)
    }

    fn user_process(&self, name: &str) -> Result<Pid, ProcessError> {
        let pid = self.lookup(name).ok_or(ProcessError::NotFound)?;
        match self.get(pid).map(Pcb::class) {
            Some(ProcessClass::User) => Ok(pid),
            Some(ProcessClass::System) => Err(ProcessError::SystemProcess),
            None => Err(ProcessError::NotFound),
        }
    }

    pub fn suspend(&mut self, name: &str) -> Result<(), ProcessError> {
        let pid = self.user_process(name)?;
        self.update(pid, |pcb| pcb.dispatch_state = DispatchState::Suspended)
    }

    pub fn resume(&mut self, name: &str) -> Result<(), ProcessError> {
        let pid = self.user_process(name)?;
        self.update(pid, |pcb| pcb.dispatch_state = DispatchState::NotSuspended)
    }

    /// Changing priority is allowed on SYSTEM processes too.
    pub fn set_priority(&mut self, name: &str, priority: i32) -> Result<(), ProcessError> {
        let priority = validate_priority(priority)?;
        let pid = self.lookup(name).ok_or(ProcessError::NotFound)?;
        self.update(pid, |pcb| pcb.priority = priority)
    }

    /// Deletes a queued USER process. The active process is never found
    /// here, so its stack cannot be freed underneath it.
    pub fn delete(&mut self, name: &str) -> Result<Pcb, ProcessError> {
        let pid = self.check_deletable(name)?;
        self.destroy(pid).ok_or(ProcessError::NotFound)
    }

    /// The pid [`delete`](Self::delete) would remove.
    pub fn check_deletable(&self, name: &str) -> Result<Pid, ProcessError> {
        let pid = self.find(name).ok_or(ProcessError::NotFound)?;
        match self.get(pid).map(Pcb::class) {
            Some(ProcessClass::User) => Ok(pid),
            Some(ProcessClass::System) => Err(ProcessError::SystemProcess),
            None => Err(ProcessError::NotFound),
        }
    }

    /// Every live PCB, queued or not.
    pub fn all(&self) -> impl Iterator<Item = &Pcb> {
        self.pcbs.iter()
    }

    /// Queued PCBs that can be dispatched, in queue order.
    pub fn ready(&self) -> impl Iterator<Item = &Pcb> {
        self.queued_pcbs().filter(|pcb| {
            pcb.dispatch_state() == DispatchState::NotSuspended && pcb.exec_state() == ExecState::Ready
        })
    }

    /// Queued PCBs waiting on I/O or held by a suspend, in queue order.
    pub fn blocked(&self) -> impl Iterator<Item = &Pcb> {
        self.queued_pcbs().filter(|pcb| {
            pcb.dispatch_state() == DispatchState::Suspended || pcb.exec_state() == ExecState::Blocked
        })
    }

    fn queued_pcbs(&self) -> impl Iterator<Item = &Pcb> {
        self.queue.iter().filter_map(|entry| self.get(entry.pid))
    }
}

impl Default for PcbRegistry {
    fn default() -> Self {
        Self::new()
    }
}
