//! Process control block and the states it moves through.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::config::{PCB_MAX_NAME_LEN, PCB_MAX_PRIORITY, PCB_STACK_SIZE};
use crate::error::ErrorKind;
use crate::process::context::Context;

/// Registry handle for a process. Never reused while the kernel runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pid(pub u32);

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ProcessClass {
    User = 0,
    System = 1,
}

impl TryFrom<i32> for ProcessClass {
    type Error = ProcessError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::User),
            1 => Ok(Self::System),
            _ => Err(ProcessError::InvalidClass),
        }
    }
}

impl core::str::FromStr for ProcessClass {
    type Err = ProcessError;

    /// Accepts `user` or `system` in any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("user") {
            Ok(Self::User)
        } else if s.eq_ignore_ascii_case("system") {
            Ok(Self::System)
        } else {
            Err(ProcessError::InvalidClass)
        }
    }
}

impl fmt::Display for ProcessClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "USER"),
            Self::System => write!(f, "SYSTEM"),
        }
    }
}

/// Variant order is the queue order: ready work sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ExecState {
    Ready,
    Running,
    Blocked,
}

/// Variant order is the queue order: suspended work sorts last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DispatchState {
    NotSuspended,
    Suspended,
}

impl fmt::Display for ExecState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => write!(f, "READY"),
            Self::Running => write!(f, "RUNNING"),
            Self::Blocked => write!(f, "BLOCKED"),
        }
    }
}

impl fmt::Display for DispatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotSuspended => write!(f, "not suspended"),
            Self::Suspended => write!(f, "suspended"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessError {
    InvalidPriority,
    InvalidClass,
    /// Empty name or a name with whitespace/control bytes.
    InvalidName,
    NameTooLong,
    DuplicateName,
    NotFound,
    /// SYSTEM-class processes cannot be deleted, suspended or resumed.
    SystemProcess,
    OutOfMemory,
}

impl ProcessError {
    pub fn kind(self) -> ErrorKind {
        match self {
            Self::InvalidPriority | Self::InvalidClass | Self::InvalidName | Self::SystemProcess => {
                ErrorKind::Validation
            }
            Self::NameTooLong => ErrorKind::CapacityExceeded,
            Self::DuplicateName => ErrorKind::DuplicateName,
            Self::NotFound => ErrorKind::NotFound,
            Self::OutOfMemory => ErrorKind::AllocationFailure,
        }
    }
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPriority => write!(f, "priority must be 0-{}", PCB_MAX_PRIORITY),
            Self::InvalidClass => write!(f, "class must be USER or SYSTEM"),
            Self::InvalidName => write!(f, "invalid process name"),
            Self::NameTooLong => write!(f, "name exceeds {} characters", PCB_MAX_NAME_LEN),
            Self::DuplicateName => write!(f, "a process with that name already exists"),
            Self::NotFound => write!(f, "no such process"),
            Self::SystemProcess => write!(f, "operation not allowed on a SYSTEM process"),
            Self::OutOfMemory => write!(f, "out of memory"),
        }
    }
}

/// Checks a raw priority and narrows it.
pub fn validate_priority(priority: i32) -> Result<u8, ProcessError> {
    u8::try_from(priority)
        .ok()
        .filter(|p| *p <= PCB_MAX_PRIORITY)
        .ok_or(ProcessError::InvalidPriority)
}

fn validate_name(name: &str) -> Result<(), ProcessError> {
    if name.is_empty() || name.bytes().any(|b| !b.is_ascii_graphic()) {
        return Err(ProcessError::InvalidName);
    }
    if name.len() > PCB_MAX_NAME_LEN {
        return Err(ProcessError::NameTooLong);
    }
    Ok(())
}

pub struct Pcb {
    pid: Pid,
    name: String,
    class: ProcessClass,
    pub(crate) priority: u8,
    pub(crate) exec_state: ExecState,
    pub(crate) dispatch_state: DispatchState,
    stack: Box<[u8]>,
    /// Saved registers while the process is not running.
    pub(crate) context: Context,
}

impl Pcb {
    /// Allocates a zeroed PCB. Name and priority must already be validated
    /// by [`Pcb::validate`].
    pub(crate) fn alloc(pid: Pid, name: &str, class: ProcessClass, priority: u8) -> Result<Self, ProcessError> {
        let mut owned = String::new();
        owned
            .try_reserve_exact(name.len())
            .map_err(|_| ProcessError::OutOfMemory)?;
        owned.push_str(name);

        let mut stack = Vec::new();
        stack
            .try_reserve_exact(PCB_STACK_SIZE)
            .map_err(|_| ProcessError::OutOfMemory)?;
        stack.resize(PCB_STACK_SIZE, 0u8);

        Ok(Self {
            pid,
            name: owned,
            class,
            priority,
            exec_state: ExecState::Ready,
            dispatch_state: DispatchState::NotSuspended,
            stack: stack.into_boxed_slice(),
            context: Context::default(),
        })
    }

    pub(crate) fn validate(name: &str, priority: i32) -> Result<u8, ProcessError> {
        let priority = validate_priority(priority)?;
        validate_name(name)?;
        Ok(priority)
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class(&self) -> ProcessClass {
        self.class
    }

    pub fn priority(&self) -> u8 {
        self.priority
    }

    pub fn exec_state(&self) -> ExecState {
        self.exec_state
    }

    pub fn dispatch_state(&self) -> DispatchState {
        self.dispatch_state
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Highest address of this process's stack.
    pub fn stack_top(&self) -> u64 {
        self.stack.as_ptr() as u64 + self.stack.len() as u64
    }

    pub fn stack_size(&self) -> usize {
        self.stack.len()
    }

    /// Key the ready/blocked queue sorts by.
    pub(crate) fn sort_key(&self) -> SortKey {
        SortKey {
            dispatch: self.dispatch_state,
            exec: self.exec_state,
            priority: self.priority,
        }
    }
}

impl fmt::Debug for Pcb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pcb")
            .field("pid", &self.pid)
            .field("name", &self.name)
            .field("class", &self.class)
            .field("priority", &self.priority)
            .field("exec_state", &self.exec_state)
            .field("dispatch_state", &self.dispatch_state)
            .finish()
    }
}

/// `(dispatch_state, exec_state, priority)`, compared field by field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct SortKey {
    pub dispatch: DispatchState,
    pub exec: ExecState,
    pub priority: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_parsing() {
        assert_eq!("user".parse::<ProcessClass>(), Ok(ProcessClass::User));
        assert_eq!("SYSTEM".parse::<ProcessClass>(), Ok(ProcessClass::System));
        assert_eq!("kernel".parse::<ProcessClass>(), Err(ProcessError::InvalidClass));
        assert_eq!(ProcessClass::try_from(2), Err(ProcessError::InvalidClass));
    }

    #[test]
    fn test_sort_key_order() {
        let ready = SortKey { dispatch: DispatchState::NotSuspended, exec: ExecState::Ready, priority: 9 };
        let blocked = SortKey { dispatch: DispatchState::NotSuspended, exec: ExecState::Blocked, priority: 0 };
        let suspended = SortKey { dispatch: DispatchState::Suspended, exec: ExecState::Ready, priority: 0 };
        assert!(ready < blocked);
        assert!(blocked < suspended);
    }

    #[test]
    fn test_validate() {
        assert_eq!(Pcb::validate("alpha", 5), Ok(5));
        assert_eq!(Pcb::validate("alpha", 10), Err(ProcessError::InvalidPriority));
        assert_eq!(Pcb::validate("alpha", -1), Err(ProcessError::InvalidPriority));
        assert_eq!(Pcb::validate("", 1), Err(ProcessError::InvalidName));
        assert_eq!(Pcb::validate("two words", 1), Err(ProcessError::InvalidName));
        assert_eq!(Pcb::validate("ninechars", 1), Err(ProcessError::NameTooLong));
    }

    #[test]
    fn test_class_from_raw() {
        assert_eq!(ProcessClass::try_from(0), Ok(ProcessClass::User));
        assert_eq!(ProcessClass::try_from(1), Ok(ProcessClass::System));
        assert_eq!(ProcessClass::try_from(2), Err(ProcessError::InvalidClass));
    }

    #[test]
    fn test_alloc_is_zeroed() {
        let pcb = Pcb::alloc(Pid(1), "p1", ProcessClass::User, 3).unwrap();
        assert_eq!(pcb.exec_state(), ExecState::Ready);
        assert_eq!(pcb.dispatch_state(), DispatchState::NotSuspended);
        assert_eq!(*pcb.context(), Context::default());
        assert_eq!(pcb.stack_size(), PCB_STACK_SIZE);
    }
}
