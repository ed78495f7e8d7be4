//! Error taxonomy shared by the scheduler and device layers.
//!
//! Each subsystem keeps its own error enum next to the code that produces
//! it; `ErrorKind` is the coarse classification those enums report so a
//! caller can react without matching every variant.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad device, buffer, length, operation, priority or class.
    Validation,
    /// Device closed or busy.
    DeviceState,
    AllocationFailure,
    /// Name lookup miss.
    NotFound,
    DuplicateName,
    /// Name too long or a fixed-size buffer is full.
    CapacityExceeded,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Validation => write!(f, "validation error"),
            ErrorKind::DeviceState => write!(f, "device state error"),
            ErrorKind::AllocationFailure => write!(f, "allocation failure"),
            ErrorKind::NotFound => write!(f, "not found"),
            ErrorKind::DuplicateName => write!(f, "duplicate name"),
            ErrorKind::CapacityExceeded => write!(f, "capacity exceeded"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::serial::{IoRequestResult, SerialError};
    use crate::process::ProcessError;
    use crate::syscalls::SyscallError;

    #[test]
    fn test_module_errors_classify() {
        assert_eq!(ProcessError::InvalidPriority.kind(), ErrorKind::Validation);
        assert_eq!(ProcessError::SystemProcess.kind(), ErrorKind::Validation);
        assert_eq!(ProcessError::NameTooLong.kind(), ErrorKind::CapacityExceeded);
        assert_eq!(ProcessError::DuplicateName.kind(), ErrorKind::DuplicateName);
        assert_eq!(ProcessError::NotFound.kind(), ErrorKind::NotFound);
        assert_eq!(ProcessError::OutOfMemory.kind(), ErrorKind::AllocationFailure);

        assert_eq!(SerialError::InvalidBaudRate.kind(), ErrorKind::Validation);
        assert_eq!(SerialError::NotOpen.kind(), ErrorKind::DeviceState);
        assert_eq!(SerialError::OutOfMemory.kind(), ErrorKind::AllocationFailure);

        assert_eq!(IoRequestResult::InvalidParams.kind(), Some(ErrorKind::Validation));
        assert_eq!(IoRequestResult::DeviceBusy.kind(), Some(ErrorKind::DeviceState));
        assert_eq!(IoRequestResult::OutOfMemory.kind(), Some(ErrorKind::AllocationFailure));
        assert_eq!(IoRequestResult::Serviced(3).kind(), None);

        assert_eq!(SyscallError::InvalidSyscall.kind(), ErrorKind::Validation);
        assert_eq!(SyscallError::InProgress.kind(), ErrorKind::DeviceState);
        assert_eq!(SyscallError::NoMemory.kind(), ErrorKind::AllocationFailure);
    }

    #[test]
    fn test_display() {
        assert_eq!(alloc::format!("{}", ErrorKind::NotFound), "not found");
        assert_eq!(alloc::format!("{}", ErrorKind::DeviceState), "device state error");
    }
}
