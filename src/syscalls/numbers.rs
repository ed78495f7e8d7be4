//! System request action codes, passed in `rax`.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u64)]
pub enum Action {
    Exit = 0,
    Idle = 1,
    Read = 2,
    Write = 3,

    Unknown = u64::MAX,
}

impl From<u64> for Action {
    fn from(num: u64) -> Self {
        match num {
            0 => Self::Exit,
            1 => Self::Idle,
            2 => Self::Read,
            3 => Self::Write,
            _ => Self::Unknown,
        }
    }
}

impl From<usize> for Action {
    fn from(num: usize) -> Self {
        Self::from(num as u64)
    }
}
