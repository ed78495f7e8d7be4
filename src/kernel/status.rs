use core::fmt;
use spin::Mutex;

/// Kernel initialization status tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStatus {
    NotStarted,
    InProgress,
    Completed,
    Failed(&'static str),
}

/// Kernel component status
#[derive(Debug, Clone, Copy)]
pub struct ComponentStatus {
    pub name: &'static str,
    pub status: InitStatus,
}

const MAX_COMPONENTS: usize = 8;

/// Components are registered before the heap exists, so the table is fixed.
struct StatusTable {
    entries: [Option<ComponentStatus>; MAX_COMPONENTS],
}

static INIT_STATUS: Mutex<StatusTable> = Mutex::new(StatusTable {
    entries: [None; MAX_COMPONENTS],
});

impl ComponentStatus {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            status: InitStatus::NotStarted,
        }
    }
}

/// Track kernel component initialization
pub fn register_component(name: &'static str) -> Result<(), &'static str> {
    let mut table = INIT_STATUS.lock();
    let slot = table
        .entries
        .iter_mut()
        .find(|slot| slot.is_none())
        .ok_or("component table full")?;
    *slot = Some(ComponentStatus::new(name));
    Ok(())
}

/// Update component status
pub fn update_component_status(name: &'static str, status: InitStatus) {
    let mut table = INIT_STATUS.lock();
    if let Some(comp) = table.entries.iter_mut().flatten().find(|c| c.name == name) {
        comp.status = status;
    }
}

/// Calls `f` with every registered component in registration order.
pub fn for_each_component(mut f: impl FnMut(&ComponentStatus)) {
    INIT_STATUS.lock().entries.iter().flatten().for_each(|c| f(c));
}

impl fmt::Display for InitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitStatus::NotStarted => write!(f, "Not Started"),
            InitStatus::InProgress => write!(f, "In Progress"),
            InitStatus::Completed => write!(f, "Completed"),
            InitStatus::Failed(err) => write!(f, "Failed: {}", err),
        }
    }
}
