//! Kernel initialization phases

use bootloader_api::BootInfo;
use lessonos::config::BOOT_CONFIG;
use lessonos::process::{ProcessClass, ProcessError};

use crate::kernel::state::with_kernel;
use crate::kernel::status::{register_component, update_component_status, InitStatus};
use crate::{logger, memory, println, processes};

type Phase = (&'static str, fn(&BootInfo) -> Result<(), &'static str>);

const PHASES: [Phase; 5] = [
    ("Memory Management", init_memory),
    ("Logging", init_logging),
    ("Interrupt System", init_interrupts),
    ("Serial Console", init_console),
    ("System Processes", init_processes),
];

/// Initialize kernel in proper order with error handling
pub fn init_kernel(boot_info: &BootInfo) -> Result<(), &'static str> {
    for (name, _) in PHASES {
        register_component(name)?;
    }
    println!("╔════════════════════════════════════════╗");
    println!("║     LessonOS Kernel Initialization     ║");
    println!("╚════════════════════════════════════════╝\n");

    for (step, &(name, init_fn)) in PHASES.iter().enumerate() {
        init_phase(step + 1, name, || init_fn(boot_info))?;
    }

    x86_64::instructions::interrupts::enable();
    println!("\nKernel initialization complete!\n");
    Ok(())
}

fn init_phase(
    step: usize,
    name: &'static str,
    init_fn: impl FnOnce() -> Result<(), &'static str>,
) -> Result<(), &'static str> {
    update_component_status(name, InitStatus::InProgress);
    println!("[{}/{}] Initializing {}...", step, PHASES.len(), name);

    match init_fn() {
        Ok(()) => {
            update_component_status(name, InitStatus::Completed);
            println!("    ✓ {} initialized successfully\n", name);
            Ok(())
        }
        Err(e) => {
            update_component_status(name, InitStatus::Failed(e));
            println!("    ✗ {} failed: {}\n", name, e);
            Err(e)
        }
    }
}

fn init_memory(boot_info: &BootInfo) -> Result<(), &'static str> {
    memory::init_heap(boot_info)
}

fn init_logging(_: &BootInfo) -> Result<(), &'static str> {
    logger::init(BOOT_CONFIG.log_level)
}

fn init_interrupts(_: &BootInfo) -> Result<(), &'static str> {
    crate::interrupts::init()
}

fn init_console(_: &BootInfo) -> Result<(), &'static str> {
    let console = BOOT_CONFIG.console;
    with_kernel(|kernel| kernel.open_device(console, BOOT_CONFIG.baud_rate)).map_err(|err| {
        log::error!(target: "boot", "opening {:?}: {}", console, err);
        "could not open the console port"
    })
}

fn init_processes(_: &BootInfo) -> Result<(), &'static str> {
    with_kernel(|kernel| -> Result<(), ProcessError> {
        kernel.spawn("comhand", ProcessClass::System, 0, processes::comhand, 0)?;
        kernel.spawn("idle", ProcessClass::System, 9, processes::idle, 0)?;
        Ok(())
    })
    .map_err(|err| {
        log::error!(target: "boot", "spawning system processes: {}", err);
        "could not spawn the system processes"
    })
}
