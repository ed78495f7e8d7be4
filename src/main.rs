#![no_std]
#![no_main]
#![feature(abi_x86_interrupt)]

extern crate alloc;
extern crate rlibc;

use bootloader_api::{entry_point, BootInfo};
use core::panic::PanicInfo;
use spin::Mutex;
use uart_16550::SerialPort;

use lessonos::config::BOOT_CONFIG;
use lessonos::syscalls::Action;

use crate::kernel::{init_kernel, state::with_kernel};

mod interrupts;
mod kernel;
mod logger;
mod memory;
mod processes;

entry_point!(kernel_main);

/// Polled output for boot messages, log lines and panics. Kept off the
/// console port, which belongs to the interrupt driven serial engine.
pub static SERIAL: Mutex<SerialPort> = Mutex::new(unsafe { SerialPort::new(BOOT_CONFIG.log_port.port()) });

#[macro_export]
macro_rules! println {
    ($($arg:tt)*) => {{
        use core::fmt::Write;
        x86_64::instructions::interrupts::without_interrupts(|| {
            let mut serial = $crate::SERIAL.lock();
            let _ = writeln!(serial, $($arg)*);
        });
    }};
}

pub fn kernel_main(boot_info: &'static mut BootInfo) -> ! {
    SERIAL.lock().init();

    if let Err(e) = init_kernel(boot_info) {
        println!("Kernel initialization failed: {}", e);
        report_components();
        loop_arch_mm();
    }

    // The first request records this context as the place to come back to
    // once every process is gone, then dispatches the command handler.
    let _ = unsafe { enter_scheduler() };

    log::info!(target: "boot", "all processes finished");
    let console = BOOT_CONFIG.console;
    if let Err(err) = with_kernel(|kernel| kernel.close_device(console)) {
        log::warn!(target: "boot", "closing {:?}: {} ({})", console, err, err.kind());
    }
    with_kernel(|kernel| kernel.reap());
    println!("LessonOS halted.");
    x86_64::instructions::interrupts::disable();
    loop_arch_mm();
}

unsafe fn enter_scheduler() -> u64 {
    let mut rax = Action::Idle as u64;
    core::arch::asm!(
        "int {vector}",
        vector = const lessonos::config::SYSCALL_VECTOR,
        inout("rax") rax,
        out("rdi") _,
        out("rsi") _,
        out("rdx") _,
    );
    rax
}

fn report_components() {
    kernel::for_each_component(|component| {
        println!("  {:<20} {}", component.name, component.status);
    });
}

fn loop_arch_mm() -> ! {
    loop {
        x86_64::instructions::hlt();
    }
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    let msg = info.message();
    let loc = info.location();
    println!("PANIC : {} | {:?}", msg, loc);

    x86_64::instructions::interrupts::disable();
    loop_arch_mm()
}
