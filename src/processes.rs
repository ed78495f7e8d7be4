//! Built-in processes: the command handler, the idle loop and the bodies
//! the command set spawns.
//!
//! Both run as ordinary scheduled processes and reach the kernel only
//! through system requests, except for the command set, which inspects the
//! scheduler directly under [`with_kernel`].

use core::arch::asm;
use core::fmt;
use core::ptr;

use lessonos::config::{BOOT_CONFIG, SYSCALL_VECTOR};
use lessonos::devices::serial::{Device, EditorOptions};
use lessonos::shell::{CommandExecutor, CommandResult, Programs};
use lessonos::syscalls::{Action, SyscallError};

use crate::kernel::state::with_kernel;

const LINE_LEN: usize = 100;

const PROGRAMS: Programs = Programs { worker, demo };

/// Traps into the kernel. Returns the request's `rax` on resumption.
fn sys_req(action: Action, device: u64, buffer: *const u8, len: usize) -> i64 {
    let mut rax = action as u64;
    unsafe {
        asm!(
            "int {vector}",
            vector = const SYSCALL_VECTOR,
            inout("rax") rax,
            in("rdi") device,
            in("rsi") buffer,
            in("rdx") len,
        );
    }
    rax as i64
}

/// Blocking text I/O on one serial device.
struct Console {
    device: Device,
}

impl Console {
    fn new(device: Device) -> Self {
        Self { device }
    }

    /// Issues one transfer and waits for its result. When nobody else could
    /// run the request comes back in progress; idle until the count lands.
    fn transfer(&self, action: Action, buffer: *const u8, len: usize) -> i64 {
        let in_progress = SyscallError::InProgress.as_errno();
        let mut result = sys_req(action, u64::from(self.device.port()), buffer, len);
        while result == in_progress {
            result = sys_req(Action::Idle, 0, ptr::null(), 0);
        }
        result
    }

    fn read_line(&mut self, buf: &mut [u8]) -> Result<usize, i64> {
        match self.transfer(Action::Read, buf.as_mut_ptr(), buf.len()) {
            n if n < 0 => Err(n),
            n => Ok(n as usize),
        }
    }

    fn set_options(&self, options: EditorOptions) {
        let device = self.device;
        with_kernel(|kernel| kernel.set_editor_options(device, options));
    }
}

impl fmt::Write for Console {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let mut rest = s.as_bytes();
        while !rest.is_empty() {
            let written = self.transfer(Action::Write, rest.as_ptr(), rest.len());
            if written <= 0 {
                return Err(fmt::Error);
            }
            rest = rest.get(written as usize..).unwrap_or(&[]);
        }
        Ok(())
    }
}

macro_rules! out {
    ($console:expr, $($arg:tt)*) => {{
        use core::fmt::Write;
        let _ = writeln!($console, $($arg)*);
    }};
}

const PROMPT_OPTIONS: EditorOptions = EditorOptions {
    history: true,
    tab_completion: true,
    command_formatting: true,
    invisible: false,
};

const PLAIN_OPTIONS: EditorOptions = EditorOptions {
    history: false,
    tab_completion: false,
    command_formatting: false,
    invisible: false,
};

/// The command handler. Never returns; `shutdown` ends it with EXIT.
pub extern "C" fn comhand(_: usize) -> ! {
    let mut console = Console::new(BOOT_CONFIG.console);
    out!(console, "\x1b[1;32mWelcome to LessonOS!\x1b[0m");
    out!(console, "Type 'help' for the list of commands.");

    loop {
        let mut buf = [0u8; LINE_LEN];
        console.set_options(PROMPT_OPTIONS);
        {
            use core::fmt::Write;
            let _ = console.write_str("> ");
        }
        let read = console.read_line(&mut buf);
        console.set_options(PLAIN_OPTIONS);

        let len = match read {
            Ok(len) => len,
            Err(errno) => {
                log::error!(target: "comhand", "console read failed: {}", errno);
                exit();
            }
        };
        let Ok(line) = core::str::from_utf8(&buf[..len]) else {
            out!(console, "Input is not valid UTF-8");
            continue;
        };

        match with_kernel(|kernel| CommandExecutor::execute(line, kernel, &PROGRAMS)) {
            CommandResult::Output(text) if text.is_empty() => {}
            CommandResult::Output(text) => out!(console, "{}", text),
            CommandResult::Error(text) => out!(console, "\x1b[31m{}\x1b[0m", text),
            CommandResult::Yield => {
                sys_req(Action::Idle, 0, ptr::null(), 0);
            }
            CommandResult::Shutdown => {
                if confirm_shutdown(&mut console) {
                    out!(console, "Shutting down...");
                    let dropped = with_kernel(|kernel| kernel.drain_queue());
                    log::info!(target: "comhand", "shutdown requested, {} processes stopped", dropped);
                    exit();
                }
            }
        }
    }
}

fn confirm_shutdown(console: &mut Console) -> bool {
    {
        use core::fmt::Write;
        let _ = console.write_str("Are you sure you want to shutdown? (y/N): ");
    }
    let mut answer = [0u8; 5];
    match console.read_line(&mut answer) {
        Ok(len) => {
            let answer = answer[..len].trim_ascii();
            answer.eq_ignore_ascii_case(b"y") || answer.eq_ignore_ascii_case(b"yes")
        }
        Err(_) => false,
    }
}

fn exit() -> ! {
    loop {
        sys_req(Action::Exit, 0, ptr::null(), 0);
    }
}

/// Runs whenever nothing else can.
pub extern "C" fn idle(_: usize) -> ! {
    loop {
        sys_req(Action::Idle, 0, ptr::null(), 0);
    }
}

/// Body of processes made with `pcb create`.
extern "C" fn worker(_: usize) -> ! {
    loop {
        sys_req(Action::Idle, 0, ptr::null(), 0);
    }
}

/// Body of the `load-r3` processes: process `n` announces itself `n` times,
/// yielding between messages, then exits.
extern "C" fn demo(n: usize) -> ! {
    let mut console = Console::new(BOOT_CONFIG.console);
    for _ in 0..n {
        out!(console, "proc{} dispatched", n);
        sys_req(Action::Idle, 0, ptr::null(), 0);
    }
    exit();
}
