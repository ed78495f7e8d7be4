//! # Command Executor
//!
//! Parses and runs the lines typed at the command handler's prompt.
//!
//! ## Available Commands
//!
//! ### General
//! - `help`: Display available commands
//! - `version`: Show the kernel version
//! - `echo <text>`: Echo text back
//! - `clear`: Clear the terminal screen
//! - `yield`: Let every ready process run once
//! - `load-r3`: Spawn the five demo writers `proc1`..`proc5`
//! - `shutdown`: Stop every process and return to the boot context
//!
//! ### Process Control (`pcb <sub>`)
//! - `create <name> <user|system> <priority>`: Spawn a worker process
//! - `delete <name>`: Remove a queued USER process
//! - `suspend <name>` / `resume <name>`: Hold or release a USER process
//! - `priority <name> <0-9>`: Change a process's priority
//! - `show <name>`: Show one process
//! - `show-ready`, `show-blocked`, `show-all`: List processes
//!
//! ## Architecture
//!
//! Commands return `CommandResult`:
//! - `Output(String)`: Successful output to display
//! - `Error(String)`: Error message to display
//! - `Yield`: Request to give up the CPU (issued by the caller)
//! - `Shutdown`: Request to shut down (confirmed and handled by the caller)

use alloc::format;
use alloc::string::String;
use core::fmt::Write;
use core::str::SplitWhitespace;

use crate::devices::PortIo;
use crate::process::{Pcb, ProcessClass, ProcessEntry, ProcessError};
use crate::scheduler::Scheduler;

/// Number of processes `load-r3` spawns.
pub const DEMO_PROCESSES: usize = 5;
const DEMO_PRIORITY: i32 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    Output(String),
    Error(String),
    Yield,
    Shutdown,
}

/// Entry points the command set can spawn.
#[derive(Clone, Copy)]
pub struct Programs {
    /// Body of processes made with `pcb create`.
    pub worker: ProcessEntry,
    /// Body of the `load-r3` processes. Its argument is the process number,
    /// 1 to [`DEMO_PROCESSES`].
    pub demo: ProcessEntry,
}

pub struct CommandExecutor;

impl CommandExecutor {
    /// Runs one input line.
    pub fn execute<P: PortIo>(input: &str, sched: &mut Scheduler<P>, programs: &Programs) -> CommandResult {
        let trimmed = input.trim();

        if trimmed.is_empty() {
            return CommandResult::Output(String::new());
        }

        let mut parts = trimmed.split_whitespace();
        let cmd = match parts.next() {
            Some(c) => c,
            None => return CommandResult::Error(String::from("Empty command")),
        };

        match cmd.to_ascii_lowercase().as_str() {
            "help" => Self::help(parts),
            "version" => Self::version(),
            "echo" => Self::echo(parts),
            "clear" => CommandResult::Output(String::from("\x1b[2J\x1b[H")),
            "yield" => CommandResult::Yield,
            "load-r3" => Self::load_r3(sched, programs.demo),
            "shutdown" => CommandResult::Shutdown,
            "pcb" => Self::pcb(parts, sched, programs.worker),
            _ => CommandResult::Error(format!("Unknown command '{}'. Type 'help' for help!", cmd)),
        }
    }

    fn help(mut args: SplitWhitespace) -> CommandResult {
        if let Some("pcb") = args.next() {
            return CommandResult::Output(String::from(PCB_HELP));
        }
        let help_text = "Available Commands:\n  \
            help [pcb]       - Show this help message\n  \
            version          - Show the kernel version\n  \
            echo <text>      - Echo text to terminal\n  \
            clear            - Clear terminal\n  \
            yield            - Let ready processes run\n  \
            load-r3          - Spawn the demo processes proc1..proc5\n  \
            pcb <sub>        - Manage processes (see 'help pcb')\n  \
            shutdown         - Stop all processes and halt";
        CommandResult::Output(String::from(help_text))
    }

    fn version() -> CommandResult {
        CommandResult::Output(format!("LessonOS v{}", env!("CARGO_PKG_VERSION")))
    }

    fn echo(args: SplitWhitespace) -> CommandResult {
        let mut output = String::new();
        for (i, word) in args.enumerate() {
            if i > 0 {
                output.push(' ');
            }
            output.push_str(word);
        }
        CommandResult::Output(output)
    }

    fn load_r3<P: PortIo>(sched: &mut Scheduler<P>, demo: ProcessEntry) -> CommandResult {
        let mut output = String::new();
        let mut failed = false;
        for n in 1..=DEMO_PROCESSES {
            if !output.is_empty() {
                output.push('\n');
            }
            let name = format!("proc{}", n);
            match sched.spawn(&name, ProcessClass::User, DEMO_PRIORITY, demo, n) {
                Ok(pid) => {
                    let _ = write!(output, "Created process '{}' ({})", name, pid);
                }
                Err(err) => {
                    failed = true;
                    let _ = write!(output, "Could not create '{}': {}", name, describe_error(err));
                }
            }
        }
        if failed {
            CommandResult::Error(output)
        } else {
            CommandResult::Output(output)
        }
    }

    fn pcb<P: PortIo>(mut args: SplitWhitespace, sched: &mut Scheduler<P>, worker: ProcessEntry) -> CommandResult {
        let Some(sub) = args.next() else {
            return CommandResult::Error(String::from("Please provide a PCB sub command!"));
        };

        match sub.to_ascii_lowercase().as_str() {
            "create" => {
                let (Some(name), Some(class), Some(priority)) = (args.next(), args.next(), args.next()) else {
                    return CommandResult::Error(String::from("Usage: pcb create <name> <user|system> <priority>"));
                };
                let class = match class.parse::<ProcessClass>() {
                    Ok(class) => class,
                    Err(err) => return CommandResult::Error(format!("'{}': {}", class, describe_error(err))),
                };
                let Ok(priority) = priority.parse::<i32>() else {
                    return CommandResult::Error(String::from("Priority must be a number between 0 and 9"));
                };
                match sched.spawn(name, class, priority, worker, 0) {
                    Ok(pid) => CommandResult::Output(format!(
                        "Created PCB '{}' ({}): class {}, priority {}",
                        name, pid, class, priority
                    )),
                    Err(err) => CommandResult::Error(format!("Could not create '{}': {}", name, describe_error(err))),
                }
            }
            "delete" => Self::with_name(args, "delete", |name| {
                sched.delete(name).map(|()| format!("Removed PCB '{}'", name))
            }),
            "suspend" => Self::with_name(args, "suspend", |name| {
                sched.suspend(name).map(|()| format!("PCB '{}' suspended", name))
            }),
            "resume" => Self::with_name(args, "resume", |name| {
                sched.resume(name).map(|()| format!("PCB '{}' resumed", name))
            }),
            "priority" => {
                let (Some(name), Some(priority)) = (args.next(), args.next()) else {
                    return CommandResult::Error(String::from("Usage: pcb priority <name> <0-9>"));
                };
                let Ok(priority) = priority.parse::<i32>() else {
                    return CommandResult::Error(String::from("Priority must be a number between 0 and 9"));
                };
                match sched.set_priority(name, priority) {
                    Ok(()) => CommandResult::Output(format!("PCB '{}' now has priority {}", name, priority)),
                    Err(err) => CommandResult::Error(format!("'{}': {}", name, describe_error(err))),
                }
            }
            "show" => Self::with_name(args, "show", |name| {
                let registry = sched.registry();
                registry
                    .lookup(name)
                    .and_then(|pid| registry.get(pid))
                    .map(describe)
                    .ok_or(ProcessError::NotFound)
            }),
            "show-ready" => Self::listing(sched.registry().ready(), "ready"),
            "show-blocked" => Self::listing(sched.registry().blocked(), "blocked"),
            "show-all" => Self::listing(sched.registry().all(), "any"),
            _ => CommandResult::Error(format!(
                "PCB sub command '{}' does not exist! Type 'help pcb' for more info!",
                sub
            )),
        }
    }

    fn with_name<F>(mut args: SplitWhitespace, sub: &str, f: F) -> CommandResult
    where
        F: FnOnce(&str) -> Result<String, ProcessError>,
    {
        let Some(name) = args.next() else {
            return CommandResult::Error(format!("Usage: pcb {} <name>", sub));
        };
        match f(name) {
            Ok(output) => CommandResult::Output(output),
            Err(err) => CommandResult::Error(format!("'{}': {}", name, describe_error(err))),
        }
    }

    fn listing<'a>(pcbs: impl Iterator<Item = &'a Pcb>, state: &str) -> CommandResult {
        let mut output = String::new();
        for pcb in pcbs {
            if !output.is_empty() {
                output.push('\n');
            }
            output.push_str(&describe(pcb));
        }
        if output.is_empty() {
            return CommandResult::Output(format!("Could not find any PCBs in the {} state", state));
        }
        CommandResult::Output(output)
    }
}

const PCB_HELP: &str = "PCB Commands:\n  \
    pcb create <name> <user|system> <priority>\n  \
    pcb delete <name>\n  \
    pcb suspend <name>\n  \
    pcb resume <name>\n  \
    pcb priority <name> <0-9>\n  \
    pcb show <name>\n  \
    pcb show-ready | show-blocked | show-all";

/// `<message> (<kind>)`, e.g. `no such process (not found)`.
fn describe_error(err: ProcessError) -> String {
    format!("{} ({})", err, err.kind())
}

fn describe(pcb: &Pcb) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "PCB \"{}\" ({})\n  - Priority: {}\n  - Class: {}\n  - State: {}\n  - Dispatch: {}",
        pcb.name(),
        pcb.pid(),
        pcb.priority(),
        pcb.class(),
        pcb.exec_state(),
        pcb.dispatch_state()
    );
    out
}
