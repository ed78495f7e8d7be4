//! Terminal output for the line editor.

use core::fmt::{self, Write};

use crate::commands::CommandRegistry;
use crate::devices::port::{wait_transmit_empty, PortIo};
use crate::devices::serial::line_editor::{Direction, EditorOptions};

const GREEN: u8 = 92;
const RED: u8 = 31;

/// Polled writes to a UART, for echo that has to happen inside the
/// interrupt handler.
pub struct PortWriter<'a, P: PortIo + ?Sized> {
    ports: &'a mut P,
    port: u16,
}

impl<'a, P: PortIo + ?Sized> PortWriter<'a, P> {
    pub fn new(ports: &'a mut P, port: u16) -> Self {
        Self { ports, port }
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        for b in bytes {
            wait_transmit_empty(&mut *self.ports, self.port);
            self.ports.write_u8(self.port, *b);
        }
    }

    pub fn move_cursor(&mut self, direction: Direction, columns: usize) {
        let code = match direction {
            Direction::Left => 'D',
            Direction::Right => 'C',
        };
        let _ = write!(self, "\x1b[{}{}", columns, code);
    }

    fn set_color(&mut self, color: u8) {
        let _ = write!(self, "\x1b[{}m", color);
    }
}

impl<P: PortIo + ?Sized> Write for PortWriter<'_, P> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write_bytes(s.as_bytes());
        Ok(())
    }
}

/// Redraws `line` and leaves the terminal cursor at `pos`.
///
/// `start_pos` is where the cursor was before the keystroke, relative to
/// the start of the line.
pub fn echo_line<P: PortIo + ?Sized>(
    out: &mut PortWriter<'_, P>,
    line: &[u8],
    pos: usize,
    start_pos: usize,
    options: EditorOptions,
    commands: &dyn CommandRegistry,
) {
    if options.invisible {
        return;
    }
    if start_pos > 0 {
        out.move_cursor(Direction::Left, start_pos);
    }
    out.write_bytes(b"\x1b[0K");

    if options.command_formatting {
        out.set_color(if commands.contains(line) { GREEN } else { RED });
    }
    out.write_bytes(line);
    if options.command_formatting {
        out.write_bytes(b"\x1b[0m");
    }

    if !line.is_empty() {
        out.move_cursor(Direction::Left, line.len());
    }
    if pos > 0 {
        out.move_cursor(Direction::Right, pos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::StaticCommands;
    use crate::devices::port::MockPorts;

    const CMDS: StaticCommands = StaticCommands(&["help"]);

    fn echoed(line: &[u8], pos: usize, start: usize, options: EditorOptions) -> alloc::vec::Vec<u8> {
        let mut ports = MockPorts::new();
        let mut out = PortWriter::new(&mut ports, 0x3F8);
        echo_line(&mut out, line, pos, start, options, &CMDS);
        ports.written_to(0x3F8)
    }

    #[test]
    fn test_plain_echo() {
        let bytes = echoed(b"abc", 2, 1, EditorOptions::default());
        assert_eq!(bytes, b"\x1b[1D\x1b[0Kabc\x1b[3D\x1b[2C");
    }

    #[test]
    fn test_colored_echo() {
        let options = EditorOptions {
            command_formatting: true,
            ..EditorOptions::default()
        };
        let bytes = echoed(b"help", 4, 0, options);
        assert_eq!(bytes, b"\x1b[0K\x1b[92mhelp\x1b[0m\x1b[4D\x1b[4C");

        let bytes = echoed(b"hx", 2, 0, options);
        assert!(bytes.starts_with(b"\x1b[0K\x1b[31m"));
    }

    #[test]
    fn test_invisible() {
        let options = EditorOptions {
            invisible: true,
            ..EditorOptions::default()
        };
        assert!(echoed(b"secret", 6, 0, options).is_empty());
    }
}
