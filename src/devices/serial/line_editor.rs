//! Keystroke handling for interactive reads.
//!
//! Runs inside the serial receive interrupt, one byte at a time. Bytes are
//! applied to the caller's read buffer; `len` and `pos` are the number of
//! bytes in the line and the cursor position within it.

use crate::commands::CommandRegistry;
use crate::config::ESCAPE_SEQUENCE_LEN;
use crate::devices::serial::history::History;

pub const BACKSPACE: u8 = 8;
pub const TAB: u8 = 9;
pub const ESCAPE: u8 = 27;
pub const DELETE: u8 = 127;

pub fn is_newline(byte: u8) -> bool {
    byte == b'\n' || byte == b'\r'
}

/// Per-device editor switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EditorOptions {
    /// Up/down recall previous lines.
    pub history: bool,
    pub tab_completion: bool,
    /// Echo the line green when it names a command, red otherwise.
    pub command_formatting: bool,
    /// Suppress echo entirely.
    pub invisible: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

/// A read buffer and its edit counters.
#[derive(Debug)]
pub struct Line<'a> {
    pub buf: &'a mut [u8],
    pub len: usize,
    pub pos: usize,
}

impl<'a> Line<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, len: 0, pos: 0 }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    fn insert(&mut self, byte: u8) {
        if self.len >= self.buf.len() {
            return;
        }
        self.buf.copy_within(self.pos..self.len, self.pos + 1);
        self.buf[self.pos] = byte;
        self.pos += 1;
        self.len += 1;
    }

    /// Removes `count` bytes starting at `at`.
    fn remove(&mut self, at: usize, count: usize) {
        self.buf.copy_within(at + count..self.len, at);
        self.len -= count;
        self.buf[self.len..self.len + count].fill(0);
    }

    fn replace(&mut self, text: &[u8]) {
        let len = text.len().min(self.buf.len());
        self.buf.fill(0);
        self.buf[..len].copy_from_slice(&text[..len]);
        self.len = len;
        self.pos = len;
    }
}

/// Index of the next word boundary from `cursor` in `direction`.
///
/// Moving right stops on the whitespace after the next word; moving left
/// stops on the first byte of the previous word.
pub fn find_next_word(direction: Direction, cursor: usize, line: &[u8]) -> usize {
    let step: isize = match direction {
        Direction::Right => 1,
        Direction::Left => -1,
    };
    let len = line.len() as isize;
    let mut index = cursor as isize + step;
    let mut found = 0;

    while index >= 0 && index < len {
        if line[index as usize].is_ascii_whitespace() {
            if found > 0 {
                if direction == Direction::Left && index > 0 {
                    index += 1;
                }
                break;
            }
        } else {
            found += 1;
        }
        index += step;
    }

    index.clamp(0, len) as usize
}

#[derive(Debug, Clone)]
pub struct LineEditor {
    pub options: EditorOptions,
    pub history: History,
    escape: [u8; ESCAPE_SEQUENCE_LEN],
    escape_len: usize,
    collecting: bool,
}

impl LineEditor {
    pub const fn new() -> Self {
        Self {
            options: EditorOptions {
                history: false,
                tab_completion: false,
                command_formatting: false,
                invisible: false,
            },
            history: History::new(),
            escape: [0; ESCAPE_SEQUENCE_LEN],
            escape_len: 0,
            collecting: false,
        }
    }

    /// Prepares for a new read.
    pub fn begin_line(&mut self) {
        self.reset_escape();
        self.history.reset_cursor();
    }

    /// Stores a finished line in the history when history is enabled.
    pub fn finish_line(&mut self, line: &[u8]) {
        if self.options.history {
            self.history.record(line);
        }
    }

    pub fn is_collecting(&self) -> bool {
        self.collecting
    }

    fn reset_escape(&mut self) {
        self.escape = [0; ESCAPE_SEQUENCE_LEN];
        self.escape_len = 0;
        self.collecting = false;
    }

    /// Applies one non-newline byte to `line`.
    pub fn handle_byte(&mut self, byte: u8, line: &mut Line<'_>, commands: &dyn CommandRegistry) {
        if self.collecting {
            self.collect(byte, line);
            return;
        }

        match byte {
            0x20..=0x7E => line.insert(byte),
            BACKSPACE | DELETE => {
                if line.pos > 0 {
                    line.pos -= 1;
                    line.remove(line.pos, 1);
                }
            }
            TAB if self.options.tab_completion => {
                if let Some(best) = commands.find_unique_prefix(line.bytes()) {
                    line.replace(best.as_bytes());
                }
            }
            ESCAPE => {
                self.reset_escape();
                self.collecting = true;
            }
            _ => {}
        }
    }

    fn collect(&mut self, byte: u8, line: &mut Line<'_>) {
        match byte {
            b'[' => return,
            ESCAPE => {
                self.reset_escape();
                self.collecting = true;
                return;
            }
            _ => {}
        }
        if self.escape_len >= ESCAPE_SEQUENCE_LEN {
            self.reset_escape();
            return;
        }
        self.escape[self.escape_len] = byte;
        self.escape_len += 1;

        if self.apply_sequence(line) {
            self.reset_escape();
        }
    }

    /// Returns true once the collected bytes form a complete sequence.
    fn apply_sequence(&mut self, line: &mut Line<'_>) -> bool {
        let seq = self.escape;
        match seq {
            [b'C', ..] => line.pos = (line.pos + 1).min(line.len),
            [b'D', ..] => line.pos = line.pos.saturating_sub(1),
            [b'f', ..] | [_, _, _, b'C', ..] => {
                line.pos = find_next_word(Direction::Right, line.pos, line.bytes());
            }
            [b'b', ..] | [_, _, _, b'D', ..] => {
                line.pos = find_next_word(Direction::Left, line.pos, line.bytes());
            }
            [b'A', ..] | [b'B', ..] => {
                if self.options.history {
                    self.recall(seq[0] == b'A', line);
                }
            }
            [b'3', b'~', ..] => {
                if line.pos < line.len {
                    line.remove(line.pos, 1);
                }
            }
            [DELETE, ..] => {
                let start = find_next_word(Direction::Left, line.pos, line.bytes());
                let count = line.pos - start;
                line.remove(start, count);
                line.pos = start;
            }
            [first, second, ..] => {
                let last = seq[self.escape_len - 1];
                return (first.is_ascii_uppercase() && first != b'O')
                    || last == b'~'
                    || (self.escape_len > 1 && last.is_ascii_alphabetic())
                    || (first == b'O' && second != 0);
            }
        }
        true
    }

    fn recall(&mut self, older: bool, line: &mut Line<'_>) {
        let current = &line.buf[..line.len];
        let shown = if older {
            self.history.older(current)
        } else {
            self.history.newer()
        };
        if let Some(text) = shown {
            let mut copy = [0u8; crate::config::HISTORY_LINE_LEN];
            let len = text.len();
            copy[..len].copy_from_slice(text);
            line.replace(&copy[..len]);
        }
    }
}

impl Default for LineEditor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::StaticCommands;

    const CMDS: StaticCommands = StaticCommands(&["version", "help", "shutdown"]);

    fn feed(editor: &mut LineEditor, line: &mut Line<'_>, bytes: &[u8]) {
        for b in bytes {
            editor.handle_byte(*b, line, &CMDS);
        }
    }

    #[test]
    fn test_insert_and_cursor_moves() {
        let mut buf = [0u8; 16];
        let mut line = Line::new(&mut buf);
        let mut editor = LineEditor::new();

        feed(&mut editor, &mut line, b"ac");
        feed(&mut editor, &mut line, b"\x1b[D");
        feed(&mut editor, &mut line, b"b");
        assert_eq!(line.bytes(), b"abc");
        assert_eq!(line.pos, 2);

        feed(&mut editor, &mut line, b"\x1b[C\x1b[C\x1b[C");
        assert_eq!(line.pos, 3);
        feed(&mut editor, &mut line, b"\x1b[D\x1b[D\x1b[D\x1b[D");
        assert_eq!(line.pos, 0);
    }

    #[test]
    fn test_backspace_and_delete_key() {
        let mut buf = [0u8; 16];
        let mut line = Line::new(&mut buf);
        let mut editor = LineEditor::new();

        feed(&mut editor, &mut line, &[BACKSPACE]);
        assert_eq!(line.len, 0);

        feed(&mut editor, &mut line, b"abcd");
        feed(&mut editor, &mut line, b"\x1b[D\x1b[D");
        feed(&mut editor, &mut line, &[DELETE]);
        assert_eq!(line.bytes(), b"acd");
        assert_eq!(line.pos, 1);

        feed(&mut editor, &mut line, b"\x1b[3~");
        assert_eq!(line.bytes(), b"ad");
        assert_eq!(line.pos, 1);
        assert!(!editor.is_collecting());
    }

    #[test]
    fn test_word_motion_and_deletion() {
        let mut buf = [0u8; 32];
        let mut line = Line::new(&mut buf);
        let mut editor = LineEditor::new();

        feed(&mut editor, &mut line, b"pcb show all");
        feed(&mut editor, &mut line, b"\x1bb");
        assert_eq!(line.pos, 9);
        feed(&mut editor, &mut line, b"\x1b[1;5D");
        assert_eq!(line.pos, 4);
        feed(&mut editor, &mut line, b"\x1bf");
        assert_eq!(line.pos, 8);

        feed(&mut editor, &mut line, &[ESCAPE, DELETE]);
        assert_eq!(line.bytes(), b"pcb  all");
        assert_eq!(line.pos, 4);
    }

    #[test]
    fn test_find_next_word() {
        assert_eq!(find_next_word(Direction::Left, 5, b"ab cd"), 3);
        assert_eq!(find_next_word(Direction::Left, 3, b"ab cd"), 0);
        assert_eq!(find_next_word(Direction::Right, 0, b"ab cd"), 2);
        assert_eq!(find_next_word(Direction::Right, 2, b"ab cd"), 5);
    }

    #[test]
    fn test_tab_completion() {
        let mut buf = [0u8; 16];
        let mut line = Line::new(&mut buf);
        let mut editor = LineEditor::new();

        feed(&mut editor, &mut line, b"ver\t");
        assert_eq!(line.bytes(), b"ver");

        editor.options.tab_completion = true;
        feed(&mut editor, &mut line, b"\t");
        assert_eq!(line.bytes(), b"version");
        assert_eq!(line.pos, 7);
    }

    #[test]
    fn test_history_recall() {
        let mut buf = [0u8; 16];
        let mut line = Line::new(&mut buf);
        let mut editor = LineEditor::new();
        editor.options.history = true;
        editor.finish_line(b"help");
        editor.finish_line(b"version");
        editor.begin_line();

        feed(&mut editor, &mut line, b"dr");
        feed(&mut editor, &mut line, b"\x1b[A");
        assert_eq!(line.bytes(), b"version");
        feed(&mut editor, &mut line, b"\x1b[A");
        assert_eq!(line.bytes(), b"help");
        feed(&mut editor, &mut line, b"\x1b[B\x1b[B");
        assert_eq!(line.bytes(), b"dr");
        assert_eq!(line.pos, 2);
    }

    #[test]
    fn test_unknown_sequences_absorbed() {
        let mut buf = [0u8; 16];
        let mut line = Line::new(&mut buf);
        let mut editor = LineEditor::new();

        // F1 (SS3), Home, Page Up, and history while disabled.
        feed(&mut editor, &mut line, b"\x1bOP\x1b[H\x1b[5~\x1b[A");
        assert!(!editor.is_collecting());
        feed(&mut editor, &mut line, b"x");
        assert_eq!(line.bytes(), b"x");
    }
}
