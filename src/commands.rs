//! Command names known to the shell, as seen by the line editor.

/// Lookup the line editor uses for tab completion and echo coloring.
pub trait CommandRegistry: Sync {
    /// The only command starting with `prefix` (case-insensitive), or `None`
    /// when there are zero or several.
    fn find_unique_prefix(&self, prefix: &[u8]) -> Option<&'static str>;

    /// Whether the first word of `line` names a command (case-insensitive).
    fn contains(&self, line: &[u8]) -> bool;
}

/// A fixed table of command labels.
#[derive(Debug, Clone, Copy)]
pub struct StaticCommands(pub &'static [&'static str]);

impl CommandRegistry for StaticCommands {
    fn find_unique_prefix(&self, prefix: &[u8]) -> Option<&'static str> {
        let mut best = None;
        for label in self.0.iter().copied() {
            let bytes = label.as_bytes();
            if bytes.len() >= prefix.len() && bytes[..prefix.len()].eq_ignore_ascii_case(prefix) {
                if best.is_some() {
                    return None;
                }
                best = Some(label);
            }
        }
        best
    }

    fn contains(&self, line: &[u8]) -> bool {
        let first = line
            .split(|b| b.is_ascii_whitespace())
            .find(|word| !word.is_empty())
            .unwrap_or(&[]);
        !first.is_empty()
            && self
                .0
                .iter()
                .any(|label| label.as_bytes().eq_ignore_ascii_case(first))
    }
}

/// Registry with no commands, for consoles without a shell.
pub const NO_COMMANDS: StaticCommands = StaticCommands(&[]);

/// Labels understood by the built-in command handler.
pub const SHELL_COMMANDS: StaticCommands = StaticCommands(&["help", "version", "echo", "clear", "yield", "load-r3", "shutdown", "pcb"]);
