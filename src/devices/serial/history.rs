use crate::config::{HISTORY_LEN, HISTORY_LINE_LEN};

#[derive(Debug, Clone, Copy)]
struct Entry {
    line: [u8; HISTORY_LINE_LEN],
    len: usize,
}

impl Entry {
    const EMPTY: Self = Self {
        line: [0; HISTORY_LINE_LEN],
        len: 0,
    };

    fn set(&mut self, line: &[u8]) {
        let len = line.len().min(HISTORY_LINE_LEN);
        self.line[..len].copy_from_slice(&line[..len]);
        self.len = len;
    }

    fn bytes(&self) -> &[u8] {
        &self.line[..self.len]
    }
}

/// The last few lines entered on one device, plus the line being edited
/// while the user browses. Storage is inline so the interrupt path never
/// allocates.
#[derive(Debug, Clone)]
pub struct History {
    entries: [Entry; HISTORY_LEN],
    /// Index of the oldest entry.
    start: usize,
    count: usize,
    /// Browse position; `count` means the in-progress line.
    cursor: usize,
    scratch: Entry,
}

impl History {
    pub const fn new() -> Self {
        Self {
            entries: [Entry::EMPTY; HISTORY_LEN],
            start: 0,
            count: 0,
            cursor: 0,
            scratch: Entry::EMPTY,
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn entry(&self, index: usize) -> &Entry {
        &self.entries[(self.start + index) % HISTORY_LEN]
    }

    /// Starts a new line: browsing resumes from the newest entry.
    pub fn reset_cursor(&mut self) {
        self.cursor = self.count;
        self.scratch.len = 0;
    }

    /// Stores a finished line, evicting the oldest when full. Empty lines
    /// are not stored.
    pub fn record(&mut self, line: &[u8]) {
        if line.is_empty() {
            return;
        }
        if self.count == HISTORY_LEN {
            self.entries[self.start].set(line);
            self.start = (self.start + 1) % HISTORY_LEN;
        } else {
            let slot = (self.start + self.count) % HISTORY_LEN;
            self.entries[slot].set(line);
            self.count += 1;
        }
        self.cursor = self.count;
    }

    /// Moves one line back. `current` is the line being edited; it is
    /// saved the first time the user leaves it. Returns the line to show.
    pub fn older(&mut self, current: &[u8]) -> Option<&[u8]> {
        if self.cursor == 0 {
            return None;
        }
        if self.cursor == self.count {
            self.scratch.set(current);
        }
        self.cursor -= 1;
        Some(self.entry(self.cursor).bytes())
    }

    /// Moves one line forward, ending at the saved in-progress line.
    pub fn newer(&mut self) -> Option<&[u8]> {
        if self.cursor >= self.count {
            return None;
        }
        self.cursor += 1;
        if self.cursor == self.count {
            Some(self.scratch.bytes())
        } else {
            Some(self.entry(self.cursor).bytes())
        }
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browse_and_restore_current() {
        let mut history = History::new();
        history.record(b"one");
        history.record(b"two");
        history.reset_cursor();

        assert_eq!(history.older(b"draft"), Some(&b"two"[..]));
        assert_eq!(history.older(b"ignored"), Some(&b"one"[..]));
        assert_eq!(history.older(b"ignored"), None);
        assert_eq!(history.newer(), Some(&b"two"[..]));
        assert_eq!(history.newer(), Some(&b"draft"[..]));
        assert_eq!(history.newer(), None);
    }

    #[test]
    fn test_keeps_last_entries() {
        let mut history = History::new();
        for line in [&b"a"[..], b"b", b"c", b"d", b"e", b"f", b"g"] {
            history.record(line);
        }
        history.record(b"");
        assert_eq!(history.len(), HISTORY_LEN);

        history.reset_cursor();
        let mut seen = alloc::vec::Vec::new();
        while let Some(line) = history.older(b"") {
            seen.push(line[0]);
        }
        assert_eq!(seen, b"gfedc");
    }
}
