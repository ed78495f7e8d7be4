use crate::config::RING_BUFFER_LEN;

/// Fixed-capacity byte queue for input that arrives while nobody is reading.
/// Pushing into a full buffer drops the byte.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    buf: [u8; RING_BUFFER_LEN],
    head: usize,
    tail: usize,
    len: usize,
}

impl RingBuffer {
    pub const fn new() -> Self {
        Self {
            buf: [0; RING_BUFFER_LEN],
            head: 0,
            tail: 0,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == RING_BUFFER_LEN
    }

    /// Returns false if the byte was dropped.
    pub fn push(&mut self, byte: u8) -> bool {
        if self.is_full() {
            return false;
        }
        self.buf[self.head] = byte;
        self.head = (self.head + 1) % RING_BUFFER_LEN;
        self.len += 1;
        true
    }

    pub fn pop(&mut self) -> Option<u8> {
        if self.is_empty() {
            return None;
        }
        let byte = self.buf[self.tail];
        self.tail = (self.tail + 1) % RING_BUFFER_LEN;
        self.len -= 1;
        Some(byte)
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.len = 0;
    }
}

impl Default for RingBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order_across_wrap() {
        let mut ring = RingBuffer::new();
        for i in 0..100u8 {
            assert!(ring.push(i));
        }
        for i in 0..100u8 {
            assert_eq!(ring.pop(), Some(i));
        }
        // head and tail are now past the middle, so this wraps
        for i in 0..120u8 {
            assert!(ring.push(i));
        }
        for i in 0..120u8 {
            assert_eq!(ring.pop(), Some(i));
        }
        assert_eq!(ring.pop(), None);
    }

    #[test]
    fn test_full_drops() {
        let mut ring = RingBuffer::new();
        for _ in 0..RING_BUFFER_LEN {
            assert!(ring.push(b'a'));
        }
        assert!(ring.is_full());
        assert!(!ring.push(b'b'));
        assert_eq!(ring.len(), RING_BUFFER_LEN);
    }
}
