use alloc::collections::VecDeque;
use core::cmp::Ordering;
use core::fmt;

/// Comparator deciding the order of a [`SortedList`].
pub type Comparator<T> = fn(&T, &T) -> Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    OutOfMemory,
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocError::OutOfMemory => write!(f, "out of memory"),
        }
    }
}

/// A list kept in ascending order under a caller-provided comparator.
///
/// Insertion is stable: an item lands after every existing item that
/// compares equal to it, so equal keys come back out in insertion order.
pub struct SortedList<T> {
    items: VecDeque<T>,
    compare: Comparator<T>,
}

impl<T> SortedList<T> {
    pub const fn new(compare: Comparator<T>) -> Self {
        Self {
            items: VecDeque::new(),
            compare,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Inserts `item` at its sorted position.
    pub fn insert(&mut self, item: T) -> Result<(), AllocError> {
        self.items
            .try_reserve(1)
            .map_err(|_| AllocError::OutOfMemory)?;

        let compare = self.compare;
        let index = self
            .items
            .iter()
            .position(|existing| compare(existing, &item) == Ordering::Greater)
            .unwrap_or(self.items.len());
        self.items.insert(index, item);
        Ok(())
    }

    /// Removes and returns the first item matching `pred`.
    pub fn remove_by<F>(&mut self, pred: F) -> Option<T>
    where
        F: FnMut(&T) -> bool,
    {
        let index = self.items.iter().position(pred)?;
        self.items.remove(index)
    }

    pub fn find<F>(&self, mut pred: F) -> Option<&T>
    where
        F: FnMut(&T) -> bool,
    {
        self.items.iter().find(|item| pred(item))
    }

    pub fn contains<F>(&self, pred: F) -> bool
    where
        F: FnMut(&T) -> bool,
    {
        self.items.iter().any(pred)
    }

    /// The minimum element, if any.
    pub fn peek(&self) -> Option<&T> {
        self.items.front()
    }

    /// Removes and returns the minimum element, if any.
    pub fn poll(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn by_first(a: &(u8, char), b: &(u8, char)) -> Ordering {
        a.0.cmp(&b.0)
    }

    #[test]
    fn test_insert_keeps_order() {
        let mut list = SortedList::new(by_first);
        for item in [(3, 'a'), (1, 'b'), (2, 'c'), (0, 'd')] {
            list.insert(item).unwrap();
        }

        let keys: alloc::vec::Vec<u8> = list.iter().map(|i| i.0).collect();
        assert_eq!(keys, [0, 1, 2, 3]);
    }

    #[test]
    fn test_equal_keys_are_fifo() {
        let mut list = SortedList::new(by_first);
        list.insert((1, 'x')).unwrap();
        list.insert((0, 'a')).unwrap();
        list.insert((1, 'y')).unwrap();
        list.insert((1, 'z')).unwrap();

        assert_eq!(list.poll(), Some((0, 'a')));
        assert_eq!(list.poll(), Some((1, 'x')));
        assert_eq!(list.poll(), Some((1, 'y')));
        assert_eq!(list.poll(), Some((1, 'z')));
        assert_eq!(list.poll(), None);
    }

    #[test]
    fn test_remove_and_find() {
        let mut list = SortedList::new(by_first);
        list.insert((5, 'q')).unwrap();
        list.insert((2, 'r')).unwrap();

        assert_eq!(list.find(|i| i.1 == 'q'), Some(&(5, 'q')));
        assert_eq!(list.remove_by(|i| i.1 == 'q'), Some((5, 'q')));
        assert_eq!(list.remove_by(|i| i.1 == 'q'), None);
        assert!(list.find(|i| i.1 == 'q').is_none());
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_empty_peek_and_poll() {
        let mut list: SortedList<(u8, char)> = SortedList::new(by_first);
        assert!(list.peek().is_none());
        assert!(list.poll().is_none());
        assert!(list.is_empty());
    }
}
