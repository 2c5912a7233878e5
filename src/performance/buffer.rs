//! Fixed-capacity metric history.

use std::collections::VecDeque;

/// A bounded FIFO that evicts its oldest element when full.
#[derive(Debug, Clone, PartialEq)]
pub struct RingBuffer<T> {
    buf: VecDeque<T>,
    capacity: usize,
}

impl<T> RingBuffer<T> {
    /// A capacity of zero is clamped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buf: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append `item`, returning the evicted element if the buffer was full.
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.buf.len() >= self.capacity {
            self.buf.pop_front()
        } else {
            None
        };
        self.buf.push_back(item);
        evicted
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.buf.iter()
    }

    /// The newest `n` elements, oldest first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &T> {
        self.buf.iter().skip(self.buf.len().saturating_sub(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overflow_evicts_oldest() {
        let mut buffer = RingBuffer::new(100);
        for i in 0..100 {
            assert_eq!(buffer.push(i), None);
        }
        assert_eq!(buffer.push(100), Some(0));
        assert_eq!(buffer.len(), 100);
        assert_eq!(buffer.iter().next(), Some(&1));
        assert_eq!(buffer.iter().last(), Some(&100));
    }

    #[test]
    fn test_recent_window() {
        let mut buffer = RingBuffer::new(5);
        for i in 0..4 {
            buffer.push(i);
        }
        assert_eq!(buffer.recent(2).copied().collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(buffer.recent(10).count(), 4);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut buffer = RingBuffer::new(0);
        buffer.push('a');
        buffer.push('b');
        assert_eq!(buffer.capacity(), 1);
        assert_eq!(buffer.iter().collect::<Vec<_>>(), vec![&'b']);
    }
}
