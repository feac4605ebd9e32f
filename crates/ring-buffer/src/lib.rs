//! A fixed-capacity FIFO ring buffer backed by a pre-allocated `Vec`.
//!
//! Designed for `no_std` + `alloc` environments where the producer may run in
//! interrupt context: the backing storage is allocated once at construction
//! and [`RingBuffer::try_push`] never allocates. When the buffer is full the
//! *new* item is handed back to the caller instead of evicting anything, so
//! whatever was accepted earlier is delivered intact and in order.

#![no_std]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "alloc")]
use alloc::vec::Vec;

/// A fixed-capacity circular FIFO.
///
/// Index `0` is the oldest live entry and index `len() - 1` the newest.
pub struct RingBuffer<T> {
    /// Backing storage, `capacity` slots allocated during construction.
    slots: Vec<Option<T>>,
    /// Index into `slots` of the oldest live entry.
    head: usize,
    /// Number of live entries.
    len: usize,
}

impl<T> RingBuffer<T> {
    /// Create a new ring buffer with the given capacity.
    ///
    /// The backing `Vec` is allocated once and never reallocated.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "RingBuffer capacity must be > 0");
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self {
            slots,
            head: 0,
            len: 0,
        }
    }

    /// The maximum number of entries this buffer can hold.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// The number of live entries currently in the buffer.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Number of entries that can still be pushed before the buffer is full.
    pub fn free(&self) -> usize {
        self.capacity() - self.len
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether the buffer is at capacity.
    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Append an item at the back.
    ///
    /// Returns `Err(item)` without touching the buffer if it is full.
    pub fn try_push(&mut self, item: T) -> Result<(), T> {
        if self.is_full() {
            return Err(item);
        }
        let tail = (self.head + self.len) % self.capacity();
        self.slots[tail] = Some(item);
        self.len += 1;
        Ok(())
    }

    /// Remove and return the oldest entry.
    pub fn pop(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let item = self.slots[self.head].take();
        self.head = (self.head + 1) % self.capacity();
        self.len -= 1;
        item
    }

    /// Move up to `max` of the oldest entries into `out`, oldest first.
    ///
    /// Returns the number of entries moved.
    #[cfg(feature = "alloc")]
    pub fn drain_into(&mut self, out: &mut Vec<T>, max: usize) -> usize {
        let count = max.min(self.len);
        out.reserve(count);
        for _ in 0..count {
            if let Some(item) = self.pop() {
                out.push(item);
            }
        }
        count
    }

    /// Drop all entries, resetting length to zero.
    ///
    /// The backing storage is kept.
    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
        self.head = 0;
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use alloc::vec;

    #[test]
    fn test_new_buffer_is_empty() {
        let rb: RingBuffer<i32> = RingBuffer::new(5);
        assert!(rb.is_empty());
        assert_eq!(rb.len(), 0);
        assert_eq!(rb.capacity(), 5);
        assert_eq!(rb.free(), 5);
    }

    #[test]
    fn test_push_and_pop_in_order() {
        let mut rb = RingBuffer::new(3);
        assert!(rb.try_push(10).is_ok());
        assert!(rb.try_push(20).is_ok());
        assert!(rb.try_push(30).is_ok());
        assert!(rb.is_full());

        assert_eq!(rb.pop(), Some(10));
        assert_eq!(rb.pop(), Some(20));
        assert_eq!(rb.pop(), Some(30));
        assert_eq!(rb.pop(), None);
    }

    #[test]
    fn test_full_rejects_newest() {
        let mut rb = RingBuffer::new(2);
        rb.try_push(1).unwrap();
        rb.try_push(2).unwrap();

        assert_eq!(rb.try_push(3), Err(3));
        assert_eq!(rb.len(), 2);
        assert_eq!(rb.pop(), Some(1));
        assert_eq!(rb.pop(), Some(2));
    }

    #[test]
    fn test_wrapping() {
        let mut rb = RingBuffer::new(3);
        for round in 0..10 {
            rb.try_push(round * 2).unwrap();
            rb.try_push(round * 2 + 1).unwrap();
            assert_eq!(rb.pop(), Some(round * 2));
            assert_eq!(rb.pop(), Some(round * 2 + 1));
        }
        assert!(rb.is_empty());
    }

    #[test]
    fn test_drain_into_respects_max() {
        let mut rb = RingBuffer::new(8);
        for i in 0..5 {
            rb.try_push(i).unwrap();
        }

        let mut out = vec![];
        assert_eq!(rb.drain_into(&mut out, 3), 3);
        assert_eq!(out, vec![0, 1, 2]);
        assert_eq!(rb.drain_into(&mut out, 10), 2);
        assert_eq!(out, vec![0, 1, 2, 3, 4]);
        assert!(rb.is_empty());
    }

    #[test]
    fn test_drain_after_wrap() {
        let mut rb = RingBuffer::new(3);
        rb.try_push(1).unwrap();
        rb.try_push(2).unwrap();
        rb.pop();
        rb.try_push(3).unwrap();
        rb.try_push(4).unwrap();
        assert_eq!(rb.free(), 0);

        let mut out = vec![];
        assert_eq!(rb.drain_into(&mut out, usize::MAX), 3);
        assert_eq!(out, vec![2, 3, 4]);
    }

    #[test]
    fn test_clear() {
        let mut rb = RingBuffer::new(3);
        rb.try_push(1).unwrap();
        rb.try_push(2).unwrap();
        rb.clear();

        assert!(rb.is_empty());
        assert_eq!(rb.capacity(), 3);
        rb.try_push(9).unwrap();
        assert_eq!(rb.pop(), Some(9));
    }

    #[test]
    #[should_panic(expected = "capacity must be > 0")]
    fn test_zero_capacity_panics() {
        let _: RingBuffer<i32> = RingBuffer::new(0);
    }
}
