//! Circular index arithmetic for one direction of the mailbox.
//!
//! The producer owns the tail index and the consumer owns the head index.
//! One slot always stays empty so that `head == tail` means "empty" and a
//! ring never holds more than `slot_count - 1` messages.

/// Geometry of a ring of message slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingChannel {
    slot_count: usize,
}

impl RingChannel {
    /// # Panics
    ///
    /// Panics if `slot_count < 2`; such a ring can never hold a message.
    pub const fn new(slot_count: usize) -> Self {
        assert!(slot_count >= 2, "ring needs at least two slots");
        Self { slot_count }
    }

    pub const fn slot_count(&self) -> usize {
        self.slot_count
    }

    /// Most messages the ring can hold at once.
    pub const fn capacity(&self) -> usize {
        self.slot_count - 1
    }

    /// Messages published but not yet consumed.
    ///
    /// Indices outside the ring (a confused peer) are reduced modulo the
    /// slot count first so the result is always within `0..=capacity()`.
    pub const fn occupied(&self, head: usize, tail: usize) -> usize {
        let n = self.slot_count;
        (tail % n + n - head % n) % n
    }

    /// Slots a producer may fill without overwriting unconsumed messages.
    pub const fn free(&self, head: usize, tail: usize) -> usize {
        self.capacity() - self.occupied(head, tail)
    }

    /// `index` moved forward by `count` slots, wrapping.
    pub const fn advance(&self, index: usize, count: usize) -> usize {
        (index % self.slot_count + count % self.slot_count) % self.slot_count
    }
}
