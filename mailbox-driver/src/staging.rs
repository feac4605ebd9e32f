//! Bounded queue between the receive interrupt and readers.
//!
//! The interrupt side never blocks: when the queue is full the newest message
//! is dropped and counted. The queue shares its lock with the receive
//! delivery flags so the interrupt's halt decision and a reader's
//! drain-then-resume decision are totally ordered.

use alloc::vec::Vec;
use core::sync::atomic::{AtomicU64, Ordering};

use ring_buffer::RingBuffer;
use spinning_top::Spinlock;
use spinning_top::guard::SpinlockGuard;

use crate::message::Message;
use crate::waker::Waker;

/// Queue contents and receive delivery flags, guarded together.
pub struct StagingState {
    queue: RingBuffer<Message>,
    /// Receive interrupt disabled for backpressure.
    halted: bool,
    /// Receive delivery switched off (channel closed or stopped).
    stopped: bool,
}

impl StagingState {
    /// Append a message. Returns `false` if the queue is full.
    pub fn push(&mut self, msg: Message) -> bool {
        self.queue.try_push(msg).is_ok()
    }

    pub fn dequeue_batch(&mut self, max: usize) -> Vec<Message> {
        let mut out = Vec::new();
        self.queue.drain_into(&mut out, max);
        out
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn free(&self) -> usize {
        self.queue.free()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn set_halted(&mut self, halted: bool) {
        self.halted = halted;
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn set_stopped(&mut self, stopped: bool) {
        self.stopped = stopped;
    }

    /// Whether the receive interrupt should be enabled right now.
    pub fn delivering(&self) -> bool {
        !self.halted && !self.stopped
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

pub struct StagingQueue {
    state: Spinlock<StagingState>,
    dropped: AtomicU64,
    waker: Waker,
}

impl StagingQueue {
    /// Empty queue of `capacity` entries. Delivery starts out stopped.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Spinlock::new(StagingState {
                queue: RingBuffer::new(capacity),
                halted: false,
                stopped: true,
            }),
            dropped: AtomicU64::new(0),
            waker: Waker::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.state.lock().queue.capacity()
    }

    pub fn len(&self) -> usize {
        self.state.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().is_empty()
    }

    pub fn is_halted(&self) -> bool {
        self.state.lock().is_halted()
    }

    /// Enqueue one message, dropping it if the queue is full.
    ///
    /// Wakes blocked readers when the queue was empty.
    pub fn enqueue(&self, msg: Message) -> bool {
        let (accepted, was_empty) = {
            let mut state = self.state.lock();
            let was_empty = state.is_empty();
            (state.push(msg), was_empty)
        };
        if !accepted {
            self.record_drops(1);
        } else if was_empty {
            self.waker.wake();
        }
        accepted
    }

    /// Up to `max` messages, oldest first. Empty when nothing is queued.
    pub fn dequeue_batch(&self, max: usize) -> Vec<Message> {
        self.state.lock().dequeue_batch(max)
    }

    /// Messages dropped because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn waker(&self) -> &Waker {
        &self.waker
    }

    pub(crate) fn lock(&self) -> SpinlockGuard<'_, StagingState> {
        self.state.lock()
    }

    pub(crate) fn record_drops(&self, count: u64) {
        if count > 0 {
            self.dropped.fetch_add(count, Ordering::Relaxed);
        }
    }
}
