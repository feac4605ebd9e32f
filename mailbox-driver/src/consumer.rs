//! Reader side of the staging queue.
//!
//! Draining the queue is the only place a backpressure halt is lifted: the
//! read that leaves a halted queue empty turns the receive interrupt back on.

use alloc::vec::Vec;

use log::info;

use crate::config::MailboxLayout;
use crate::message::Message;
use crate::mmio::{RegisterBus, RegisterWindow};
use crate::staging::StagingQueue;

/// Result of a non-blocking receive.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Received {
    pub messages: Vec<Message>,
    /// Nothing was queued, whatever `max` was; a blocking reader should
    /// wait for [`Readable`](crate::waker::Readable).
    pub would_block: bool,
}

pub struct ConsumerInterface<'a, B> {
    window: &'a RegisterWindow<B>,
    layout: &'a MailboxLayout,
    staging: &'a StagingQueue,
}

impl<'a, B: RegisterBus> ConsumerInterface<'a, B> {
    pub fn new(
        window: &'a RegisterWindow<B>,
        layout: &'a MailboxLayout,
        staging: &'a StagingQueue,
    ) -> Self {
        Self {
            window,
            layout,
            staging,
        }
    }

    /// Take up to `max` messages, oldest first. Returns whether the
    /// receive interrupt was resumed as well.
    pub fn receive(&self, max: usize) -> (Received, bool) {
        let (messages, resumed, would_block) = {
            let mut state = self.staging.lock();
            let would_block = state.is_empty();
            let messages = state.dequeue_batch(max);
            let resumed = state.is_halted() && state.is_empty();
            if resumed {
                state.set_halted(false);
                if state.delivering() {
                    self.window
                        .update_csr(&self.layout.inbound, |csr| csr.with_enabled(true));
                }
            }
            (messages, resumed, would_block)
        };

        if resumed {
            info!("mailbox: receive resumed");
        }
        (
            Received {
                messages,
                would_block,
            },
            resumed,
        )
    }

    /// Whether a receive would return at least one message.
    pub fn poll(&self) -> bool {
        !self.staging.is_empty()
    }
}
