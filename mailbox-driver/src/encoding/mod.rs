//! How messages are published and consumed in the registers.
//!
//! Two hardware revisions exist. Both use the same slots and CSR enable bit;
//! they differ in how a sender announces filled slots:
//!
//! * [`Encoding::RingIndex`]: the sender advances its tail index in its info
//!   register and rings the peer's doorbell. The receiver consumes up to the
//!   tail and publishes its head back.
//! * [`Encoding::Bitmask`]: the sender sets one validity bit per filled slot
//!   in the peer's CSR. The receiver consumes set bits in ascending order and
//!   clears exactly those.

mod bitmask;
mod ring_index;

use mailbox_abi::{MESSAGE_SIZE, SLOT_RECORD_SIZE};

use crate::config::MailboxLayout;
use crate::message::Message;
use crate::mmio::{RegisterBus, RegisterWindow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    RingIndex,
    Bitmask,
}

impl Default for Encoding {
    fn default() -> Self {
        if cfg!(feature = "bitmask") {
            Self::Bitmask
        } else {
            Self::RingIndex
        }
    }
}

impl Encoding {
    /// Bytes one received message occupies in a device read.
    pub const fn record_size(self) -> usize {
        match self {
            Self::RingIndex => MESSAGE_SIZE,
            Self::Bitmask => SLOT_RECORD_SIZE,
        }
    }

    /// Whether the peer currently accepts messages on the outbound ring.
    pub fn peer_accepting<B: RegisterBus>(
        self,
        window: &RegisterWindow<B>,
        layout: &MailboxLayout,
    ) -> bool {
        window.csr(&layout.outbound).is_enabled()
    }

    /// Outbound slots that may be filled right now without overwriting
    /// anything the peer has not consumed.
    pub fn credit<B: RegisterBus>(self, window: &RegisterWindow<B>, layout: &MailboxLayout) -> usize {
        match self {
            Self::RingIndex => ring_index::credit(window, layout),
            Self::Bitmask => bitmask::credit(window, layout),
        }
    }

    /// Write as many of `words` as the current credit allows into the
    /// outbound ring and signal the peer once. Returns the number written.
    pub fn publish<B: RegisterBus>(
        self,
        window: &RegisterWindow<B>,
        layout: &MailboxLayout,
        words: &[u64],
    ) -> usize {
        if words.is_empty() {
            return 0;
        }
        match self {
            Self::RingIndex => ring_index::publish(window, layout, words),
            Self::Bitmask => bitmask::publish(window, layout, words),
        }
    }

    /// Consume every message currently available on the inbound ring,
    /// oldest first, acknowledging them to the peer. Returns the count.
    pub fn drain<B: RegisterBus>(
        self,
        window: &RegisterWindow<B>,
        layout: &MailboxLayout,
        sink: impl FnMut(Message),
    ) -> usize {
        match self {
            Self::RingIndex => ring_index::drain(window, layout, sink),
            Self::Bitmask => bitmask::drain(window, layout, sink),
        }
    }
}
