//! Outbound flow control.
//!
//! A send fills the outbound ring as far as the peer's credit allows, signals
//! the peer once per batch and then polls for more credit until every message
//! is out. Polling is bounded by an optional spin limit and by a
//! [`CancelToken`], so a peer that stops consuming cannot wedge the caller.

use core::hint::spin_loop;
use core::sync::atomic::{AtomicBool, Ordering};

use log::debug;
use spinning_top::Spinlock;

use crate::config::MailboxLayout;
use crate::encoding::Encoding;
use crate::mmio::{RegisterBus, RegisterWindow};

/// Cooperative cancellation for a send that is waiting for credit.
#[derive(Debug, Default)]
pub struct CancelToken {
    cancelled: AtomicBool,
}

impl CancelToken {
    pub const fn new() -> Self {
        Self {
            cancelled: AtomicBool::new(false),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::Release);
    }
}

pub struct TransmitEngine {
    /// Single tail writer.
    lock: Spinlock<()>,
    spin_limit: Option<u32>,
}

impl TransmitEngine {
    pub fn new(spin_limit: Option<u32>) -> Self {
        Self {
            lock: Spinlock::new(()),
            spin_limit,
        }
    }

    /// Send `messages` in order. Returns how many went out.
    ///
    /// Returns 0 without touching the ring when the peer is not accepting.
    /// Fewer than `messages.len()` means the spin limit was reached or one
    /// of the tokens was cancelled while waiting for credit. Cancellation
    /// never stops messages that fit the current credit.
    pub fn send<B: RegisterBus>(
        &self,
        window: &RegisterWindow<B>,
        layout: &MailboxLayout,
        encoding: Encoding,
        messages: &[u64],
        cancel: &[&CancelToken],
    ) -> usize {
        if messages.is_empty() {
            return 0;
        }
        let _guard = self.lock.lock();

        if !encoding.peer_accepting(window, layout) {
            debug!("mailbox: peer not accepting, dropping send of {}", messages.len());
            return 0;
        }

        let mut sent = 0;
        let mut idle_polls = 0u32;
        while sent < messages.len() {
            let written = encoding.publish(window, layout, &messages[sent..]);
            if written > 0 {
                sent += written;
                idle_polls = 0;
                continue;
            }

            if cancel.iter().any(|token| token.is_cancelled()) {
                debug!("mailbox: send cancelled after {}", sent);
                break;
            }
            if self.spin_limit.is_some_and(|limit| idle_polls >= limit) {
                debug!("mailbox: no credit after {} polls, sent {}", idle_polls, sent);
                break;
            }
            idle_polls += 1;
            spin_loop();
        }
        sent
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;
    use crate::mmio::SharedRegisters;
    use crate::registers::{Csr, InfoHalf};

    fn host_window() -> RegisterWindow<SharedRegisters> {
        let window = RegisterWindow::new(SharedRegisters::new(mailbox_abi::WINDOW_SIZE));
        window.write_csr(&MailboxLayout::host().outbound, Csr::ENABLED);
        window
    }

    #[test]
    fn refuses_when_peer_not_accepting() {
        let window = RegisterWindow::new(SharedRegisters::new(mailbox_abi::WINDOW_SIZE));
        let engine = TransmitEngine::new(Some(10));
        let layout = MailboxLayout::host();
        assert_eq!(engine.send(&window, &layout, Encoding::RingIndex, &[1, 2], &[]), 0);
        assert_eq!(window.info(&layout.outbound).tail(), 0);
        assert_eq!(window.csr(&layout.outbound).signal_bits(), 0);
    }

    #[test]
    fn stops_at_spin_limit_when_ring_full() {
        let window = host_window();
        let layout = MailboxLayout::host();
        let engine = TransmitEngine::new(Some(100));
        let words: Vec<u64> = (0..80).collect();

        assert_eq!(engine.send(&window, &layout, Encoding::RingIndex, &words, &[]), 61);
        assert_eq!(Encoding::RingIndex.credit(&window, &layout), 0);

        // Peer consumes 10: the next send can make exactly that much progress.
        window.update_info(&layout.inbound, InfoHalf::Head, 10);
        assert_eq!(engine.send(&window, &layout, Encoding::RingIndex, &words[61..], &[]), 10);
    }

    #[test]
    fn cancelled_token_aborts_wait() {
        let window = host_window();
        let layout = MailboxLayout::host();
        let engine = TransmitEngine::new(None);
        let token = CancelToken::new();
        let words: Vec<u64> = (0..70).collect();

        // Cancellation only ends the wait for credit; what fits goes out.
        token.cancel();
        assert_eq!(
            engine.send(&window, &layout, Encoding::RingIndex, &words, &[&token]),
            61
        );

        // Ring full and no spin limit: only a cancel from elsewhere ends it.
        token.reset();
        assert!(!token.is_cancelled());
        std::thread::scope(|s| {
            s.spawn(|| {
                std::thread::sleep(std::time::Duration::from_millis(20));
                token.cancel();
            });
            assert_eq!(
                engine.send(&window, &layout, Encoding::RingIndex, &words[61..], &[&token]),
                0
            );
        });
    }

    #[test]
    fn bitmask_send_fills_all_slots() {
        let window = host_window();
        let layout = MailboxLayout::host();
        let engine = TransmitEngine::new(Some(5));
        let words: Vec<u64> = (0..70).collect();

        assert_eq!(engine.send(&window, &layout, Encoding::Bitmask, &words, &[]), 62);
        assert_eq!(window.csr(&layout.outbound).validity(62), (1 << 62) - 1);
        assert!(window.csr(&layout.outbound).is_enabled());
    }
}
