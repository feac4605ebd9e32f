//! Interrupt-time receive path.
//!
//! One pass drains everything the peer has published into the staging queue
//! and then either keeps the receive interrupt enabled or turns it off when
//! the queue is running out of room. The bitmask encoding also masks the
//! interrupt for the duration of the drain. A halted channel
//! is resumed by the reader once it has emptied the queue.

use log::{debug, info, warn};

use crate::config::MailboxLayout;
use crate::encoding::Encoding;
use crate::irq::IrqReturn;
use crate::mmio::{RegisterBus, RegisterWindow};
use crate::staging::StagingQueue;

/// Outcome of one receive pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrainReport {
    /// Messages taken off the hardware ring.
    pub drained: usize,
    /// Messages dropped because the staging queue was full.
    pub dropped: usize,
    /// The pass halted the receive interrupt.
    pub halted: bool,
}

impl DrainReport {
    pub fn irq_return(&self) -> IrqReturn {
        if self.drained > 0 {
            IrqReturn::Handled
        } else {
            IrqReturn::None
        }
    }
}

pub struct ReceiveEngine {
    halt_free_slots: usize,
}

impl ReceiveEngine {
    pub fn new(halt_free_slots: usize) -> Self {
        Self { halt_free_slots }
    }

    /// Run one receive pass. Never blocks.
    pub fn handle<B: RegisterBus>(
        &self,
        window: &RegisterWindow<B>,
        layout: &MailboxLayout,
        encoding: Encoding,
        staging: &StagingQueue,
    ) -> DrainReport {
        // Validity bits are cleared per drained slot, so a bitmask peer must
        // not publish mid-drain. A ring-index peer may keep publishing past
        // the tail read here; its doorbell stays set for the next pass.
        if encoding == Encoding::Bitmask {
            window.update_csr(&layout.inbound, |csr| csr.with_enabled(false));
        }

        let mut report = DrainReport::default();
        let woke = {
            let mut state = staging.lock();
            let was_empty = state.is_empty();

            // The hardware ring is always fully drained, even into a full queue.
            let mut dropped = 0;
            report.drained = encoding.drain(window, layout, |msg| {
                if !state.push(msg) {
                    dropped += 1;
                }
            });
            report.dropped = dropped;

            if !state.is_halted() && state.free() < self.halt_free_slots {
                state.set_halted(true);
                report.halted = true;
            }
            let delivering = state.delivering();
            window.update_csr(&layout.inbound, |csr| csr.with_enabled(delivering));
            was_empty && !state.is_empty()
        };

        staging.record_drops(report.dropped as u64);
        if woke {
            staging.waker().wake();
        }

        if report.drained > 0 {
            debug!("mailbox: drained {}", report.drained);
        }
        if report.dropped > 0 {
            warn!(
                "mailbox: staging queue full, dropped {} of {}",
                report.dropped, report.drained
            );
        }
        if report.halted {
            info!("mailbox: receive halted, {} queued", staging.len());
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use spinning_top::Spinlock;

    use super::*;
    use crate::mmio::SharedRegisters;
    use crate::registers::Csr;

    struct Fixture {
        host: RegisterWindow<SharedRegisters>,
        peer: RegisterWindow<SharedRegisters>,
        layout: MailboxLayout,
        staging: StagingQueue,
        engine: ReceiveEngine,
    }

    impl Fixture {
        fn new(capacity: usize, halt_free_slots: usize) -> Self {
            let regs = SharedRegisters::new(mailbox_abi::WINDOW_SIZE);
            let layout = MailboxLayout::host();
            let host = RegisterWindow::new(regs.clone());
            host.write_csr(&layout.inbound, Csr::ENABLED);
            let staging = StagingQueue::new(capacity);
            staging.lock().set_stopped(false);
            Self {
                host,
                peer: RegisterWindow::new(regs),
                layout,
                staging,
                engine: ReceiveEngine::new(halt_free_slots),
            }
        }

        fn peer_send(&self, words: &[u64]) -> usize {
            Encoding::RingIndex.publish(&self.peer, &self.layout.mirrored(), words)
        }

        fn interrupt(&self) -> DrainReport {
            self.engine
                .handle(&self.host, &self.layout, Encoding::RingIndex, &self.staging)
        }
    }

    #[test]
    fn drains_and_re_enables() {
        let f = Fixture::new(16, 4);
        assert_eq!(f.peer_send(&[1, 2, 3]), 3);
        f.staging.waker().register(core::task::Waker::noop());

        let report = f.interrupt();
        assert_eq!(report.drained, 3);
        assert_eq!(report.irq_return(), IrqReturn::Handled);
        assert!(!report.halted);
        assert!(f.host.csr(&f.layout.inbound).is_enabled());
        assert_eq!(f.staging.waker().waiters(), 0);

        let values: Vec<u64> = f.staging.dequeue_batch(10).iter().map(|m| m.value).collect();
        assert_eq!(values, [1, 2, 3]);
    }

    #[test]
    fn spurious_interrupt_is_not_handled() {
        let f = Fixture::new(16, 4);
        assert_eq!(f.interrupt().irq_return(), IrqReturn::None);
        assert!(f.host.csr(&f.layout.inbound).is_enabled());
    }

    #[test]
    fn halts_below_free_threshold() {
        let f = Fixture::new(16, 4);
        let words: Vec<u64> = (0..13).collect();
        assert_eq!(f.peer_send(&words), 13);

        let report = f.interrupt();
        assert!(report.halted);
        assert!(f.staging.is_halted());
        assert!(!f.host.csr(&f.layout.inbound).is_enabled());
    }

    #[test]
    fn exactly_at_threshold_keeps_running() {
        let f = Fixture::new(16, 4);
        let words: Vec<u64> = (0..12).collect();
        assert_eq!(f.peer_send(&words), 12);

        assert!(!f.interrupt().halted);
        assert!(f.host.csr(&f.layout.inbound).is_enabled());
    }

    #[test]
    fn overflow_drops_newest_and_drains_hardware() {
        let f = Fixture::new(4, 1);
        let words: Vec<u64> = (0..10).collect();
        assert_eq!(f.peer_send(&words), 10);

        let report = f.interrupt();
        assert_eq!(report.drained, 10);
        assert_eq!(report.dropped, 6);
        assert_eq!(f.staging.dropped(), 6);
        // The ring is empty again from the peer's point of view.
        assert_eq!(
            Encoding::RingIndex.credit(&f.peer, &f.layout.mirrored()),
            61
        );
        let values: Vec<u64> = f.staging.dequeue_batch(10).iter().map(|m| m.value).collect();
        assert_eq!(values, [0, 1, 2, 3]);
    }

    /// Reports whether the inbound CSR enable bit was set each time an
    /// inbound slot was read.
    struct EnableDuringDrain {
        regs: SharedRegisters,
        seen: Spinlock<Vec<bool>>,
    }

    impl RegisterBus for EnableDuringDrain {
        fn size(&self) -> usize {
            self.regs.size()
        }

        fn read(&self, offset: usize) -> u64 {
            let inbound = MailboxLayout::host().inbound;
            if (inbound.slots..inbound.info).contains(&offset) {
                let csr = Csr::from_bits(self.regs.read(inbound.csr));
                self.seen.lock().push(csr.is_enabled());
            }
            self.regs.read(offset)
        }

        fn write(&self, offset: usize, value: u64) {
            self.regs.write(offset, value)
        }

        fn modify(&self, offset: usize, f: &mut dyn FnMut(u64) -> u64) -> u64 {
            self.regs.modify(offset, f)
        }
    }

    fn enable_seen_during_drain(encoding: Encoding) -> Vec<bool> {
        let regs = SharedRegisters::new(mailbox_abi::WINDOW_SIZE);
        let layout = MailboxLayout::host();
        let peer = RegisterWindow::new(regs.clone());
        let host = RegisterWindow::new(EnableDuringDrain {
            regs,
            seen: Spinlock::new(Vec::new()),
        });
        host.write_csr(&layout.inbound, Csr::ENABLED);
        assert_eq!(encoding.publish(&peer, &layout.mirrored(), &[1, 2]), 2);

        let staging = StagingQueue::new(16);
        staging.lock().set_stopped(false);
        let report = ReceiveEngine::new(4).handle(&host, &layout, encoding, &staging);
        assert_eq!(report.drained, 2);
        assert!(host.csr(&layout.inbound).is_enabled());
        let seen = host.bus().seen.lock().clone();
        seen
    }

    #[test]
    fn ring_index_keeps_accepting_while_draining() {
        assert_eq!(enable_seen_during_drain(Encoding::RingIndex), [true, true]);
    }

    #[test]
    fn bitmask_masks_while_draining() {
        assert_eq!(enable_seen_during_drain(Encoding::Bitmask), [false, false]);
    }

    #[test]
    fn stopped_channel_stays_disabled() {
        let f = Fixture::new(16, 4);
        f.staging.lock().set_stopped(true);
        f.peer_send(&[1]);
        f.interrupt();
        assert!(!f.host.csr(&f.layout.inbound).is_enabled());
    }
}
