//! Two endpoints wired back to back over one memory-backed register window.
//!
//! Used by the simulator and by tests. The peer endpoint sees the window with
//! the two blocks swapped, exactly as the accelerator sees the hardware.
//! Nothing raises interrupts on its own: callers either poll
//! [`MailboxChannel::interrupt_pending`] from a thread of their own or use
//! [`pump`] to deliver pending interrupts inline.

use alloc::sync::Arc;
use alloc::vec::Vec;

use mailbox_abi::WINDOW_SIZE;
use spinning_top::Spinlock;

use crate::channel::MailboxChannel;
use crate::config::MailboxConfig;
use crate::error::{AttachError, IrqError};
use crate::irq::{InterruptController, IrqLine};
use crate::mmio::{RegisterBus, SharedRegisters};

/// Line claimed by the host endpoint of a loopback pair.
pub const HOST_IRQ: IrqLine = 10;
/// Line claimed by the peer endpoint of a loopback pair.
pub const PEER_IRQ: IrqLine = 11;

pub type LoopbackChannel = MailboxChannel<SharedRegisters>;

/// Interrupt controller that only records what was claimed and released.
#[derive(Default)]
pub struct RecordingIrq {
    requested: Spinlock<Vec<IrqLine>>,
    released: Spinlock<Vec<IrqLine>>,
    in_use: Spinlock<Vec<IrqLine>>,
}

impl RecordingIrq {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make requests for `line` fail as if another driver held it.
    pub fn mark_busy(&self, line: IrqLine) {
        self.in_use.lock().push(line);
    }

    pub fn requested(&self) -> Vec<IrqLine> {
        self.requested.lock().clone()
    }

    pub fn released(&self) -> Vec<IrqLine> {
        self.released.lock().clone()
    }
}

impl InterruptController for RecordingIrq {
    fn request(&self, line: IrqLine) -> Result<(), IrqError> {
        let mut in_use = self.in_use.lock();
        if in_use.contains(&line) {
            return Err(IrqError::Busy(line));
        }
        in_use.push(line);
        self.requested.lock().push(line);
        Ok(())
    }

    fn release(&self, line: IrqLine) {
        self.in_use.lock().retain(|&l| l != line);
        self.released.lock().push(line);
    }
}

/// Attach and open a host endpoint with `config` and a peer endpoint with
/// the mirrored layout, sharing one register window.
pub fn loopback_pair(
    config: MailboxConfig,
) -> Result<(Arc<LoopbackChannel>, Arc<LoopbackChannel>), AttachError> {
    let registers = SharedRegisters::new(WINDOW_SIZE);
    let irq: Arc<dyn InterruptController> = Arc::new(RecordingIrq::new());

    let host = MailboxChannel::attach(registers.clone(), HOST_IRQ, irq.clone(), config)?;
    let peer = MailboxChannel::attach(registers, PEER_IRQ, irq, config.mirrored())?;
    host.open_fresh();
    peer.open_fresh();
    Ok((Arc::new(host), Arc::new(peer)))
}

/// Publish `words` from `sender` as far as the ring has room, ignoring
/// whether the receiver accepts and without waiting. Returns the count
/// written.
///
/// Models a peer that keeps producing while this side is halted.
pub fn inject<B: RegisterBus>(sender: &MailboxChannel<B>, words: &[u64]) -> usize {
    sender
        .encoding()
        .publish(sender.window(), &sender.config().layout, words)
}

/// Push all of `words` through to `receiver`, running its receive path
/// whenever the ring fills, regardless of halts.
pub fn flood<B: RegisterBus>(
    sender: &MailboxChannel<B>,
    receiver: &MailboxChannel<B>,
    words: &[u64],
) {
    let mut sent = 0;
    while sent < words.len() {
        sent += inject(sender, &words[sent..]);
        receiver.handle_interrupt();
    }
}

/// Run every pending receive interrupt until none is left. Returns the
/// number of passes.
pub fn pump<B: RegisterBus>(channels: &[&MailboxChannel<B>]) -> usize {
    let mut passes = 0;
    loop {
        let mut ran = false;
        for channel in channels {
            if channel.interrupt_pending() {
                channel.handle_interrupt();
                passes += 1;
                ran = true;
            }
        }
        if !ran {
            return passes;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_is_open_and_accepting() {
        let (host, peer) = loopback_pair(MailboxConfig::default()).unwrap();
        assert!(host.is_open() && peer.is_open());
        assert!(host.peer_accepting());
        assert!(peer.peer_accepting());
        assert_eq!(host.irq_line(), HOST_IRQ);
        assert_eq!(peer.irq_line(), PEER_IRQ);
    }

    #[test]
    fn pump_delivers_both_directions() {
        let (host, peer) = loopback_pair(MailboxConfig::default()).unwrap();
        assert_eq!(host.send(&[1, 2]), 2);
        assert_eq!(peer.send(&[3]), 1);
        assert!(host.interrupt_pending());
        assert!(peer.interrupt_pending());

        assert_eq!(pump(&[&*host, &*peer]), 2);
        assert!(!host.interrupt_pending());
        assert_eq!(host.receive(8).messages.len(), 1);
        assert_eq!(peer.receive(8).messages.len(), 2);
    }

    #[test]
    fn irq_lines_are_exclusive() {
        let irq = RecordingIrq::new();
        assert_eq!(irq.request(4), Ok(()));
        assert_eq!(irq.request(4), Err(IrqError::Busy(4)));
        irq.release(4);
        assert_eq!(irq.request(4), Ok(()));
        assert_eq!(irq.requested(), [4, 4]);
        assert_eq!(irq.released(), [4]);
    }
}
