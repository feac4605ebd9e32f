use log::debug;

use crate::config::MailboxLayout;
use crate::message::Message;
use crate::mmio::{RegisterBus, RegisterWindow};
use crate::registers::{Csr, InfoHalf};

// Own tail and own inbound head live in the local (outbound) info register;
// the peer's live in the inbound one.

pub(super) fn credit<B: RegisterBus>(window: &RegisterWindow<B>, layout: &MailboxLayout) -> usize {
    let tail = window.info(&layout.outbound).tail();
    let peer_head = window.info(&layout.inbound).head();
    layout.outbound.ring().free(peer_head, tail)
}

pub(super) fn publish<B: RegisterBus>(
    window: &RegisterWindow<B>,
    layout: &MailboxLayout,
    words: &[u64],
) -> usize {
    let ring = layout.outbound.ring();
    let tail = window.info(&layout.outbound).tail();
    let peer_head = window.info(&layout.inbound).head();
    let count = words.len().min(ring.free(peer_head, tail));
    if count == 0 {
        return 0;
    }

    for (i, &word) in words[..count].iter().enumerate() {
        window.write_slot(&layout.outbound, ring.advance(tail, i), word);
    }
    let new_tail = ring.advance(tail, count);
    window.update_info(&layout.outbound, InfoHalf::Tail, new_tail);
    window.update_csr(&layout.outbound, Csr::with_doorbell);

    debug!("mailbox: published {} at {}..{}", count, tail, new_tail);
    count
}

pub(super) fn drain<B: RegisterBus>(
    window: &RegisterWindow<B>,
    layout: &MailboxLayout,
    mut sink: impl FnMut(Message),
) -> usize {
    // Acknowledge before reading the tail so a doorbell rung mid-drain is
    // kept for the next pass.
    window.update_csr(&layout.inbound, Csr::acknowledged);

    let ring = layout.inbound.ring();
    let peer_tail = window.info(&layout.inbound).tail();
    let head = window.info(&layout.outbound).head();
    let count = ring.occupied(head, peer_tail);

    for i in 0..count {
        let slot = ring.advance(head, i);
        sink(Message::new(slot as u8, window.slot(&layout.inbound, slot)));
    }
    if count > 0 {
        window.update_info(&layout.outbound, InfoHalf::Head, ring.advance(head, count));
    }
    count
}
