use log::debug;

use crate::config::MailboxLayout;
use crate::message::Message;
use crate::mmio::{RegisterBus, RegisterWindow};
use crate::registers::{Csr, slot_mask};

// A sender only fills slots above the highest still-pending one, so the
// receiver's ascending scan sees messages in the order they were sent. Once
// the peer has consumed everything the next batch starts again at slot 0.

fn first_free_slot(pending: u64) -> usize {
    (u64::BITS - pending.leading_zeros()) as usize
}

pub(super) fn credit<B: RegisterBus>(window: &RegisterWindow<B>, layout: &MailboxLayout) -> usize {
    let slot_count = layout.outbound.slot_count;
    let pending = window.csr(&layout.outbound).validity(slot_count);
    slot_count - first_free_slot(pending)
}

pub(super) fn publish<B: RegisterBus>(
    window: &RegisterWindow<B>,
    layout: &MailboxLayout,
    words: &[u64],
) -> usize {
    let slot_count = layout.outbound.slot_count;
    let pending = window.csr(&layout.outbound).validity(slot_count);
    let first = first_free_slot(pending);
    let count = words.len().min(slot_count - first);
    if count == 0 {
        return 0;
    }

    for (i, &word) in words[..count].iter().enumerate() {
        window.write_slot(&layout.outbound, first + i, word);
    }
    let mask = slot_mask(count) << first;
    window.update_csr(&layout.outbound, |csr| csr.with_validity_set(mask));

    debug!("mailbox: published {} at slots {}..{}", count, first, first + count);
    count
}

pub(super) fn drain<B: RegisterBus>(
    window: &RegisterWindow<B>,
    layout: &MailboxLayout,
    mut sink: impl FnMut(Message),
) -> usize {
    let valid = window.csr(&layout.inbound).validity(layout.inbound.slot_count);
    if valid == 0 {
        return 0;
    }

    let mut remaining = valid;
    while remaining != 0 {
        let slot = remaining.trailing_zeros() as usize;
        sink(Message::new(slot as u8, window.slot(&layout.inbound, slot)));
        remaining &= remaining - 1;
    }
    window.update_csr(&layout.inbound, |csr: Csr| csr.with_validity_cleared(valid));
    valid.count_ones() as usize
}
