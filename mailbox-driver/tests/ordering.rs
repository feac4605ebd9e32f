//! Order preservation and flow-control safety under arbitrary interleavings
//! of sends, interrupts and reads.

mod common;

use common::{config, pair, values};
use mailbox_driver::loopback::pump;
use mailbox_driver::{Encoding, MailboxConfig};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Send(usize),
    Interrupt,
    Receive(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1usize..150).prop_map(Op::Send),
        Just(Op::Interrupt),
        (1usize..200).prop_map(Op::Receive),
    ]
}

fn encoding() -> impl Strategy<Value = Encoding> {
    prop_oneof![Just(Encoding::RingIndex), Just(Encoding::Bitmask)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn delivery_is_in_order_and_lossless(encoding in encoding(), ops in prop::collection::vec(op(), 1..60)) {
        let (host, peer) = pair(MailboxConfig {
            tx_spin_limit: Some(0),
            ..config(encoding)
        });
        let mut next = 0u64;
        let mut got = Vec::new();

        for op in ops {
            match op {
                Op::Send(count) => {
                    let credit = host.credit();
                    let words: Vec<u64> = (next..next + count as u64).collect();
                    let sent = host.send(&words);
                    // Never more than the credit seen before the send, and
                    // nothing at all while the peer is not accepting.
                    prop_assert!(sent <= credit);
                    if !peer.is_halted() {
                        prop_assert_eq!(sent, count.min(credit));
                    } else {
                        prop_assert_eq!(sent, 0);
                    }
                    next += sent as u64;
                }
                Op::Interrupt => {
                    pump(&[&*peer]);
                }
                Op::Receive(max) => {
                    got.extend(values(&peer.receive(max).messages));
                }
            }
            prop_assert!(got.iter().copied().eq(0..got.len() as u64));
        }

        // Drain whatever is still in flight.
        loop {
            pump(&[&*peer]);
            let received = peer.receive(usize::MAX);
            if received.would_block {
                break;
            }
            got.extend(values(&received.messages));
        }
        prop_assert_eq!(got, (0..next).collect::<Vec<u64>>());
        prop_assert_eq!(peer.stats().dropped, 0);
    }
}
