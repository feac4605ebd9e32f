//! Helpers shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use mailbox_driver::loopback::{LoopbackChannel, loopback_pair};
use mailbox_driver::{Encoding, MailboxConfig, Message};

pub type Pair = (Arc<LoopbackChannel>, Arc<LoopbackChannel>);

pub fn config(encoding: Encoding) -> MailboxConfig {
    MailboxConfig {
        encoding,
        ..MailboxConfig::default()
    }
}

pub fn pair(config: MailboxConfig) -> Pair {
    loopback_pair(config).expect("loopback pair attaches")
}

pub fn values(messages: &[Message]) -> Vec<u64> {
    messages.iter().map(|m| m.value).collect()
}

/// Polls a channel's interrupt line and runs its handler, like the
/// interrupt controller would.
pub struct InterruptThread {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl InterruptThread {
    pub fn spawn(channel: Arc<LoopbackChannel>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let handle = thread::spawn({
            let stop = stop.clone();
            move || {
                while !stop.load(Ordering::Acquire) {
                    if channel.interrupt_pending() {
                        channel.handle_interrupt();
                    } else {
                        thread::yield_now();
                    }
                }
            }
        });
        Self {
            stop,
            handle: Some(handle),
        }
    }
}

impl Drop for InterruptThread {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            handle.join().expect("interrupt thread panicked");
        }
    }
}

/// Keep calling `send` until every word is out. A send returns short while
/// the receiver is halted, or mid-drain with its interrupt masked in bitmask
/// mode.
pub fn send_all(channel: &LoopbackChannel, words: &[u64]) {
    let deadline = Instant::now() + Duration::from_secs(10);
    let mut sent = 0;
    while sent < words.len() {
        sent += channel.send(&words[sent..]);
        assert!(Instant::now() < deadline, "send stalled at {}", sent);
        thread::yield_now();
    }
}

/// Blocking read of exactly `count` messages, in batches of at most `batch`.
pub fn receive_exactly(channel: &LoopbackChannel, count: usize, batch: usize) -> Vec<u64> {
    let mut got = Vec::with_capacity(count);
    while got.len() < count {
        pollster::block_on(channel.readable()).expect("channel stays open");
        let received = channel.receive(batch.min(count - got.len()));
        got.extend(values(&received.messages));
    }
    got
}
