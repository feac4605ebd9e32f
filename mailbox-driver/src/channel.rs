//! One endpoint of the mailbox.
//!
//! A `MailboxChannel` owns everything the protocol needs: the register
//! window, the staging queue with its halt flag, the interrupt registration,
//! the transmit lock and the statistics. The platform calls
//! [`handle_interrupt`](MailboxChannel::handle_interrupt) from its handler
//! for the claimed line; readers and writers use the rest of the API, usually
//! through a [`MailboxFile`](crate::device::MailboxFile).

use alloc::sync::Arc;
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use log::info;

use crate::config::MailboxConfig;
use crate::consumer::{ConsumerInterface, Received};
use crate::encoding::Encoding;
use crate::error::{AttachError, DeviceError};
use crate::irq::{InterruptController, IrqLine, IrqRegistration, IrqReturn};
use crate::mmio::{RegisterBus, RegisterWindow};
use crate::receive::ReceiveEngine;
use crate::staging::StagingQueue;
use crate::transmit::{CancelToken, TransmitEngine};
use crate::waker::Readable;

/// Counters since attach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MailboxStats {
    /// Messages written to the outbound ring.
    pub sent: u64,
    /// Messages drained from the inbound ring, dropped ones included.
    pub received: u64,
    /// Inbound messages lost to a full staging queue.
    pub dropped: u64,
    /// Receive passes run.
    pub interrupts: u64,
    /// Times the receive interrupt was halted for backpressure.
    pub halts: u64,
    /// Times a reader's drain lifted a halt.
    pub resumes: u64,
    /// Messages waiting in the staging queue right now.
    pub queued: usize,
}

#[derive(Default)]
struct Counters {
    sent: AtomicU64,
    received: AtomicU64,
    interrupts: AtomicU64,
    halts: AtomicU64,
    resumes: AtomicU64,
}

pub struct MailboxChannel<B: RegisterBus> {
    // Released before the window goes away.
    irq: IrqRegistration,
    window: RegisterWindow<B>,
    config: MailboxConfig,
    transmitter: TransmitEngine,
    receiver: ReceiveEngine,
    staging: StagingQueue,
    cancel: CancelToken,
    opened: AtomicBool,
    counters: Counters,
}

impl<B: RegisterBus> MailboxChannel<B> {
    /// Take over a mapped register window and its interrupt line.
    ///
    /// Receive delivery stays off until [`open`](Self::open).
    pub fn attach(
        bus: B,
        line: IrqLine,
        controller: Arc<dyn InterruptController>,
        config: MailboxConfig,
    ) -> Result<Self, AttachError> {
        config.validate(bus.size())?;
        let irq = IrqRegistration::request(controller, line)?;

        let window = RegisterWindow::new(bus);
        window.update_csr(&config.layout.inbound, |csr| csr.with_enabled(false));

        info!(
            "mailbox: attached {:#x} byte window, IRQ {}, {:?} encoding, queue {}",
            window.size(),
            line,
            config.encoding,
            config.queue_capacity
        );

        Ok(Self {
            irq,
            window,
            transmitter: TransmitEngine::new(config.tx_spin_limit),
            receiver: ReceiveEngine::new(config.halt_free_slots),
            staging: StagingQueue::new(config.queue_capacity),
            config,
            cancel: CancelToken::new(),
            opened: AtomicBool::new(false),
            counters: Counters::default(),
        })
    }

    /// Start a session: empty queue, not halted, receive interrupt on.
    pub fn open(&self) -> Result<(), DeviceError> {
        if self.opened.swap(true, Ordering::AcqRel) {
            return Err(DeviceError::Busy);
        }
        self.begin_session();
        Ok(())
    }

    /// Open a channel nobody else can have opened yet.
    pub(crate) fn open_fresh(&self) {
        self.opened.store(true, Ordering::Release);
        self.begin_session();
    }

    fn begin_session(&self) {
        self.cancel.reset();
        self.staging.waker().reopen();
        {
            let mut state = self.staging.lock();
            state.clear();
            state.set_halted(false);
            state.set_stopped(false);
            self.set_receive_enabled(true);
        }
        info!("mailbox: opened");
    }

    /// End the session: receive off, queue emptied, waiting readers and
    /// senders released.
    pub fn close(&self) {
        if !self.opened.swap(false, Ordering::AcqRel) {
            return;
        }
        self.cancel.cancel();
        {
            let mut state = self.staging.lock();
            state.set_stopped(true);
            state.set_halted(false);
            state.clear();
            self.set_receive_enabled(false);
        }
        self.staging.waker().close();
        info!("mailbox: closed");
    }

    pub fn is_open(&self) -> bool {
        self.opened.load(Ordering::Acquire)
    }

    /// Re-enable receive delivery, lifting any halt.
    pub fn start(&self) {
        let mut state = self.staging.lock();
        state.set_stopped(false);
        state.set_halted(false);
        self.set_receive_enabled(true);
        info!("mailbox: receive started");
    }

    /// Disable receive delivery and discard everything queued.
    pub fn stop(&self) {
        let mut state = self.staging.lock();
        state.set_stopped(true);
        state.clear();
        self.set_receive_enabled(false);
        info!("mailbox: receive stopped");
    }

    fn set_receive_enabled(&self, enabled: bool) {
        self.window
            .update_csr(&self.config.layout.inbound, |csr| csr.with_enabled(enabled));
    }

    /// Receive interrupt entry point.
    pub fn handle_interrupt(&self) -> IrqReturn {
        let report = self.receiver.handle(
            &self.window,
            &self.config.layout,
            self.config.encoding,
            &self.staging,
        );
        self.counters.interrupts.fetch_add(1, Ordering::Relaxed);
        self.counters
            .received
            .fetch_add(report.drained as u64, Ordering::Relaxed);
        if report.halted {
            self.counters.halts.fetch_add(1, Ordering::Relaxed);
        }
        report.irq_return()
    }

    /// Whether the receive interrupt is currently asserted.
    pub fn interrupt_pending(&self) -> bool {
        self.window.csr(&self.config.layout.inbound).interrupt_pending()
    }

    /// Send words in order, waiting for credit as configured. Returns how
    /// many were sent; 0 if the peer is not accepting.
    pub fn send(&self, messages: &[u64]) -> usize {
        self.send_inner(messages, &[&self.cancel])
    }

    /// Like [`send`](Self::send), also giving up when `token` is cancelled.
    pub fn send_cancellable(&self, messages: &[u64], token: &CancelToken) -> usize {
        self.send_inner(messages, &[&self.cancel, token])
    }

    fn send_inner(&self, messages: &[u64], cancel: &[&CancelToken]) -> usize {
        let sent = self.transmitter.send(
            &self.window,
            &self.config.layout,
            self.config.encoding,
            messages,
            cancel,
        );
        self.counters.sent.fetch_add(sent as u64, Ordering::Relaxed);
        sent
    }

    /// Outbound slots free right now.
    pub fn credit(&self) -> usize {
        self.config.encoding.credit(&self.window, &self.config.layout)
    }

    pub fn peer_accepting(&self) -> bool {
        self.config
            .encoding
            .peer_accepting(&self.window, &self.config.layout)
    }

    /// Take up to `max` queued messages without blocking.
    pub fn receive(&self, max: usize) -> Received {
        let (received, resumed) = self.consumer().receive(max);
        if resumed {
            self.counters.resumes.fetch_add(1, Ordering::Relaxed);
        }
        received
    }

    pub fn poll(&self) -> bool {
        self.consumer().poll()
    }

    /// Wait until a message is queued.
    pub fn readable(&self) -> Readable<'_> {
        Readable::new(&self.staging)
    }

    fn consumer(&self) -> ConsumerInterface<'_, B> {
        ConsumerInterface::new(&self.window, &self.config.layout, &self.staging)
    }

    pub fn is_halted(&self) -> bool {
        self.staging.is_halted()
    }

    pub fn stats(&self) -> MailboxStats {
        MailboxStats {
            sent: self.counters.sent.load(Ordering::Relaxed),
            received: self.counters.received.load(Ordering::Relaxed),
            dropped: self.staging.dropped(),
            interrupts: self.counters.interrupts.load(Ordering::Relaxed),
            halts: self.counters.halts.load(Ordering::Relaxed),
            resumes: self.counters.resumes.load(Ordering::Relaxed),
            queued: self.staging.len(),
        }
    }

    pub fn config(&self) -> &MailboxConfig {
        &self.config
    }

    pub fn encoding(&self) -> Encoding {
        self.config.encoding
    }

    pub fn irq_line(&self) -> IrqLine {
        self.irq.line()
    }

    pub fn window(&self) -> &RegisterWindow<B> {
        &self.window
    }
}

impl<B: RegisterBus> Drop for MailboxChannel<B> {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.staging.waker().close();
        self.set_receive_enabled(false);
        info!("mailbox: detached from IRQ {}", self.irq.line());
    }
}
