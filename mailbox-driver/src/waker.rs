//! Waker abstraction for blocking reads.
//!
//! The receive interrupt signals a `Waker` when the staging queue goes from
//! empty to non-empty; a reader blocked on the [`Readable`] future is woken
//! through the `core::task::Waker` it registered. Closing the waker fails
//! every current and future wait until it is reopened.

use alloc::vec::Vec;
use core::future::Future;
use core::pin::Pin;
use core::sync::atomic::{AtomicBool, Ordering};
use core::task::{Context, Poll};

use spinning_top::Spinlock;

use crate::error::ChannelClosed;
use crate::staging::StagingQueue;

/// Wakes readers waiting for inbound messages.
pub struct Waker {
    /// Set on teardown; waits fail instead of blocking.
    closed: AtomicBool,
    /// Every task currently blocked on this waker.
    waiting: Spinlock<Vec<core::task::Waker>>,
}

impl Waker {
    pub const fn new() -> Self {
        Self {
            closed: AtomicBool::new(false),
            waiting: Spinlock::new(Vec::new()),
        }
    }

    /// Called by the receive path when data is available. Wakes every
    /// waiting task; each re-registers if it still has to wait.
    pub fn wake(&self) {
        let waiting = core::mem::take(&mut *self.waiting.lock());
        for waker in waiting {
            waker.wake();
        }
    }

    /// Add a task to wake on the next signal. Re-registering the same task
    /// does not add a second entry.
    pub fn register(&self, waker: &core::task::Waker) {
        let mut waiting = self.waiting.lock();
        if !waiting.iter().any(|current| current.will_wake(waker)) {
            waiting.push(waker.clone());
        }
    }

    /// Tasks registered and not yet woken.
    pub fn waiters(&self) -> usize {
        self.waiting.lock().len()
    }

    /// Fail all waits and wake whoever is blocked.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.wake();
    }

    pub fn reopen(&self) {
        self.closed.store(false, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Default for Waker {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves once the staging queue holds at least one message.
///
/// Fails with [`ChannelClosed`] if the channel is closed or torn down while
/// waiting.
pub struct Readable<'a> {
    queue: &'a StagingQueue,
}

impl<'a> Readable<'a> {
    pub(crate) fn new(queue: &'a StagingQueue) -> Self {
        Self { queue }
    }

    fn check(&self) -> Option<Result<(), ChannelClosed>> {
        if self.queue.waker().is_closed() {
            Some(Err(ChannelClosed))
        } else if !self.queue.is_empty() {
            Some(Ok(()))
        } else {
            None
        }
    }
}

impl Future for Readable<'_> {
    type Output = Result<(), ChannelClosed>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Some(result) = self.check() {
            return Poll::Ready(result);
        }
        self.queue.waker().register(cx.waker());
        // A message may have arrived between the check and the registration.
        match self.check() {
            Some(result) => Poll::Ready(result),
            None => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::sync::Arc;
    use alloc::task::Wake;
    use core::sync::atomic::AtomicUsize;

    use super::*;

    struct CountingWake(AtomicUsize);

    impl Wake for CountingWake {
        fn wake(self: Arc<Self>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn counting() -> (Arc<CountingWake>, core::task::Waker) {
        let counter = Arc::new(CountingWake(AtomicUsize::new(0)));
        let waker = core::task::Waker::from(counter.clone());
        (counter, waker)
    }

    #[test]
    fn wake_consumes_registrations() {
        let (counter, task_waker) = counting();
        let waker = Waker::new();
        waker.register(&task_waker);
        waker.register(&task_waker);
        assert_eq!(waker.waiters(), 1);

        waker.wake();
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
        assert_eq!(waker.waiters(), 0);

        waker.wake();
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn close_wakes_every_waiter() {
        let (first, first_waker) = counting();
        let (second, second_waker) = counting();
        let waker = Waker::new();
        waker.register(&first_waker);
        waker.register(&second_waker);
        assert_eq!(waker.waiters(), 2);

        waker.close();
        assert!(waker.is_closed());
        assert_eq!(first.0.load(Ordering::SeqCst), 1);
        assert_eq!(second.0.load(Ordering::SeqCst), 1);

        waker.reopen();
        assert!(!waker.is_closed());
    }

    #[test]
    fn readable_resolves_when_queue_has_data() {
        use crate::message::Message;

        let queue = StagingQueue::new(4);
        let counter = Arc::new(CountingWake(AtomicUsize::new(0)));
        let task_waker = core::task::Waker::from(counter.clone());
        let mut cx = Context::from_waker(&task_waker);

        let mut readable = Readable::new(&queue);
        assert_eq!(Pin::new(&mut readable).poll(&mut cx), Poll::Pending);

        assert!(queue.enqueue(Message::new(0, 1)));
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
        assert_eq!(Pin::new(&mut readable).poll(&mut cx), Poll::Ready(Ok(())));

        queue.waker().close();
        assert_eq!(
            Pin::new(&mut Readable::new(&queue)).poll(&mut cx),
            Poll::Ready(Err(ChannelClosed))
        );
    }
}
