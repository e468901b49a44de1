// SPDX-License-Identifier: MIT

//! Unbounded single-producer/single-consumer push queue with explicit close
//! and a "wait until closed" primitive (§4.1, C3).
//!
//! Deliberately not a `tokio::sync::mpsc` channel: mpsc's `close()` doesn't
//! give us "items pushed before close are still delivered, items pushed
//! after close are silently dropped" without extra bookkeeping on the
//! sender side, and its `Sender` drop-to-close semantics don't match the
//! explicit `close()` call the contract requires. A `Mutex<VecDeque<T>>`
//! plus a `Notify` says exactly what we mean.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

struct Inner<T> {
    items: Mutex<VecDeque<T>>,
    closed: AtomicBool,
    item_ready: Notify,
    closed_ready: Notify,
}

/// FIFO queue consumed via [`PushQueue::recv`] until the queue is closed and
/// drained. Safe to call `push`/`close`/`recv`/`wait_closed` concurrently
/// from multiple tasks; the single-consumer expectation in the design is a
/// usage convention, not a correctness requirement — two concurrent `recv`
/// callers never observe the same item twice.
#[derive(Clone)]
pub struct PushQueue<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Default for PushQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PushQueue<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                items: Mutex::new(VecDeque::new()),
                closed: AtomicBool::new(false),
                item_ready: Notify::new(),
                closed_ready: Notify::new(),
            }),
        }
    }

    /// Append `value` to the queue. Silently dropped if the queue is
    /// already closed.
    pub fn push(&self, value: T) {
        if self.inner.closed.load(Ordering::Acquire) {
            return;
        }
        self.inner.items.lock().push_back(value);
        self.inner.item_ready.notify_waiters();
    }

    /// Close the queue. Idempotent; wakes every waiter on both `recv` and
    /// `wait_closed`. No item pushed after this call returns is ever
    /// observed by a consumer.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
        self.inner.item_ready.notify_waiters();
        self.inner.closed_ready.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Pop the next item, waiting for one to arrive. Returns `None` once the
    /// queue is closed and empty — the end-of-stream signal for `iterate()`.
    pub async fn recv(&self) -> Option<T> {
        loop {
            if let Some(item) = self.inner.items.lock().pop_front() {
                return Some(item);
            }
            if self.inner.closed.load(Ordering::Acquire) {
                // Re-check after observing closed: a push racing with close
                // may have landed between the pop above and this check.
                if let Some(item) = self.inner.items.lock().pop_front() {
                    return Some(item);
                }
                return None;
            }
            let notified = self.inner.item_ready.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if !self.inner.items.lock().is_empty() || self.inner.closed.load(Ordering::Acquire) {
                continue;
            }
            notified.await;
        }
    }

    /// Drain all items currently queued without waiting for close. Useful
    /// for tests and for collecting whatever accumulated before a forced
    /// teardown.
    pub fn drain(&self) -> Vec<T> {
        self.inner.items.lock().drain(..).collect()
    }

    /// Resolve once `close()` has been called, regardless of remaining
    /// buffered items.
    pub async fn wait_closed(&self) {
        if self.inner.closed.load(Ordering::Acquire) {
            return;
        }
        let notified = self.inner.closed_ready.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if self.inner.closed.load(Ordering::Acquire) {
            return;
        }
        notified.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn fifo_order_preserved() {
        let q: PushQueue<u32> = PushQueue::new();
        q.push(1);
        q.push(2);
        q.push(3);
        q.close();
        let mut out = Vec::new();
        while let Some(v) = q.recv().await {
            out.push(v);
        }
        assert_eq!(out, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn push_after_close_is_dropped() {
        let q: PushQueue<u32> = PushQueue::new();
        q.push(1);
        q.close();
        q.push(2);
        assert_eq!(q.recv().await, Some(1));
        assert_eq!(q.recv().await, None);
    }

    #[tokio::test]
    async fn recv_waits_for_push() {
        let q: PushQueue<u32> = PushQueue::new();
        let q2 = q.clone();
        let handle = tokio::spawn(async move { q2.recv().await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        q.push(7);
        q.close();
        assert_eq!(handle.await.unwrap(), Some(7));
    }

    #[tokio::test]
    async fn wait_closed_resolves_after_close() {
        let q: PushQueue<u32> = PushQueue::new();
        let q2 = q.clone();
        let handle = tokio::spawn(async move {
            q2.wait_closed().await;
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        q.close();
        handle.await.unwrap();
    }

    proptest::proptest! {
        #[test]
        fn any_push_sequence_round_trips_in_order(values: Vec<u32>) {
            let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
            rt.block_on(async {
                let q: PushQueue<u32> = PushQueue::new();
                for v in &values {
                    q.push(*v);
                }
                q.close();
                let mut out = Vec::new();
                while let Some(v) = q.recv().await {
                    out.push(v);
                }
                prop_assert_eq!(out, values);
                Ok(())
            })?;
        }
    }
}
