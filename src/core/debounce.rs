// src/core/debounce.rs

//! Trailing-edge debouncing and cancellable delayed actions on the tokio runtime.

use crate::CancellationToken;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

/// One pending timer per key. Scheduling a key again cancels its pending timer,
/// so a burst for the same key delivers a single message after the quiet window.
/// Keys are independent of each other.
///
/// Must be used from within a tokio runtime.
#[derive(Debug)]
pub struct DebouncerTable<K, M> {
    window: Duration,
    sender: UnboundedSender<M>,
    pending: HashMap<K, JoinHandle<()>>,
}

impl<K, M> DebouncerTable<K, M>
where
    K: Eq + Hash + Copy,
    M: Send + 'static,
{
    /// # Arguments
    ///
    /// * `window` - Quiet time after the last call before the message is sent.
    /// * `sender` - Channel the messages are delivered to.
    pub fn new(window: Duration, sender: UnboundedSender<M>) -> Self {
        Self {
            window,
            sender,
            pending: HashMap::new(),
        }
    }

    /// Schedules `message` for `key`, superseding any pending message of that key.
    pub fn debounce(&mut self, key: K, message: M) {
        // 1. Cancel the pending timer of this key, if any.
        if let Some(previous) = self.pending.remove(&key) {
            previous.abort();
        }

        // 2. Drop finished timers of other keys so the table doesn't grow.
        self.pending.retain(|_, handle| !handle.is_finished());

        // 3. Arm a fresh timer.
        let sender = self.sender.clone();
        let window = self.window;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            if sender.send(message).is_err() {
                log::debug!("Debounced message dropped: receiver is gone.");
            }
        });
        self.pending.insert(key, handle);
    }

    /// Cancels the pending message of `key`.
    pub fn cancel(&mut self, key: &K) {
        if let Some(handle) = self.pending.remove(key) {
            handle.abort();
        }
    }

    /// Cancels every pending message.
    pub fn cancel_all(&mut self) {
        for (_, handle) in self.pending.drain() {
            handle.abort();
        }
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.get(key).is_some_and(|handle| !handle.is_finished())
    }
}

impl<K, M> Drop for DebouncerTable<K, M> {
    fn drop(&mut self) {
        for (_, handle) in self.pending.drain() {
            handle.abort();
        }
    }
}

/// Runs an action after a settle delay, last writer wins.
///
/// Every call to [`DelayedAction::schedule`] cancels the token of the previous
/// call, so an action either runs completely or not at all.
#[derive(Debug, Default)]
pub struct DelayedAction {
    token: Option<CancellationToken>,
}

impl DelayedAction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `action` to run after `delay` unless superseded or cancelled.
    pub fn schedule<F>(&mut self, delay: Duration, action: F) -> JoinHandle<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancel();
        let token: CancellationToken = Arc::new(AtomicBool::new(false));
        self.token = Some(Arc::clone(&token));
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if !token.load(Ordering::SeqCst) {
                action();
            }
        })
    }

    /// Cancels the scheduled action, if any.
    pub fn cancel(&mut self) {
        if let Some(token) = self.token.take() {
            token.store(true, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn test_burst_for_one_key_delivers_once() {
        // --- Setup ---
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut table = DebouncerTable::new(Duration::from_millis(100), tx);

        // --- Execute ---
        for value in 0..5 {
            table.debounce(1u32, value);
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;

        // --- Assert ---
        assert_eq!(rx.try_recv().ok(), Some(4));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_are_independent() {
        // --- Setup ---
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut table = DebouncerTable::new(Duration::from_millis(100), tx);

        // --- Execute ---
        table.debounce('a', "a");
        tokio::time::sleep(Duration::from_millis(60)).await;
        table.debounce('b', "b");
        tokio::time::sleep(Duration::from_millis(60)).await;
        let first = rx.try_recv().ok();
        tokio::time::sleep(Duration::from_millis(60)).await;
        let second = rx.try_recv().ok();

        // --- Assert ---
        assert_eq!(first, Some("a"));
        assert_eq!(second, Some("b"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_pending_message() {
        // --- Setup ---
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut table = DebouncerTable::new(Duration::from_millis(100), tx);
        table.debounce(7u8, ());

        // --- Execute ---
        table.cancel(&7);
        tokio::time::sleep(Duration::from_millis(200)).await;

        // --- Assert ---
        assert!(rx.try_recv().is_err());
        assert!(!table.is_pending(&7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_action_last_writer_wins() {
        // --- Setup ---
        let counter = Arc::new(AtomicUsize::new(0));
        let mut action = DelayedAction::new();

        // --- Execute ---
        let first_counter = Arc::clone(&counter);
        let first = action.schedule(Duration::from_millis(250), move || {
            first_counter.fetch_add(1, Ordering::SeqCst);
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        let second_counter = Arc::clone(&counter);
        let second = action.schedule(Duration::from_millis(250), move || {
            second_counter.fetch_add(10, Ordering::SeqCst);
        });
        first.await.unwrap();
        second.await.unwrap();

        // --- Assert ---
        assert_eq!(counter.load(Ordering::SeqCst), 10);
    }
}
