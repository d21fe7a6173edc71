// src/core/history.rs

//! Undo/redo history of whole-tree snapshots.

use crate::constants::HISTORY_CAPACITY;
use scopeguard::ScopeGuard;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Fixed-size circular buffer with a "front" (newest entry) and a movable
/// "current" cursor.
///
/// Pushing while the cursor is behind the front drops every entry after the
/// cursor. Once full, pushing overwrites the oldest entry.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    items: Vec<Option<T>>,
    front: usize,
    current: usize,
    count: usize,
}

impl<T> RingBuffer<T> {
    /// Creates a buffer holding at most `capacity` entries (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let mut items = Vec::with_capacity(capacity);
        items.resize_with(capacity, || None);
        Self {
            items,
            front: capacity - 1,
            current: capacity - 1,
            count: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.items.len()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_current_front(&self) -> bool {
        self.front == self.current
    }

    fn inc(&self, index: usize) -> usize {
        (index + 1) % self.capacity()
    }

    fn dec(&self, index: usize) -> usize {
        (index + self.capacity() - 1) % self.capacity()
    }

    /// Number of slots from `start` to `end`, both included, walking forward.
    fn inclusive_interval(&self, start: usize, end: usize) -> usize {
        if end < start {
            end + self.capacity() + 1 - start
        } else {
            end - start + 1
        }
    }

    pub fn clear(&mut self) {
        let last = self.capacity() - 1;
        self.front = last;
        self.current = last;
        self.count = 0;
        self.items.iter_mut().for_each(|slot| *slot = None);
    }

    /// Stores `item` at the cursor, which becomes the new front.
    pub fn push(&mut self, item: T) {
        if self.is_empty() {
            self.current = self.inc(self.current);
        } else if !self.is_current_front() {
            self.count -= self.inclusive_interval(self.current, self.front);
        } else {
            self.current = self.inc(self.current);
        }
        self.front = self.current;
        if let Some(slot) = self.items.get_mut(self.front) {
            *slot = Some(item);
        }
        self.count = (self.count + 1).min(self.capacity());
    }

    /// Drops the newest entry. The cursor follows if it was on it.
    pub fn pop_front(&mut self) {
        if self.count > 1 {
            let new_front = self.dec(self.front);
            if let Some(slot) = self.items.get_mut(self.front) {
                *slot = None;
            }
            if self.is_current_front() {
                self.current = new_front;
            }
            self.front = new_front;
            self.count -= 1;
        } else {
            self.clear();
        }
    }

    pub fn can_move_back(&self) -> bool {
        !self.is_empty() && self.inclusive_interval(self.current, self.front) != self.count
    }

    /// Steps the cursor towards older entries. Fails at the oldest retained one.
    pub fn move_back(&mut self) -> bool {
        if !self.can_move_back() {
            return false;
        }
        self.current = self.dec(self.current);
        true
    }

    /// Steps the cursor towards the front. Fails at the front.
    pub fn move_forward(&mut self) -> bool {
        if self.is_current_front() {
            return false;
        }
        self.current = self.inc(self.current);
        true
    }

    pub fn current(&self) -> Option<&T> {
        if self.is_empty() {
            return None;
        }
        self.items.get(self.current).and_then(Option::as_ref)
    }

    /// Entries from newest to oldest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        let mut index = self.front;
        (0..self.count).filter_map(move |_| {
            let item = self.items.get(index).and_then(Option::as_ref);
            index = self.dec(index);
            item
        })
    }
}

/// Guard returned by [`History::pause`]. Resumes recording on drop.
pub type PauseGuard = ScopeGuard<Arc<AtomicUsize>, fn(Arc<AtomicUsize>)>;

fn resume(counter: Arc<AtomicUsize>) {
    let _ = counter.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |value| value.checked_sub(1));
}

/// Snapshot history with re-entrant pausing.
///
/// While paused, [`History::save_state_with`] and [`History::delete_newest`] do
/// nothing. When disabled, every operation does nothing.
#[derive(Debug)]
pub struct History<S> {
    buffer: RingBuffer<S>,
    pause_counter: Arc<AtomicUsize>,
    enabled: bool,
}

impl<S: Clone> Default for History<S> {
    fn default() -> Self {
        Self::new(HISTORY_CAPACITY)
    }
}

impl<S: Clone> History<S> {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: RingBuffer::new(capacity),
            pause_counter: Arc::new(AtomicUsize::new(0)),
            enabled: true,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_paused(&self) -> bool {
        self.pause_counter.load(Ordering::SeqCst) > 0
    }

    fn is_recording(&self) -> bool {
        self.enabled && !self.is_paused()
    }

    /// Pauses recording until the returned guard is dropped. Nests.
    pub fn pause(&self) -> PauseGuard {
        self.pause_counter.fetch_add(1, Ordering::SeqCst);
        scopeguard::guard(Arc::clone(&self.pause_counter), resume as fn(Arc<AtomicUsize>))
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Records the state produced by `snapshot`. Nothing is built when paused.
    pub fn save_state_with<F>(&mut self, snapshot: F)
    where
        F: FnOnce() -> S,
    {
        if self.is_recording() {
            self.buffer.push(snapshot());
        }
    }

    /// Discards the newest entry. Used to drop the snapshot of a no-op edit.
    pub fn delete_newest(&mut self) {
        if self.is_recording() {
            self.buffer.pop_front();
        }
    }

    pub fn can_undo(&self) -> bool {
        self.enabled
            && !self.buffer.is_empty()
            && ((self.buffer.is_current_front() && self.buffer.capacity() > 1) || self.buffer.can_move_back())
    }

    pub fn can_redo(&self) -> bool {
        self.enabled && !self.buffer.is_current_front()
    }

    /// Steps back one entry and returns the state to restore.
    ///
    /// When the cursor is at the front, the live state from `current` is pushed
    /// first so that a later redo can come back to it.
    pub fn restore_last_state<F>(&mut self, current: F) -> Option<S>
    where
        F: FnOnce() -> S,
    {
        if !self.enabled {
            return None;
        }
        if self.buffer.is_current_front() && !self.is_paused() {
            self.buffer.push(current());
        }
        if self.buffer.move_back() {
            self.buffer.current().cloned()
        } else {
            None
        }
    }

    /// Steps forward one entry and returns the state to restore.
    ///
    /// Reaching the front consumes the entry pushed by the first undo.
    pub fn restore_prev_state(&mut self) -> Option<S> {
        if !self.enabled || !self.buffer.move_forward() {
            return None;
        }
        let state = self.buffer.current().cloned();
        if self.buffer.is_current_front() {
            self.buffer.pop_front();
        }
        state
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
