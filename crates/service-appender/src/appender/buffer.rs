//! Mutex-guarded FIFO queue of buffered entries.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::entry::BufferedItem;

/// FIFO buffer shared between producer threads and flush workers.
///
/// The queue is created lazily on first append and reset to `None` whenever
/// it is fully drained. The reset swaps the queue reference so capacity
/// allocated during a burst is released instead of being retained at its
/// high-water mark. There is no upper bound: appends always succeed, which
/// trades bounded memory for never dropping an entry while the remote sink
/// is down.
#[derive(Debug)]
pub struct Buffer {
    inner: Mutex<Option<VecDeque<BufferedItem>>>,
    capacity: usize,
    threshold: usize,
}

impl Buffer {
    pub fn new(capacity: usize, threshold: usize) -> Self {
        Buffer {
            inner: Mutex::new(None),
            capacity,
            threshold,
        }
    }

    /// Flush trigger count, which also bounds a single dispatched batch.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Enqueues one item. Returns true when the post-insert size has reached
    /// the flush threshold.
    pub fn append(&self, item: BufferedItem) -> bool {
        let mut guard = self.inner.lock().expect("buffer lock poisoned");
        let queue = guard.get_or_insert_with(|| VecDeque::with_capacity(self.capacity));
        queue.push_back(item);
        queue.len() >= self.threshold
    }

    /// Enqueues a batch of items under a single lock acquisition. Returns
    /// true when the post-insert size has reached the flush threshold.
    pub fn append_all(&self, items: impl IntoIterator<Item = BufferedItem>) -> bool {
        let mut guard = self.inner.lock().expect("buffer lock poisoned");
        let queue = guard.get_or_insert_with(|| VecDeque::with_capacity(self.capacity));
        queue.extend(items);
        queue.len() >= self.threshold
    }

    /// Takes the whole queue in one reference swap, leaving the buffer in
    /// its fresh, unallocated state.
    pub fn drain_all(&self) -> Vec<BufferedItem> {
        let mut guard = self.inner.lock().expect("buffer lock poisoned");
        match guard.take() {
            Some(queue) => queue.into(),
            None => Vec::new(),
        }
    }

    /// Pops the `n` oldest items, leaving the remainder queued in arrival
    /// order. Behaves like [`drain_all`](Buffer::drain_all) when the queue
    /// holds `n` items or fewer.
    pub fn drain_up_to(&self, n: usize) -> Vec<BufferedItem> {
        let mut guard = self.inner.lock().expect("buffer lock poisoned");
        let Some(queue) = guard.as_mut() else {
            return Vec::new();
        };
        if queue.len() <= n {
            return match guard.take() {
                Some(queue) => queue.into(),
                None => Vec::new(),
            };
        }
        queue.drain(..n).collect()
    }

    /// Current number of queued items. This takes the lock, so do not poll
    /// it in a hot loop.
    pub fn len(&self) -> usize {
        let guard = self.inner.lock().expect("buffer lock poisoned");
        guard.as_ref().map_or(0, VecDeque::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
