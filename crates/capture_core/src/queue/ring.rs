use std::collections::VecDeque;
use std::sync::Mutex;

use super::QueueStatistics;

/// A fixed power-of-two-capacity ring queue intended for the ring-buffer
/// sink. Unlike [`FifoQueue`](super::FifoQueue), `try_enqueue` fails rather
/// than dropping the oldest element when full.
///
/// `peek()` never clears the returned slot; only `try_dequeue()` advances
/// the read cursor (resolving the ambiguity between the two in the source
/// this was ported from).
pub struct RingQueue<T> {
    capacity: usize,
    items: Mutex<VecDeque<T>>,
    stats: Mutex<QueueStatistics>,
}

impl<T> RingQueue<T> {
    /// Panics if `capacity` is not a power of two.
    pub fn new(capacity: usize) -> Self {
        assert!(
            capacity.is_power_of_two() && capacity > 0,
            "ring queue capacity must be a non-zero power of two, got {capacity}"
        );
        Self {
            capacity,
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            stats: Mutex::new(QueueStatistics::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn try_enqueue(&self, item: T) -> bool {
        let mut items = self.items.lock().unwrap();
        if items.len() >= self.capacity {
            self.stats.lock().unwrap().errors += 1;
            return false;
        }
        items.push_back(item);
        self.stats.lock().unwrap().record_enqueue(items.len());
        true
    }

    pub fn try_dequeue(&self) -> Option<T> {
        let mut items = self.items.lock().unwrap();
        let item = items.pop_front();
        if item.is_some() {
            self.stats.lock().unwrap().record_dequeue();
        }
        item
    }

    /// Returns the oldest item without removing it.
    pub fn peek(&self) -> Option<T>
    where
        T: Clone,
    {
        self.items.lock().unwrap().front().cloned()
    }

    pub fn clear(&self) {
        self.items.lock().unwrap().clear();
    }

    pub fn count(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn is_full(&self) -> bool {
        self.count() >= self.capacity
    }

    pub fn statistics(&self) -> QueueStatistics {
        *self.stats.lock().unwrap()
    }

    pub fn reset_statistics(&self) {
        let size = self.count();
        self.stats.lock().unwrap().reset_preserving_size(size);
    }
}
