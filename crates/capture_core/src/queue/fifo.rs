use std::collections::VecDeque;
use std::sync::Mutex;

use crossbeam_channel::{bounded, Receiver, Sender};

use super::QueueStatistics;

/// A thread-safe FIFO queue with drop-oldest overflow.
///
/// The sync store (`items`) is always authoritative. `stream()` hands back a
/// receiver fed by a best-effort notification on every successful enqueue;
/// a full notification channel just means a slow consumer missed a wakeup,
/// never that data was lost.
pub struct FifoQueue<T> {
    capacity: usize,
    items: Mutex<VecDeque<T>>,
    stats: Mutex<QueueStatistics>,
    notify_tx: Sender<()>,
    notify_rx: Receiver<()>,
}

impl<T> FifoQueue<T> {
    pub fn new(capacity: usize) -> Self {
        let (notify_tx, notify_rx) = bounded(capacity.max(1));
        Self {
            capacity,
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            stats: Mutex::new(QueueStatistics::default()),
            notify_tx,
            notify_rx,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Enqueues `item`, dropping the oldest element first if full. Always
    /// succeeds unless capacity is zero.
    pub fn try_enqueue(&self, item: T) -> bool {
        if self.capacity == 0 {
            return false;
        }
        let mut items = self.items.lock().unwrap();
        let mut stats = self.stats.lock().unwrap();
        if items.len() >= self.capacity {
            items.pop_front();
            stats.record_drop();
        }
        items.push_back(item);
        stats.record_enqueue(items.len());
        let _ = self.notify_tx.try_send(());
        true
    }

    pub fn dequeue(&self) -> Option<T> {
        let mut items = self.items.lock().unwrap();
        let item = items.pop_front();
        if item.is_some() {
            self.stats.lock().unwrap().record_dequeue();
        }
        item
    }

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

    /// A best-effort notification receiver: one message per successful
    /// enqueue, used by cooperative consumers that want to await new data
    /// rather than poll `dequeue`.
    pub fn notifications(&self) -> Receiver<()> {
        self.notify_rx.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drop_oldest_keeps_contiguous_suffix() {
        let queue: FifoQueue<i32> = FifoQueue::new(4);
        for i in 1..=10 {
            queue.try_enqueue(i);
        }
        let mut drained = Vec::new();
        while let Some(v) = queue.dequeue() {
            drained.push(v);
        }
        assert_eq!(drained, vec![7, 8, 9, 10]);
        assert_eq!(queue.statistics().dropped, 6);
    }

    #[test]
    fn count_matches_min_of_n_and_capacity() {
        let queue: FifoQueue<i32> = FifoQueue::new(4);
        for i in 0..3 {
            queue.try_enqueue(i);
        }
        assert_eq!(queue.count(), 3);
        for i in 0..10 {
            queue.try_enqueue(i);
        }
        assert_eq!(queue.count(), 4);
    }

    #[test]
    fn peek_does_not_remove() {
        let queue: FifoQueue<i32> = FifoQueue::new(2);
        queue.try_enqueue(1);
        assert_eq!(queue.peek(), Some(1));
        assert_eq!(queue.count(), 1);
    }

    #[test]
    fn reset_statistics_preserves_current_size() {
        let queue: FifoQueue<i32> = FifoQueue::new(4);
        for i in 0..6 {
            queue.try_enqueue(i);
        }
        queue.reset_statistics();
        let stats = queue.statistics();
        assert_eq!(stats.current_size(), 4);
        assert_eq!(stats.dropped, 0);
    }

    #[test]
    fn notifications_fire_on_enqueue() {
        let queue: FifoQueue<i32> = FifoQueue::new(4);
        let rx = queue.notifications();
        queue.try_enqueue(1);
        assert!(rx.try_recv().is_ok());
    }
}
