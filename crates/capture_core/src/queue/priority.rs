use std::sync::Mutex;

use super::QueueStatistics;

/// Enqueue priority, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    Low = 0,
    Normal = 1,
    High = 2,
    Critical = 3,
}

struct Entry<T> {
    priority: Priority,
    sequence: u64,
    value: T,
}

/// A priority-ordered bounded queue.
///
/// Items are kept in strictly decreasing-priority order; insertion within a
/// priority level preserves FIFO via a monotonic sequence number. On
/// overflow the lowest-priority item is evicted (oldest first among ties).
///
/// Priority order is held until an explicit `dequeue()` — unlike the
/// original implementation this was ported from, `enqueue` never eagerly
/// drains the highest-priority item into a side channel.
pub struct PriorityQueue<T> {
    capacity: usize,
    items: Mutex<Vec<Entry<T>>>,
    stats: Mutex<QueueStatistics>,
    next_sequence: Mutex<u64>,
}

impl<T> PriorityQueue<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            items: Mutex::new(Vec::with_capacity(capacity)),
            stats: Mutex::new(QueueStatistics::default()),
            next_sequence: Mutex::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn try_enqueue(&self, item: T, priority: Priority) -> bool {
        if self.capacity == 0 {
            return false;
        }
        let sequence = {
            let mut next = self.next_sequence.lock().unwrap();
            let seq = *next;
            *next += 1;
            seq
        };

        let mut items = self.items.lock().unwrap();
        let mut stats = self.stats.lock().unwrap();

        if items.len() >= self.capacity {
            // Evict the lowest-priority item; ties break toward oldest sequence.
            let evict_index = items
                .iter()
                .enumerate()
                .min_by_key(|(_, e)| (e.priority, std::cmp::Reverse(e.sequence)))
                .map(|(i, _)| i);
            if let Some(idx) = evict_index {
                items.remove(idx);
                stats.record_drop();
            }
        }

        let insert_at = items
            .iter()
            .position(|e| e.priority < priority)
            .unwrap_or(items.len());
        items.insert(
            insert_at,
            Entry {
                priority,
                sequence,
                value: item,
            },
        );
        stats.record_enqueue(items.len());
        true
    }

    /// Removes and returns the highest-priority item, oldest first among ties.
    pub fn dequeue(&self) -> Option<T> {
        let mut items = self.items.lock().unwrap();
        if items.is_empty() {
            return None;
        }
        let entry = items.remove(0);
        self.stats.lock().unwrap().record_dequeue();
        Some(entry.value)
    }

    pub fn peek_priority(&self) -> Option<Priority> {
        self.items.lock().unwrap().first().map(|e| e.priority)
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
