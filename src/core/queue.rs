//! Pending-task queue with priority ordering and FIFO tie-break.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::core::task::{QueueEntry, TaskId, TaskRecord};

/// Wrapper making `TaskRecord` orderable: priority descending, then insertion
/// order (seq) ascending among equal priorities.
struct HeapEntry<V> {
    record: TaskRecord<V>,
}

impl<V> PartialEq for HeapEntry<V> {
    fn eq(&self, other: &Self) -> bool {
        self.record.seq == other.record.seq
    }
}

impl<V> Eq for HeapEntry<V> {}

impl<V> PartialOrd for HeapEntry<V> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<V> Ord for HeapEntry<V> {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.record.priority.cmp(&other.record.priority) {
            // FIFO within same priority: lower seq wins (reversed for max-heap)
            Ordering::Equal => other.record.seq.cmp(&self.record.seq),
            ord => ord,
        }
    }
}

/// Ordered container of not-yet-started tasks.
///
/// Backed by a `BinaryHeap` for O(log n) insert and pop. A record re-inserted
/// after a failed attempt keeps its original priority and seq, so it competes
/// under the same ordering rule as everything else in the queue.
pub struct PendingQueue<V> {
    entries: BinaryHeap<HeapEntry<V>>,
}

impl<V> Default for PendingQueue<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> PendingQueue<V> {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: BinaryHeap::new(),
        }
    }

    /// Insert a record, keeping the ordering invariant.
    pub(crate) fn insert(&mut self, record: TaskRecord<V>) {
        self.entries.push(HeapEntry { record });
    }

    /// Remove and return the best-ordered record. `None` means no work, not
    /// an error.
    pub(crate) fn pop_highest(&mut self) -> Option<TaskRecord<V>> {
        self.entries.pop().map(|e| e.record)
    }

    /// Remove a specific not-yet-started record if present.
    ///
    /// Rebuilds the heap without the matching entry; selective removal is rare
    /// enough that O(n) is acceptable here.
    pub(crate) fn remove_by_id(&mut self, id: TaskId) -> Option<TaskRecord<V>> {
        let entries: Vec<_> = std::mem::take(&mut self.entries).into_vec();
        let mut removed = None;
        for entry in entries {
            if removed.is_none() && entry.record.id == id {
                removed = Some(entry.record);
            } else {
                self.entries.push(entry);
            }
        }
        removed
    }

    /// Remove every record, lowest priority first, for the shutdown drain.
    /// The order is deterministic for testing.
    pub(crate) fn drain_for_shutdown(&mut self) -> Vec<TaskRecord<V>> {
        let mut drained: Vec<_> = std::mem::take(&mut self.entries)
            .into_vec()
            .into_iter()
            .map(|e| e.record)
            .collect();
        drained.sort_by(|a, b| a.priority.cmp(&b.priority).then(a.seq.cmp(&b.seq)));
        drained
    }

    /// Ordered `(id, priority)` pairs without mutating the queue.
    #[must_use]
    pub fn snapshot(&self) -> Vec<QueueEntry> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .map(|e| (e.record.priority, e.record.seq, e.record.id))
            .collect();
        entries.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        entries
            .into_iter()
            .map(|(priority, _, id)| QueueEntry { id, priority })
            .collect()
    }

    /// Number of pending records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no records are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::oneshot;

    fn make_record(id: TaskId, priority: i64, seq: u64) -> TaskRecord<u32> {
        let (done, _rx) = oneshot::channel();
        TaskRecord {
            id,
            seq,
            work: Arc::new(|| Box::pin(async { Ok(0) })),
            priority,
            timeout: Duration::from_secs(5),
            retry_budget: 0,
            attempts_used: 0,
            done,
        }
    }

    #[test]
    fn test_priority_ordering() {
        let mut q = PendingQueue::new();
        q.insert(make_record(1, -3, 0));
        q.insert(make_record(2, 10, 1));
        q.insert(make_record(3, 0, 2));
        q.insert(make_record(4, 7, 3));

        assert_eq!(q.pop_highest().unwrap().id, 2);
        assert_eq!(q.pop_highest().unwrap().id, 4);
        assert_eq!(q.pop_highest().unwrap().id, 3);
        assert_eq!(q.pop_highest().unwrap().id, 1);
    }

    #[test]
    fn test_fifo_within_priority() {
        let mut q = PendingQueue::new();
        q.insert(make_record(1, 5, 0));
        q.insert(make_record(2, 5, 1));
        q.insert(make_record(3, 5, 2));

        assert_eq!(q.pop_highest().unwrap().id, 1);
        assert_eq!(q.pop_highest().unwrap().id, 2);
        assert_eq!(q.pop_highest().unwrap().id, 3);
    }

    #[test]
    fn test_reinserted_record_keeps_original_order() {
        let mut q = PendingQueue::new();
        let mut retried = make_record(1, 5, 0);
        retried.attempts_used = 1;
        q.insert(make_record(2, 5, 1));
        // Re-insert after a failed attempt: original seq still wins FIFO.
        q.insert(retried);

        assert_eq!(q.pop_highest().unwrap().id, 1);
        assert_eq!(q.pop_highest().unwrap().id, 2);
    }

    #[test]
    fn test_remove_by_id() {
        let mut q = PendingQueue::new();
        q.insert(make_record(1, 1, 0));
        q.insert(make_record(2, 2, 1));
        q.insert(make_record(3, 3, 2));

        assert!(q.remove_by_id(2).is_some());
        assert!(q.remove_by_id(2).is_none());
        assert_eq!(q.len(), 2);
        assert_eq!(q.pop_highest().unwrap().id, 3);
        assert_eq!(q.pop_highest().unwrap().id, 1);
    }

    #[test]
    fn test_snapshot_is_ordered_and_nonmutating() {
        let mut q = PendingQueue::new();
        q.insert(make_record(1, 0, 0));
        q.insert(make_record(2, 9, 1));
        q.insert(make_record(3, 9, 2));

        let snap = q.snapshot();
        assert_eq!(
            snap,
            vec![
                QueueEntry { id: 2, priority: 9 },
                QueueEntry { id: 3, priority: 9 },
                QueueEntry { id: 1, priority: 0 },
            ]
        );
        assert_eq!(q.len(), 3);
    }

    #[test]
    fn test_drain_for_shutdown_lowest_first() {
        let mut q = PendingQueue::new();
        q.insert(make_record(1, 4, 0));
        q.insert(make_record(2, -1, 1));
        q.insert(make_record(3, 4, 2));

        let ids: Vec<_> = q.drain_for_shutdown().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
        assert!(q.is_empty());
    }

    #[test]
    fn test_empty_pop() {
        let mut q = PendingQueue::<u32>::new();
        assert!(q.pop_highest().is_none());
        assert!(q.is_empty());
    }
}
