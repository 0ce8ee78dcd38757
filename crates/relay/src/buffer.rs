//! Sample buffer - FIFO of records awaiting delivery

use std::collections::VecDeque;

use contracts::{DropPolicy, Record};

/// Result of pushing a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Appended to the tail
    Queued,
    /// Appended; the oldest pending record was evicted to make room
    EvictedOldest,
    /// Rejected because the buffer is full
    Rejected,
}

/// Ordered queue of pending records
///
/// Unbounded unless a capacity is given. The bound applies to `push` only:
/// records returned by `requeue_front` are always kept and never evicted, so
/// the buffer may exceed its capacity until the next `take_all`.
#[derive(Debug, Default)]
pub struct SampleBuffer {
    records: VecDeque<Record>,
    capacity: Option<usize>,
    policy: DropPolicy,
    dropped: u64,
    /// Leading records that came back through `requeue_front`
    protected: usize,
}

impl SampleBuffer {
    /// Unbounded buffer
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Buffer holding at most `capacity` records on push
    pub fn bounded(capacity: usize, policy: DropPolicy) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity.min(1024)),
            capacity: Some(capacity),
            policy,
            dropped: 0,
            protected: 0,
        }
    }

    pub fn with_limit(capacity: Option<usize>, policy: DropPolicy) -> Self {
        match capacity {
            Some(capacity) => Self::bounded(capacity, policy),
            None => Self::unbounded(),
        }
    }

    /// Append to the tail
    pub fn push(&mut self, record: Record) -> PushOutcome {
        let full = self
            .capacity
            .is_some_and(|capacity| self.records.len() >= capacity);
        if !full {
            self.records.push_back(record);
            return PushOutcome::Queued;
        }

        self.dropped += 1;
        // the oldest record that is not a requeued one
        let evictable = self.protected < self.records.len();
        match self.policy {
            DropPolicy::DropOldest if evictable => {
                self.records.remove(self.protected);
                self.records.push_back(record);
                PushOutcome::EvictedOldest
            }
            DropPolicy::DropOldest | DropPolicy::DropNewest => PushOutcome::Rejected,
        }
    }

    /// Take the entire contents, leaving the buffer empty
    pub fn take_all(&mut self) -> VecDeque<Record> {
        self.protected = 0;
        std::mem::take(&mut self.records)
    }

    /// Put undelivered records back in front of everything buffered since
    ///
    /// Requeued records are exempt from eviction until they are taken again.
    pub fn requeue_front(&mut self, undelivered: VecDeque<Record>) {
        self.protected += undelivered.len();
        let mut restored = undelivered;
        restored.append(&mut self.records);
        self.records = restored;
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records evicted or rejected by the bound so far
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(n: i64) -> Record {
        [("n", n)].into_iter().collect()
    }

    fn values(records: &VecDeque<Record>) -> Vec<i64> {
        records
            .iter()
            .map(|r| match r.get("n") {
                Some(contracts::ScalarValue::Integer(n)) => *n,
                other => panic!("unexpected value {other:?}"),
            })
            .collect()
    }

    #[test]
    fn test_take_all_swaps_out_contents() {
        let mut buffer = SampleBuffer::unbounded();
        buffer.push(rec(1));
        buffer.push(rec(2));

        let snapshot = buffer.take_all();
        assert_eq!(values(&snapshot), vec![1, 2]);
        assert!(buffer.is_empty());

        buffer.push(rec(3));
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_requeue_goes_to_front() {
        let mut buffer = SampleBuffer::unbounded();
        buffer.push(rec(1));
        buffer.push(rec(2));
        let snapshot = buffer.take_all();

        buffer.push(rec(3));
        buffer.requeue_front(snapshot);

        assert_eq!(values(&buffer.take_all()), vec![1, 2, 3]);
    }

    #[test]
    fn test_drop_oldest_policy() {
        let mut buffer = SampleBuffer::bounded(2, DropPolicy::DropOldest);
        assert_eq!(buffer.push(rec(1)), PushOutcome::Queued);
        assert_eq!(buffer.push(rec(2)), PushOutcome::Queued);
        assert_eq!(buffer.push(rec(3)), PushOutcome::EvictedOldest);

        assert_eq!(buffer.dropped(), 1);
        assert_eq!(values(&buffer.take_all()), vec![2, 3]);
    }

    #[test]
    fn test_drop_newest_policy() {
        let mut buffer = SampleBuffer::bounded(2, DropPolicy::DropNewest);
        buffer.push(rec(1));
        buffer.push(rec(2));
        assert_eq!(buffer.push(rec(3)), PushOutcome::Rejected);

        assert_eq!(buffer.dropped(), 1);
        assert_eq!(values(&buffer.take_all()), vec![1, 2]);
    }

    #[test]
    fn test_requeue_ignores_bound() {
        let mut buffer = SampleBuffer::bounded(1, DropPolicy::DropOldest);
        buffer.push(rec(1));
        let snapshot = buffer.take_all();
        buffer.push(rec(2));

        buffer.requeue_front(snapshot);
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.dropped(), 0);
    }

    #[test]
    fn test_push_after_requeue_evicts_only_new_records() {
        let mut buffer = SampleBuffer::bounded(2, DropPolicy::DropOldest);
        buffer.push(rec(1));
        buffer.push(rec(2));
        let snapshot = buffer.take_all();

        // pushed while the chain was running
        buffer.push(rec(3));
        buffer.push(rec(4));
        buffer.requeue_front(snapshot);

        assert_eq!(buffer.push(rec(5)), PushOutcome::EvictedOldest);
        assert_eq!(buffer.push(rec(6)), PushOutcome::EvictedOldest);
        assert_eq!(buffer.dropped(), 2);
        assert_eq!(values(&buffer.take_all()), vec![1, 2, 5, 6]);

        // protection ends with the drain
        buffer.push(rec(7));
        buffer.push(rec(8));
        assert_eq!(buffer.push(rec(9)), PushOutcome::EvictedOldest);
        assert_eq!(values(&buffer.take_all()), vec![8, 9]);
    }

    #[test]
    fn test_push_rejected_when_only_requeued_records_remain() {
        let mut buffer = SampleBuffer::bounded(2, DropPolicy::DropOldest);
        buffer.push(rec(1));
        buffer.push(rec(2));
        let snapshot = buffer.take_all();
        buffer.requeue_front(snapshot);

        assert_eq!(buffer.push(rec(3)), PushOutcome::Rejected);
        assert_eq!(buffer.dropped(), 1);
        assert_eq!(values(&buffer.take_all()), vec![1, 2]);
    }
}
