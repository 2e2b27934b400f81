//! Per-label bounded FIFO queues.
//!
//! Each label gets a fixed-capacity ring buffer sized to the backpressure
//! limit. A full queue rejects the value: the caller turns that into an
//! overflow error, nothing is overwritten or dropped silently.

use std::collections::HashMap;
use std::fmt;

use contracts::{Label, LabelSet, SyncError};
use ringbuf::{traits::*, HeapRb};

/// Bounded FIFO queue for one label
pub struct LabelQueue<T> {
    ring: HeapRb<T>,
    limit: usize,
    high_water: usize,
}

impl<T> fmt::Debug for LabelQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LabelQueue")
            .field("len", &self.ring.occupied_len())
            .field("limit", &self.limit)
            .field("high_water", &self.high_water)
            .finish()
    }
}

impl<T> LabelQueue<T> {
    /// Create a queue holding at most `limit` values (at least one)
    #[inline]
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            ring: HeapRb::new(limit),
            limit,
            high_water: 0,
        }
    }

    /// Append a value, handing it back if the queue is full
    #[inline]
    pub fn push(&mut self, value: T) -> Result<(), T> {
        self.ring.try_push(value)?;
        self.high_water = self.high_water.max(self.ring.occupied_len());
        Ok(())
    }

    /// Remove and return the oldest value
    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        self.ring.try_pop()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ring.occupied_len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    #[inline]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Largest depth reached since creation
    #[inline]
    pub fn high_water(&self) -> usize {
        self.high_water
    }

    /// Drop every buffered value, returning how many were discarded
    pub fn clear(&mut self) -> usize {
        self.ring.pop_iter().count()
    }
}

/// Queues for every label seen so far, all sharing one limit.
///
/// A label is present while its queue is non-empty.
#[derive(Debug)]
pub struct FifoBuffers<L, T> {
    queues: HashMap<L, LabelQueue<T>>,
    limit: usize,
}

impl<L: Label, T> FifoBuffers<L, T> {
    pub fn new(limit: usize) -> Self {
        Self {
            queues: HashMap::new(),
            limit,
        }
    }

    /// Queue `value` under `label`, returning the new depth
    ///
    /// # Errors
    /// `BackpressureOverflow` if the label already holds `limit` values.
    pub fn push(&mut self, label: L, value: T) -> Result<usize, SyncError> {
        let limit = self.limit;
        let queue = self
            .queues
            .entry(label.clone())
            .or_insert_with(|| LabelQueue::new(limit));

        if queue.push(value).is_err() {
            return Err(SyncError::backpressure_overflow(&label, limit));
        }
        Ok(queue.len())
    }

    /// Whether every label of `labels` has a buffered value
    pub fn covers(&self, labels: &LabelSet<L>) -> bool {
        labels.all(|label| self.depth(label) > 0)
    }

    /// Pop one front value from every present label
    ///
    /// Labels whose queue empties stop being present.
    pub fn take_round(&mut self) -> HashMap<L, T> {
        self.queues
            .iter_mut()
            .filter_map(|(label, queue)| queue.pop().map(|value| (label.clone(), value)))
            .collect()
    }

    pub fn depth(&self, label: &L) -> usize {
        self.queues.get(label).map(LabelQueue::len).unwrap_or(0)
    }

    /// Labels with at least one buffered value
    pub fn present_labels(&self) -> Vec<L> {
        self.queues
            .iter()
            .filter(|(_, queue)| !queue.is_empty())
            .map(|(label, _)| label.clone())
            .collect()
    }

    /// Total buffered values across all labels
    pub fn buffered(&self) -> usize {
        self.queues.values().map(LabelQueue::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.values().all(LabelQueue::is_empty)
    }

    /// Deepest any queue has been
    pub fn high_water(&self) -> usize {
        self.queues
            .values()
            .map(LabelQueue::high_water)
            .max()
            .unwrap_or(0)
    }

    /// Discard queues of labels no longer in `labels`, returning them
    pub fn prune(&mut self, labels: &LabelSet<L>) -> Vec<L> {
        let removed: Vec<L> = self
            .queues
            .keys()
            .filter(|label| !labels.contains(*label))
            .cloned()
            .collect();
        for label in &removed {
            self.queues.remove(label);
        }
        removed
    }

    /// Drop all buffered values, returning how many were discarded
    pub fn clear(&mut self) -> usize {
        self.queues.values_mut().map(LabelQueue::clear).sum()
    }
}
