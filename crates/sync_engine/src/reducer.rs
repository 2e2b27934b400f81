//! The synchronizer as a reduction step.

use contracts::{Label, Reducer, Step, SyncError, SyncedTuple};

use crate::engine::TupleSynchronizer;

/// Reducer over raw values feeding a downstream reducer of tuples.
///
/// `step` routes each value through the synchronizer and forwards every
/// emitted tuple to `downstream.step`. `complete` runs the synchronizer's
/// flush, then `downstream.complete` exactly once.
pub struct Synchronize<L, T, K, R> {
    sync: TupleSynchronizer<L, T, K>,
    downstream: R,
}

impl<L, T, K, R> Synchronize<L, T, K, R>
where
    L: Label,
    T: Clone,
    K: FnMut(&T) -> L,
    R: Reducer<SyncedTuple<L, T>>,
{
    pub fn new(sync: TupleSynchronizer<L, T, K>, downstream: R) -> Self {
        Self { sync, downstream }
    }

    pub fn synchronizer(&self) -> &TupleSynchronizer<L, T, K> {
        &self.sync
    }

    pub fn into_parts(self) -> (TupleSynchronizer<L, T, K>, R) {
        (self.sync, self.downstream)
    }
}

impl<L, T, K, R> Reducer<T> for Synchronize<L, T, K, R>
where
    L: Label,
    T: Clone,
    K: FnMut(&T) -> L,
    R: Reducer<SyncedTuple<L, T>>,
{
    type Acc = R::Acc;

    fn init(&mut self) -> R::Acc {
        self.downstream.init()
    }

    fn step(&mut self, acc: R::Acc, input: T) -> Result<Step<R::Acc>, SyncError> {
        let Self { sync, downstream } = self;
        sync.ingest_with(acc, input, |acc, tuple| downstream.step(acc, tuple))
    }

    fn complete(&mut self, acc: R::Acc) -> Result<R::Acc, SyncError> {
        let Self { sync, downstream } = self;
        let acc = sync.complete_with(acc, |acc, tuple| downstream.step(acc, tuple))?;
        downstream.complete(acc)
    }
}
