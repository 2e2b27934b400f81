//! # Sync Engine
//!
//! Labeled stream synchronizer.
//!
//! Responsibilities:
//! - Route values into per-label state using a key function
//! - Unbounded-latest mode: keep the newest value per label, emit when every
//!   required label is present (or on every value with `merge_only`)
//! - Bounded-FIFO mode: queue up to `back_pressure` values per label and
//!   drain matched rounds in per-label arrival order
//! - Completion flush policy (`all`, `reset`)
//!
//! ## Usage
//!
//! ```
//! use sync_engine::{LabelSet, SyncOptions, TupleSynchronizer};
//!
//! let labels: LabelSet<char> = ['a', 'b'].into_iter().collect();
//! let key: fn(&(char, u32)) -> char = |v| v.0;
//! let mut sync = TupleSynchronizer::new(labels, SyncOptions::default(), key);
//!
//! assert!(sync.push(('a', 1)).unwrap().is_empty());
//! let tuples = sync.push(('b', 7)).unwrap();
//! assert_eq!(tuples[0].get(&'b'), Some(&('b', 7)));
//! ```

mod buffer;
mod engine;
mod latest;
mod reducer;

pub use buffer::{FifoBuffers, LabelQueue};
pub use engine::{SyncState, SyncStats, TupleSynchronizer};
pub use latest::LatestTuple;
pub use reducer::Synchronize;

// Re-export contracts types
pub use contracts::{
    reduce, BufferMode, Collect, EmitTrigger, Label, LabelSet, Reducer, Step, SyncError,
    SyncOptions, SyncedTuple, TupleMeta,
};

/// Synchronize a finite input in one go, collecting every tuple
///
/// Equivalent to reducing `input` through a [`Synchronize`] over [`Collect`].
pub fn sync_tuples<L, T, K, I>(
    labels: LabelSet<L>,
    options: SyncOptions,
    key: K,
    input: I,
) -> Result<Vec<SyncedTuple<L, T>>, SyncError>
where
    L: Label,
    T: Clone,
    K: FnMut(&T) -> L,
    I: IntoIterator<Item = T>,
{
    let sync = TupleSynchronizer::new(labels, options, key);
    reduce(Synchronize::new(sync, Collect::new()), input)
}
