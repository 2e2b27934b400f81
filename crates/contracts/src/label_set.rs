//! LabelSet - shared set of required labels
//!
//! The set is owned jointly by the code that configures a pipeline and by the
//! synchronizers reading it. Membership is read live: a label added or removed
//! through any handle is observed by the next `ingest`/`complete` call of every
//! synchronizer holding a clone of the handle. Nothing is snapshotted and
//! nothing already emitted is revisited.

use std::borrow::Borrow;
use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Bound satisfied by every type usable as a label.
///
/// `Display` is used to name the label in errors and log fields.
pub trait Label: Eq + Hash + Clone + fmt::Debug + fmt::Display {}

impl<T> Label for T where T: Eq + Hash + Clone + fmt::Debug + fmt::Display {}

/// Shared, mutable handle to the set of allowed labels.
///
/// Cloning the handle shares the underlying set.
pub struct LabelSet<L> {
    inner: Arc<RwLock<HashSet<L>>>,
}

impl<L> Clone for LabelSet<L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<L: Label> Default for LabelSet<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: Label> fmt::Debug for LabelSet<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.read().iter()).finish()
    }
}

impl<L: Label> FromIterator<L> for LabelSet<L> {
    fn from_iter<I: IntoIterator<Item = L>>(iter: I) -> Self {
        Self {
            inner: Arc::new(RwLock::new(iter.into_iter().collect())),
        }
    }
}

impl<L: Label> LabelSet<L> {
    /// Create an empty label set
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    /// Whether `label` is currently allowed
    pub fn contains<Q>(&self, label: &Q) -> bool
    where
        L: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.read().contains(label)
    }

    /// Add a label. Returns `true` if it was not already present.
    pub fn add(&self, label: L) -> bool {
        self.write().insert(label)
    }

    /// Remove a label. Returns `true` if it was present.
    pub fn remove<Q>(&self, label: &Q) -> bool
    where
        L: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.write().remove(label)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Snapshot of the current members, in the set's iteration order
    pub fn labels(&self) -> Vec<L> {
        self.read().iter().cloned().collect()
    }

    /// Whether `pred` holds for every current member
    ///
    /// Vacuously true for an empty set.
    pub fn all<F>(&self, mut pred: F) -> bool
    where
        F: FnMut(&L) -> bool,
    {
        self.read().iter().all(|label| pred(label))
    }

    /// Number of handles sharing this set
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    // Poisoning is ignored: the set holds plain labels.
    fn read(&self) -> RwLockReadGuard<'_, HashSet<L>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashSet<L>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}
