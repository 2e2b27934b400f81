//! Latest-value tuple for the unbounded mode.
//!
//! Holds at most one value per label; a newer value for the same label
//! replaces the older one.

use std::collections::HashMap;

use contracts::{EmitTrigger, Label, LabelSet};

#[derive(Debug)]
pub struct LatestTuple<L, T> {
    current: HashMap<L, T>,
}

impl<L: Label, T: Clone> LatestTuple<L, T> {
    pub fn new() -> Self {
        Self {
            current: HashMap::new(),
        }
    }

    /// Store `value` as the latest for `label`
    ///
    /// Returns `true` if an older value was replaced.
    #[inline]
    pub fn insert(&mut self, label: L, value: T) -> bool {
        self.current.insert(label, value).is_some()
    }

    /// Whether an emission is due, and why
    ///
    /// A tuple covering every required label is always `AllPresent`, even
    /// when `merge_only` is set.
    pub fn ready(&self, labels: &LabelSet<L>, merge_only: bool) -> Option<EmitTrigger> {
        if self.current.is_empty() {
            return None;
        }
        if labels.all(|label| self.current.contains_key(label)) {
            Some(EmitTrigger::AllPresent)
        } else if merge_only {
            Some(EmitTrigger::MergeOnly)
        } else {
            None
        }
    }

    /// Snapshot for emission
    ///
    /// With `reset` the tuple is moved out and the state starts empty;
    /// otherwise the values stay and later updates build on them.
    pub fn emit(&mut self, reset: bool) -> HashMap<L, T> {
        if reset {
            std::mem::take(&mut self.current)
        } else {
            self.current.clone()
        }
    }

    /// Move the current values out, leaving the state empty
    pub fn take(&mut self) -> HashMap<L, T> {
        std::mem::take(&mut self.current)
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    pub fn present_labels(&self) -> Vec<L> {
        self.current.keys().cloned().collect()
    }

    /// Forget values of labels no longer in `labels`, returning them
    pub fn prune(&mut self, labels: &LabelSet<L>) -> Vec<L> {
        let removed: Vec<L> = self
            .current
            .keys()
            .filter(|label| !labels.contains(*label))
            .cloned()
            .collect();
        for label in &removed {
            self.current.remove(label);
        }
        removed
    }

    pub fn clear(&mut self) -> usize {
        let dropped = self.current.len();
        self.current.clear();
        dropped
    }
}

impl<L: Label, T: Clone> Default for LatestTuple<L, T> {
    fn default() -> Self {
        Self::new()
    }
}
