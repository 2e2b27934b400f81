//! SyncedTuple - synchronizer output
//!
//! One value per label, plus metadata describing why it was emitted.

use serde::Serialize;
use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

/// Synchronized tuple
///
/// Maps each represented label to its value. Labels of the required set that
/// are absent from `values` are listed in `meta.missing_labels`.
#[derive(Debug, Clone, Serialize)]
#[serde(bound(serialize = "L: Serialize + Eq + Hash, T: Serialize"))]
pub struct SyncedTuple<L, T> {
    /// Sequence number (monotonically increasing, starts at 1)
    pub tuple_id: u64,

    /// Label -> value
    pub values: HashMap<L, T>,

    /// Emission metadata
    pub meta: TupleMeta<L>,
}

/// Why a tuple was emitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmitTrigger {
    /// Every required label was present
    AllPresent,
    /// `merge_only` emission, labels may be missing
    MergeOnly,
    /// One matched round drained from the bounded queues
    Drain,
    /// Final flush on completion
    Flush,
}

impl EmitTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmitTrigger::AllPresent => "all_present",
            EmitTrigger::MergeOnly => "merge_only",
            EmitTrigger::Drain => "drain",
            EmitTrigger::Flush => "flush",
        }
    }
}

/// Tuple metadata
#[derive(Debug, Clone, Serialize)]
pub struct TupleMeta<L> {
    pub trigger: EmitTrigger,

    /// Required labels without a value in this tuple
    pub missing_labels: Vec<L>,
}

impl<L: Eq + Hash, T> SyncedTuple<L, T> {
    /// Value for `label`, if represented
    pub fn get<Q>(&self, label: &Q) -> Option<&T>
    where
        L: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.values.get(label)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Whether every required label was represented at emission time
    pub fn is_complete(&self) -> bool {
        self.meta.missing_labels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SyncedTuple<&'static str, i32> {
        SyncedTuple {
            tuple_id: 7,
            values: HashMap::from([("a", 1), ("b", 2)]),
            meta: TupleMeta {
                trigger: EmitTrigger::Flush,
                missing_labels: vec!["c"],
            },
        }
    }

    #[test]
    fn test_accessors() {
        let tuple = sample();
        assert_eq!(tuple.get("a"), Some(&1));
        assert_eq!(tuple.len(), 2);
        assert!(!tuple.is_complete());
    }

    #[test]
    fn test_serialize_shape() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["tuple_id"], 7);
        assert_eq!(json["values"]["b"], 2);
        assert_eq!(json["meta"]["trigger"], "flush");
        assert_eq!(json["meta"]["missing_labels"][0], "c");
    }
}
