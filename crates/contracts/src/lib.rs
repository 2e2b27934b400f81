//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the workspace.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Model
//! - Values carry a label extracted by a key function
//! - A shared [`LabelSet`] decides which labels take part in synchronization
//! - Synchronized output is a [`SyncedTuple`], delivered through the
//!   three-operation [`Reducer`] protocol

mod blueprint;
mod error;
mod label_id;
mod label_set;
mod reducer;
mod sync_options;
mod tuple;

pub use blueprint::*;
pub use error::*;
pub use label_id::LabelId;
pub use label_set::{Label, LabelSet};
pub use reducer::{reduce, Collect, Reducer, Step};
pub use sync_options::*;
pub use tuple::*;
