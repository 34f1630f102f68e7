//! Schema-driven tree diff of two FHIR records.
//!
//! The engine walks a reference ("true") record and a predicted record in
//! lock-step along the schema of their declared type. Leaves are classified
//! as matched, added, deleted or modified; struct fields recurse; array
//! fields are aligned item-by-item first so that insertion order does not
//! count against the prediction. Every node carries the [`ScoreTally`] of
//! its subtree.
//!
//! The primary entry point is [`compare`]; [`Comparator`] allows a custom
//! configuration or validator.
//!
//! [`ScoreTally`]: crate::score::ScoreTally
pub mod align;
pub mod engine;
pub mod leaf;
pub mod tree;

#[cfg(test)]
mod tests;

pub use align::{AlignStrategy, Alignment, align, are_same_types, pad_to_equal_len};
pub use engine::{Comparator, STRAY_VALUE_KEY, compare, compare_with_config};
pub use leaf::{LeafOutcome, classify_leaf, compare_leaf, values_equal};
pub use tree::{Children, DiffNode, DiffTree, NodeId, make_label};
