#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod batch;
pub mod bundle;
pub mod config;
pub mod diff;
pub mod error;
pub mod record;
pub mod report;
pub mod schema;
pub mod score;
pub mod validation;

pub use batch::{BatchSummary, PairFailure, RecordPair, evaluate_pairs};
pub use bundle::{BundleDistance, ResourceMatch, bundle_distance, bundle_resources, compare_bundles};
pub use config::{BundleConfig, DiffConfig, MAX_EXACT_ARRAY_LEN_LIMIT};
pub use diff::{
    AlignStrategy, Alignment, Children, Comparator, DiffNode, DiffTree, LeafOutcome, NodeId,
    compare, compare_with_config,
};
pub use error::{DiffError, DiffWarning};
pub use record::{Record, ValueKind};
pub use report::{Report, ReportRow, TreemapEntry, TypeAccuracy, treemap_entries};
pub use schema::{FieldDescriptor, FieldKind, SchemaRegistry};
pub use score::{ScoreTally, format_ratio};
pub use validation::{ResourceValidator, SchemaValidator, ValidationIssue};

/// Returns the current version of the fhirdiff-core library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
