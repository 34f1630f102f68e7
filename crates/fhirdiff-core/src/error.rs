use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Errors that abort a comparison.
///
/// Schema resolution failures are never recovered: without field
/// descriptors for a type the engine cannot expand it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiffError {
    /// A type name was requested that the schema registry does not define.
    #[error("unknown type `{type_name}` at `{path}`")]
    UnknownType {
        /// The type name that could not be resolved.
        type_name: String,
        /// Dot-joined label of the node that requested it.
        path: String,
    },
    /// A schema table could not be parsed or is internally inconsistent.
    #[error("invalid schema: {detail}")]
    InvalidSchema {
        /// Human-readable description of the problem.
        detail: String,
    },
    /// A configuration value is outside its permitted range.
    #[error("invalid config: {detail}")]
    InvalidConfig {
        /// Which setting is wrong and why.
        detail: String,
    },
    /// A bundle member has no `resourceType`.
    #[error("resource at index {index} has no resourceType")]
    MissingResourceType {
        /// Zero-based position of the resource in its bundle.
        index: usize,
    },
}

/// Non-fatal conditions encountered while building a diff tree.
///
/// Each warning is recorded on the tree and emitted once through `tracing`;
/// the offending field contributes nothing further to the score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiffWarning {
    /// A schema field whose declared type is neither leaf, struct, nor array.
    UnclassifiedField {
        /// Label of the node owning the field.
        path: String,
        /// Field key.
        key: String,
        /// Declared type as reported by the schema.
        declared_type: String,
    },
    /// A struct-typed field held a non-object value on at least one side.
    NonObjectValue {
        /// Label of the struct node.
        path: String,
    },
    /// An array-typed field held a non-array value on at least one side.
    NonArrayValue {
        /// Label of the owning node.
        path: String,
        /// Field key.
        key: String,
    },
}

impl fmt::Display for DiffWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnclassifiedField {
                path,
                key,
                declared_type,
            } => write!(
                f,
                "{path}: field `{key}` has unclassified type `{declared_type}`; not scored"
            ),
            Self::NonObjectValue { path } => {
                write!(f, "{path}: expected an object, found a scalar value")
            }
            Self::NonArrayValue { path, key } => {
                write!(f, "{path}: field `{key}` expected an array; treating as one item")
            }
        }
    }
}
