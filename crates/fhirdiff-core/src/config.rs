//! Tunable parameters for record and bundle comparison.
//!
//! Both structs implement [`Default`] with the values used for benchmark
//! scoring and deserialize from JSON with every field optional, so a config
//! file only needs to name what it overrides.
use serde::{Deserialize, Serialize};

use crate::error::DiffError;

/// Arrays of at most this many items are aligned by exhaustive search.
pub const DEFAULT_MAX_EXACT_ARRAY_LEN: usize = 7;

/// Upper bound on `max_exact_array_len`; 9! candidate orders per array.
pub const MAX_EXACT_ARRAY_LEN_LIMIT: usize = 9;

/// Characters of a `date-time` leaf kept before comparison (minute precision).
pub const DEFAULT_DATETIME_PREFIX_LEN: usize = 16;

/// Minimum accuracy for two bundle resources to be considered the same.
pub const DEFAULT_MIN_SIMILARITY: f64 = 0.6;

/// Configuration of the tree-diff engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiffConfig {
    /// Arrays at or below this length use exact permutation search; longer
    /// arrays use greedy matching.
    pub max_exact_array_len: usize,
    /// Number of leading characters of `date-time` values compared.
    pub datetime_prefix_len: usize,
    /// Leaf keys that never contribute to scoring.
    pub ignored_keys: Vec<String>,
    /// Leaf keys of the form `Type/identifier`, compared on `Type` only.
    pub reference_keys: Vec<String>,
    /// Fold a structural validity check of the predicted value into the
    /// score of every node that carries a `resourceType`.
    pub validate_resources: bool,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            max_exact_array_len: DEFAULT_MAX_EXACT_ARRAY_LEN,
            datetime_prefix_len: DEFAULT_DATETIME_PREFIX_LEN,
            ignored_keys: vec!["id".to_owned()],
            reference_keys: vec!["reference".to_owned()],
            validate_resources: true,
        }
    }
}

impl DiffConfig {
    /// Checks that every setting is within its permitted range.
    ///
    /// # Errors
    ///
    /// Returns [`DiffError::InvalidConfig`] if `max_exact_array_len` exceeds
    /// [`MAX_EXACT_ARRAY_LEN_LIMIT`].
    pub fn validate(&self) -> Result<(), DiffError> {
        if self.max_exact_array_len > MAX_EXACT_ARRAY_LEN_LIMIT {
            return Err(DiffError::InvalidConfig {
                detail: format!(
                    "max_exact_array_len is {}, at most {MAX_EXACT_ARRAY_LEN_LIMIT} is allowed",
                    self.max_exact_array_len
                ),
            });
        }
        Ok(())
    }

    /// Returns `true` if leaves under `key` are excluded from scoring.
    pub fn is_ignored(&self, key: &str) -> bool {
        self.ignored_keys.iter().any(|k| k == key)
    }

    /// Returns `true` if leaves under `key` are compared on their type prefix.
    pub fn is_reference(&self, key: &str) -> bool {
        self.reference_keys.iter().any(|k| k == key)
    }
}

/// Configuration of the bundle-level aligner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BundleConfig {
    /// Pairs scoring below this accuracy are never mapped to each other.
    pub min_similarity: f64,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            min_similarity: DEFAULT_MIN_SIMILARITY,
        }
    }
}
