//! Synthetic FHIR record generator and benchmark utilities for fhirdiff.
//!
//! This crate provides deterministic generation of reference bundles and
//! noisy predictions of them for benchmarking and property-based testing
//! of `fhirdiff-core`.

use std::path::PathBuf;

pub mod correctness;
pub mod generator;

pub use generator::{GeneratorConfig, SizeTier, generate_bundle, generate_pair, perturb};

/// Returns the path where the generated NDJSON pair corpus is stored.
///
/// The file lives under `target/bench-fixtures/pairs.ndjson` so it is
/// gitignored and shared between the generator binary and ad-hoc runs of
/// `fhirdiff batch`.
pub fn pairs_fixture_path() -> PathBuf {
    let manifest = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest
        .join("..")
        .join("..")
        .join("target")
        .join("bench-fixtures")
        .join("pairs.ndjson")
}
