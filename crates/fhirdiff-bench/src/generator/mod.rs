//! Synthetic FHIR bundle generator.
//!
//! Produces reference bundles of patients with their observations and
//! conditions, and predictions of them with controlled noise, for
//! benchmarking.

pub mod datatypes;
pub mod noise;
pub mod resources;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::{Value, json};

use datatypes::gen_urn_uuid;
pub use noise::perturb;
use resources::{gen_condition, gen_observation, gen_patient};

/// Salt mixed into the seed of the prediction stream.
const PREDICTION_SALT: u64 = 0x5eed_f00d;

/// Configuration for the bundle generator.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Seed for the random number generator (deterministic).
    pub seed: u64,
    pub num_patients: usize,
    pub observations_per_patient: usize,
    pub conditions_per_patient: usize,
    /// At least one name is always generated.
    pub names_per_patient: usize,
    pub telecoms_per_patient: usize,
    pub identifiers_per_resource: usize,
    /// Probability that a predicted leaf differs from the reference (0.0-1.0).
    pub leaf_noise: f64,
    /// Probability that a predicted array item is missing (0.0-1.0).
    pub drop_rate: f64,
    /// Whether predicted arrays, bundle entries included, are reordered.
    pub shuffle: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        SizeTier::Small.config(42)
    }
}

/// Predefined size tiers for benchmarking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeTier {
    /// ~15 resources, ~600 leaves
    Small,
    /// ~130 resources, ~5000 leaves
    Medium,
    /// ~650 resources, ~25000 leaves
    Large,
}

impl SizeTier {
    /// Returns the default `GeneratorConfig` for this size tier.
    pub fn config(self, seed: u64) -> GeneratorConfig {
        match self {
            SizeTier::Small => GeneratorConfig {
                seed,
                num_patients: 3,
                observations_per_patient: 3,
                conditions_per_patient: 1,
                names_per_patient: 1,
                telecoms_per_patient: 2,
                identifiers_per_resource: 1,
                leaf_noise: 0.05,
                drop_rate: 0.05,
                shuffle: true,
            },
            SizeTier::Medium => GeneratorConfig {
                seed,
                num_patients: 15,
                observations_per_patient: 6,
                conditions_per_patient: 2,
                names_per_patient: 2,
                telecoms_per_patient: 4,
                identifiers_per_resource: 2,
                leaf_noise: 0.1,
                drop_rate: 0.05,
                shuffle: true,
            },
            SizeTier::Large => GeneratorConfig {
                seed,
                num_patients: 50,
                observations_per_patient: 8,
                conditions_per_patient: 4,
                names_per_patient: 2,
                telecoms_per_patient: 6,
                identifiers_per_resource: 3,
                leaf_noise: 0.1,
                drop_rate: 0.1,
                shuffle: true,
            },
        }
    }

    /// Number of resources a bundle of this tier holds.
    pub fn resource_count(self) -> usize {
        let c = self.config(0);
        c.num_patients * (1 + c.observations_per_patient + c.conditions_per_patient)
    }
}

/// Generates a reference `Bundle` of type `collection`.
///
/// Each patient is followed by its observations and conditions. All
/// randomness is deterministic, seeded from `config.seed`.
pub fn generate_bundle(config: &GeneratorConfig) -> Value {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut entries = Vec::new();
    for p in 0..config.num_patients {
        let patient_id = format!("pat-{p}");
        entries.push(gen_patient(&mut rng, config, &patient_id));
        for o in 0..config.observations_per_patient {
            let id = format!("obs-{p}-{o}");
            entries.push(gen_observation(&mut rng, config, &id, &patient_id));
        }
        for c in 0..config.conditions_per_patient {
            let id = format!("cond-{p}-{c}");
            entries.push(gen_condition(&mut rng, config, &id, &patient_id));
        }
    }
    let entry: Vec<Value> = entries
        .into_iter()
        .map(|resource| {
            json!({
                "fullUrl": gen_urn_uuid(&mut rng),
                "resource": resource,
            })
        })
        .collect();
    json!({
        "resourceType": "Bundle",
        "type": "collection",
        "entry": entry,
    })
}

/// Generates a reference bundle and a noisy prediction of it.
pub fn generate_pair(config: &GeneratorConfig) -> (Value, Value) {
    let reference = generate_bundle(config);
    let mut rng = StdRng::seed_from_u64(config.seed ^ PREDICTION_SALT);
    let prediction = perturb(&reference, config, &mut rng);
    (reference, prediction)
}
