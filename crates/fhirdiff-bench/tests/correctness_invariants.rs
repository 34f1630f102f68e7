//! Tally and mapping invariants over generated bundle pairs.
#![allow(clippy::expect_used)]

use fhirdiff_bench::correctness::{check_bundle_invariants, check_tree_invariants};
use fhirdiff_bench::{GeneratorConfig, SizeTier, generate_bundle, generate_pair};
use fhirdiff_core::{BundleConfig, Comparator, SchemaRegistry, bundle_resources, compare_bundles};
use proptest::prelude::*;

fn registry() -> SchemaRegistry {
    SchemaRegistry::fhir_r4b().expect("embedded schema")
}

#[test]
fn identical_bundles_score_perfectly() {
    let schema = registry();
    let comparator = Comparator::new(&schema);
    let bundle = generate_bundle(&SizeTier::Medium.config(42));

    let tree = comparator.compare(&bundle, &bundle, "Bundle").expect("compare");
    check_tree_invariants(&tree).expect("tree invariants");
    let score = tree.score();
    assert_eq!(score.matches, score.leaves);
    assert_eq!(score.accuracy(), Some(1.0));

    let d = compare_bundles(&comparator, &bundle, &bundle, &BundleConfig::default())
        .expect("bundle distance");
    check_bundle_invariants(&d, tier_count(&bundle)).expect("bundle invariants");
    assert_eq!(d.mean_accuracy, Some(1.0));
    assert!(d.resources.iter().all(|r| r.matched.as_deref() == Some(r.key.as_str())));
}

fn tier_count(bundle: &serde_json::Value) -> usize {
    bundle_resources(bundle).len()
}

#[test]
fn shuffling_alone_is_free() {
    let schema = registry();
    let comparator = Comparator::new(&schema);
    let config = GeneratorConfig {
        leaf_noise: 0.0,
        drop_rate: 0.0,
        shuffle: true,
        ..SizeTier::Small.config(9)
    };
    let (t, p) = generate_pair(&config);
    assert_ne!(t, p);
    let d = compare_bundles(&comparator, &t, &p, &BundleConfig::default()).expect("bundle distance");
    assert_eq!(d.mean_accuracy, Some(1.0));
    assert!(d.unmatched_pred.is_empty());
}

#[test]
fn noise_lowers_accuracy() {
    let schema = registry();
    let comparator = Comparator::new(&schema);
    let clean = GeneratorConfig {
        leaf_noise: 0.0,
        drop_rate: 0.0,
        shuffle: false,
        ..SizeTier::Small.config(3)
    };
    let noisy = GeneratorConfig {
        leaf_noise: 0.5,
        ..clean.clone()
    };
    let (t, p) = generate_pair(&clean);
    let clean_acc = comparator.compare(&t, &p, "Bundle").expect("compare").score().accuracy();
    let (t, p) = generate_pair(&noisy);
    let noisy_acc = comparator.compare(&t, &p, "Bundle").expect("compare").score().accuracy();
    assert_eq!(clean_acc, Some(1.0));
    assert!(noisy_acc.expect("accuracy") < 1.0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn noisy_pairs_keep_invariants(seed in 0u64..10_000, noise in 0.0f64..0.6, drop in 0.0f64..0.4) {
        let schema = registry();
        let comparator = Comparator::new(&schema);
        let config = GeneratorConfig {
            leaf_noise: noise,
            drop_rate: drop,
            shuffle: true,
            ..SizeTier::Small.config(seed)
        };
        let (t, p) = generate_pair(&config);

        let tree = comparator.compare(&t, &p, "Bundle").expect("compare");
        prop_assert_eq!(check_tree_invariants(&tree), Ok(()));

        let d = compare_bundles(&comparator, &t, &p, &BundleConfig::default())
            .expect("bundle distance");
        prop_assert_eq!(check_bundle_invariants(&d, tier_count(&p)), Ok(()));
    }
}
