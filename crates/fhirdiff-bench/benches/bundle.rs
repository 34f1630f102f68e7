//! Resource-level bundle mapping.
#![allow(clippy::expect_used)]

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use fhirdiff_bench::{SizeTier, generate_pair};
use fhirdiff_core::{BundleConfig, Comparator, SchemaRegistry, compare_bundles};

fn bench_bundle_distance(c: &mut Criterion) {
    let schema = SchemaRegistry::fhir_r4b().expect("embedded schema");
    let comparator = Comparator::new(&schema);
    let config = BundleConfig::default();
    let mut group = c.benchmark_group("bundle_distance");
    group.sample_size(20);

    for (name, tier) in [
        ("S", SizeTier::Small),
        ("M", SizeTier::Medium),
        ("L", SizeTier::Large),
    ] {
        let pair = generate_pair(&tier.config(42));
        group.throughput(Throughput::Elements(tier.resource_count() as u64));
        group.bench_with_input(BenchmarkId::new("greedy", name), &pair, |b, (t, p)| {
            b.iter(|| {
                compare_bundles(&comparator, t, p, &config)
                    .expect("bundle distance")
                    .mean_accuracy
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_bundle_distance);
criterion_main!(benches);
