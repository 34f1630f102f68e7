//! Invariant checkers for comparison results.

use std::collections::HashSet;

use fhirdiff_core::{BundleDistance, DiffTree, ScoreTally};

fn counts(s: &ScoreTally) -> [usize; 5] {
    [s.leaves, s.matches, s.additions, s.deletions, s.modifications]
}

fn ratio_in_range(name: &str, label: &str, r: Option<f64>) -> Result<(), String> {
    match r {
        Some(v) if !(0.0..=1.0).contains(&v) => Err(format!("{label}: {name} {v} out of range")),
        Some(_) | None => Ok(()),
    }
}

/// Verifies the tally invariants of every node of `tree`.
///
/// - every tally is conserved and its ratios lie in `[0, 1]`;
/// - a node with children holds their element-wise sum;
/// - children point back at their parent, one level deeper.
pub fn check_tree_invariants(tree: &DiffTree<'_>) -> Result<(), String> {
    for (id, node) in tree.iter() {
        let s = &node.score;
        if !s.is_conserved() {
            return Err(format!("{}: tally not conserved: {s:?}", node.label));
        }
        ratio_in_range("accuracy", &node.label, s.accuracy())?;
        ratio_in_range("precision", &node.label, s.precision())?;
        ratio_in_range("recall", &node.label, s.recall())?;

        let mut sum = [0usize; 5];
        let mut has_children = false;
        for child_id in node.child_ids() {
            let child = tree
                .get(child_id)
                .ok_or_else(|| format!("{}: dangling child {}", node.label, child_id.index()))?;
            if child.parent != Some(id) {
                return Err(format!("{}: parent link broken", child.label));
            }
            if child.depth != node.depth + 1 {
                return Err(format!("{}: depth {} under {}", child.label, child.depth, node.depth));
            }
            for (acc, v) in sum.iter_mut().zip(counts(&child.score)) {
                *acc += v;
            }
            has_children = true;
        }
        if has_children && sum != counts(s) {
            return Err(format!(
                "{}: children sum to {sum:?}, node holds {:?}",
                node.label,
                counts(s)
            ));
        }
    }
    Ok(())
}

/// Verifies that a bundle mapping is one-to-one and accounts for every
/// predicted resource.
pub fn check_bundle_invariants(d: &BundleDistance, pred_count: usize) -> Result<(), String> {
    let mut seen = HashSet::new();
    for r in &d.resources {
        if !(0.0..=1.0).contains(&r.accuracy) {
            return Err(format!("{}: accuracy {} out of range", r.key, r.accuracy));
        }
        if let Some(m) = &r.matched {
            if !seen.insert(m.as_str()) {
                return Err(format!("{m} mapped twice"));
            }
        }
    }
    if seen.len() + d.unmatched_pred.len() != pred_count {
        return Err(format!(
            "{} mapped + {} unmatched != {pred_count} predicted",
            seen.len(),
            d.unmatched_pred.len()
        ));
    }
    ratio_in_range("mean accuracy", "bundle", d.mean_accuracy)?;
    ratio_in_range("validity ratio", "bundle", d.validity_ratio)
}
