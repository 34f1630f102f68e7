//! Pairing of array items before they are compared.
use std::cmp::Ordering;

use serde::Serialize;

use crate::config::MAX_EXACT_ARRAY_LEN_LIMIT;
use crate::record::{Record, ValueKind};
use crate::score::ScoreTally;

/// Accuracy assigned to item pairs that may never be matched.
pub const INCOMPATIBLE: f64 = -1.0;

/// How an alignment was computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignStrategy {
    /// Zero or one item per side; nothing to search.
    Trivial,
    /// Every permutation of the predicted items was scored.
    Exact,
    /// Pairs were taken greedily from the accuracy matrix.
    Greedy,
}

/// A one-to-one pairing of true and predicted array positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alignment {
    /// `order[i]` is the predicted index paired with true index `i`.
    pub order: Vec<usize>,
    /// Strategy that produced `order`.
    pub strategy: AlignStrategy,
}

/// Returns `true` if two array items may be paired.
///
/// Objects pair when their `resourceType`s agree or both lack one; wrapper
/// objects without a type of their own (bundle entries) are compared on the
/// type of their nested `resource`. Arrays pair with arrays, strings with
/// strings, numbers and booleans with each other. An absent item pairs with
/// nothing.
pub fn are_same_types(a: Record<'_>, b: Record<'_>) -> bool {
    let (Some(a), Some(b)) = (a.kind(), b.kind()) else {
        return false;
    };
    match (a, b) {
        (
            ValueKind::Object {
                resource_type: ta,
                nested_type: na,
            },
            ValueKind::Object {
                resource_type: tb,
                nested_type: nb,
            },
        ) => {
            if ta.is_none() && tb.is_none() {
                na == nb
            } else {
                ta == tb
            }
        }
        (ValueKind::Array, ValueKind::Array)
        | (ValueKind::String, ValueKind::String)
        | (ValueKind::Scalar, ValueKind::Scalar) => true,
        (
            ValueKind::Object { .. }
            | ValueKind::Array
            | ValueKind::String
            | ValueKind::Scalar
            | ValueKind::Null,
            _,
        ) => false,
    }
}

/// Pads the shorter list with absent records so both have equal length.
///
/// Real items are never dropped or reordered.
pub fn pad_to_equal_len<'a>(
    mut true_items: Vec<Record<'a>>,
    mut pred_items: Vec<Record<'a>>,
) -> (Vec<Record<'a>>, Vec<Record<'a>>) {
    let len = true_items.len().max(pred_items.len());
    true_items.resize(len, Record::absent());
    pred_items.resize(len, Record::absent());
    (true_items, pred_items)
}

/// Finds the pairing of two item lists to score.
///
/// The shorter list is padded with absent records first, so `order` covers
/// the longer length. Lists of at most `max_exact_len` items (capped at
/// [`MAX_EXACT_ARRAY_LEN_LIMIT`]) are solved exactly by trying every permutation of the predicted list; longer lists
/// are aligned greedily. The `score` callback receives the true index and
/// one (true, predicted) pair, and must be pure.
///
/// # Errors
///
/// Propagates the first error returned by `score`.
pub fn align<'a, E>(
    true_items: &[Record<'a>],
    pred_items: &[Record<'a>],
    max_exact_len: usize,
    mut score: impl FnMut(usize, Record<'a>, Record<'a>) -> Result<ScoreTally, E>,
) -> Result<Alignment, E> {
    let (true_items, pred_items) = pad_to_equal_len(true_items.to_vec(), pred_items.to_vec());
    let n = true_items.len();
    if n <= 1 {
        return Ok(Alignment {
            order: (0..n).collect(),
            strategy: AlignStrategy::Trivial,
        });
    }

    let mut matrix = Vec::with_capacity(n * n);
    for (i, &t) in true_items.iter().enumerate() {
        for &p in &pred_items {
            matrix.push(score(i, t, p)?);
        }
    }

    if n <= max_exact_len.min(MAX_EXACT_ARRAY_LEN_LIMIT) {
        tracing::debug!(len = n, "aligning array by exhaustive search");
        Ok(Alignment {
            order: best_permutation(&matrix, n),
            strategy: AlignStrategy::Exact,
        })
    } else {
        tracing::debug!(len = n, "aligning array greedily");
        let accuracy: Vec<f64> = matrix
            .iter()
            .enumerate()
            .map(|(idx, tally)| {
                if are_same_types(true_items[idx / n], pred_items[idx % n]) {
                    tally.accuracy().unwrap_or(0.0)
                } else {
                    INCOMPATIBLE
                }
            })
            .collect();
        Ok(Alignment {
            order: greedy_order(&accuracy, n),
            strategy: AlignStrategy::Greedy,
        })
    }
}

// ---------------------------------------------------------------------------
// Exact search
// ---------------------------------------------------------------------------

/// Total order on candidate tallies; `Greater` means `a` is the better pairing.
///
/// Ranks by defined accuracy, then accuracy, more matches, fewer leaves, fewer
/// modifications, fewer deletions. Two tallies that rank equal have identical
/// counts, so the chosen score never depends on the input order.
pub fn rank_tallies(a: &ScoreTally, b: &ScoreTally) -> Ordering {
    let defined = (a.leaves > 0).cmp(&(b.leaves > 0));
    // a.matches / a.leaves vs b.matches / b.leaves without division.
    let accuracy = if a.leaves > 0 && b.leaves > 0 {
        (a.matches * b.leaves).cmp(&(b.matches * a.leaves))
    } else {
        Ordering::Equal
    };
    defined
        .then(accuracy)
        .then(a.matches.cmp(&b.matches))
        .then(b.leaves.cmp(&a.leaves))
        .then(b.modifications.cmp(&a.modifications))
        .then(b.deletions.cmp(&a.deletions))
}

/// Returns the permutation of predicted indices with the best summed tally.
///
/// Permutations are visited in lexicographic order starting from the
/// identity; only a strictly better candidate replaces the current best.
fn best_permutation(matrix: &[ScoreTally], n: usize) -> Vec<usize> {
    let total = |perm: &[usize]| -> ScoreTally {
        perm.iter()
            .enumerate()
            .map(|(t, &p)| matrix[t * n + p])
            .sum()
    };

    let mut perm: Vec<usize> = (0..n).collect();
    let mut best = perm.clone();
    let mut best_score = total(&perm);
    while next_permutation(&mut perm) {
        let candidate = total(&perm);
        if rank_tallies(&candidate, &best_score) == Ordering::Greater {
            best.clone_from(&perm);
            best_score = candidate;
        }
    }
    best
}

/// Advances `perm` to the next lexicographic permutation.
///
/// Returns `false` once `perm` is the last permutation.
fn next_permutation(perm: &mut [usize]) -> bool {
    let Some(pivot) = perm.windows(2).rposition(|w| w[0] < w[1]) else {
        return false;
    };
    let Some(swap) = perm.iter().rposition(|&x| x > perm[pivot]) else {
        return false;
    };
    perm.swap(pivot, swap);
    perm[pivot + 1..].reverse();
    true
}

// ---------------------------------------------------------------------------
// Greedy matching
// ---------------------------------------------------------------------------

/// Greedy one-to-one assignment over a row-major `n x n` accuracy matrix.
///
/// Repeatedly takes the highest remaining pair; ties go to the lowest true
/// index, then the lowest predicted index.
fn greedy_order(accuracy: &[f64], n: usize) -> Vec<usize> {
    let mut pairs: Vec<(usize, usize, f64)> = (0..n)
        .flat_map(|t| (0..n).map(move |p| (t, p, accuracy[t * n + p])))
        .collect();
    // Stable: equal accuracies keep row-major order.
    pairs.sort_by(|a, b| b.2.total_cmp(&a.2));

    let mut true_used = vec![false; n];
    let mut pred_used = vec![false; n];
    let mut order = vec![0; n];
    for (t, p, _) in pairs {
        if true_used[t] || pred_used[p] {
            continue;
        }
        true_used[t] = true;
        pred_used[p] = true;
        order[t] = p;
    }
    order
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use std::convert::Infallible;

    use serde_json::{Value, json};

    use super::*;

    fn records(values: &[Value]) -> Vec<Record<'_>> {
        values.iter().map(Record::present).collect()
    }

    #[test]
    fn same_type_rules() {
        let obs = json!({"resourceType": "Observation"});
        let cond = json!({"resourceType": "Condition"});
        let plain = json!({"system": "x"});
        let entry_obs = json!({"resource": {"resourceType": "Observation"}});
        let entry_cond = json!({"resource": {"resourceType": "Condition"}});
        fn r(v: &Value) -> Record<'_> {
            Record::present(v)
        }

        assert!(are_same_types(r(&obs), r(&obs)));
        assert!(!are_same_types(r(&obs), r(&cond)));
        assert!(!are_same_types(r(&obs), r(&plain)));
        assert!(are_same_types(r(&plain), r(&json!({"code": "y"}))));
        assert!(are_same_types(r(&entry_obs), r(&entry_obs)));
        assert!(!are_same_types(r(&entry_obs), r(&entry_cond)));
        assert!(are_same_types(r(&json!([1])), r(&json!([]))));
        assert!(are_same_types(r(&json!("a")), r(&json!("b"))));
        assert!(are_same_types(r(&json!(1)), r(&json!(2.5))));
        assert!(are_same_types(r(&json!(1)), r(&json!(true))));
        assert!(!are_same_types(r(&json!("1")), r(&json!(1))));
        assert!(!are_same_types(Record::absent(), r(&obs)));
        assert!(!are_same_types(Record::absent(), Record::absent()));
    }

    #[test]
    fn padding_keeps_items_in_place() {
        let values = [json!(1), json!(2), json!(3)];
        let (t, p) = pad_to_equal_len(records(&values), records(&values[..1]));
        assert_eq!(t.len(), 3);
        assert_eq!(p.len(), 3);
        assert_eq!(p[0].value(), Some(&json!(1)));
        assert!(p[1].is_absent() && p[2].is_absent());
    }

    #[test]
    fn next_permutation_visits_all() {
        let mut perm = vec![0, 1, 2, 3];
        let mut count = 1;
        while next_permutation(&mut perm) {
            count += 1;
        }
        assert_eq!(count, 24);
        assert_eq!(perm, vec![3, 2, 1, 0]);
    }

    #[test]
    fn rank_prefers_defined_then_accuracy_then_matches() {
        let undefined = ScoreTally::ZERO;
        let zero = ScoreTally::deleted();
        assert_eq!(rank_tallies(&zero, &undefined), Ordering::Greater);

        let half = ScoreTally::matched() + ScoreTally::deleted();
        let two_of_four = half + half;
        assert_eq!(rank_tallies(&two_of_four, &half), Ordering::Greater);
        assert_eq!(rank_tallies(&ScoreTally::matched(), &two_of_four), Ordering::Greater);
        assert_eq!(rank_tallies(&half, &half), Ordering::Equal);
    }

    #[test]
    fn exact_alignment_finds_reversed_order() {
        let t = [json!("a"), json!("b"), json!("c")];
        let p = [json!("c"), json!("b"), json!("a")];
        let (t, p) = (records(&t), records(&p));
        let alignment = align(&t, &p, 7, |_, a, b| {
            Ok::<_, Infallible>(if a == b {
                ScoreTally::matched()
            } else {
                ScoreTally::modified()
            })
        })
        .expect("infallible");
        assert_eq!(alignment.strategy, AlignStrategy::Exact);
        assert_eq!(alignment.order, vec![2, 1, 0]);
    }

    #[test]
    fn exact_alignment_keeps_identity_on_ties() {
        let t = [json!("x"), json!("x")];
        let (t, p) = (records(&t), records(&t));
        let alignment =
            align(&t, &p, 7, |_, _, _| Ok::<_, Infallible>(ScoreTally::modified())).expect("ok");
        assert_eq!(alignment.order, vec![0, 1]);
    }

    #[test]
    fn greedy_takes_best_pairs_first() {
        // Row-major 3x3: true 0 best matches pred 2, true 1 -> pred 0.
        let acc = [
            0.1, 0.2, 0.9, //
            0.8, 0.3, 0.1, //
            0.5, 0.4, 0.0,
        ];
        assert_eq!(greedy_order(&acc, 3), vec![2, 0, 1]);
    }

    #[test]
    fn greedy_ties_break_on_lowest_true_then_pred() {
        let acc = [0.5; 9];
        assert_eq!(greedy_order(&acc, 3), vec![0, 1, 2]);
        let acc = [
            0.0, 1.0, 1.0, //
            1.0, 0.0, 1.0, //
            1.0, 1.0, 0.0,
        ];
        assert_eq!(greedy_order(&acc, 3), vec![1, 0, 2]);
    }

    #[test]
    fn greedy_pairs_incompatible_items_last() {
        let acc = [
            INCOMPATIBLE, 0.0, //
            0.0, INCOMPATIBLE,
        ];
        assert_eq!(greedy_order(&acc, 2), vec![1, 0]);
    }

    #[test]
    fn long_arrays_use_greedy() {
        let values: Vec<Value> = (0..9).map(|i| json!(i)).collect();
        let t = records(&values);
        let mut p = t.clone();
        p.reverse();
        let alignment = align(&t, &p, 7, |_, a, b| {
            Ok::<_, Infallible>(if a == b {
                ScoreTally::matched()
            } else {
                ScoreTally::modified()
            })
        })
        .expect("ok");
        assert_eq!(alignment.strategy, AlignStrategy::Greedy);
        assert_eq!(alignment.order, (0..9).rev().collect::<Vec<_>>());
    }

    #[test]
    fn exact_bound_cannot_exceed_limit() {
        let values: Vec<Value> = (0..10).map(|i| json!(i)).collect();
        let t = records(&values);
        let alignment =
            align(&t, &t, 13, |_, _, _| Ok::<_, Infallible>(ScoreTally::matched())).expect("ok");
        assert_eq!(alignment.strategy, AlignStrategy::Greedy);
    }

    #[test]
    fn score_errors_propagate() {
        let values = [json!(1), json!(2)];
        let t = records(&values);
        let err = align(&t, &t, 7, |_, _, _| Err::<ScoreTally, _>("boom")).expect_err("fails");
        assert_eq!(err, "boom");
    }

    #[test]
    fn score_sees_each_true_index_per_row() {
        let values = [json!(1), json!(2), json!(3)];
        let t = records(&values);
        let mut seen = Vec::new();
        align(&t, &t[..2], 7, |i, _, _| {
            seen.push(i);
            Ok::<_, Infallible>(ScoreTally::matched())
        })
        .expect("ok");
        assert_eq!(seen, vec![0, 0, 0, 1, 1, 1, 2, 2, 2]);
    }

    #[test]
    fn single_items_are_trivial() {
        let values = [json!(1)];
        let t = records(&values);
        let alignment =
            align(&t, &t, 7, |_, _, _| Err::<ScoreTally, _>("not called")).expect("ok");
        assert_eq!(alignment.strategy, AlignStrategy::Trivial);
        assert_eq!(alignment.order, vec![0]);
    }
}
