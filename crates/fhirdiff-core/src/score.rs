//! Additive leaf tally for a diff node and its subtree.
//!
//! Every leaf comparison produces a [`ScoreTally`] counting zero or one leaf;
//! container nodes hold the element-wise sum of their children. The derived
//! ratios return `None` whenever their denominator is zero, so an empty
//! subtree is never reported as perfectly right or perfectly wrong.
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

/// Outcome counts for a set of compared leaves.
///
/// Produced per leaf and summed upward through the diff tree. For any tally
/// built purely by aggregation, `leaves == matches + additions + deletions +
/// modifications` holds; see [`ScoreTally::is_conserved`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScoreTally {
    /// Number of leaves counted.
    pub leaves: usize,
    /// Leaves present and equal on both sides ("true positives").
    pub matches: usize,
    /// Leaves present only in the predicted record ("hallucinations").
    pub additions: usize,
    /// Leaves present only in the reference record ("missing").
    pub deletions: usize,
    /// Leaves present on both sides with different values ("mistakes").
    pub modifications: usize,
    /// Structural validity of the predicted record, when it was checked.
    pub is_valid: Option<bool>,
}

impl ScoreTally {
    /// The empty tally: no leaves, validity unknown.
    pub const ZERO: Self = Self {
        leaves: 0,
        matches: 0,
        additions: 0,
        deletions: 0,
        modifications: 0,
        is_valid: None,
    };

    /// One matched leaf.
    pub const fn matched() -> Self {
        Self {
            leaves: 1,
            matches: 1,
            ..Self::ZERO
        }
    }

    /// One leaf present only in the predicted record.
    pub const fn added() -> Self {
        Self {
            leaves: 1,
            additions: 1,
            ..Self::ZERO
        }
    }

    /// One leaf present only in the reference record.
    pub const fn deleted() -> Self {
        Self {
            leaves: 1,
            deletions: 1,
            ..Self::ZERO
        }
    }

    /// One leaf present on both sides with different values.
    pub const fn modified() -> Self {
        Self {
            leaves: 1,
            modifications: 1,
            ..Self::ZERO
        }
    }

    /// Fraction of leaves that matched, or `None` when no leaves were counted.
    pub fn accuracy(&self) -> Option<f64> {
        ratio(self.matches, self.leaves)
    }

    /// Fraction of predicted leaves that were correct.
    ///
    /// Denominator: `matches + additions + modifications`.
    pub fn precision(&self) -> Option<f64> {
        ratio(
            self.matches,
            self.matches + self.additions + self.modifications,
        )
    }

    /// Fraction of reference leaves that were reproduced.
    ///
    /// Denominator: `matches + deletions + modifications`.
    pub fn recall(&self) -> Option<f64> {
        ratio(
            self.matches,
            self.matches + self.deletions + self.modifications,
        )
    }

    /// Returns `true` if the outcome counts add up to the leaf count.
    pub fn is_conserved(&self) -> bool {
        self.leaves == self.matches + self.additions + self.deletions + self.modifications
    }

    /// Returns `true` if no leaf was counted.
    pub fn is_empty(&self) -> bool {
        self.leaves == 0
    }

    /// Element-wise sum of two tallies.
    ///
    /// Validity combines as a logical AND over the operands whose validity is
    /// known; an unknown operand leaves the other side's value untouched.
    pub fn combine(self, other: Self) -> Self {
        Self {
            leaves: self.leaves + other.leaves,
            matches: self.matches + other.matches,
            additions: self.additions + other.additions,
            deletions: self.deletions + other.deletions,
            modifications: self.modifications + other.modifications,
            is_valid: combine_validity(self.is_valid, other.is_valid),
        }
    }

    /// Returns this tally with `valid` folded into its validity flag.
    pub fn with_validity(self, valid: bool) -> Self {
        Self {
            is_valid: combine_validity(self.is_valid, Some(valid)),
            ..self
        }
    }
}

fn ratio(numerator: usize, denominator: usize) -> Option<f64> {
    if denominator == 0 {
        None
    } else {
        Some(numerator as f64 / denominator as f64)
    }
}

fn combine_validity(a: Option<bool>, b: Option<bool>) -> Option<bool> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a && b),
        (Some(v), None) | (None, Some(v)) => Some(v),
        (None, None) => None,
    }
}

impl Add for ScoreTally {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.combine(rhs)
    }
}

/// Adding "no tally" is a no-op, which lets heterogeneous child sequences be
/// folded without special-casing the missing entries.
impl Add<Option<ScoreTally>> for ScoreTally {
    type Output = Self;

    fn add(self, rhs: Option<ScoreTally>) -> Self {
        match rhs {
            Some(rhs) => self.combine(rhs),
            None => self,
        }
    }
}

impl AddAssign for ScoreTally {
    fn add_assign(&mut self, rhs: Self) {
        *self = self.combine(rhs);
    }
}

impl Sum for ScoreTally {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Self::combine)
    }
}

impl<'a> Sum<&'a ScoreTally> for ScoreTally {
    fn sum<I: Iterator<Item = &'a ScoreTally>>(iter: I) -> Self {
        iter.copied().fold(Self::ZERO, Self::combine)
    }
}

impl fmt::Display for ScoreTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} leaves: {} matched, {} added, {} deleted, {} modified; accuracy {}",
            self.leaves,
            self.matches,
            self.additions,
            self.deletions,
            self.modifications,
            format_ratio(self.accuracy())
        )?;
        match self.is_valid {
            Some(true) => f.write_str(" (valid)"),
            Some(false) => f.write_str(" (invalid)"),
            None => Ok(()),
        }
    }
}

/// Formats an optional ratio with three decimals, or `n/a` when undefined.
pub fn format_ratio(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.3}"),
        None => "n/a".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;

    fn tally(matches: usize, additions: usize, deletions: usize, modifications: usize) -> ScoreTally {
        ScoreTally {
            leaves: matches + additions + deletions + modifications,
            matches,
            additions,
            deletions,
            modifications,
            is_valid: None,
        }
    }

    #[test]
    fn zero_tally_has_no_ratios() {
        let t = ScoreTally::ZERO;
        assert_eq!(t.accuracy(), None);
        assert_eq!(t.precision(), None);
        assert_eq!(t.recall(), None);
        assert!(t.is_empty());
        assert!(t.is_conserved());
    }

    #[test]
    fn precision_undefined_when_only_deletions() {
        let t = tally(0, 0, 3, 0);
        assert_eq!(t.precision(), None);
        assert_eq!(t.recall(), Some(0.0));
        assert_eq!(t.accuracy(), Some(0.0));
    }

    #[test]
    fn recall_undefined_when_only_additions() {
        let t = tally(0, 2, 0, 0);
        assert_eq!(t.recall(), None);
        assert_eq!(t.precision(), Some(0.0));
        assert_eq!(t.accuracy(), Some(0.0));
    }

    #[test]
    fn ratios_use_coherent_denominators() {
        let t = tally(6, 1, 2, 1);
        assert_eq!(t.accuracy(), Some(0.6));
        // 6 / (6 + 1 + 1)
        assert_eq!(t.precision(), Some(0.75));
        // 6 / (6 + 2 + 1), not 6 / (6 + 2 + 2)
        let recall = t.recall().expect("recall defined");
        assert!((recall - 6.0 / 9.0).abs() < 1e-12);
    }

    #[test]
    fn single_leaf_constructors_are_conserved() {
        for t in [
            ScoreTally::matched(),
            ScoreTally::added(),
            ScoreTally::deleted(),
            ScoreTally::modified(),
        ] {
            assert_eq!(t.leaves, 1);
            assert!(t.is_conserved());
        }
    }

    #[test]
    fn addition_is_element_wise() {
        let sum = tally(1, 2, 3, 4) + tally(10, 20, 30, 40);
        assert_eq!(sum, tally(11, 22, 33, 44));
    }

    #[test]
    fn adding_nothing_is_a_no_op() {
        let t = tally(1, 0, 1, 0);
        assert_eq!(t + None, t);
        assert_eq!(t + Some(ScoreTally::matched()), tally(2, 0, 1, 0));
    }

    #[test]
    fn sum_over_references_and_values_agree() {
        let parts = vec![ScoreTally::matched(), ScoreTally::deleted(), ScoreTally::added()];
        let by_ref: ScoreTally = parts.iter().sum();
        let by_value: ScoreTally = parts.into_iter().sum();
        assert_eq!(by_ref, by_value);
        assert_eq!(by_ref, tally(1, 1, 1, 0));
    }

    #[test]
    fn validity_combines_as_and_over_known_values() {
        let valid = ScoreTally::ZERO.with_validity(true);
        let invalid = ScoreTally::ZERO.with_validity(false);
        assert_eq!((valid + valid).is_valid, Some(true));
        assert_eq!((valid + invalid).is_valid, Some(false));
        assert_eq!((ScoreTally::ZERO + valid).is_valid, Some(true));
        assert_eq!((invalid + ScoreTally::ZERO).is_valid, Some(false));
        assert_eq!((ScoreTally::ZERO + ScoreTally::ZERO).is_valid, None);
    }

    #[test]
    fn display_reports_undefined_accuracy() {
        let s = ScoreTally::ZERO.to_string();
        assert!(s.contains("n/a"), "display: {s}");
        let s = ScoreTally::matched().with_validity(false).to_string();
        assert!(s.contains("1.000"), "display: {s}");
        assert!(s.contains("invalid"), "display: {s}");
    }
}
