//! Classification of a single leaf value pair.
use serde_json::Value;

use crate::config::DiffConfig;
use crate::record::Record;
use crate::schema::DATE_TIME_TYPE;
use crate::score::ScoreTally;

/// Classification of a single leaf pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafOutcome {
    /// Nothing to score: both sides absent, or the key is never scored.
    Skipped,
    /// Present only in the reference record.
    Deleted,
    /// Present only in the predicted record.
    Added,
    /// Present on both sides, unequal after normalization.
    Modified,
    /// Present on both sides, equal after normalization.
    Matched,
}

impl LeafOutcome {
    /// The tally this outcome contributes: zero or one leaf.
    pub fn tally(self) -> ScoreTally {
        match self {
            Self::Skipped => ScoreTally::ZERO,
            Self::Deleted => ScoreTally::deleted(),
            Self::Added => ScoreTally::added(),
            Self::Modified => ScoreTally::modified(),
            Self::Matched => ScoreTally::matched(),
        }
    }
}

/// A leaf value after field-specific normalization.
#[derive(Debug, Clone, Copy)]
enum Normalized<'a> {
    Absent,
    Text(&'a str),
    Other(&'a Value),
}

impl Normalized<'_> {
    fn is_absent(&self) -> bool {
        match self {
            Self::Absent => true,
            Self::Text(s) => s.is_empty(),
            Self::Other(_) => false,
        }
    }
}

fn normalize<'a>(
    value: Record<'a>,
    field_key: &str,
    declared_type: &str,
    config: &DiffConfig,
) -> Normalized<'a> {
    if value.is_absent() {
        return Normalized::Absent;
    }
    let Some(raw) = value.value() else {
        return Normalized::Absent;
    };
    let Some(text) = raw.as_str() else {
        return Normalized::Other(raw);
    };
    let text = if config.is_reference(field_key) {
        text.split_once('/').map_or(text, |(prefix, _)| prefix)
    } else {
        text
    };
    let text = if declared_type == DATE_TIME_TYPE {
        char_prefix(text, config.datetime_prefix_len)
    } else {
        text
    };
    Normalized::Text(text)
}

/// Returns the first `n` characters of `s`.
fn char_prefix(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}

/// Structural equality with numbers compared by value (`1 == 1.0`).
///
/// Strings are compared case-sensitively and values of different JSON kinds
/// are never equal (`"1" != 1`).
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| values_equal(a, b))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(k, a)| y.get(k).is_some_and(|b| values_equal(a, b)))
        }
        _ => a == b,
    }
}

fn normalized_equal(a: Normalized<'_>, b: Normalized<'_>) -> bool {
    match (a, b) {
        (Normalized::Text(x), Normalized::Text(y)) => x == y,
        (Normalized::Other(x), Normalized::Other(y)) => values_equal(x, y),
        (Normalized::Absent, Normalized::Absent) => true,
        (Normalized::Absent | Normalized::Text(_) | Normalized::Other(_), _) => false,
    }
}

/// Classifies a leaf pair.
///
/// Normalization runs before the absence check: keys listed in
/// [`DiffConfig::ignored_keys`] are skipped, keys in
/// [`DiffConfig::reference_keys`] keep only the text before the first `/`,
/// and `date-time` values keep their first
/// [`DiffConfig::datetime_prefix_len`] characters.
pub fn classify_leaf(
    true_value: Record<'_>,
    pred_value: Record<'_>,
    field_key: &str,
    declared_type: &str,
    config: &DiffConfig,
) -> LeafOutcome {
    if config.is_ignored(field_key) {
        return LeafOutcome::Skipped;
    }
    let t = normalize(true_value, field_key, declared_type, config);
    let p = normalize(pred_value, field_key, declared_type, config);
    match (t.is_absent(), p.is_absent()) {
        (true, true) => LeafOutcome::Skipped,
        (false, true) => LeafOutcome::Deleted,
        (true, false) => LeafOutcome::Added,
        (false, false) if normalized_equal(t, p) => LeafOutcome::Matched,
        (false, false) => LeafOutcome::Modified,
    }
}

/// Scores a leaf pair: zero or one leaf, see [`classify_leaf`].
///
/// Both sides absent yields the zero tally.
pub fn compare_leaf(
    true_value: Record<'_>,
    pred_value: Record<'_>,
    field_key: &str,
    declared_type: &str,
    config: &DiffConfig,
) -> ScoreTally {
    classify_leaf(true_value, pred_value, field_key, declared_type, config).tally()
}
