//! Prediction noise: the kinds of error an extraction model makes.
//!
//! Leaves are altered in a type-preserving way so that a perturbed record
//! still passes the structural check; array items are dropped or reordered.

use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde_json::{Map, Number, Value};

use super::GeneratorConfig;

/// Members that identify a record rather than describe it; never perturbed.
const STABLE_KEYS: &[&str] = &["resourceType", "fullUrl", "reference"];

/// Returns a noisy copy of `value`.
///
/// Each leaf differs from the original with probability `leaf_noise`. Each
/// array item is dropped with probability `drop_rate`, keeping at least one.
/// Arrays are shuffled when `shuffle` is set.
pub fn perturb(value: &Value, config: &GeneratorConfig, rng: &mut StdRng) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, child) in map {
                let child = if STABLE_KEYS.contains(&key.as_str()) {
                    child.clone()
                } else {
                    perturb(child, config, rng)
                };
                out.insert(key.clone(), child);
            }
            Value::Object(out)
        }
        Value::Array(items) => {
            let mut out: Vec<Value> = Vec::with_capacity(items.len());
            for item in items {
                if config.drop_rate > 0.0 && rng.gen_bool(config.drop_rate) {
                    continue;
                }
                out.push(perturb(item, config, rng));
            }
            if out.is_empty() {
                if let Some(first) = items.first() {
                    out.push(perturb(first, config, rng));
                }
            }
            if config.shuffle {
                out.shuffle(rng);
            }
            Value::Array(out)
        }
        Value::Null => Value::Null,
        leaf @ (Value::Bool(_) | Value::Number(_) | Value::String(_)) => {
            if config.leaf_noise > 0.0 && rng.gen_bool(config.leaf_noise) {
                mutate_leaf(leaf)
            } else {
                leaf.clone()
            }
        }
    }
}

fn mutate_leaf(leaf: &Value) -> Value {
    match leaf {
        Value::Bool(b) => Value::Bool(!b),
        Value::Number(n) => mutate_number(n),
        Value::String(s) => Value::String(mutate_string(s)),
        Value::Null | Value::Array(_) | Value::Object(_) => leaf.clone(),
    }
}

fn mutate_number(n: &Number) -> Value {
    if let Some(i) = n.as_u64() {
        return Value::from(i.saturating_add(1));
    }
    if let Some(i) = n.as_i64() {
        return Value::from(i.saturating_add(1));
    }
    let f = n.as_f64().unwrap_or_default();
    Value::from(f + 1.5)
}

/// Bumps the year of date-like strings so they stay well formed; other
/// strings get a suffix.
fn mutate_string(s: &str) -> String {
    let bytes = s.as_bytes();
    let date_like = bytes.len() >= 4 && bytes[..4].iter().all(u8::is_ascii_digit);
    if date_like {
        let digit = bytes[3] - b'0';
        let bumped = char::from(b'0' + (digit + 1) % 10);
        format!("{}{bumped}{}", &s[..3], &s[4..])
    } else {
        format!("{s} (amended)")
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use rand::SeedableRng;
    use serde_json::json;

    use super::*;

    fn config(leaf_noise: f64, drop_rate: f64, shuffle: bool) -> GeneratorConfig {
        GeneratorConfig {
            leaf_noise,
            drop_rate,
            shuffle,
            ..GeneratorConfig::default()
        }
    }

    #[test]
    fn zero_noise_is_identity() {
        let value = json!({"a": [1, 2, {"b": "x"}], "c": true});
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(perturb(&value, &config(0.0, 0.0, false), &mut rng), value);
    }

    #[test]
    fn full_noise_changes_every_leaf() {
        let value = json!({"resourceType": "Patient", "gender": "male", "active": true, "birthDate": "1989-05-01"});
        let mut rng = StdRng::seed_from_u64(1);
        let out = perturb(&value, &config(1.0, 0.0, false), &mut rng);
        assert_eq!(out["resourceType"], "Patient");
        assert_eq!(out["gender"], "male (amended)");
        assert_eq!(out["active"], false);
        assert_eq!(out["birthDate"], "1980-05-01");
    }

    #[test]
    fn dropping_keeps_one_item() {
        let value = json!([1, 2, 3]);
        let mut rng = StdRng::seed_from_u64(7);
        let out = perturb(&value, &config(0.0, 1.0, false), &mut rng);
        assert_eq!(out.as_array().expect("array").len(), 1);
    }

    #[test]
    fn shuffling_keeps_items() {
        let value = json!([1, 2, 3, 4, 5]);
        let mut rng = StdRng::seed_from_u64(3);
        let out = perturb(&value, &config(0.0, 0.0, true), &mut rng);
        let mut items: Vec<u64> = out
            .as_array()
            .expect("array")
            .iter()
            .filter_map(Value::as_u64)
            .collect();
        items.sort_unstable();
        assert_eq!(items, vec![1, 2, 3, 4, 5]);
    }
}
