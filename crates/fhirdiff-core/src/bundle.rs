//! Bundle-level alignment: pairs whole resources of two collections.
//!
//! Every true resource is scored against every predicted resource of the
//! same `resourceType` with the tree-diff engine. Resources are then mapped
//! greedily in reference order: each true resource takes the unused
//! predicted resource with the highest accuracy, provided it reaches
//! [`BundleConfig::min_similarity`].
use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::config::BundleConfig;
use crate::diff::Comparator;
use crate::error::DiffError;
use crate::record::Record;
use crate::report::Mean;
use crate::score::ScoreTally;
use crate::validation::{ResourceValidator, SchemaValidator};

const BUNDLE_TYPE: &str = "Bundle";

/// Score of one reference resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceMatch {
    /// `Type/id`, or `Type/#index` when the resource has no id.
    pub key: String,
    pub resource_type: String,
    /// Key of the predicted resource mapped to this one.
    pub matched: Option<String>,
    /// Accuracy against the mapped resource; 0 when unmapped.
    pub accuracy: f64,
    /// Full tally against the mapped resource.
    pub score: Option<ScoreTally>,
}

/// Result of comparing two resource collections.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BundleDistance {
    /// One entry per reference resource, in reference order.
    pub resources: Vec<ResourceMatch>,
    /// Mean resource accuracy per resource type.
    pub by_type: BTreeMap<String, f64>,
    /// Mean accuracy over all reference resources; `None` if there are none.
    pub mean_accuracy: Option<f64>,
    /// Keys of predicted resources no reference resource was mapped to.
    pub unmatched_pred: Vec<String>,
    /// Share of predicted resources that pass the structural check.
    pub validity_ratio: Option<f64>,
}

impl BundleDistance {
    /// Predicted key mapped to each reference key, for mapped resources.
    pub fn mapping(&self) -> impl Iterator<Item = (&str, &str)> {
        self.resources
            .iter()
            .filter_map(|r| r.matched.as_deref().map(|m| (r.key.as_str(), m)))
    }
}

/// Resources of a collection value.
///
/// A `Bundle` yields the `resource` of each entry, an array yields its
/// items, anything else is a single resource. Null and empty members are
/// dropped.
pub fn bundle_resources(value: &Value) -> Vec<&Value> {
    let record = Record::present(value);
    if record.resource_type() == Some(BUNDLE_TYPE) {
        return record
            .get("entry")
            .items()
            .unwrap_or_default()
            .into_iter()
            .filter_map(|entry| entry.get("resource").value())
            .filter(|r| Record::present(r).is_present())
            .collect();
    }
    match record.items() {
        Some(items) => items.into_iter().filter_map(|r| r.value()).collect(),
        None => vec![value],
    }
}

struct Keyed<'a> {
    value: &'a Value,
    resource_type: &'a str,
    key: String,
}

fn keyed<'a>(resources: &[&'a Value]) -> Result<Vec<Keyed<'a>>, DiffError> {
    resources
        .iter()
        .enumerate()
        .map(|(index, &value)| {
            let missing = DiffError::MissingResourceType { index };
            let resource_type = Record::present(value).resource_type().ok_or(missing.clone())?;
            let key = resource_key(value, index).ok_or(missing)?;
            Ok(Keyed {
                value,
                resource_type,
                key,
            })
        })
        .collect()
}

/// Compares two resource collections.
///
/// # Errors
///
/// Returns [`DiffError::MissingResourceType`] if a resource on either side
/// lacks a `resourceType`, and any engine error raised while scoring a pair.
pub fn bundle_distance(
    comparator: &Comparator<'_>,
    true_resources: &[&Value],
    pred_resources: &[&Value],
    config: &BundleConfig,
) -> Result<BundleDistance, DiffError> {
    let truth = keyed(true_resources)?;
    let pred = keyed(pred_resources)?;

    // Row-major; pairs of different types stay `None`.
    let mut scores: Vec<Option<ScoreTally>> = Vec::with_capacity(truth.len() * pred.len());
    for t in &truth {
        for p in &pred {
            if t.resource_type == p.resource_type {
                let tree = comparator.compare(t.value, p.value, t.resource_type)?;
                scores.push(Some(tree.score()));
            } else {
                scores.push(None);
            }
        }
    }
    let similarity = |score: Option<ScoreTally>| match score {
        // Nothing to compare on either side counts as identical.
        Some(s) => s.accuracy().unwrap_or(1.0),
        None => 0.0,
    };

    let mut used = vec![false; pred.len()];
    let mut resources = Vec::with_capacity(truth.len());
    for (i, t) in truth.iter().enumerate() {
        let mut best: Option<(usize, f64)> = None;
        for (j, taken) in used.iter().enumerate() {
            let score = scores[i * pred.len() + j];
            let s = similarity(score);
            if *taken || score.is_none() || s < config.min_similarity {
                continue;
            }
            if best.is_none_or(|(_, b)| s > b) {
                best = Some((j, s));
            }
        }
        let entry = match best {
            Some((j, accuracy)) => {
                used[j] = true;
                ResourceMatch {
                    key: t.key.clone(),
                    resource_type: t.resource_type.to_owned(),
                    matched: Some(pred[j].key.clone()),
                    accuracy,
                    score: scores[i * pred.len() + j],
                }
            }
            None => ResourceMatch {
                key: t.key.clone(),
                resource_type: t.resource_type.to_owned(),
                matched: None,
                accuracy: 0.0,
                score: None,
            },
        };
        tracing::debug!(
            resource = %entry.key,
            matched = entry.matched.as_deref().unwrap_or("-"),
            accuracy = entry.accuracy,
            "mapped bundle resource"
        );
        resources.push(entry);
    }

    let mut type_means: BTreeMap<String, Mean> = BTreeMap::new();
    let mut overall = Mean::default();
    for r in &resources {
        type_means
            .entry(r.resource_type.clone())
            .or_default()
            .push(Some(r.accuracy));
        overall.push(Some(r.accuracy));
    }
    let by_type = type_means
        .into_iter()
        .filter_map(|(ty, mean)| mean.value().map(|m| (ty, m)))
        .collect();

    let unmatched_pred = pred
        .iter()
        .zip(&used)
        .filter(|&(_, &taken)| !taken)
        .map(|(p, _)| p.key.clone())
        .collect();

    let validator = SchemaValidator::new(comparator.schema());
    let mut validity = Mean::default();
    for p in &pred {
        validity.push(Some(if validator.is_valid(p.value) { 1.0 } else { 0.0 }));
    }

    Ok(BundleDistance {
        resources,
        by_type,
        mean_accuracy: overall.value(),
        unmatched_pred,
        validity_ratio: validity.value(),
    })
}

/// Like [`bundle_distance`], over two collection values (bundles, arrays or
/// single resources).
///
/// # Errors
///
/// See [`bundle_distance`].
pub fn compare_bundles(
    comparator: &Comparator<'_>,
    true_bundle: &Value,
    pred_bundle: &Value,
    config: &BundleConfig,
) -> Result<BundleDistance, DiffError> {
    let truth = bundle_resources(true_bundle);
    let pred = bundle_resources(pred_bundle);
    bundle_distance(comparator, &truth, &pred, config)
}

/// Key under which [`ResourceMatch`] entries are reported for a value.
pub fn resource_key(value: &Value, index: usize) -> Option<String> {
    let record = Record::present(value);
    let resource_type = record.resource_type()?;
    Some(match record.get("id").as_str().filter(|id| !id.is_empty()) {
        Some(id) => format!("{resource_type}/{id}"),
        None => format!("{resource_type}/#{index}"),
    })
}
