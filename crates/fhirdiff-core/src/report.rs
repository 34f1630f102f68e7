//! Tabular and hierarchical views of a [`DiffTree`].
//!
//! [`Report`] holds one [`ReportRow`] per flattened node and aggregates mean
//! accuracy per resolved type. [`treemap_entries`] produces the records a
//! hierarchical plot consumes.
use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::diff::DiffTree;
use crate::diff::tree::DiffNode;
use crate::score::ScoreTally;

/// One flattened diff node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    /// Resolved type of the node.
    pub resource_type: String,
    /// Position within the parent array; empty for non-array members.
    pub array_index: String,
    pub field_key: String,
    pub label: String,
    pub n_leaves: usize,
    pub n_matches: usize,
    pub n_additions: usize,
    pub n_deletions: usize,
    pub n_modifications: usize,
    pub accuracy: Option<f64>,
    pub precision: Option<f64>,
    pub recall: Option<f64>,
}

impl ReportRow {
    fn from_node(node: &DiffNode<'_>) -> Self {
        let score = node.score;
        Self {
            resource_type: node.resolved_type.clone(),
            array_index: node.array_index.map(|i| i.to_string()).unwrap_or_default(),
            field_key: node.field_key.clone(),
            label: node.label.clone(),
            n_leaves: score.leaves,
            n_matches: score.matches,
            n_additions: score.additions,
            n_deletions: score.deletions,
            n_modifications: score.modifications,
            accuracy: score.accuracy(),
            precision: score.precision(),
            recall: score.recall(),
        }
    }

    /// The counts of this row as a tally (validity is not carried).
    pub fn tally(&self) -> ScoreTally {
        ScoreTally {
            leaves: self.n_leaves,
            matches: self.n_matches,
            additions: self.n_additions,
            deletions: self.n_deletions,
            modifications: self.n_modifications,
            is_valid: None,
        }
    }
}

/// Mean accuracy of all rows of one resolved type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeAccuracy {
    pub resource_type: String,
    /// Mean over rows with defined accuracy; `None` if there are none.
    pub mean_accuracy: Option<f64>,
    /// Number of rows of this type, including those without accuracy.
    pub rows: usize,
}

/// Flattened report over one or more diff trees.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Report {
    pub rows: Vec<ReportRow>,
}

impl Report {
    /// Flattens `tree` depth-first, one row per node.
    pub fn from_tree(tree: &DiffTree<'_>) -> Self {
        Self {
            rows: tree.flattened().map(ReportRow::from_node).collect(),
        }
    }

    /// Appends the rows of another report.
    pub fn extend(&mut self, other: Report) {
        self.rows.extend(other.rows);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Mean accuracy per resolved type, sorted by type name.
    pub fn by_resource_type(&self) -> Vec<TypeAccuracy> {
        let mut groups: BTreeMap<&str, (Mean, usize)> = BTreeMap::new();
        for row in &self.rows {
            let entry = groups.entry(row.resource_type.as_str()).or_default();
            entry.0.push(row.accuracy);
            entry.1 += 1;
        }
        groups
            .into_iter()
            .map(|(resource_type, (mean, rows))| TypeAccuracy {
                resource_type: resource_type.to_owned(),
                mean_accuracy: mean.value(),
                rows,
            })
            .collect()
    }

    /// Mean accuracy over every row with defined accuracy.
    pub fn overall_mean(&self) -> Option<f64> {
        let mut mean = Mean::default();
        for row in &self.rows {
            mean.push(row.accuracy);
        }
        mean.value()
    }
}

/// Running mean that skips undefined samples.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Mean {
    sum: f64,
    count: usize,
}

impl Mean {
    pub(crate) fn push(&mut self, sample: Option<f64>) {
        if let Some(x) = sample {
            self.sum += x;
            self.count += 1;
        }
    }

    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn value(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

/// One node of a treemap plot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreemapEntry {
    pub label: String,
    /// Label of the parent node; empty for the root.
    pub parent_label: String,
    /// Height of the node above the deepest label in the tree.
    pub weight: usize,
    pub accuracy: Option<f64>,
    /// Raw reference value; `null` when absent.
    pub true_value: Value,
    /// Raw predicted value; `null` when absent.
    pub pred_value: Value,
}

/// Number of dot-separated parts in a label.
fn label_depth(label: &str) -> usize {
    label.split('.').filter(|part| !part.is_empty()).count()
}

/// Builds treemap entries for every node of `tree`, in flattened order.
///
/// `weight = max_depth + 1 - depth`, so the root is heaviest and the
/// deepest leaves weigh 1.
pub fn treemap_entries(tree: &DiffTree<'_>) -> Vec<TreemapEntry> {
    let max_depth = tree
        .iter()
        .map(|(_, node)| label_depth(&node.label))
        .max()
        .unwrap_or(0);
    tree.flatten()
        .into_iter()
        .map(|id| {
            let node = &tree[id];
            TreemapEntry {
                label: node.label.clone(),
                parent_label: tree
                    .parent(id)
                    .map(|p| p.label.clone())
                    .unwrap_or_default(),
                weight: max_depth + 1 - label_depth(&node.label),
                accuracy: node.score.accuracy(),
                true_value: node.true_value.value().cloned().unwrap_or(Value::Null),
                pred_value: node.pred_value.value().cloned().unwrap_or(Value::Null),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use serde_json::json;

    use super::*;
    use crate::diff::compare;
    use crate::schema::SchemaRegistry;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::fhir_r4b().expect("embedded schema")
    }

    fn observation(status: &str) -> Value {
        json!({
            "resourceType": "Observation",
            "status": status,
            "code": {"coding": [{"system": "http://loinc.org", "code": "8867-4"}]}
        })
    }

    #[test]
    fn rows_follow_flatten_order() {
        let schema = registry();
        let (t, p) = (observation("final"), observation("amended"));
        let tree = compare(&schema, &t, &p, "Observation").expect("compare");
        let report = Report::from_tree(&tree);
        assert_eq!(report.len(), tree.len());

        let root = &report.rows[0];
        assert_eq!(root.label, "Observation");
        assert_eq!(root.field_key, "Observation");
        assert_eq!(root.array_index, "");
        assert_eq!((root.n_leaves, root.n_matches, root.n_modifications), (3, 2, 1));

        let coding = report
            .rows
            .iter()
            .find(|r| r.label == "Observation.code.coding.0")
            .expect("coding row");
        assert_eq!(coding.array_index, "0");
        assert_eq!(coding.resource_type, "Coding");
        assert_eq!(coding.accuracy, Some(1.0));
    }

    #[test]
    fn groups_by_resolved_type() {
        let schema = registry();
        let (t, p) = (observation("final"), observation("amended"));
        let tree = compare(&schema, &t, &p, "Observation").expect("compare");
        let report = Report::from_tree(&tree);
        let groups = report.by_resource_type();
        let names: Vec<&str> = groups.iter().map(|g| g.resource_type.as_str()).collect();
        assert_eq!(names, vec!["CodeableConcept", "Coding", "Observation", "string"]);

        let strings = groups.iter().find(|g| g.resource_type == "string").expect("strings");
        // status modified, system and code matched
        assert_eq!(strings.rows, 3);
        let mean = strings.mean_accuracy.expect("defined");
        assert!((mean - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn undefined_rows_are_left_out_of_means() {
        let mut report = Report::default();
        assert_eq!(report.overall_mean(), None);
        report.rows.push(ReportRow::from_node(&DiffNode {
            true_value: crate::record::Record::absent(),
            pred_value: crate::record::Record::absent(),
            type_name: "string".to_owned(),
            resolved_type: "string".to_owned(),
            parent: None,
            children: Vec::new(),
            array_index: None,
            field_key: "id".to_owned(),
            label: "Patient.id".to_owned(),
            depth: 1,
            is_leaf: true,
            score: ScoreTally::ZERO,
        }));
        assert_eq!(report.overall_mean(), None);
        assert_eq!(report.by_resource_type()[0].rows, 1);
        assert_eq!(report.by_resource_type()[0].mean_accuracy, None);
        assert_eq!(report.rows[0].tally(), ScoreTally::ZERO);
    }

    #[test]
    fn treemap_weights_and_parents() {
        let schema = registry();
        let t = observation("final");
        let tree = compare(&schema, &t, &t, "Observation").expect("compare");
        let entries = treemap_entries(&tree);
        assert_eq!(entries.len(), tree.len());

        let root = &entries[0];
        assert_eq!(root.parent_label, "");
        // Deepest label is Observation.code.coding.0.system (5 parts).
        assert_eq!(root.weight, 5);
        assert_eq!(root.true_value, t);

        let system = entries
            .iter()
            .find(|e| e.label == "Observation.code.coding.0.system")
            .expect("system");
        assert_eq!(system.weight, 1);
        assert_eq!(system.parent_label, "Observation.code.coding.0");
        assert_eq!(system.pred_value, json!("http://loinc.org"));
    }

    #[test]
    fn treemap_uses_null_for_absent_values() {
        let schema = registry();
        let t = observation("final");
        let p = json!({"resourceType": "Observation"});
        let tree = compare(&schema, &t, &p, "Observation").expect("compare");
        let status = treemap_entries(&tree)
            .into_iter()
            .find(|e| e.label == "Observation.status")
            .expect("status");
        assert_eq!(status.pred_value, Value::Null);
        assert_eq!(status.accuracy, Some(0.0));
    }
}
