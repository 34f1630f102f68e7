//! Evaluation of many independent record pairs.
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::diff::Comparator;
use crate::error::DiffError;
use crate::record::Record;
use crate::report::{Report, TypeAccuracy};

/// One (reference, prediction) pair to compare.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordPair {
    #[serde(rename = "true")]
    pub true_value: Value,
    #[serde(rename = "pred")]
    pub pred_value: Value,
    /// Type to compare under; defaults to the reference's `resourceType`.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
}

/// A pair that could not be compared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairFailure {
    /// Zero-based position of the pair in the input.
    pub index: usize,
    pub error: DiffError,
}

/// Aggregate accuracy over a batch of pairs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    /// Number of pairs seen, failed ones included.
    pub pairs: usize,
    /// Mean accuracy per resolved type over the rows of all compared pairs.
    pub by_type: Vec<TypeAccuracy>,
    pub overall_mean: Option<f64>,
    pub failures: Vec<PairFailure>,
}

impl BatchSummary {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

impl Serialize for PairFailure {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("PairFailure", 2)?;
        s.serialize_field("index", &self.index)?;
        s.serialize_field("error", &self.error.to_string())?;
        s.end()
    }
}

/// Compares every pair and aggregates their flattened reports.
///
/// A pair that fails is recorded with its index and skipped; the others
/// still count.
pub fn evaluate_pairs<I>(comparator: &Comparator<'_>, pairs: I) -> BatchSummary
where
    I: IntoIterator<Item = RecordPair>,
{
    let mut report = Report::default();
    let mut summary = BatchSummary::default();
    for (index, pair) in pairs.into_iter().enumerate() {
        summary.pairs += 1;
        match evaluate_pair(comparator, &pair, index) {
            Ok(rows) => report.extend(rows),
            Err(error) => {
                tracing::warn!(index, %error, "pair could not be compared");
                summary.failures.push(PairFailure { index, error });
            }
        }
    }
    summary.by_type = report.by_resource_type();
    summary.overall_mean = report.overall_mean();
    summary
}

fn evaluate_pair(
    comparator: &Comparator<'_>,
    pair: &RecordPair,
    index: usize,
) -> Result<Report, DiffError> {
    let type_name = match &pair.type_name {
        Some(name) => name.as_str(),
        None => Record::present(&pair.true_value)
            .resource_type()
            .ok_or(DiffError::MissingResourceType { index })?,
    };
    let tree = comparator.compare(&pair.true_value, &pair.pred_value, type_name)?;
    Ok(Report::from_tree(&tree))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use serde_json::json;

    use super::*;
    use crate::schema::SchemaRegistry;

    fn pair(t: Value, p: Value) -> RecordPair {
        RecordPair {
            true_value: t,
            pred_value: p,
            type_name: None,
        }
    }

    #[test]
    fn aggregates_across_pairs() {
        let schema = SchemaRegistry::fhir_r4b().expect("schema");
        let comparator = Comparator::new(&schema);
        let a = json!({"resourceType": "Patient", "gender": "female"});
        let b = json!({"resourceType": "Patient", "gender": "male"});
        let summary = evaluate_pairs(&comparator, vec![pair(a.clone(), a.clone()), pair(a, b)]);
        assert_eq!(summary.pairs, 2);
        assert_eq!(summary.failed(), 0);
        let patient = summary
            .by_type
            .iter()
            .find(|t| t.resource_type == "Patient")
            .expect("patient rows");
        assert_eq!(patient.rows, 2);
        assert_eq!(patient.mean_accuracy, Some(0.5));
        assert_eq!(summary.overall_mean, Some(0.5));
    }

    #[test]
    fn failures_are_recorded_and_skipped() {
        let schema = SchemaRegistry::fhir_r4b().expect("schema");
        let comparator = Comparator::new(&schema);
        let ok = json!({"resourceType": "Patient", "gender": "female"});
        let untyped = json!({"gender": "female"});
        let mut unknown = pair(ok.clone(), ok.clone());
        unknown.type_name = Some("Spaceship".to_owned());
        let summary = evaluate_pairs(
            &comparator,
            vec![pair(untyped.clone(), untyped), pair(ok.clone(), ok), unknown],
        );
        assert_eq!(summary.pairs, 3);
        assert_eq!(summary.failed(), 2);
        assert_eq!(summary.failures[0].error, DiffError::MissingResourceType { index: 0 });
        assert_eq!(summary.failures[1].index, 2);
        assert_eq!(summary.overall_mean, Some(1.0));
    }

    #[test]
    fn pairs_parse_from_json_lines() {
        let line = r#"{"true": {"resourceType": "Patient"}, "pred": {}, "type": "Patient"}"#;
        let pair: RecordPair = serde_json::from_str(line).expect("parse");
        assert_eq!(pair.type_name.as_deref(), Some("Patient"));
        assert_eq!(pair.pred_value, json!({}));
    }
}
