#![allow(clippy::expect_used)]


use serde_json::{Value, json};

use crate::schema::SchemaRegistry;
use crate::score::ScoreTally;

use super::engine::compare;
use super::tree::DiffTree;

pub(crate) fn registry() -> SchemaRegistry {
    SchemaRegistry::fhir_r4b().expect("embedded schema")
}

/// Compares two records typed by the reference's `resourceType`.
pub(crate) fn diff<'a>(schema: &SchemaRegistry, t: &'a Value, p: &'a Value) -> DiffTree<'a> {
    let type_name = t["resourceType"].as_str().expect("resourceType");
    compare(schema, t, p, type_name).expect("comparison succeeds")
}

pub(crate) fn counts(score: ScoreTally) -> (usize, usize, usize, usize, usize) {
    (
        score.leaves,
        score.matches,
        score.additions,
        score.deletions,
        score.modifications,
    )
}

pub(crate) fn heart_rate() -> Value {
    json!({
        "resourceType": "Observation",
        "status": "final",
        "code": {
            "coding": [{
                "system": "http://loinc.org",
                "code": "8867-4",
                "display": "Heart rate"
            }]
        }
    })
}

pub(crate) fn patient() -> Value {
    json!({
        "resourceType": "Patient",
        "id": "p1",
        "active": true,
        "name": [
            {"use": "official", "family": "Jansen", "given": ["Anna", "Maria"]},
            {"use": "nickname", "given": ["Ans"]}
        ],
        "telecom": [
            {"system": "phone", "value": "+31 6 1234 5678", "use": "mobile"},
            {"system": "email", "value": "anna@example.org"}
        ],
        "gender": "female",
        "birthDate": "1980-04-12",
        "address": [{"city": "Utrecht", "country": "NL", "line": ["Oudegracht 1"]}],
        "generalPractitioner": [{"reference": "Practitioner/gp-7", "display": "Dr. de Vries"}]
    })
}
