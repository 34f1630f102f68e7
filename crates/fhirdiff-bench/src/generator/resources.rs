//! Generators for whole FHIR resources.

use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde_json::{Value, json};

use super::GeneratorConfig;
use super::datatypes::{
    CONDITION_CODES, OBSERVATION_CODES, gen_address, gen_codeable_concept, gen_contact_point,
    gen_date, gen_date_time, gen_human_name, gen_identifier,
};

const MRN_SYSTEM: &str = "urn:oid:2.16.840.1.113883.2.4.6.3";
const OBSERVATION_SYSTEM: &str = "urn:example:lab-orders";
const CONDITION_SYSTEM: &str = "urn:example:problem-list";

fn identifiers(rng: &mut StdRng, system: &str, count: usize) -> Vec<Value> {
    (0..count).map(|_| gen_identifier(rng, system)).collect()
}

/// Generates a `Patient` with the configured number of names, telecoms
/// and identifiers.
pub fn gen_patient(rng: &mut StdRng, config: &GeneratorConfig, id: &str) -> Value {
    let names: Vec<Value> = (0..config.names_per_patient.max(1))
        .map(|i| gen_human_name(rng, i == 0))
        .collect();
    let telecom: Vec<Value> = (0..config.telecoms_per_patient)
        .map(|i| gen_contact_point(rng, i))
        .collect();
    let gender = ["female", "male", "other", "unknown"]
        .choose(rng)
        .copied()
        .unwrap_or("unknown");

    let mut patient = json!({
        "resourceType": "Patient",
        "id": id,
        "identifier": identifiers(rng, MRN_SYSTEM, config.identifiers_per_resource),
        "active": rng.gen_bool(0.9),
        "name": names,
        "gender": gender,
        "birthDate": gen_date(rng),
        "address": [gen_address(rng)],
    });
    if !telecom.is_empty() {
        patient["telecom"] = Value::Array(telecom);
    }
    patient
}

/// Generates a vital-sign `Observation` about `patient_id`.
pub fn gen_observation(
    rng: &mut StdRng,
    config: &GeneratorConfig,
    id: &str,
    patient_id: &str,
) -> Value {
    let index = rng.gen_range(0..OBSERVATION_CODES.len());
    let (concept, unit, low, high) = &OBSERVATION_CODES[index];
    let value = (rng.gen_range(*low..*high) * 10.0).round() / 10.0;
    json!({
        "resourceType": "Observation",
        "id": id,
        "identifier": identifiers(rng, OBSERVATION_SYSTEM, config.identifiers_per_resource),
        "status": if rng.gen_bool(0.8) { "final" } else { "preliminary" },
        "category": [{
            "coding": [{
                "system": "http://terminology.hl7.org/CodeSystem/observation-category",
                "code": "vital-signs",
            }],
        }],
        "code": gen_codeable_concept(concept),
        "subject": { "reference": format!("Patient/{patient_id}") },
        "effectiveDateTime": gen_date_time(rng),
        "valueQuantity": {
            "value": value,
            "unit": unit,
            "system": "http://unitsofmeasure.org",
            "code": unit,
        },
    })
}

/// Generates an active `Condition` about `patient_id`.
pub fn gen_condition(
    rng: &mut StdRng,
    config: &GeneratorConfig,
    id: &str,
    patient_id: &str,
) -> Value {
    let index = rng.gen_range(0..CONDITION_CODES.len());
    json!({
        "resourceType": "Condition",
        "id": id,
        "identifier": identifiers(rng, CONDITION_SYSTEM, config.identifiers_per_resource),
        "clinicalStatus": {
            "coding": [{
                "system": "http://terminology.hl7.org/CodeSystem/condition-clinical",
                "code": "active",
            }],
        },
        "code": gen_codeable_concept(&CONDITION_CODES[index]),
        "subject": { "reference": format!("Patient/{patient_id}") },
        "onsetDateTime": gen_date_time(rng),
        "recordedDate": gen_date_time(rng),
    })
}
