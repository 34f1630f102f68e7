//! Generators for FHIR complex datatypes.

use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde_json::{Value, json};

const FAMILY_NAMES: &[&str] = &[
    "Jansen", "de Vries", "Bakker", "Visser", "Smit", "Meijer", "Mulder", "Bos", "Vos", "Peters",
];
const GIVEN_NAMES: &[&str] = &[
    "Anna", "Maria", "Sophie", "Julia", "Lucas", "Daan", "Sem", "Finn", "Emma", "Noah", "Tess",
];
const CITIES: &[&str] = &["Amsterdam", "Rotterdam", "Utrecht", "Eindhoven", "Groningen"];
const STREETS: &[&str] = &["Kerkstraat", "Dorpsstraat", "Molenweg", "Stationsplein", "Beukenlaan"];
const POSTCODE_LETTERS: &[&str] = &["AB", "CD", "GH", "KL", "RS", "XZ"];
const CONTACT_SYSTEMS: &[&str] = &["phone", "email", "fax", "sms"];
const CONTACT_USES: &[&str] = &["home", "work", "mobile", "temp"];

/// A terminology code with its display text.
pub struct Concept {
    pub system: &'static str,
    pub code: &'static str,
    pub display: &'static str,
}

/// LOINC codes used for generated observations, with a plausible unit and range.
pub const OBSERVATION_CODES: &[(Concept, &str, f64, f64)] = &[
    (
        Concept { system: "http://loinc.org", code: "8867-4", display: "Heart rate" },
        "/min",
        50.0,
        120.0,
    ),
    (
        Concept { system: "http://loinc.org", code: "8310-5", display: "Body temperature" },
        "Cel",
        35.5,
        40.0,
    ),
    (
        Concept { system: "http://loinc.org", code: "29463-7", display: "Body weight" },
        "kg",
        3.0,
        140.0,
    ),
    (
        Concept { system: "http://loinc.org", code: "9279-1", display: "Respiratory rate" },
        "/min",
        10.0,
        30.0,
    ),
];

/// SNOMED CT codes used for generated conditions.
pub const CONDITION_CODES: &[Concept] = &[
    Concept { system: "http://snomed.info/sct", code: "44054006", display: "Diabetes mellitus type 2" },
    Concept { system: "http://snomed.info/sct", code: "38341003", display: "Hypertensive disorder" },
    Concept { system: "http://snomed.info/sct", code: "195967001", display: "Asthma" },
    Concept { system: "http://snomed.info/sct", code: "35489007", display: "Depressive disorder" },
];

fn pick<'a>(rng: &mut StdRng, items: &'a [&'a str]) -> &'a str {
    items.choose(rng).copied().unwrap_or_default()
}

/// A `CodeableConcept` with a single coding.
pub fn gen_codeable_concept(concept: &Concept) -> Value {
    json!({
        "coding": [{
            "system": concept.system,
            "code": concept.code,
            "display": concept.display,
        }],
        "text": concept.display,
    })
}

/// A `HumanName` with one to three given names.
pub fn gen_human_name(rng: &mut StdRng, official: bool) -> Value {
    let given_count = rng.gen_range(1..=3);
    let given: Vec<&str> = GIVEN_NAMES.choose_multiple(rng, given_count).copied().collect();
    json!({
        "use": if official { "official" } else { "usual" },
        "family": pick(rng, FAMILY_NAMES),
        "given": given,
    })
}

/// A `ContactPoint`; `rank` is set so that equal systems remain distinguishable.
pub fn gen_contact_point(rng: &mut StdRng, rank: usize) -> Value {
    let system = pick(rng, CONTACT_SYSTEMS);
    let value = match system {
        "email" => format!("user{}@example.org", rng.gen_range(100..10_000)),
        _ => format!("+31 6 {:04} {:04}", rng.gen_range(0..10_000), rng.gen_range(0..10_000)),
    };
    json!({
        "system": system,
        "value": value,
        "use": pick(rng, CONTACT_USES),
        "rank": rank + 1,
    })
}

/// An `Identifier` in a hospital-local system.
pub fn gen_identifier(rng: &mut StdRng, system: &str) -> Value {
    json!({
        "use": "official",
        "system": system,
        "value": format!("{:08}", rng.gen_range(0..100_000_000)),
    })
}

/// An `Address` in one of a handful of Dutch cities.
pub fn gen_address(rng: &mut StdRng) -> Value {
    json!({
        "use": "home",
        "line": [format!("{} {}", pick(rng, STREETS), rng.gen_range(1..200))],
        "city": pick(rng, CITIES),
        "postalCode": format!("{:04} {}", rng.gen_range(1000..10_000), pick(rng, POSTCODE_LETTERS)),
        "country": "NL",
    })
}

/// A `date` between 1930 and 2020.
pub fn gen_date(rng: &mut StdRng) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        rng.gen_range(1930..2021),
        rng.gen_range(1..=12),
        rng.gen_range(1..=28)
    )
}

/// A UTC `dateTime` between 2015 and 2024.
pub fn gen_date_time(rng: &mut StdRng) -> String {
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:00Z",
        rng.gen_range(2015..2025),
        rng.gen_range(1..=12),
        rng.gen_range(1..=28),
        rng.gen_range(0..24),
        rng.gen_range(0..60)
    )
}

/// An RFC 4122-shaped `urn:uuid:` drawn from `rng`.
pub fn gen_urn_uuid(rng: &mut StdRng) -> String {
    let hi: u64 = rng.gen_range(0..u64::MAX);
    let lo: u64 = rng.gen_range(0..u64::MAX);
    format!(
        "urn:uuid:{:08x}-{:04x}-4{:03x}-{:04x}-{:012x}",
        hi >> 32,
        (hi >> 16) & 0xffff,
        hi & 0x0fff,
        0x8000 | ((lo >> 48) & 0x3fff),
        lo & 0xffff_ffff_ffff
    )
}
