/// Structural validity checks for predicted resources.
///
/// The diff engine only needs a yes/no answer per resource, expressed by the
/// [`ResourceValidator`] trait. [`SchemaValidator`] answers it against a
/// [`SchemaRegistry`]: every member must be a declared field, required fields
/// must be present, and every value must have the JSON shape its declared type
/// calls for. It is not a conformance validator; terminology bindings,
/// invariants and cardinality beyond `required` are out of reach.
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::record::RESOURCE_TYPE_KEY;
use crate::schema::{FieldDescriptor, FieldKind, RESOURCE_TYPE, SchemaRegistry};

// ---------------------------------------------------------------------------
// Regex statics
//
// The patterns are literals and always compile; `ok()` turns the impossible
// failure into "no pattern", which rejects every value.
// ---------------------------------------------------------------------------

/// FHIR `date`: `YYYY`, `YYYY-MM` or `YYYY-MM-DD`.
static DATE_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\d{4}(-(0[1-9]|1[0-2])(-(0[1-9]|[12]\d|3[01]))?)?$").ok());

/// FHIR `dateTime` / `instant`: a date optionally followed by a time and zone.
static DATE_TIME_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"^\d{4}(-(0[1-9]|1[0-2])(-(0[1-9]|[12]\d|3[01])(T([01]\d|2[0-3]):[0-5]\d(:([0-5]\d|60)(\.\d+)?)?(Z|[+-]((0\d|1[0-3]):[0-5]\d|14:00))?)?)?)?$",
    )
    .ok()
});

fn matches(re: &LazyLock<Option<Regex>>, s: &str) -> bool {
    re.as_ref().is_some_and(|re| re.is_match(s))
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Decides whether a predicted resource is structurally valid.
///
/// Implementations must not fail: anything they cannot judge is invalid.
pub trait ResourceValidator {
    /// Returns `true` if `record` is a structurally valid resource.
    fn is_valid(&self, record: &Value) -> bool;
}

/// One reason a record failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Dot-joined path of the offending member.
    pub path: String,
    /// Human-readable description.
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

// ---------------------------------------------------------------------------
// SchemaValidator
// ---------------------------------------------------------------------------

/// Validates resources against a [`SchemaRegistry`].
#[derive(Debug, Clone, Copy)]
pub struct SchemaValidator<'s> {
    schema: &'s SchemaRegistry,
}

impl<'s> SchemaValidator<'s> {
    /// Creates a validator over `schema`.
    pub fn new(schema: &'s SchemaRegistry) -> Self {
        Self { schema }
    }

    /// Collects every structural problem in `record`.
    ///
    /// An empty result means the record is valid.
    pub fn check(&self, record: &Value) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        self.check_resource(record, "", &mut issues);
        issues
    }

    fn check_resource(&self, value: &Value, path: &str, issues: &mut Vec<ValidationIssue>) {
        let Some(obj) = value.as_object() else {
            push(issues, path, "expected a resource object");
            return;
        };
        let Some(type_name) = obj.get(RESOURCE_TYPE_KEY).and_then(Value::as_str) else {
            push(issues, path, "missing resourceType");
            return;
        };
        if !self.schema.is_resource(type_name) || type_name == RESOURCE_TYPE {
            push(issues, path, format!("unknown resourceType `{type_name}`"));
            return;
        }
        let path = join(path, type_name);
        self.check_object(obj, type_name, &path, true, issues);
    }

    fn check_object(
        &self,
        obj: &Map<String, Value>,
        type_name: &str,
        path: &str,
        is_resource: bool,
        issues: &mut Vec<ValidationIssue>,
    ) {
        let Some(fields) = self.schema.fields(type_name) else {
            push(issues, path, format!("type `{type_name}` is not defined"));
            return;
        };

        for key in obj.keys() {
            if is_resource && key == RESOURCE_TYPE_KEY {
                continue;
            }
            let declared = key.strip_prefix('_').unwrap_or(key);
            if !fields.iter().any(|f| f.key == declared) {
                push(issues, &join(path, key), "not a field of this type");
            }
        }

        for field in fields {
            let child_path = join(path, &field.key);
            match obj.get(&field.key) {
                None | Some(Value::Null) => {
                    if field.required {
                        push(issues, &child_path, "required field is missing");
                    }
                }
                Some(value) => self.check_field(field, value, &child_path, issues),
            }
        }
    }

    fn check_field(
        &self,
        field: &FieldDescriptor,
        value: &Value,
        path: &str,
        issues: &mut Vec<ValidationIssue>,
    ) {
        match &field.kind {
            FieldKind::Leaf | FieldKind::Struct => {
                self.check_value(&field.declared_type, value, path, issues);
            }
            FieldKind::Array { item_type } => {
                let Some(items) = value.as_array() else {
                    push(issues, path, "expected an array");
                    return;
                };
                for (i, item) in items.iter().enumerate() {
                    self.check_value(item_type, item, &join(path, &i.to_string()), issues);
                }
            }
            FieldKind::Unclassified => {
                if !value.is_string() {
                    push(issues, path, "expected a string");
                }
            }
        }
    }

    fn check_value(
        &self,
        type_name: &str,
        value: &Value,
        path: &str,
        issues: &mut Vec<ValidationIssue>,
    ) {
        if type_name == RESOURCE_TYPE {
            self.check_resource(value, path, issues);
            return;
        }
        if self.schema.contains(type_name) {
            match value.as_object() {
                Some(obj) => self.check_object(obj, type_name, path, false, issues),
                None => push(issues, path, format!("expected a `{type_name}` object")),
            }
            return;
        }
        if let Some(problem) = leaf_problem(type_name, value) {
            push(issues, path, problem);
        }
    }
}

impl ResourceValidator for SchemaValidator<'_> {
    fn is_valid(&self, record: &Value) -> bool {
        self.check(record).is_empty()
    }
}

fn leaf_problem(type_name: &str, value: &Value) -> Option<String> {
    let ok = match type_name {
        "boolean" => value.is_boolean(),
        "integer" => value.is_i64() || value.is_u64(),
        "decimal" | "number" => value.is_number(),
        "date" => value.as_str().is_some_and(|s| matches(&DATE_RE, s)),
        "date-time" => value.as_str().is_some_and(|s| matches(&DATE_TIME_RE, s)),
        _ => value.is_string(),
    };
    if ok {
        None
    } else {
        Some(format!("expected a value of type `{type_name}`, got {value}"))
    }
}

fn push(issues: &mut Vec<ValidationIssue>, path: &str, message: impl Into<String>) {
    issues.push(ValidationIssue {
        path: if path.is_empty() {
            "$".to_owned()
        } else {
            path.to_owned()
        },
        message: message.into(),
    });
}

fn join(path: &str, part: &str) -> String {
    if path.is_empty() {
        part.to_owned()
    } else {
        format!("{path}.{part}")
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use serde_json::json;

    use super::*;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::fhir_r4b().expect("schema")
    }

    fn observation() -> Value {
        json!({
            "resourceType": "Observation",
            "id": "obs-1",
            "status": "final",
            "code": {"coding": [{"system": "http://loinc.org", "code": "8867-4"}]},
            "subject": {"reference": "Patient/p1"},
            "effectiveDateTime": "2024-03-01T10:15:00Z",
            "valueQuantity": {"value": 72, "unit": "beats/min"}
        })
    }

    #[test]
    fn well_formed_observation_is_valid() {
        let schema = registry();
        let v = SchemaValidator::new(&schema);
        assert_eq!(v.check(&observation()), Vec::new());
        assert!(v.is_valid(&observation()));
    }

    #[test]
    fn missing_required_field_is_reported() {
        let schema = registry();
        let mut obs = observation();
        obs.as_object_mut().expect("object").remove("status");
        let issues = SchemaValidator::new(&schema).check(&obs);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "Observation.status");
    }

    #[test]
    fn unknown_member_is_reported() {
        let schema = registry();
        let mut obs = observation();
        obs["colour"] = json!("blue");
        let issues = SchemaValidator::new(&schema).check(&obs);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "Observation.colour");
    }

    #[test]
    fn wrong_shapes_are_reported() {
        let schema = registry();
        let mut obs = observation();
        obs["note"] = json!("extra");
        obs["effectiveDateTime"] = json!("yesterday");
        let issues = SchemaValidator::new(&schema).check(&obs);
        let paths: Vec<&str> = issues.iter().map(|i| i.path.as_str()).collect();
        assert!(paths.contains(&"Observation.note"), "{paths:?}");
        assert!(paths.contains(&"Observation.effectiveDateTime"), "{paths:?}");
    }

    #[test]
    fn missing_or_unknown_resource_type_is_invalid() {
        let schema = registry();
        let v = SchemaValidator::new(&schema);
        assert!(!v.is_valid(&json!({"status": "final"})));
        assert!(!v.is_valid(&json!({"resourceType": "Spaceship"})));
        assert!(!v.is_valid(&json!({"resourceType": "CodeableConcept"})));
        assert!(!v.is_valid(&json!("Observation")));
    }

    #[test]
    fn bundle_entries_are_validated_recursively() {
        let schema = registry();
        let v = SchemaValidator::new(&schema);
        let mut bundle = json!({
            "resourceType": "Bundle",
            "type": "collection",
            "entry": [{"resource": observation()}]
        });
        assert!(v.is_valid(&bundle));
        bundle["entry"][0]["resource"]["status"] = json!(7);
        let issues = v.check(&bundle);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "Bundle.entry.0.resource.Observation.status");
    }

    #[test]
    fn date_formats() {
        assert!(leaf_problem("date", &json!("2024")).is_none());
        assert!(leaf_problem("date", &json!("2024-02-29")).is_none());
        assert!(leaf_problem("date", &json!("2024-13-01")).is_some());
        assert!(leaf_problem("date-time", &json!("2024-02-29T23:59:59.123+01:00")).is_none());
        assert!(leaf_problem("date-time", &json!("2024-02-29T24:00")).is_some());
        assert!(leaf_problem("integer", &json!(1.5)).is_some());
        assert!(leaf_problem("decimal", &json!(1.5)).is_none());
    }

    #[test]
    fn primitive_extension_members_are_accepted() {
        let schema = registry();
        let mut obs = observation();
        obs["_status"] = json!({"extension": []});
        assert!(SchemaValidator::new(&schema).is_valid(&obs));
    }
}
