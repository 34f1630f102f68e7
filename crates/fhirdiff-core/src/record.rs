/// Presence-checking accessor over a borrowed JSON record.
///
/// A [`Record`] is either absent or a reference into a `serde_json::Value`.
/// Looking up a key that does not exist, or looking up anything on a value
/// that is not an object, yields an absent record instead of an error. This
/// lets the diff engine walk both sides of a comparison in lock-step even
/// when their shapes disagree.
use serde::{Serialize, Serializer};
use serde_json::Value;

/// Key under which FHIR records carry their concrete type name.
pub const RESOURCE_TYPE_KEY: &str = "resourceType";

/// A possibly-absent borrowed JSON value.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Record<'a> {
    value: Option<&'a Value>,
}

/// Coarse shape of a present value, used by the array aligner to decide
/// whether two items may be paired at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind<'a> {
    /// A JSON object, with its `resourceType` (if any) and, for wrapper
    /// objects such as bundle entries, the `resourceType` of its nested
    /// `resource` member.
    Object {
        /// Own `resourceType`, when present and non-empty.
        resource_type: Option<&'a str>,
        /// `resource.resourceType`, when present and non-empty.
        nested_type: Option<&'a str>,
    },
    /// A JSON array.
    Array,
    /// A JSON string.
    String,
    /// A JSON number or boolean.
    Scalar,
    /// JSON `null`.
    Null,
}

impl<'a> Record<'a> {
    /// The absent record.
    pub const fn absent() -> Self {
        Self { value: None }
    }

    /// Wraps a present value. A JSON `null` is still reported absent by
    /// [`Record::is_absent`].
    pub const fn present(value: &'a Value) -> Self {
        Self { value: Some(value) }
    }

    /// Returns the raw value, or `None` if there is none.
    pub const fn value(&self) -> Option<&'a Value> {
        self.value
    }

    /// Returns the member `key` of an object value, or an absent record.
    pub fn get(&self, key: &str) -> Record<'a> {
        Record {
            value: self.value.and_then(|v| v.get(key)),
        }
    }

    /// Returns `true` if this record carries no data.
    ///
    /// Missing values, `null`, `""`, `[]` and `{}` are all treated alike.
    pub fn is_absent(&self) -> bool {
        match self.value {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.is_empty(),
            Some(Value::Array(a)) => a.is_empty(),
            Some(Value::Object(o)) => o.is_empty(),
            Some(Value::Bool(_) | Value::Number(_)) => false,
        }
    }

    /// Returns `true` if this record carries data.
    pub fn is_present(&self) -> bool {
        !self.is_absent()
    }

    /// Returns `true` if the value is a JSON object.
    pub fn is_object(&self) -> bool {
        matches!(self.value, Some(Value::Object(_)))
    }

    /// Returns the non-empty `resourceType` of an object value.
    pub fn resource_type(&self) -> Option<&'a str> {
        self.get(RESOURCE_TYPE_KEY)
            .value
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Returns the string content of a string value.
    pub fn as_str(&self) -> Option<&'a str> {
        self.value.and_then(Value::as_str)
    }

    /// Classifies the value, or returns `None` when there is no value.
    pub fn kind(&self) -> Option<ValueKind<'a>> {
        let value = self.value?;
        Some(match value {
            Value::Object(_) => ValueKind::Object {
                resource_type: self.resource_type(),
                nested_type: self.get("resource").resource_type(),
            },
            Value::Array(_) => ValueKind::Array,
            Value::String(_) => ValueKind::String,
            Value::Number(_) | Value::Bool(_) => ValueKind::Scalar,
            Value::Null => ValueKind::Null,
        })
    }

    /// Returns the items of an array value, dropping `null` items.
    ///
    /// Returns `None` if the value is present but not an array; an absent
    /// record yields an empty list.
    pub fn items(&self) -> Option<Vec<Record<'a>>> {
        match self.value {
            None | Some(Value::Null) => Some(Vec::new()),
            Some(Value::Array(items)) => Some(
                items
                    .iter()
                    .filter(|item| !item.is_null())
                    .map(Record::present)
                    .collect(),
            ),
            Some(Value::Bool(_) | Value::Number(_) | Value::String(_) | Value::Object(_)) => None,
        }
    }

    /// Returns the record with non-object values treated as absent.
    pub fn object_only(&self) -> Record<'a> {
        if self.is_object() { *self } else { Record::absent() }
    }

    /// Returns the record with object values treated as absent.
    pub fn scalar_only(&self) -> Record<'a> {
        if self.is_object() { Record::absent() } else { *self }
    }
}

impl<'a> From<&'a Value> for Record<'a> {
    fn from(value: &'a Value) -> Self {
        Record::present(value)
    }
}

impl<'a> From<Option<&'a Value>> for Record<'a> {
    fn from(value: Option<&'a Value>) -> Self {
        Record { value }
    }
}

impl Serialize for Record<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.value {
            Some(v) => v.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use serde_json::json;

    use super::*;

    #[test]
    fn missing_key_is_absent() {
        let v = json!({"status": "final"});
        let r = Record::present(&v);
        assert!(r.get("code").is_absent());
        assert!(r.get("code").get("coding").is_absent());
        assert!(r.get("status").is_present());
    }

    #[test]
    fn empty_values_are_absent() {
        for v in [json!(null), json!(""), json!([]), json!({})] {
            assert!(Record::present(&v).is_absent(), "{v} should be absent");
        }
        for v in [json!(0), json!(false), json!(" "), json!([1]), json!({"a": 1})] {
            assert!(Record::present(&v).is_present(), "{v} should be present");
        }
        assert!(Record::absent().is_absent());
    }

    #[test]
    fn lookup_on_scalar_is_absent() {
        let v = json!("text");
        assert!(Record::present(&v).get("anything").is_absent());
    }

    #[test]
    fn resource_type_ignores_empty_strings() {
        let v = json!({"resourceType": ""});
        assert_eq!(Record::present(&v).resource_type(), None);
        let v = json!({"resourceType": "Patient"});
        assert_eq!(Record::present(&v).resource_type(), Some("Patient"));
    }

    #[test]
    fn kind_reports_nested_resource_type() {
        let v = json!({"resource": {"resourceType": "Condition"}});
        assert_eq!(
            Record::present(&v).kind(),
            Some(ValueKind::Object {
                resource_type: None,
                nested_type: Some("Condition"),
            })
        );
        assert_eq!(Record::absent().kind(), None);
        assert_eq!(Record::present(&json!(true)).kind(), Some(ValueKind::Scalar));
    }

    #[test]
    fn items_drop_nulls_and_reject_scalars() {
        let v = json!([{"a": 1}, null, {"b": 2}]);
        let items = Record::present(&v).items().expect("array");
        assert_eq!(items.len(), 2);
        assert!(Record::absent().items().expect("absent").is_empty());
        assert!(Record::present(&json!("x")).items().is_none());
    }

    #[test]
    fn serializes_absent_as_null() {
        let s = serde_json::to_string(&Record::absent()).expect("serialize");
        assert_eq!(s, "null");
        let v = json!({"a": [1, 2]});
        let s = serde_json::to_string(&Record::present(&v)).expect("serialize");
        assert_eq!(s, r#"{"a":[1,2]}"#);
    }
}
