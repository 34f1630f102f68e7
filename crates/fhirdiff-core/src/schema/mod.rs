//! Static FHIR schema registry.
//!
//! A [`SchemaRegistry`] maps a type name (a resource such as `Patient`, or a
//! complex data type such as `CodeableConcept`) to its ordered list of
//! [`FieldDescriptor`]s. The default registry is built once from a JSON table
//! embedded in the library; alternate tables can be supplied with
//! [`SchemaRegistry::from_json`].
//!
//! Table format: an object keyed by type name, each value either a plain list
//! of fields or `{"base": "<Type>", "fields": [...]}` to inherit the fields of
//! another type first. Each field is `{"key", "type", "items"?, "required"?}`.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::DiffError;

/// The FHIR R4B subset this crate scores out of the box.
const FHIR_R4B_JSON: &str = include_str!("fhir_r4b.json");

/// Declared type of every array field.
pub const ARRAY_TYPE: &str = "array";

/// Root of the resource hierarchy.
pub const RESOURCE_TYPE: &str = "Resource";

/// Primitive type names compared as leaves.
pub const LEAF_TYPES: &[&str] = &[
    "boolean",
    "integer",
    "string",
    "decimal",
    "number",
    "date-time",
    "date",
];

/// Declared type name of `date-time` leaves.
pub const DATE_TIME_TYPE: &str = "date-time";

/// Returns `true` if `type_name` is one of the primitive leaf types.
pub fn is_leaf_type(type_name: &str) -> bool {
    LEAF_TYPES.contains(&type_name)
}

/// Returns `true` if `type_name` names a complex type (leading uppercase).
pub fn is_struct_type(type_name: &str) -> bool {
    type_name.chars().next().is_some_and(char::is_uppercase)
}

// ---------------------------------------------------------------------------
// FieldDescriptor
// ---------------------------------------------------------------------------

/// How the engine handles a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldKind {
    /// A primitive compared by the leaf comparator.
    Leaf,
    /// A nested complex type expanded recursively.
    Struct,
    /// An ordered list whose items are aligned before being compared.
    Array {
        /// Declared type of each item.
        item_type: String,
    },
    /// Declared type matches none of the above; the field is not scored.
    Unclassified,
}

/// One field of a FHIR type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDescriptor {
    /// JSON member name.
    pub key: String,
    /// A primitive name, a complex type name, or `"array"`.
    pub declared_type: String,
    /// Whether the field must be present for the record to be valid.
    pub required: bool,
    /// Classification derived from `declared_type`.
    #[serde(flatten)]
    pub kind: FieldKind,
}

impl FieldDescriptor {
    /// Builds a descriptor, classifying `declared_type`.
    ///
    /// `items` is only consulted for array fields.
    pub fn new(key: &str, declared_type: &str, items: Option<&str>, required: bool) -> Self {
        let kind = if declared_type == ARRAY_TYPE {
            match items {
                Some(item_type) => FieldKind::Array {
                    item_type: item_type.to_owned(),
                },
                None => FieldKind::Unclassified,
            }
        } else if is_struct_type(declared_type) {
            FieldKind::Struct
        } else if is_leaf_type(declared_type) {
            FieldKind::Leaf
        } else {
            FieldKind::Unclassified
        };
        Self {
            key: key.to_owned(),
            declared_type: declared_type.to_owned(),
            required,
            kind,
        }
    }

    /// Returns `true` for primitive fields.
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, FieldKind::Leaf)
    }

    /// Returns `true` for complex-type fields.
    pub fn is_struct(&self) -> bool {
        matches!(self.kind, FieldKind::Struct)
    }

    /// Returns `true` for array fields.
    pub fn is_array(&self) -> bool {
        matches!(self.kind, FieldKind::Array { .. })
    }

    /// Item type of an array field.
    pub fn array_item_type(&self) -> Option<&str> {
        match &self.kind {
            FieldKind::Array { item_type } => Some(item_type),
            FieldKind::Leaf | FieldKind::Struct | FieldKind::Unclassified => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Table parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawField {
    key: String,
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default)]
    items: Option<String>,
    #[serde(default)]
    required: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDerived {
    base: String,
    fields: Vec<RawField>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawType {
    Fields(Vec<RawField>),
    Derived(RawDerived),
}

impl RawType {
    fn base(&self) -> Option<&str> {
        match self {
            Self::Fields(_) => None,
            Self::Derived(d) => Some(&d.base),
        }
    }

    fn fields(&self) -> &[RawField] {
        match self {
            Self::Fields(f) => f,
            Self::Derived(d) => &d.fields,
        }
    }
}

fn invalid(detail: impl Into<String>) -> DiffError {
    DiffError::InvalidSchema {
        detail: detail.into(),
    }
}

// ---------------------------------------------------------------------------
// SchemaRegistry
// ---------------------------------------------------------------------------

/// Immutable lookup table from type name to field descriptors.
///
/// Built once and passed by reference into every comparison; nothing in the
/// comparison path mutates it.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    types: BTreeMap<String, Vec<FieldDescriptor>>,
    bases: BTreeMap<String, String>,
}

impl SchemaRegistry {
    /// Builds the registry for the embedded FHIR R4B table.
    ///
    /// # Errors
    ///
    /// Returns [`DiffError::InvalidSchema`] only if the embedded table is
    /// corrupt, which the crate's own tests rule out.
    pub fn fhir_r4b() -> Result<Self, DiffError> {
        Self::from_json(FHIR_R4B_JSON)
    }

    /// Builds a registry from a JSON schema table.
    ///
    /// # Errors
    ///
    /// Returns [`DiffError::InvalidSchema`] if the table cannot be parsed, a
    /// base chain is cyclic or names an undefined type, a key is declared
    /// twice for one type, an array field has no item type, or a field refers
    /// to a complex type the table does not define.
    pub fn from_json(json: &str) -> Result<Self, DiffError> {
        let raw: BTreeMap<String, RawType> =
            serde_json::from_str(json).map_err(|e| invalid(format!("cannot parse table: {e}")))?;

        let mut types = BTreeMap::new();
        let mut bases = BTreeMap::new();
        for name in raw.keys() {
            let fields = resolve_fields(name, &raw, &mut Vec::new())?;
            types.insert(name.clone(), fields);
            if let Some(base) = raw.get(name).and_then(RawType::base) {
                bases.insert(name.clone(), base.to_owned());
            }
        }

        let registry = Self { types, bases };
        registry.check_references()?;
        Ok(registry)
    }

    fn check_references(&self) -> Result<(), DiffError> {
        for (name, fields) in &self.types {
            for field in fields {
                let referenced = match &field.kind {
                    FieldKind::Struct => Some(field.declared_type.as_str()),
                    FieldKind::Array { item_type } => Some(item_type.as_str()),
                    FieldKind::Leaf => None,
                    FieldKind::Unclassified if field.declared_type == ARRAY_TYPE => {
                        return Err(invalid(format!(
                            "{name}.{}: array field without item type",
                            field.key
                        )));
                    }
                    FieldKind::Unclassified => None,
                };
                if let Some(referenced) = referenced {
                    if !is_leaf_type(referenced) && !self.types.contains_key(referenced) {
                        return Err(invalid(format!(
                            "{name}.{}: references undefined type `{referenced}`",
                            field.key
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Ordered field descriptors of `type_name`, base fields first.
    pub fn fields(&self, type_name: &str) -> Option<&[FieldDescriptor]> {
        self.types.get(type_name).map(Vec::as_slice)
    }

    /// Looks up a single field of `type_name`.
    pub fn field(&self, type_name: &str, key: &str) -> Option<&FieldDescriptor> {
        self.fields(type_name)?.iter().find(|f| f.key == key)
    }

    /// Returns `true` if the registry defines `type_name`.
    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    /// Returns `true` if `type_name` is `Resource` or derives from it.
    pub fn is_resource(&self, type_name: &str) -> bool {
        let mut current = type_name;
        // Base chains were checked for cycles at construction.
        for _ in 0..=self.bases.len() {
            if current == RESOURCE_TYPE {
                return self.contains(RESOURCE_TYPE);
            }
            match self.bases.get(current) {
                Some(base) => current = base,
                None => return false,
            }
        }
        false
    }

    /// All defined type names, sorted.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }
}

fn resolve_fields(
    name: &str,
    raw: &BTreeMap<String, RawType>,
    stack: &mut Vec<String>,
) -> Result<Vec<FieldDescriptor>, DiffError> {
    if stack.iter().any(|s| s == name) {
        stack.push(name.to_owned());
        return Err(invalid(format!("cyclic base chain: {}", stack.join(" -> "))));
    }
    let entry = raw
        .get(name)
        .ok_or_else(|| invalid(format!("base type `{name}` is not defined")))?;

    stack.push(name.to_owned());
    let mut fields = match entry.base() {
        Some(base) => resolve_fields(base, raw, stack)?,
        None => Vec::new(),
    };
    stack.pop();

    for f in entry.fields() {
        if fields.iter().any(|existing| existing.key == f.key) {
            return Err(invalid(format!("{name}.{}: declared twice", f.key)));
        }
        fields.push(FieldDescriptor::new(
            &f.key,
            &f.type_name,
            f.items.as_deref(),
            f.required,
        ));
    }
    Ok(fields)
}
