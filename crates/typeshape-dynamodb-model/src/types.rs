//! Field types and schema shapes.
//!
//! The compiler only needs enough type information to decide how an input
//! value bound against a stored attribute should be coerced, and to rebuild
//! the row shape of a projection. Richer schema primitives live upstream.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// DynamoDB attribute type codes, as accepted by `attribute_type(path, type)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeType {
    /// `S`
    String,
    /// `N`
    Number,
    /// `B`
    Binary,
    /// `BOOL`
    Boolean,
    /// `NULL`
    Null,
    /// `L`
    List,
    /// `M`
    Map,
    /// `SS`
    StringSet,
    /// `NS`
    NumberSet,
    /// `BS`
    BinarySet,
}

impl AttributeType {
    /// Returns the DynamoDB wire-format string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "S",
            Self::Number => "N",
            Self::Binary => "B",
            Self::Boolean => "BOOL",
            Self::Null => "NULL",
            Self::List => "L",
            Self::Map => "M",
            Self::StringSet => "SS",
            Self::NumberSet => "NS",
            Self::BinarySet => "BS",
        }
    }

    /// Parse a wire-format type code.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "S" => Some(Self::String),
            "N" => Some(Self::Number),
            "B" => Some(Self::Binary),
            "BOOL" => Some(Self::Boolean),
            "NULL" => Some(Self::Null),
            "L" => Some(Self::List),
            "M" => Some(Self::Map),
            "SS" => Some(Self::StringSet),
            "NS" => Some(Self::NumberSet),
            "BS" => Some(Self::BinarySet),
            _ => None,
        }
    }
}

impl Serialize for AttributeType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AttributeType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_code(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown attribute type: {s}")))
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared type of a stored field or a bound input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FieldType {
    /// UTF-8 string.
    String,
    /// Number (integer or decimal).
    Number,
    /// Boolean.
    Boolean,
    /// Binary blob.
    Binary,
    /// Explicit null.
    Null,
    /// Homogeneous list.
    List {
        /// Element type.
        items: Box<FieldType>,
    },
    /// String-keyed map with homogeneous values.
    Map {
        /// Value type.
        values: Box<FieldType>,
    },
    /// Nested object with a known shape.
    Object {
        /// Field shape of the nested object.
        shape: Schema,
    },
    /// Set of strings.
    StringSet,
    /// Set of numbers.
    NumberSet,
    /// Set of binaries.
    BinarySet,
    /// Untyped; no coercion is applied.
    Any,
}

impl FieldType {
    /// Shorthand for a list of `items`.
    #[must_use]
    pub fn list(items: Self) -> Self {
        Self::List {
            items: Box::new(items),
        }
    }

    /// Shorthand for a map with `values`.
    #[must_use]
    pub fn map(values: Self) -> Self {
        Self::Map {
            values: Box::new(values),
        }
    }

    /// The type of a single element, for containment checks.
    ///
    /// Lists yield their item type and sets their scalar type. Strings
    /// contain substrings, so scalars yield themselves.
    #[must_use]
    pub fn element_type(&self) -> Self {
        match self {
            Self::List { items } => items.as_ref().clone(),
            Self::StringSet => Self::String,
            Self::NumberSet => Self::Number,
            Self::BinarySet => Self::Binary,
            other => other.clone(),
        }
    }

    /// Returns `true` for numeric fields.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Number)
    }
}

/// Ordered field shape of an entity or nested object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    fields: IndexMap<String, FieldType>,
}

impl Schema {
    /// Create an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a field, keeping the original position on replace.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.insert(name.into(), field_type);
        self
    }

    /// Look up a field's declared type.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldType> {
        self.fields.get(name)
    }

    /// Iterate fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldType)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of declared fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if no fields are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Restrict the shape to `names`, in the order given.
    ///
    /// Names that are not declared come back as [`FieldType::Any`].
    #[must_use]
    pub fn pick<S: AsRef<str>>(&self, names: &[S]) -> Self {
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                let field_type = self.field(name).cloned().unwrap_or(FieldType::Any);
                (name.to_owned(), field_type)
            })
            .collect()
    }
}

impl<K: Into<String>> FromIterator<(K, FieldType)> for Schema {
    fn from_iter<I: IntoIterator<Item = (K, FieldType)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_map_attribute_codes() {
        assert_eq!(AttributeType::StringSet.as_str(), "SS");
        assert_eq!(AttributeType::from_code("BOOL"), Some(AttributeType::Boolean));
        assert_eq!(AttributeType::from_code("X"), None);
    }

    #[test]
    fn test_should_resolve_element_types() {
        assert_eq!(
            FieldType::list(FieldType::String).element_type(),
            FieldType::String
        );
        assert_eq!(FieldType::NumberSet.element_type(), FieldType::Number);
        assert_eq!(FieldType::String.element_type(), FieldType::String);
    }

    #[test]
    fn test_should_pick_fields_in_selection_order() {
        let schema = Schema::new()
            .with_field("id", FieldType::String)
            .with_field("age", FieldType::Number)
            .with_field("tags", FieldType::StringSet);

        let picked = schema.pick(&["tags", "id", "missing"]);
        let names: Vec<_> = picked.fields().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["tags", "id", "missing"]);
        assert_eq!(picked.field("missing"), Some(&FieldType::Any));
        assert_eq!(picked.field("age"), None);
    }

    #[test]
    fn test_should_serialize_field_type_with_tag() {
        let json = serde_json::to_string(&FieldType::list(FieldType::Number))
            .expect("test serialization");
        assert_eq!(json, r#"{"type":"list","items":{"type":"number"}}"#);
    }
}
