//! Entity, table and key definitions.
//!
//! An [`EntityDef`] is the read-only metadata the compiler consumes: the
//! table it lives in, its field shape, how its partition/sort keys are
//! formatted from command inputs, and which bookkeeping attributes it
//! declares.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::error::KeyTemplateError;
use crate::payload::string_literal;
use crate::types::{FieldType, Schema};

/// One piece of a key template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySegment {
    /// Literal text copied into the key as is.
    Literal(String),
    /// Reference to a command input by name.
    Input(String),
}

/// A formatted key such as `"USER#{id}"`: literal text interleaved with
/// `{input}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyTemplate {
    segments: Vec<KeySegment>,
}

impl KeyTemplate {
    /// The parsed segments in order.
    #[must_use]
    pub fn segments(&self) -> &[KeySegment] {
        &self.segments
    }

    /// Names of the inputs referenced by the template, in order of appearance.
    pub fn inputs(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            KeySegment::Input(name) => Some(name.as_str()),
            KeySegment::Literal(_) => None,
        })
    }

    /// Render the template as a host expression over `input_ident`.
    ///
    /// A lone placeholder renders as a plain input reference, pure literal
    /// text as a quoted string, and anything mixed as a template string.
    #[must_use]
    pub fn render(&self, input_ident: &str) -> String {
        match self.segments.as_slice() {
            [] => string_literal(""),
            [KeySegment::Input(name)] => format!("{input_ident}.{name}"),
            [KeySegment::Literal(text)] => string_literal(text),
            segments => {
                let mut out = String::from("`");
                for segment in segments {
                    match segment {
                        KeySegment::Literal(text) => out.push_str(&escape_template(text)),
                        KeySegment::Input(name) => {
                            out.push_str("${");
                            out.push_str(input_ident);
                            out.push('.');
                            out.push_str(name);
                            out.push('}');
                        }
                    }
                }
                out.push('`');
                out
            }
        }
    }
}

fn escape_template(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('`', "\\`")
        .replace("${", "\\${")
}

impl FromStr for KeyTemplate {
    type Err = KeyTemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = s.char_indices();

        while let Some((offset, c)) = chars.next() {
            match c {
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for (_, c) in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        name.push(c);
                    }
                    if !closed {
                        return Err(KeyTemplateError::UnclosedPlaceholder { offset });
                    }
                    let name = name.trim();
                    if name.is_empty() {
                        return Err(KeyTemplateError::EmptyPlaceholder { offset });
                    }
                    if !literal.is_empty() {
                        segments.push(KeySegment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(KeySegment::Input(name.to_owned()));
                }
                '}' => return Err(KeyTemplateError::UnbalancedBrace { offset }),
                c => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(KeySegment::Literal(literal));
        }

        Ok(Self { segments })
    }
}

impl fmt::Display for KeyTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                KeySegment::Literal(text) => f.write_str(text)?,
                KeySegment::Input(name) => write!(f, "{{{name}}}")?,
            }
        }
        Ok(())
    }
}

impl Serialize for KeyTemplate {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for KeyTemplate {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A key attribute together with the template its value is formatted from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyDef {
    /// Stored attribute name (e.g. `pk`).
    pub attribute: String,
    /// How the attribute value is built from inputs.
    pub template: KeyTemplate,
}

impl KeyDef {
    /// Create a key definition from an already parsed template.
    #[must_use]
    pub fn new(attribute: impl Into<String>, template: KeyTemplate) -> Self {
        Self {
            attribute: attribute.into(),
            template,
        }
    }

    /// Create a key definition, parsing `template`.
    pub fn parse(attribute: impl Into<String>, template: &str) -> Result<Self, KeyTemplateError> {
        Ok(Self::new(attribute, template.parse()?))
    }
}

/// A secondary index over the entity's table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDef {
    /// Index name as known to the table.
    pub name: String,
    /// Index partition key.
    pub partition_key: KeyDef,
    /// Index sort key, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_key: Option<KeyDef>,
}

/// Metadata of one entity stored in a (possibly shared) table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct EntityDef {
    /// Entity name, also the value written to the entity-type attribute.
    #[builder(setter(into))]
    pub name: String,

    /// Backing table name.
    #[builder(setter(into))]
    pub table_name: String,

    /// Declared field shape.
    #[builder(default)]
    pub schema: Schema,

    /// Table partition key.
    pub partition_key: KeyDef,

    /// Table sort key.
    #[builder(default, setter(strip_option))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_key: Option<KeyDef>,

    /// Secondary indexes usable by queries and scans.
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<IndexDef>,

    /// Attribute holding the creation timestamp, written once.
    #[builder(default, setter(strip_option, into))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    /// Attribute holding the last-update timestamp, overwritten on every update.
    #[builder(default, setter(strip_option, into))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,

    /// Attribute holding the entity-type discriminator, written once.
    #[builder(default, setter(strip_option, into))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type_attribute: Option<String>,
}

impl EntityDef {
    /// The table key definitions: partition key first, then the sort key.
    pub fn table_keys(&self) -> impl Iterator<Item = &KeyDef> {
        std::iter::once(&self.partition_key).chain(self.sort_key.as_ref())
    }

    /// Look up a secondary index by name.
    #[must_use]
    pub fn index(&self, name: &str) -> Option<&IndexDef> {
        self.indexes.iter().find(|index| index.name == name)
    }

    /// Declared type of a field, [`FieldType::Any`] when undeclared.
    #[must_use]
    pub fn field_type(&self, name: &str) -> FieldType {
        self.schema.field(name).cloned().unwrap_or(FieldType::Any)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_parse_mixed_template() {
        let template: KeyTemplate = "USER#{id}#ORDER#{ orderId }".parse().unwrap();
        assert_eq!(
            template.segments(),
            &[
                KeySegment::Literal("USER#".into()),
                KeySegment::Input("id".into()),
                KeySegment::Literal("#ORDER#".into()),
                KeySegment::Input("orderId".into()),
            ]
        );
        assert_eq!(template.inputs().collect::<Vec<_>>(), vec!["id", "orderId"]);
        assert_eq!(template.to_string(), "USER#{id}#ORDER#{orderId}");
    }

    #[test]
    fn test_should_reject_malformed_templates() {
        assert_eq!(
            "USER#{id".parse::<KeyTemplate>(),
            Err(KeyTemplateError::UnclosedPlaceholder { offset: 5 })
        );
        assert_eq!(
            "USER}".parse::<KeyTemplate>(),
            Err(KeyTemplateError::UnbalancedBrace { offset: 4 })
        );
        assert_eq!(
            "{ }".parse::<KeyTemplate>(),
            Err(KeyTemplateError::EmptyPlaceholder { offset: 0 })
        );
    }

    #[test]
    fn test_should_render_templates() {
        let single: KeyTemplate = "{id}".parse().unwrap();
        assert_eq!(single.render("input"), "input.id");

        let literal: KeyTemplate = "PROFILE".parse().unwrap();
        assert_eq!(literal.render("input"), "\"PROFILE\"");

        let mixed: KeyTemplate = "USER#{id}".parse().unwrap();
        assert_eq!(mixed.render("args"), "`USER#${args.id}`");

        let escaped: KeyTemplate = "a`b{id}".parse().unwrap();
        assert_eq!(escaped.render("input"), "`a\\`b${input.id}`");
    }

    #[test]
    fn test_should_build_entity_with_typed_builder() {
        let entity = EntityDef::builder()
            .name("User")
            .table_name("main")
            .schema(Schema::new().with_field("id", FieldType::String))
            .partition_key(KeyDef::parse("pk", "USER#{id}").unwrap())
            .sort_key(KeyDef::parse("sk", "PROFILE").unwrap())
            .created_at("createdAt")
            .build();

        let keys: Vec<_> = entity.table_keys().map(|k| k.attribute.as_str()).collect();
        assert_eq!(keys, vec!["pk", "sk"]);
        assert_eq!(entity.created_at.as_deref(), Some("createdAt"));
        assert!(entity.updated_at.is_none());
        assert_eq!(entity.field_type("id"), FieldType::String);
        assert_eq!(entity.field_type("nope"), FieldType::Any);
    }

    #[test]
    fn test_should_round_trip_key_template_through_json() {
        let key = KeyDef::parse("pk", "USER#{id}").unwrap();
        let json = serde_json::to_string(&key).expect("test serialization");
        assert_eq!(json, r#"{"attribute":"pk","template":"USER#{id}"}"#);
        let back: KeyDef = serde_json::from_str(&json).expect("test deserialization");
        assert_eq!(back, key);
    }
}
