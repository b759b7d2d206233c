//! Command payload types.
//!
//! All payload fields use `PascalCase` JSON naming to match the DynamoDB
//! wire protocol. Absent expressions and empty maps are omitted entirely so
//! the renderer never emits an empty expression string or an empty object.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::types::FieldType;

/// What an `ExpressionAttributeValues` alias stands for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ValueBinding {
    /// Pass-through of a command input.
    #[serde(rename_all = "camelCase")]
    Input {
        /// Input name.
        key: String,
        /// Type the input is coerced to, bound by the first path it was
        /// compared against.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        field_type: Option<FieldType>,
    },
    /// Verbatim host expression (literal or computed default).
    Const {
        /// Rendered expression text.
        text: String,
    },
}

impl ValueBinding {
    /// Render the binding as a host expression over `input_ident`.
    #[must_use]
    pub fn render(&self, input_ident: &str) -> String {
        match self {
            Self::Input { key, .. } => format!("{input_ident}.{key}"),
            Self::Const { text } => text.clone(),
        }
    }
}

/// The assembled command payload handed to the renderer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CommandPayload {
    /// Target table.
    pub table_name: String,

    /// Secondary index for queries and scans.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,

    /// Key attribute name to rendered key expression.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub key: IndexMap<String, String>,

    /// Attribute name to rendered value expression, for puts.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub item: IndexMap<String, String>,

    /// A condition that must hold for a write to succeed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_expression: Option<String>,

    /// A post-read filter for queries and scans.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_expression: Option<String>,

    /// The key condition of a query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_condition_expression: Option<String>,

    /// `SET`/`REMOVE` clauses of an update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_expression: Option<String>,

    /// Attributes to return.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projection_expression: Option<String>,

    /// Substitution tokens for attribute names (`#aN` -> name).
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub expression_attribute_names: IndexMap<String, String>,

    /// Substitution tokens for attribute values (`:vN` -> binding).
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub expression_attribute_values: IndexMap<String, ValueBinding>,
}

/// Quote `text` as a double-quoted string literal with JSON escaping.
#[must_use]
pub fn string_literal(text: &str) -> String {
    serde_json::Value::from(text).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_omit_empty_fields() {
        let payload = CommandPayload {
            table_name: "main".into(),
            ..CommandPayload::default()
        };
        let json = serde_json::to_string(&payload).expect("test serialization");
        assert_eq!(json, r#"{"TableName":"main"}"#);
    }

    #[test]
    fn test_should_serialize_pascal_case_fields() {
        let mut payload = CommandPayload {
            table_name: "main".into(),
            condition_expression: Some("#a0 = :v0".into()),
            ..CommandPayload::default()
        };
        payload
            .expression_attribute_names
            .insert("#a0".into(), "status".into());
        payload.expression_attribute_values.insert(
            ":v0".into(),
            ValueBinding::Input {
                key: "status".into(),
                field_type: Some(FieldType::String),
            },
        );

        let json = serde_json::to_value(&payload).expect("test serialization");
        assert_eq!(json["ConditionExpression"], "#a0 = :v0");
        assert_eq!(json["ExpressionAttributeNames"]["#a0"], "status");
        assert_eq!(json["ExpressionAttributeValues"][":v0"]["kind"], "input");
        assert_eq!(
            json["ExpressionAttributeValues"][":v0"]["fieldType"]["type"],
            "string"
        );
        assert!(json.get("UpdateExpression").is_none());
    }

    #[test]
    fn test_should_render_bindings() {
        let input = ValueBinding::Input {
            key: "id".into(),
            field_type: None,
        };
        assert_eq!(input.render("input"), "input.id");
        let constant = ValueBinding::Const {
            text: "Date.now()".into(),
        };
        assert_eq!(constant.render("input"), "Date.now()");
    }

    #[test]
    fn test_should_quote_string_literals() {
        assert_eq!(string_literal("User"), "\"User\"");
        assert_eq!(string_literal("a\"b"), "\"a\\\"b\"");
    }
}
