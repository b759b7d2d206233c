//! Attribute name/value alias tables.
//!
//! One [`AttributeInterner`] exists per command compilation and is shared by
//! every sub-compiler, so aliases are numbered globally across the
//! condition, filter, key-condition, projection and update expressions of
//! that command. Tables only ever grow.

use indexmap::IndexMap;
use tracing::trace;
use typeshape_dynamodb_model::{FieldType, ValueBinding};

/// Issues `#aN` name aliases and `:vN` value aliases.
#[derive(Debug, Default)]
pub struct AttributeInterner {
    /// Raw attribute name -> `#aN`, in first-seen order.
    names: IndexMap<String, String>,
    /// Input key -> `:vN`.
    inputs: IndexMap<String, String>,
    /// `:vN` -> binding, for inputs and constants alike.
    values: IndexMap<String, ValueBinding>,
}

impl AttributeInterner {
    /// Create an empty interner.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Alias for a stored attribute name, allocating one on first sight.
    pub fn name_alias(&mut self, raw: &str) -> String {
        if let Some(alias) = self.names.get(raw) {
            return alias.clone();
        }
        let alias = format!("#a{}", self.names.len());
        trace!(raw, alias = %alias, "allocated name alias");
        self.names.insert(raw.to_owned(), alias.clone());
        alias
    }

    /// Alias for a command input, allocating one on first sight.
    pub fn value_alias(&mut self, key: &str) -> String {
        if let Some(alias) = self.inputs.get(key) {
            return alias.clone();
        }
        let alias = self.next_value_alias();
        trace!(key, alias = %alias, "allocated input alias");
        self.inputs.insert(key.to_owned(), alias.clone());
        self.values.insert(
            alias.clone(),
            ValueBinding::Input {
                key: key.to_owned(),
                field_type: None,
            },
        );
        alias
    }

    /// Fresh alias bound to a verbatim host expression.
    ///
    /// Constants are never deduplicated: equal texts get distinct aliases.
    pub fn const_alias(&mut self, text: &str) -> String {
        let alias = self.next_value_alias();
        trace!(text, alias = %alias, "allocated constant alias");
        self.values.insert(
            alias.clone(),
            ValueBinding::Const {
                text: text.to_owned(),
            },
        );
        alias
    }

    /// Record the type an input is coerced to. The first typed binding wins;
    /// untyped contexts carry no information and are ignored.
    pub fn bind_input_type(&mut self, key: &str, field_type: &FieldType) {
        if matches!(field_type, FieldType::Any) {
            return;
        }
        let Some(alias) = self.inputs.get(key) else {
            return;
        };
        if let Some(ValueBinding::Input {
            field_type: slot, ..
        }) = self.values.get_mut(alias)
        {
            if slot.is_none() {
                *slot = Some(field_type.clone());
            }
        }
    }

    /// Snapshot of `ExpressionAttributeNames` (`#aN` -> raw name).
    #[must_use]
    pub fn names(&self) -> IndexMap<String, String> {
        self.names
            .iter()
            .map(|(raw, alias)| (alias.clone(), raw.clone()))
            .collect()
    }

    /// Snapshot of `ExpressionAttributeValues` (`:vN` -> binding).
    #[must_use]
    pub fn values(&self) -> IndexMap<String, ValueBinding> {
        self.values.clone()
    }

    /// Types bound to inputs so far, in alias order.
    #[must_use]
    pub fn input_types(&self) -> IndexMap<String, FieldType> {
        self.values
            .values()
            .filter_map(|binding| match binding {
                ValueBinding::Input {
                    key,
                    field_type: Some(field_type),
                } => Some((key.clone(), field_type.clone())),
                _ => None,
            })
            .collect()
    }

    fn next_value_alias(&self) -> String {
        format!(":v{}", self.values.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_reuse_name_alias_for_same_key() {
        let mut interner = AttributeInterner::new();
        assert_eq!(interner.name_alias("status"), "#a0");
        assert_eq!(interner.name_alias("status"), "#a0");
        assert_eq!(interner.name_alias("age"), "#a1");
        assert_eq!(interner.names().len(), 2);
        assert_eq!(interner.names()["#a0"], "status");
    }

    #[test]
    fn test_should_accept_empty_keys() {
        let mut interner = AttributeInterner::new();
        assert_eq!(interner.name_alias(""), "#a0");
        assert_eq!(interner.value_alias(""), ":v0");
    }

    #[test]
    fn test_should_share_value_numbering_between_inputs_and_constants() {
        let mut interner = AttributeInterner::new();
        assert_eq!(interner.value_alias("status"), ":v0");
        assert_eq!(interner.const_alias("1"), ":v1");
        assert_eq!(interner.value_alias("status"), ":v0");
        assert_eq!(interner.value_alias("age"), ":v2");
        assert_eq!(interner.values().len(), 3);
    }

    #[test]
    fn test_should_never_deduplicate_constants() {
        let mut interner = AttributeInterner::new();
        assert_eq!(interner.const_alias("Date.now()"), ":v0");
        assert_eq!(interner.const_alias("Date.now()"), ":v1");
    }

    #[test]
    fn test_should_keep_first_typed_binding() {
        let mut interner = AttributeInterner::new();
        interner.value_alias("x");
        interner.bind_input_type("x", &FieldType::Any);
        interner.bind_input_type("x", &FieldType::Number);
        interner.bind_input_type("x", &FieldType::String);

        assert_eq!(
            interner.values()[":v0"],
            ValueBinding::Input {
                key: "x".into(),
                field_type: Some(FieldType::Number),
            }
        );
        assert_eq!(interner.input_types()["x"], FieldType::Number);
    }

    #[test]
    fn test_should_start_with_empty_tables() {
        let interner = AttributeInterner::new();
        assert!(interner.names().is_empty());
        assert!(interner.values().is_empty());
    }
}
