//! Projection lowering.

use indexmap::IndexSet;
use typeshape_dynamodb_model::Schema;

use super::interner::AttributeInterner;
use super::operand::Path;

/// A lowered projection and the narrowed result shape it implies.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledProjection {
    /// Comma-separated name aliases.
    pub expression: String,
    /// Selected attribute names, first occurrence order.
    pub fields: Vec<String>,
    /// The entity schema restricted to the selected fields.
    pub shape: Schema,
}

/// Lower a selection of paths into a projection expression.
///
/// Returns `None` for an empty selection, in which case the full item is
/// read. A path selected more than once is emitted once.
pub fn compile_projection(
    selection: Vec<Path>,
    schema: &Schema,
    interner: &mut AttributeInterner,
) -> Option<CompiledProjection> {
    let fields: IndexSet<String> = selection
        .into_iter()
        .map(|path| path.key().to_owned())
        .collect();
    if fields.is_empty() {
        return None;
    }

    let aliases: Vec<String> = fields.iter().map(|field| interner.name_alias(field)).collect();
    let fields: Vec<String> = fields.into_iter().collect();

    Some(CompiledProjection {
        expression: aliases.join(", "),
        shape: schema.pick(&fields),
        fields,
    })
}

#[cfg(test)]
mod tests {
    use typeshape_dynamodb_model::FieldType;

    use super::*;

    fn schema() -> Schema {
        Schema::new()
            .with_field("name", FieldType::String)
            .with_field("age", FieldType::Number)
            .with_field("email", FieldType::String)
    }

    #[test]
    fn test_should_project_selected_fields() {
        let mut interner = AttributeInterner::new();
        let projection = compile_projection(
            vec![
                Path::new("name", FieldType::String),
                Path::new("age", FieldType::Number),
            ],
            &schema(),
            &mut interner,
        )
        .unwrap();

        assert_eq!(projection.expression, "#a0, #a1");
        assert_eq!(projection.fields, vec!["name", "age"]);
        assert_eq!(projection.shape.len(), 2);
        assert_eq!(projection.shape.field("age"), Some(&FieldType::Number));
        assert!(projection.shape.field("email").is_none());
    }

    #[test]
    fn test_should_emit_duplicate_selection_once() {
        let mut interner = AttributeInterner::new();
        let name = Path::new("name", FieldType::String);
        let projection =
            compile_projection(vec![name.clone(), name], &schema(), &mut interner).unwrap();
        assert_eq!(projection.expression, "#a0");
        assert_eq!(projection.fields, vec!["name"]);
    }

    #[test]
    fn test_should_reuse_aliases_from_earlier_clauses() {
        let mut interner = AttributeInterner::new();
        interner.name_alias("age");
        let projection = compile_projection(
            vec![
                Path::new("name", FieldType::String),
                Path::new("age", FieldType::Number),
            ],
            &schema(),
            &mut interner,
        )
        .unwrap();
        assert_eq!(projection.expression, "#a1, #a0");
    }

    #[test]
    fn test_should_return_none_for_empty_selection() {
        let mut interner = AttributeInterner::new();
        assert!(compile_projection(vec![], &schema(), &mut interner).is_none());
        assert!(interner.names().is_empty());
    }
}
