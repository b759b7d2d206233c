//! Update builder actions and their lowering.
//!
//! An update builder returns either an explicit action list or a map from
//! field name to value. Both are normalized into [`UpdateAction`]s,
//! bookkeeping actions are appended, and the result is grouped into one
//! `SET` and one `REMOVE` clause.

use indexmap::IndexMap;
use tracing::debug;

use super::ast::{SetAction, UpdateExpr};
use super::interner::AttributeInterner;
use super::operand::{Const, Operand, Path, Paths, Position};
use crate::error::{CompileError, CompileResult};

/// One mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateAction {
    /// `path = value`.
    Set {
        /// Target attribute.
        path: Path,
        /// New value.
        value: Operand,
    },
    /// `REMOVE path`.
    Remove {
        /// Attribute to remove.
        path: Path,
    },
    /// `path = list_append(path, value)`, emitted under `SET`.
    ListAppend {
        /// Target list attribute.
        path: Path,
        /// Elements to append.
        value: Operand,
    },
}

/// Value side of the map form of an update.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateValue {
    /// Assign this operand.
    Operand(Operand),
    /// Remove the attribute.
    Remove,
}

impl From<Operand> for UpdateValue {
    fn from(operand: Operand) -> Self {
        Self::Operand(operand)
    }
}

impl From<Path> for UpdateValue {
    fn from(path: Path) -> Self {
        Self::Operand(path.into())
    }
}

impl From<super::operand::Value> for UpdateValue {
    fn from(value: super::operand::Value) -> Self {
        Self::Operand(value.into())
    }
}

impl From<Const> for UpdateValue {
    fn from(constant: Const) -> Self {
        Self::Operand(constant.into())
    }
}

/// What an update builder returns.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateSpec {
    /// Explicit actions, emitted in order.
    Actions(Vec<UpdateAction>),
    /// Field name to value; `None` is an authoring error.
    Assignments(IndexMap<String, Option<UpdateValue>>),
}

impl Default for UpdateSpec {
    fn default() -> Self {
        Self::Actions(Vec::new())
    }
}

impl UpdateSpec {
    /// Normalize into an action list.
    fn into_actions(self, paths: &Paths) -> CompileResult<Vec<UpdateAction>> {
        match self {
            Self::Actions(actions) => Ok(actions),
            Self::Assignments(assignments) => assignments
                .into_iter()
                .map(|(field, value)| {
                    let path = paths.field(&field);
                    match value {
                        Some(UpdateValue::Operand(operand)) => Ok(path.set(operand)),
                        Some(UpdateValue::Remove) => Ok(path.remove()),
                        None => Err(CompileError::MissingUpdateValue { field }),
                    }
                })
                .collect(),
        }
    }
}

/// Entity metadata attributes maintained on every update.
#[derive(Debug, Clone, Default)]
pub struct Bookkeeping {
    /// Creation timestamp attribute, written once.
    pub created_at: Option<String>,
    /// Update timestamp attribute, overwritten every time.
    pub updated_at: Option<String>,
    /// Entity-type attribute and the entity name written to it once.
    pub entity_type: Option<(String, String)>,
    /// Host expression for the current timestamp.
    pub now_expression: String,
}

impl Bookkeeping {
    /// Actions in fixed order: created-at, updated-at, entity type.
    fn actions(&self, paths: &Paths) -> Vec<UpdateAction> {
        let mut actions = Vec::new();
        if let Some(attribute) = &self.created_at {
            let path = paths.field(attribute);
            actions.push(path.set(path.if_not_exists(Const::expr(&self.now_expression))));
        }
        if let Some(attribute) = &self.updated_at {
            actions.push(paths.field(attribute).set(Const::expr(&self.now_expression)));
        }
        if let Some((attribute, entity_name)) = &self.entity_type {
            let path = paths.field(attribute);
            actions.push(path.set(path.if_not_exists(Const::string(entity_name))));
        }
        actions
    }
}

/// Lower an update spec plus bookkeeping into `SET ... REMOVE ...`.
///
/// Returns an empty [`UpdateExpr`] when there is nothing to do; callers omit
/// the expression in that case.
pub fn compile_update(
    spec: UpdateSpec,
    paths: &Paths,
    bookkeeping: &Bookkeeping,
    interner: &mut AttributeInterner,
) -> CompileResult<UpdateExpr> {
    let mut actions = spec.into_actions(paths)?;
    let injected = bookkeeping.actions(paths);
    if !injected.is_empty() {
        debug!(count = injected.len(), "appending bookkeeping actions");
    }
    actions.extend(injected);

    let mut update = UpdateExpr::default();
    for action in actions {
        match action {
            UpdateAction::Set { path, value } => {
                let alias = interner.name_alias(path.key());
                let value =
                    value.resolve(interner, path.field_type(), Position::Update, "SET")?;
                update.set_actions.push(SetAction { path: alias, value });
            }
            UpdateAction::ListAppend { path, value } => {
                let alias = interner.name_alias(path.key());
                let value =
                    value.resolve(interner, path.field_type(), Position::Update, "list_append")?;
                update.set_actions.push(SetAction {
                    value: format!("list_append({alias}, {value})"),
                    path: alias,
                });
            }
            UpdateAction::Remove { path } => {
                update.remove_paths.push(interner.name_alias(path.key()));
            }
        }
    }

    Ok(update)
}

#[cfg(test)]
mod tests {
    use typeshape_dynamodb_model::{EntityDef, FieldType, KeyDef, Schema, ValueBinding};

    use super::*;
    use crate::expression::operand::{Value, Values};

    fn entity() -> EntityDef {
        EntityDef::builder()
            .name("Post")
            .table_name("main")
            .schema(
                Schema::new()
                    .with_field("title", FieldType::String)
                    .with_field("counter", FieldType::Number)
                    .with_field("tags", FieldType::list(FieldType::String)),
            )
            .partition_key(KeyDef::parse("pk", "POST#{id}").unwrap())
            .build()
    }

    fn compile(spec: UpdateSpec, bookkeeping: &Bookkeeping) -> (String, AttributeInterner) {
        let paths = Paths::from_entity(&entity());
        let mut interner = AttributeInterner::new();
        let update = compile_update(spec, &paths, bookkeeping, &mut interner).unwrap();
        (update.to_string(), interner)
    }

    #[test]
    fn test_should_compile_math_chain_under_set() {
        let paths = Paths::from_entity(&entity());
        let counter = paths.field("counter");
        let (text, _) = compile(
            UpdateSpec::Actions(vec![counter.set(counter.plus(1))]),
            &Bookkeeping::default(),
        );
        assert_eq!(text, "SET #a0 = #a0 + :v0");
    }

    #[test]
    fn test_should_emit_only_remove_clause() {
        let paths = Paths::from_entity(&entity());
        let (text, _) = compile(
            UpdateSpec::Actions(vec![paths.field("title").remove(), paths.field("tags").remove()]),
            &Bookkeeping::default(),
        );
        assert_eq!(text, "REMOVE #a0, #a1");
        assert!(!text.contains("SET"));
    }

    #[test]
    fn test_should_order_set_before_remove() {
        let paths = Paths::from_entity(&entity());
        let (text, _) = compile(
            UpdateSpec::Actions(vec![
                paths.field("title").remove(),
                paths.field("counter").set(Value::new("count")),
                paths.field("tags").list_append(Value::new("more")),
            ]),
            &Bookkeeping::default(),
        );
        assert_eq!(
            text,
            "SET #a1 = :v0, #a2 = list_append(#a2, :v1) REMOVE #a0"
        );
    }

    #[test]
    fn test_should_lower_assignment_map() {
        let values = Values::new(["title"]);
        let mut assignments = IndexMap::new();
        assignments.insert("title".to_owned(), Some(UpdateValue::from(values.input("title").unwrap())));
        assignments.insert("tags".to_owned(), Some(UpdateValue::Remove));

        let (text, interner) = compile(UpdateSpec::Assignments(assignments), &Bookkeeping::default());
        assert_eq!(text, "SET #a0 = :v0 REMOVE #a1");
        assert_eq!(interner.input_types()["title"], FieldType::String);
    }

    #[test]
    fn test_should_fail_on_undefined_assignment() {
        let paths = Paths::from_entity(&entity());
        let mut assignments = IndexMap::new();
        assignments.insert("title".to_owned(), None);

        let mut interner = AttributeInterner::new();
        let err = compile_update(
            UpdateSpec::Assignments(assignments),
            &paths,
            &Bookkeeping::default(),
            &mut interner,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "value for `title` is undefined");
    }

    #[test]
    fn test_should_fail_on_missing_set_operand() {
        let paths = Paths::from_entity(&entity());
        let mut interner = AttributeInterner::new();
        let err = compile_update(
            UpdateSpec::Actions(vec![paths.field("title").set(None::<Value>)]),
            &paths,
            &Bookkeeping::default(),
            &mut interner,
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::MissingOperand { operation: "SET" }));
    }

    #[test]
    fn test_should_append_bookkeeping_in_fixed_order() {
        let bookkeeping = Bookkeeping {
            created_at: Some("createdAt".into()),
            updated_at: Some("updatedAt".into()),
            entity_type: Some(("_type".into(), "Post".into())),
            now_expression: "Date.now()".into(),
        };
        let (text, interner) = compile(UpdateSpec::default(), &bookkeeping);
        assert_eq!(
            text,
            "SET #a0 = if_not_exists(#a0, :v0), #a1 = :v1, #a2 = if_not_exists(#a2, :v2)"
        );
        let names = interner.names();
        assert_eq!(names["#a0"], "createdAt");
        assert_eq!(names["#a1"], "updatedAt");
        assert_eq!(names["#a2"], "_type");
        let values = interner.values();
        assert_eq!(values[":v0"], ValueBinding::Const { text: "Date.now()".into() });
        assert_eq!(values[":v1"], ValueBinding::Const { text: "Date.now()".into() });
        assert_eq!(values[":v2"], ValueBinding::Const { text: "\"Post\"".into() });
    }

    #[test]
    fn test_should_append_bookkeeping_after_user_actions() {
        let paths = Paths::from_entity(&entity());
        let bookkeeping = Bookkeeping {
            updated_at: Some("updatedAt".into()),
            now_expression: "Date.now()".into(),
            ..Bookkeeping::default()
        };
        let (text, _) = compile(
            UpdateSpec::Actions(vec![paths.field("title").remove()]),
            &bookkeeping,
        );
        assert_eq!(text, "SET #a1 = :v0 REMOVE #a0");
    }

    #[test]
    fn test_should_produce_empty_update_without_actions() {
        let (text, _) = compile(UpdateSpec::default(), &Bookkeeping::default());
        assert!(text.is_empty());
    }
}
