//! Operand model.
//!
//! Builders work with four operand kinds: [`Path`] (a stored attribute),
//! [`Value`] (a command input), [`Const`] (a verbatim host expression) and
//! math chains over those. Operands are inert descriptions; aliases are only
//! allocated when a tree is lowered against an [`AttributeInterner`], in
//! left-to-right order.

use indexmap::{IndexMap, IndexSet};
use typeshape_dynamodb_model::payload::string_literal;
use typeshape_dynamodb_model::{AttributeType, EntityDef, FieldType};

use super::ast::{ArithOp, CompareOp, FunctionName};
use super::condition::{Condition, PredicateForm, Target};
use super::interner::AttributeInterner;
use super::update::UpdateAction;
use crate::error::{CompileError, CompileResult};

/// Reference to a stored attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    key: String,
    field_type: FieldType,
}

/// Reference to a caller-supplied command input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Value {
    key: String,
}

/// Host expression inserted verbatim behind a fresh value alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Const {
    text: String,
}

/// `head + a - b ...`, numeric throughout.
#[derive(Debug, Clone, PartialEq)]
pub struct Math {
    head: Operand,
    terms: Vec<(ArithOp, Operand)>,
}

/// `size(path)`, only usable on the left of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct Size {
    path: Path,
}

/// Any right-hand side a comparison or update action accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Stored attribute.
    Path(Path),
    /// Command input.
    Value(Value),
    /// Verbatim host expression.
    Const(Const),
    /// Arithmetic chain.
    Math(Box<Math>),
    /// `size(path)`.
    Size(Path),
    /// `if_not_exists(path, value)`.
    IfNotExists {
        /// Attribute checked for existence.
        path: Path,
        /// Fallback when the attribute is absent.
        value: Box<Operand>,
    },
    /// No operand was supplied. Lowering fails on it.
    Missing,
}

impl Path {
    /// Create a path over `key` declared as `field_type`.
    #[must_use]
    pub fn new(key: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            key: key.into(),
            field_type,
        }
    }

    /// Raw attribute name.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Declared type.
    #[must_use]
    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }

    fn target(&self) -> Target {
        Target {
            left: Operand::Path(self.clone()),
            subject: self.key.clone(),
            context: self.field_type.clone(),
        }
    }

    fn function(&self, name: FunctionName, args: Vec<Operand>, context: FieldType) -> Condition {
        let mut all = Vec::with_capacity(args.len() + 1);
        all.push(Operand::Path(self.clone()));
        all.extend(args);
        Condition::predicate(
            self.key.clone(),
            context,
            PredicateForm::Function { name, args: all },
        )
    }

    /// `path = right`.
    #[allow(clippy::should_implement_trait)]
    pub fn eq(&self, right: impl Into<Operand>) -> Condition {
        Condition::compare(self.target(), CompareOp::Eq, right.into())
    }

    /// `path <> right`.
    pub fn neq(&self, right: impl Into<Operand>) -> Condition {
        Condition::compare(self.target(), CompareOp::Ne, right.into())
    }

    /// `path > right`.
    pub fn gt(&self, right: impl Into<Operand>) -> Condition {
        Condition::compare(self.target(), CompareOp::Gt, right.into())
    }

    /// `path >= right`.
    pub fn gte(&self, right: impl Into<Operand>) -> Condition {
        Condition::compare(self.target(), CompareOp::Ge, right.into())
    }

    /// `path < right`.
    pub fn lt(&self, right: impl Into<Operand>) -> Condition {
        Condition::compare(self.target(), CompareOp::Lt, right.into())
    }

    /// `path <= right`.
    pub fn lte(&self, right: impl Into<Operand>) -> Condition {
        Condition::compare(self.target(), CompareOp::Le, right.into())
    }

    /// `path BETWEEN low AND high`.
    pub fn between(&self, low: impl Into<Operand>, high: impl Into<Operand>) -> Condition {
        Condition::between(self.target(), low.into(), high.into())
    }

    /// `path IN (a, b, ...)`.
    pub fn is_in<I, O>(&self, candidates: I) -> Condition
    where
        I: IntoIterator<Item = O>,
        O: Into<Operand>,
    {
        Condition::within(self.target(), candidates.into_iter().map(Into::into).collect())
    }

    /// `begins_with(path, prefix)`.
    pub fn begins_with(&self, prefix: impl Into<Operand>) -> Condition {
        self.function(
            FunctionName::BeginsWith,
            vec![prefix.into()],
            self.field_type.clone(),
        )
    }

    /// `attribute_exists(path)`.
    #[must_use]
    pub fn exists(&self) -> Condition {
        self.function(FunctionName::AttributeExists, vec![], FieldType::Any)
    }

    /// `attribute_not_exists(path)`.
    #[must_use]
    pub fn not_exists(&self) -> Condition {
        self.function(FunctionName::AttributeNotExists, vec![], FieldType::Any)
    }

    /// `attribute_type(path, type)`, the type code bound as a constant.
    #[must_use]
    pub fn has_type(&self, attribute_type: AttributeType) -> Condition {
        self.function(
            FunctionName::AttributeType,
            vec![Operand::Const(Const::string(attribute_type.as_str()))],
            FieldType::String,
        )
    }

    /// `contains(path, element)`; inputs bind to the element type.
    pub fn contains(&self, element: impl Into<Operand>) -> Condition {
        self.function(
            FunctionName::Contains,
            vec![element.into()],
            self.field_type.element_type(),
        )
    }

    /// `size(path)` as the left side of a further comparison.
    #[must_use]
    pub fn size(&self) -> Size {
        Size { path: self.clone() }
    }

    /// `SET path = value`.
    pub fn set(&self, value: impl Into<Operand>) -> UpdateAction {
        UpdateAction::Set {
            path: self.clone(),
            value: value.into(),
        }
    }

    /// `REMOVE path`.
    #[must_use]
    pub fn remove(&self) -> UpdateAction {
        UpdateAction::Remove { path: self.clone() }
    }

    /// `SET path = list_append(path, value)`.
    pub fn list_append(&self, value: impl Into<Operand>) -> UpdateAction {
        UpdateAction::ListAppend {
            path: self.clone(),
            value: value.into(),
        }
    }

    /// `path + rhs`.
    pub fn plus(&self, rhs: impl Into<Operand>) -> Operand {
        Operand::Path(self.clone()).plus(rhs)
    }

    /// `path - rhs`.
    pub fn minus(&self, rhs: impl Into<Operand>) -> Operand {
        Operand::Path(self.clone()).minus(rhs)
    }

    /// `if_not_exists(path, fallback)`.
    pub fn if_not_exists(&self, fallback: impl Into<Operand>) -> Operand {
        Operand::IfNotExists {
            path: self.clone(),
            value: Box::new(fallback.into()),
        }
    }
}

impl Size {
    fn target(&self) -> Target {
        Target {
            left: Operand::Size(self.path.clone()),
            subject: self.path.key.clone(),
            context: FieldType::Number,
        }
    }

    /// `size(path) = right`.
    #[allow(clippy::should_implement_trait)]
    pub fn eq(&self, right: impl Into<Operand>) -> Condition {
        Condition::compare(self.target(), CompareOp::Eq, right.into())
    }

    /// `size(path) <> right`.
    pub fn neq(&self, right: impl Into<Operand>) -> Condition {
        Condition::compare(self.target(), CompareOp::Ne, right.into())
    }

    /// `size(path) > right`.
    pub fn gt(&self, right: impl Into<Operand>) -> Condition {
        Condition::compare(self.target(), CompareOp::Gt, right.into())
    }

    /// `size(path) >= right`.
    pub fn gte(&self, right: impl Into<Operand>) -> Condition {
        Condition::compare(self.target(), CompareOp::Ge, right.into())
    }

    /// `size(path) < right`.
    pub fn lt(&self, right: impl Into<Operand>) -> Condition {
        Condition::compare(self.target(), CompareOp::Lt, right.into())
    }

    /// `size(path) <= right`.
    pub fn lte(&self, right: impl Into<Operand>) -> Condition {
        Condition::compare(self.target(), CompareOp::Le, right.into())
    }

    /// `size(path) BETWEEN low AND high`.
    pub fn between(&self, low: impl Into<Operand>, high: impl Into<Operand>) -> Condition {
        Condition::between(self.target(), low.into(), high.into())
    }
}

impl Value {
    /// Create a reference to input `key`.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    /// Input name.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Const {
    /// A host expression used verbatim, e.g. `Date.now()`.
    #[must_use]
    pub fn expr(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// A string literal, quoted for the host language.
    #[must_use]
    pub fn string(value: &str) -> Self {
        Self {
            text: string_literal(value),
        }
    }

    /// Rendered text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl Operand {
    /// Extend into (or start) a math chain: `self + rhs`.
    #[must_use]
    pub fn plus(self, rhs: impl Into<Operand>) -> Operand {
        self.chain(ArithOp::Plus, rhs.into())
    }

    /// Extend into (or start) a math chain: `self - rhs`.
    #[must_use]
    pub fn minus(self, rhs: impl Into<Operand>) -> Operand {
        self.chain(ArithOp::Minus, rhs.into())
    }

    fn chain(self, op: ArithOp, rhs: Operand) -> Operand {
        match self {
            Self::Math(mut math) => {
                math.terms.push((op, rhs));
                Self::Math(math)
            }
            head => Self::Math(Box::new(Math {
                head,
                terms: vec![(op, rhs)],
            })),
        }
    }

    /// Render the operand, allocating aliases as needed.
    ///
    /// Inputs are bound to `context`, the type of the path they are compared
    /// against or assigned to. `size()` is only valid in conditions, while
    /// arithmetic and `if_not_exists` are only valid in update values.
    pub(crate) fn resolve(
        self,
        interner: &mut AttributeInterner,
        context: &FieldType,
        position: Position,
        operation: &'static str,
    ) -> CompileResult<String> {
        match self {
            Self::Path(path) => Ok(interner.name_alias(&path.key)),
            Self::Value(value) => {
                let alias = interner.value_alias(&value.key);
                interner.bind_input_type(&value.key, context);
                Ok(alias)
            }
            Self::Const(constant) => Ok(interner.const_alias(&constant.text)),
            Self::Math(math) => {
                position.reject_in(Position::Condition, "arithmetic")?;
                let Math { head, terms } = *math;
                head.ensure_numeric()?;
                let mut rendered =
                    head.resolve(interner, &FieldType::Number, position, operation)?;
                for (op, term) in terms {
                    term.ensure_numeric()?;
                    let term = term.resolve(interner, &FieldType::Number, position, operation)?;
                    rendered = format!("{rendered} {op} {term}");
                }
                Ok(rendered)
            }
            Self::Size(path) => {
                position.reject_in(Position::Update, "size()")?;
                Ok(format!("size({})", interner.name_alias(&path.key)))
            }
            Self::IfNotExists { path, value } => {
                position.reject_in(Position::Condition, "if_not_exists()")?;
                let alias = interner.name_alias(&path.key);
                let fallback = value.resolve(interner, &path.field_type, position, operation)?;
                Ok(format!("if_not_exists({alias}, {fallback})"))
            }
            Self::Missing => Err(CompileError::MissingOperand { operation }),
        }
    }

    /// Attributes inside arithmetic must be numbers (or untyped).
    fn ensure_numeric(&self) -> CompileResult<()> {
        let path = match self {
            Self::Path(path) | Self::IfNotExists { path, .. } => path,
            _ => return Ok(()),
        };
        if path.field_type.is_numeric() || matches!(path.field_type, FieldType::Any) {
            Ok(())
        } else {
            Err(CompileError::NonNumericOperand {
                attribute: path.key.clone(),
            })
        }
    }
}

/// Which kind of expression an operand is lowered into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Position {
    /// Condition, filter or key condition.
    Condition,
    /// Right-hand side of a `SET` action.
    Update,
}

impl Position {
    fn as_str(self) -> &'static str {
        match self {
            Self::Condition => "condition",
            Self::Update => "update value",
        }
    }

    fn reject_in(self, forbidden: Self, operand: &'static str) -> CompileResult<()> {
        if self == forbidden {
            return Err(CompileError::MisplacedOperand {
                operand,
                position: self.as_str(),
            });
        }
        Ok(())
    }
}

impl From<Path> for Operand {
    fn from(path: Path) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for Operand {
    fn from(path: &Path) -> Self {
        Self::Path(path.clone())
    }
}

impl From<Value> for Operand {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<Const> for Operand {
    fn from(constant: Const) -> Self {
        Self::Const(constant)
    }
}

impl From<Size> for Operand {
    fn from(size: Size) -> Self {
        Self::Size(size.path)
    }
}

impl<T: Into<Operand>> From<Option<T>> for Operand {
    fn from(operand: Option<T>) -> Self {
        operand.map_or(Self::Missing, Into::into)
    }
}

impl From<&str> for Operand {
    fn from(value: &str) -> Self {
        Self::Const(Const::string(value))
    }
}

impl From<String> for Operand {
    fn from(value: String) -> Self {
        Self::Const(Const::string(&value))
    }
}

macro_rules! literal_operand {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Operand {
                fn from(value: $ty) -> Self {
                    Self::Const(Const::expr(value.to_string()))
                }
            }
        )*
    };
}

literal_operand!(i32, i64, u32, u64, f64, bool);

/// One path operand per stored field, built eagerly from the entity.
#[derive(Debug, Clone, Default)]
pub struct Paths {
    fields: IndexMap<String, Path>,
}

impl Paths {
    /// Build the table from an entity's schema, key attributes and
    /// bookkeeping attributes. Attributes outside the schema are strings.
    #[must_use]
    pub fn from_entity(entity: &EntityDef) -> Self {
        let mut fields: IndexMap<String, Path> = entity
            .schema
            .fields()
            .map(|(name, field_type)| (name.to_owned(), Path::new(name, field_type.clone())))
            .collect();

        let index_keys = entity
            .indexes
            .iter()
            .flat_map(|index| std::iter::once(&index.partition_key).chain(&index.sort_key));
        let implicit = entity
            .table_keys()
            .chain(index_keys)
            .map(|key| key.attribute.as_str())
            .chain(entity.created_at.as_deref())
            .chain(entity.updated_at.as_deref())
            .chain(entity.entity_type_attribute.as_deref());
        for name in implicit {
            fields
                .entry(name.to_owned())
                .or_insert_with(|| Path::new(name, FieldType::String));
        }

        Self { fields }
    }

    /// Path for `name`; undeclared names are untyped.
    #[must_use]
    pub fn field(&self, name: &str) -> Path {
        self.fields
            .get(name)
            .cloned()
            .unwrap_or_else(|| Path::new(name, FieldType::Any))
    }

    /// Declared path for `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Path> {
        self.fields.get(name)
    }

    /// All declared paths in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.fields.values()
    }
}

/// One value operand per declared command input.
#[derive(Debug, Clone, Default)]
pub struct Values {
    inputs: IndexSet<String>,
}

impl Values {
    /// Build the table from declared input names, deduplicated in order.
    pub fn new<I, S>(inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
        }
    }

    /// Value operand for a declared input; `None` if it was never declared,
    /// which fails lowering as a missing operand.
    #[must_use]
    pub fn input(&self, name: &str) -> Option<Value> {
        self.inputs.contains(name).then(|| Value::new(name))
    }

    /// Declared input names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.inputs.iter().map(String::as_str)
    }
}
