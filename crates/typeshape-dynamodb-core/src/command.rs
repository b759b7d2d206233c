//! Command assembly.
//!
//! A [`CommandDef`] collects the builders of one logical command. Compiling
//! it against an [`EntityDef`] lowers every builder over a single
//! [`Session`], so `#aN`/`:vN` numbering is shared by all expressions of the
//! command, and assembles the [`CommandPayload`].
//!
//! Compilation order is fixed: condition, filter, key condition,
//! projection, update. Alias numbers follow that order.

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;
use typeshape_dynamodb_model::payload::string_literal;
use typeshape_dynamodb_model::{
    CommandKind, CommandPayload, EntityDef, FieldType, KeyDef, Schema, ValueBinding,
};

use crate::config::CompilerConfig;
use crate::error::{CompileError, CompileResult};
use crate::expression::{
    AttributeInterner, Bookkeeping, Condition, Const, Path, Paths, UpdateSpec, Values,
    compile_key_condition, compile_projection, compile_update,
};

type ConditionBuilder = Box<dyn FnOnce(&Paths, &Values) -> Condition>;
type UpdateBuilder = Box<dyn FnOnce(&Paths, &Values) -> UpdateSpec>;
type ProjectionBuilder = Box<dyn FnOnce(&Paths) -> Vec<Path>>;

/// Clauses a command definition can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Clause {
    Condition,
    Filter,
    KeyCondition,
    Index,
    Projection,
    Update,
}

impl Clause {
    fn as_str(self) -> &'static str {
        match self {
            Self::Condition => "condition expression",
            Self::Filter => "filter expression",
            Self::KeyCondition => "key condition",
            Self::Index => "index",
            Self::Projection => "projection",
            Self::Update => "update expression",
        }
    }

    fn supported_by(self, kind: CommandKind) -> bool {
        use CommandKind::{ConditionCheck, Delete, Get, Put, Query, Scan, Update};
        match self {
            Self::Condition => matches!(kind, Put | Update | Delete | ConditionCheck),
            Self::Filter | Self::Index => matches!(kind, Query | Scan),
            Self::KeyCondition => kind == Query,
            Self::Projection => matches!(kind, Get | Query | Scan),
            Self::Update => kind == Update,
        }
    }
}

/// Builders of one logical command.
///
/// Builder methods never fail; a clause the command kind cannot carry is
/// reported when the definition is compiled.
pub struct CommandDef {
    name: String,
    kind: CommandKind,
    inputs: Vec<String>,
    index: Option<String>,
    condition: Option<ConditionBuilder>,
    filter: Option<ConditionBuilder>,
    key_condition: Option<ConditionBuilder>,
    projection: Option<ProjectionBuilder>,
    update: Option<UpdateBuilder>,
    rejected: Option<Clause>,
}

impl fmt::Debug for CommandDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDef")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("inputs", &self.inputs)
            .field("index", &self.index)
            .field("condition", &self.condition.is_some())
            .field("filter", &self.filter.is_some())
            .field("key_condition", &self.key_condition.is_some())
            .field("projection", &self.projection.is_some())
            .field("update", &self.update.is_some())
            .finish_non_exhaustive()
    }
}

impl CommandDef {
    /// Start a definition of `kind` named `name`.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: CommandKind) -> Self {
        Self {
            name: name.into(),
            kind,
            inputs: Vec::new(),
            index: None,
            condition: None,
            filter: None,
            key_condition: None,
            projection: None,
            update: None,
            rejected: None,
        }
    }

    /// `GetItem` by primary key.
    #[must_use]
    pub fn get(name: impl Into<String>) -> Self {
        Self::new(name, CommandKind::Get)
    }

    /// `PutItem`.
    #[must_use]
    pub fn put(name: impl Into<String>) -> Self {
        Self::new(name, CommandKind::Put)
    }

    /// `UpdateItem` by primary key.
    #[must_use]
    pub fn update(name: impl Into<String>) -> Self {
        Self::new(name, CommandKind::Update)
    }

    /// `DeleteItem` by primary key.
    #[must_use]
    pub fn delete(name: impl Into<String>) -> Self {
        Self::new(name, CommandKind::Delete)
    }

    /// `Query` on the table or an index.
    #[must_use]
    pub fn query(name: impl Into<String>) -> Self {
        Self::new(name, CommandKind::Query)
    }

    /// `Scan` of the table or an index.
    #[must_use]
    pub fn scan(name: impl Into<String>) -> Self {
        Self::new(name, CommandKind::Scan)
    }

    /// Transactional condition check.
    #[must_use]
    pub fn condition_check(name: impl Into<String>) -> Self {
        Self::new(name, CommandKind::ConditionCheck)
    }

    /// Command name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Command kind.
    #[must_use]
    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    /// Declare inputs available to the builders as [`Values`].
    #[must_use]
    pub fn inputs<I, S>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs.extend(inputs.into_iter().map(Into::into));
        self
    }

    /// Run against a secondary index.
    #[must_use]
    pub fn index(mut self, name: impl Into<String>) -> Self {
        if self.accept(Clause::Index) {
            self.index = Some(name.into());
        }
        self
    }

    /// Condition that must hold for the write.
    #[must_use]
    pub fn condition<F>(mut self, builder: F) -> Self
    where
        F: FnOnce(&Paths, &Values) -> Condition + 'static,
    {
        if self.accept(Clause::Condition) {
            self.condition = Some(Box::new(builder));
        }
        self
    }

    /// Post-read filter.
    #[must_use]
    pub fn filter<F>(mut self, builder: F) -> Self
    where
        F: FnOnce(&Paths, &Values) -> Condition + 'static,
    {
        if self.accept(Clause::Filter) {
            self.filter = Some(Box::new(builder));
        }
        self
    }

    /// Extra key constraints. The partition key equality is added when the
    /// builder does not constrain the partition key itself.
    #[must_use]
    pub fn key_condition<F>(mut self, builder: F) -> Self
    where
        F: FnOnce(&Paths, &Values) -> Condition + 'static,
    {
        if self.accept(Clause::KeyCondition) {
            self.key_condition = Some(Box::new(builder));
        }
        self
    }

    /// Attributes to read.
    #[must_use]
    pub fn projection<F>(mut self, selector: F) -> Self
    where
        F: FnOnce(&Paths) -> Vec<Path> + 'static,
    {
        if self.accept(Clause::Projection) {
            self.projection = Some(Box::new(selector));
        }
        self
    }

    /// Mutations to apply.
    #[must_use]
    pub fn update_with<F>(mut self, builder: F) -> Self
    where
        F: FnOnce(&Paths, &Values) -> UpdateSpec + 'static,
    {
        if self.accept(Clause::Update) {
            self.update = Some(Box::new(builder));
        }
        self
    }

    fn accept(&mut self, clause: Clause) -> bool {
        let supported = clause.supported_by(self.kind);
        if !supported && self.rejected.is_none() {
            self.rejected = Some(clause);
        }
        supported
    }

    /// Compile every builder and assemble the payload.
    ///
    /// # Errors
    ///
    /// Any fault is returned as [`CompileError::InCommand`] naming this
    /// command; no partial payload is produced.
    pub fn compile(
        self,
        entity: &EntityDef,
        config: &CompilerConfig,
    ) -> CompileResult<CompiledCommand> {
        let name = self.name.clone();
        self.assemble(entity, config)
            .map_err(|err| err.in_command(&name))
    }

    #[allow(clippy::too_many_lines)]
    fn assemble(
        self,
        entity: &EntityDef,
        config: &CompilerConfig,
    ) -> CompileResult<CompiledCommand> {
        let Self {
            name,
            kind,
            inputs,
            index,
            condition,
            filter,
            key_condition,
            projection,
            update,
            rejected,
        } = self;

        if let Some(clause) = rejected {
            return Err(CompileError::UnsupportedClause {
                kind,
                clause: clause.as_str(),
            });
        }

        let index = index
            .map(|index_name| {
                entity
                    .index(&index_name)
                    .ok_or(CompileError::UnknownIndex { name: index_name })
            })
            .transpose()?;

        let key_defs: Vec<&KeyDef> = match kind {
            CommandKind::Query => {
                vec![index.map_or(&entity.partition_key, |index| &index.partition_key)]
            }
            CommandKind::Scan => Vec::new(),
            _ => entity.table_keys().collect(),
        };
        let key_inputs = key_defs
            .iter()
            .flat_map(|key| key.template.inputs())
            .map(str::to_owned);
        let schema_inputs = (kind == CommandKind::Put)
            .then(|| item_fields(entity))
            .into_iter()
            .flatten();

        let mut session = Session {
            interner: AttributeInterner::new(),
            paths: Paths::from_entity(entity),
            values: Values::new(inputs.into_iter().chain(key_inputs).chain(schema_inputs)),
        };
        let ident = config.input_ident.as_str();

        let mut payload = CommandPayload {
            table_name: entity.table_name.clone(),
            index_name: index.map(|index| index.name.clone()),
            ..CommandPayload::default()
        };

        if let Some(builder) = condition {
            let text = session.condition(builder)?;
            debug!(command = %name, expression = %text, "compiled condition expression");
            payload.condition_expression = Some(text);
        }

        if let Some(builder) = filter {
            let text = session.condition(builder)?;
            debug!(command = %name, expression = %text, "compiled filter expression");
            payload.filter_expression = Some(text);
        }

        if kind == CommandKind::Query {
            let partition_key = key_defs
                .first()
                .map_or(&entity.partition_key, |key| *key);
            let user = key_condition.map(|builder| builder(&session.paths, &session.values));
            let path = session.paths.field(&partition_key.attribute);
            let compiled = compile_key_condition(
                &mut session.interner,
                user,
                &path,
                Const::expr(partition_key.template.render(ident)),
            )?;
            let text = compiled.text();
            debug!(command = %name, expression = %text, "compiled key condition");
            payload.key_condition_expression = Some(text);
        }

        let mut result_shape = None;
        if let Some(selector) = projection {
            let selection = selector(&session.paths);
            if let Some(compiled) =
                compile_projection(selection, &entity.schema, &mut session.interner)
            {
                debug!(command = %name, expression = %compiled.expression, "compiled projection");
                payload.projection_expression = Some(compiled.expression);
                result_shape = Some(compiled.shape);
            }
        }
        let reads = matches!(kind, CommandKind::Get | CommandKind::Query | CommandKind::Scan);
        if result_shape.is_none() && reads {
            result_shape = Some(entity.schema.clone());
        }

        if kind == CommandKind::Update {
            let spec = update.map_or_else(UpdateSpec::default, |builder| {
                builder(&session.paths, &session.values)
            });
            let bookkeeping = Bookkeeping {
                created_at: entity.created_at.clone(),
                updated_at: entity.updated_at.clone(),
                entity_type: entity
                    .entity_type_attribute
                    .clone()
                    .map(|attribute| (attribute, entity.name.clone())),
                now_expression: config.now_expression.clone(),
            };
            let compiled =
                compile_update(spec, &session.paths, &bookkeeping, &mut session.interner)?;
            if !compiled.is_empty() {
                let text = compiled.to_string();
                debug!(command = %name, expression = %text, "compiled update expression");
                payload.update_expression = Some(text);
            }
        }

        if kind.addresses_key() {
            payload.key = key_defs
                .iter()
                .map(|key| (key.attribute.clone(), key.template.render(ident)))
                .collect();
        }

        if kind == CommandKind::Put {
            payload.item = put_item(entity, config);
        }

        payload.expression_attribute_names = session.interner.names();
        payload.expression_attribute_values = session.interner.values();

        let mut input_types = session.interner.input_types();
        for input in session.values.names() {
            let field_type = entity.field_type(input);
            if !matches!(field_type, FieldType::Any) {
                input_types.entry(input.to_owned()).or_insert(field_type);
            }
        }

        debug!(
            command = %name,
            kind = %kind,
            names = payload.expression_attribute_names.len(),
            values = payload.expression_attribute_values.len(),
            "assembled command"
        );

        Ok(CompiledCommand {
            name,
            kind,
            payload,
            input_types,
            result_shape,
        })
    }
}

/// Alias tables and operand tables of one command under compilation.
#[derive(Debug)]
struct Session {
    interner: AttributeInterner,
    paths: Paths,
    values: Values,
}

impl Session {
    fn condition(&mut self, builder: ConditionBuilder) -> CompileResult<String> {
        let condition = builder(&self.paths, &self.values);
        Ok(condition.compile(&mut self.interner)?.text())
    }
}

/// Schema fields a put writes from its input, excluding key and
/// bookkeeping attributes.
fn item_fields(entity: &EntityDef) -> Vec<String> {
    let reserved: Vec<&str> = entity
        .table_keys()
        .map(|key| key.attribute.as_str())
        .chain(entity.created_at.as_deref())
        .chain(entity.updated_at.as_deref())
        .chain(entity.entity_type_attribute.as_deref())
        .collect();
    entity
        .schema
        .fields()
        .map(|(name, _)| name)
        .filter(|name| !reserved.contains(name))
        .map(str::to_owned)
        .collect()
}

fn put_item(entity: &EntityDef, config: &CompilerConfig) -> IndexMap<String, String> {
    let ident = config.input_ident.as_str();
    let now = ValueBinding::Const {
        text: config.now_expression.clone(),
    };

    let mut bindings: Vec<(String, ValueBinding)> = item_fields(entity)
        .into_iter()
        .map(|field| {
            let binding = ValueBinding::Input {
                key: field.clone(),
                field_type: entity.schema.field(&field).cloned(),
            };
            (field, binding)
        })
        .collect();
    for attribute in [&entity.created_at, &entity.updated_at].into_iter().flatten() {
        bindings.push((attribute.clone(), now.clone()));
    }
    if let Some(attribute) = &entity.entity_type_attribute {
        bindings.push((
            attribute.clone(),
            ValueBinding::Const {
                text: string_literal(&entity.name),
            },
        ));
    }

    let mut item: IndexMap<String, String> = entity
        .table_keys()
        .map(|key| (key.attribute.clone(), key.template.render(ident)))
        .collect();
    for (attribute, binding) in bindings {
        item.insert(attribute, binding.render(ident));
    }
    item
}

/// Parse a key template, reporting failures against the key attribute.
///
/// # Errors
///
/// Returns [`CompileError::InvalidKeyTemplate`] when `template` has an
/// unclosed, empty or unbalanced placeholder.
pub fn parse_key(attribute: &str, template: &str) -> CompileResult<KeyDef> {
    KeyDef::parse(attribute, template).map_err(|source| CompileError::InvalidKeyTemplate {
        attribute: attribute.to_owned(),
        source,
    })
}

/// A fully assembled command.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledCommand {
    /// Command name.
    pub name: String,
    /// Command kind.
    pub kind: CommandKind,
    /// Wire payload.
    pub payload: CommandPayload,
    /// Types the command's inputs are coerced to.
    pub input_types: IndexMap<String, FieldType>,
    /// Shape of the returned item(s), for reads.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_shape: Option<Schema>,
}
