//! Compilation error types.
//!
//! Every error is an authoring fault detected while a command is being
//! defined. Nothing is recovered locally: the command fails as a whole and
//! no partial payload is produced.

use typeshape_dynamodb_model::{CommandKind, KeyTemplateError};

/// Errors produced while compiling a command definition.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// A comparison or update action received no operand where one was required.
    #[error("operand is required for {operation}")]
    MissingOperand {
        /// The operation missing its operand.
        operation: &'static str,
    },

    /// An operand was used where DynamoDB does not accept it, such as
    /// `size()` in an update value or arithmetic in a condition.
    #[error("{operand} is not allowed in a {position}")]
    MisplacedOperand {
        /// The operand kind.
        operand: &'static str,
        /// Where it was used.
        position: &'static str,
    },

    /// An arithmetic chain referenced a non-numeric attribute.
    #[error("arithmetic requires a numeric attribute, `{attribute}` is not numeric")]
    NonNumericOperand {
        /// The offending attribute.
        attribute: String,
    },

    /// The map form of an update left a field without a value.
    #[error("value for `{field}` is undefined")]
    MissingUpdateValue {
        /// The offending field.
        field: String,
    },

    /// An AND/OR composite was built with no children.
    #[error("{kind} composite requires at least one condition")]
    InvalidComposite {
        /// `AND` or `OR`.
        kind: &'static str,
    },

    /// The command kind cannot carry the requested clause.
    #[error("{kind} commands do not support a {clause}")]
    UnsupportedClause {
        /// Command kind.
        kind: CommandKind,
        /// The clause that was supplied.
        clause: &'static str,
    },

    /// A query or scan named an index the entity does not declare.
    #[error("unknown index: {name}")]
    UnknownIndex {
        /// The index name.
        name: String,
    },

    /// A key template could not be parsed.
    #[error("invalid key template for `{attribute}`: {source}")]
    InvalidKeyTemplate {
        /// Key attribute the template belongs to.
        attribute: String,
        /// Parse failure.
        #[source]
        source: KeyTemplateError,
    },

    /// A fault raised while compiling a specific command.
    #[error("failed to compile command `{command}`: {source}")]
    InCommand {
        /// Command name.
        command: String,
        /// The underlying fault.
        #[source]
        source: Box<CompileError>,
    },
}

impl CompileError {
    /// Attach the name of the command under compilation.
    #[must_use]
    pub fn in_command(self, command: &str) -> Self {
        match self {
            already @ Self::InCommand { .. } => already,
            other => Self::InCommand {
                command: command.to_owned(),
                source: Box::new(other),
            },
        }
    }

    /// The innermost error, skipping command context.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::InCommand { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Convenience result type for compilation.
pub type CompileResult<T> = Result<T, CompileError>;
