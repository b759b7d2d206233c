//! DynamoDB expression compiler for typeshape.
//!
//! Entities declare their fields and keys once; commands are then defined
//! with typed builders and compiled into DynamoDB condition, filter,
//! key-condition, update and projection expressions that share one
//! `#aN`/`:vN` alias namespace per command.

pub mod command;
pub mod config;
pub mod error;
pub mod expression;

pub use command::{CommandDef, CompiledCommand, parse_key};
pub use config::CompilerConfig;
pub use error::{CompileError, CompileResult};
