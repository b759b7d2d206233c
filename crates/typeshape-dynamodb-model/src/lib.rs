//! DynamoDB model types for typeshape.
//!
//! Plain data shared between the expression compiler and the downstream
//! source renderer: field types, entity and key definitions, command kinds
//! and the serialized command payload. Payload structs use `PascalCase`
//! JSON field naming to match the DynamoDB wire protocol.

pub mod entity;
pub mod error;
pub mod operations;
pub mod payload;
pub mod types;

pub use entity::{EntityDef, IndexDef, KeyDef, KeySegment, KeyTemplate};
pub use error::KeyTemplateError;
pub use operations::CommandKind;
pub use payload::{CommandPayload, ValueBinding};
pub use types::{AttributeType, FieldType, Schema};
