//! DynamoDB expression compilation.
//!
//! Builder trees describe conditions, updates and projections in terms of
//! typed operands. Lowering turns them into expression text over `#aN`/`:vN`
//! aliases. The pipeline is:
//!
//! 1. **Building**: builders return inert [`Condition`], [`UpdateSpec`] or
//!    path selections over [`Paths`] and [`Values`].
//! 2. **Lowering**: each tree is walked against one shared
//!    [`AttributeInterner`], allocating aliases left to right.
//! 3. **Rendering**: the resulting [`ast`] nodes print the wire text.

pub mod ast;
pub mod condition;
pub mod interner;
pub mod operand;
pub mod projection;
pub mod update;

pub use ast::{Expr, UpdateExpr};
pub use condition::{CompiledCondition, Condition, compile_key_condition};
pub use interner::AttributeInterner;
pub use operand::{Const, Operand, Path, Paths, Size, Value, Values};
pub use projection::{CompiledProjection, compile_projection};
pub use update::{Bookkeeping, UpdateAction, UpdateSpec, UpdateValue, compile_update};
