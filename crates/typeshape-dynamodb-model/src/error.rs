//! Model-level error types.

/// Errors produced while parsing a key template such as `"USER#{id}"`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyTemplateError {
    /// A `{` placeholder was opened but never closed.
    #[error("unclosed placeholder starting at offset {offset}")]
    UnclosedPlaceholder {
        /// Byte offset of the opening brace.
        offset: usize,
    },
    /// A `}` appeared without a matching `{`.
    #[error("unbalanced '}}' at offset {offset}")]
    UnbalancedBrace {
        /// Byte offset of the stray brace.
        offset: usize,
    },
    /// A placeholder with no input name (`{}`).
    #[error("empty placeholder at offset {offset}")]
    EmptyPlaceholder {
        /// Byte offset of the opening brace.
        offset: usize,
    },
}
