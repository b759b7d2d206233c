//! Compiler configuration.
//!
//! Provides [`CompilerConfig`], loaded from environment variables or built
//! explicitly with its typed builder.

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Default host expression for "current timestamp".
pub const DEFAULT_NOW_EXPRESSION: &str = "new Date().toISOString()";

/// Default identifier the renderer binds command inputs to.
pub const DEFAULT_INPUT_IDENT: &str = "input";

/// Expression compiler configuration.
///
/// # Examples
///
/// ```
/// use typeshape_dynamodb_core::config::CompilerConfig;
///
/// let config = CompilerConfig::default();
/// assert_eq!(config.input_ident, "input");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct CompilerConfig {
    /// Host expression written into timestamp bookkeeping attributes.
    #[builder(default = String::from(DEFAULT_NOW_EXPRESSION), setter(into))]
    pub now_expression: String,

    /// Identifier that input references and key templates are rendered against.
    #[builder(default = String::from(DEFAULT_INPUT_IDENT), setter(into))]
    pub input_ident: String,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            now_expression: String::from(DEFAULT_NOW_EXPRESSION),
            input_ident: String::from(DEFAULT_INPUT_IDENT),
        }
    }
}

impl CompilerConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `TYPESHAPE_NOW_EXPRESSION` | `new Date().toISOString()` |
    /// | `TYPESHAPE_INPUT_IDENT` | `input` |
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("TYPESHAPE_NOW_EXPRESSION") {
            if !v.trim().is_empty() {
                config.now_expression = v;
            }
        }
        if let Ok(v) = std::env::var("TYPESHAPE_INPUT_IDENT") {
            if !v.trim().is_empty() {
                config.input_ident = v;
            }
        }

        config
    }
}
