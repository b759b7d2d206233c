//! Command kinds.

use std::fmt;

use serde::{Deserialize, Serialize};

/// All command kinds the compiler can assemble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandKind {
    /// Get an item by primary key.
    #[serde(rename = "GetItem")]
    Get,
    /// Put (insert or replace) an item.
    #[serde(rename = "PutItem")]
    Put,
    /// Update an item in place.
    #[serde(rename = "UpdateItem")]
    Update,
    /// Delete an item by primary key.
    #[serde(rename = "DeleteItem")]
    Delete,
    /// Query items by key condition.
    Query,
    /// Scan a table or index.
    Scan,
    /// Transactional condition check against one item.
    ConditionCheck,
}

impl CommandKind {
    /// Returns the DynamoDB operation name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GetItem",
            Self::Put => "PutItem",
            Self::Update => "UpdateItem",
            Self::Delete => "DeleteItem",
            Self::Query => "Query",
            Self::Scan => "Scan",
            Self::ConditionCheck => "ConditionCheck",
        }
    }

    /// Whether the command addresses a single item through `Key`.
    #[must_use]
    pub fn addresses_key(&self) -> bool {
        matches!(
            self,
            Self::Get | Self::Update | Self::Delete | Self::ConditionCheck
        )
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
