//! Database schemas.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// A database schema and its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaObject {
    /// Schema name.
    pub name: SmolStr,
    /// Owning principal; `None` leaves ownership unmanaged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<SmolStr>,
}

impl SchemaObject {
    /// Create a schema without a managed owner.
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            owner: None,
        }
    }

    /// Set the owner.
    pub fn with_owner(mut self, owner: impl Into<SmolStr>) -> Self {
        self.owner = Some(owner.into());
        self
    }
}
