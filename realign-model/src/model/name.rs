//! Schema-qualified object names.

use std::fmt;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// A schema-qualified name such as `dbo.orders`.
///
/// Ordering and hashing follow `(schema, name)`, which is also the
/// tie-breaker used wherever deterministic output is needed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QualifiedName {
    /// Owning schema.
    pub schema: SmolStr,
    /// Object name within the schema.
    pub name: SmolStr,
}

impl QualifiedName {
    /// Create a new qualified name.
    pub fn new(schema: impl Into<SmolStr>, name: impl Into<SmolStr>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }

    /// Parse `schema.name`; a bare name lands in `default_schema`.
    pub fn parse(text: &str, default_schema: &str) -> Self {
        match text.split_once('.') {
            Some((schema, name)) => Self::new(schema.trim(), name.trim()),
            None => Self::new(default_schema, text.trim()),
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}
