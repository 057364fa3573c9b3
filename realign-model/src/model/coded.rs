//! Views, functions, procedures and triggers.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::QualifiedName;

/// Kind of coded entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodedKind {
    /// A function.
    Function,
    /// A stored procedure.
    Procedure,
    /// A view.
    View,
    /// A trigger.
    Trigger,
}

impl CodedKind {
    /// Canonical catalog code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Function => "FUNCTION",
            Self::Procedure => "PROCEDURE",
            Self::View => "VIEW",
            Self::Trigger => "TRIGGER",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Procedure => "procedure",
            Self::View => "view",
            Self::Trigger => "trigger",
        }
    }
}

impl fmt::Display for CodedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A view, function, procedure or trigger.
///
/// `definition` is the text the catalog reports: the complete `CREATE`
/// statement for SQL Server modules and PostgreSQL routines and triggers,
/// and the query body for PostgreSQL views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodedEntity {
    /// Qualified name.
    pub name: QualifiedName,
    /// Entity kind.
    pub kind: CodedKind,
    /// Parameter-type signature disambiguating overloads; the owning table
    /// name for PostgreSQL triggers; empty otherwise.
    #[serde(default)]
    pub signature: String,
    /// Definition text.
    pub definition: String,
    /// Table a trigger is attached to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<QualifiedName>,
    /// Disabled trigger.
    #[serde(default)]
    pub is_disabled: bool,
}

impl CodedEntity {
    /// Create a coded entity.
    pub fn new(name: QualifiedName, kind: CodedKind, definition: impl Into<String>) -> Self {
        Self {
            name,
            kind,
            signature: String::new(),
            definition: definition.into(),
            table: None,
            is_disabled: false,
        }
    }

    /// Create a view.
    pub fn view(name: QualifiedName, definition: impl Into<String>) -> Self {
        Self::new(name, CodedKind::View, definition)
    }

    /// Create a trigger on `table`.
    pub fn trigger(name: QualifiedName, table: QualifiedName, definition: impl Into<String>) -> Self {
        let mut entity = Self::new(name, CodedKind::Trigger, definition);
        entity.table = Some(table);
        entity
    }

    /// Set the signature.
    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = signature.into();
        self
    }

    /// Mark a trigger disabled.
    pub fn disabled(mut self) -> Self {
        self.is_disabled = true;
        self
    }

    /// Name plus signature, e.g. `public.total(integer)`.
    pub fn display_name(&self) -> String {
        match self.kind {
            CodedKind::Function | CodedKind::Procedure => {
                format!("{}({})", self.name, self.signature)
            }
            _ => self.name.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_includes_signature_for_routines() {
        let f = CodedEntity::new(
            QualifiedName::new("public", "total"),
            CodedKind::Function,
            "CREATE FUNCTION ...",
        )
        .with_signature("integer, text");
        assert_eq!(f.display_name(), "public.total(integer, text)");

        let v = CodedEntity::view(QualifiedName::new("public", "v"), "SELECT 1");
        assert_eq!(v.display_name(), "public.v");
    }
}
