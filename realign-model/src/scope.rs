//! What a load or a generated script manages.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::model::{MetadataModel, QualifiedName};

/// The part of a database under management.
///
/// Objects outside the scope are never created, altered or dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    /// Managed schemas; empty means every schema the model mentions.
    /// Live-only schemas are dropped only when listed here explicitly.
    #[serde(default)]
    pub schemas: Vec<SmolStr>,
    /// Explicit table list; empty means every table in a managed schema.
    #[serde(default)]
    pub tables: Vec<QualifiedName>,
    /// Tables whose rows are reconciled.
    #[serde(default)]
    pub data_tables: Vec<QualifiedName>,
}

impl Scope {
    /// Manage everything the model mentions.
    pub fn all() -> Self {
        Self::default()
    }

    /// Restrict to the given schemas.
    pub fn with_schemas<I, S>(mut self, schemas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        self.schemas = schemas.into_iter().map(Into::into).collect();
        self
    }

    /// Restrict to the given tables.
    pub fn with_tables(mut self, tables: impl IntoIterator<Item = QualifiedName>) -> Self {
        self.tables = tables.into_iter().collect();
        self
    }

    /// Reconcile rows for the given tables.
    pub fn with_data_tables(mut self, tables: impl IntoIterator<Item = QualifiedName>) -> Self {
        self.data_tables = tables.into_iter().collect();
        self
    }

    /// Managed schema names, resolved against a model.
    pub fn managed_schemas(&self, model: &MetadataModel) -> Vec<SmolStr> {
        if self.schemas.is_empty() {
            model.schema_names()
        } else {
            self.schemas.clone()
        }
    }

    /// Whether the table list is explicit.
    pub fn has_table_list(&self) -> bool {
        !self.tables.is_empty()
    }

    /// Whether a table falls inside the scope.
    pub fn includes_table(&self, model: &MetadataModel, table: &QualifiedName) -> bool {
        if self.has_table_list() {
            self.tables.contains(table)
        } else {
            self.managed_schemas(model).contains(&table.schema)
        }
    }
}
