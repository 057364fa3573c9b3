//! The in-memory metadata model.
//!
//! A [`MetadataModel`] is an immutable snapshot of one database: schemas,
//! tables with everything they own, coded entities and captured rows.
//! It is pure data; loaders produce it and generators only read it.

mod coded;
mod data;
mod foreign_key;
mod index;
mod name;
mod schema;
mod table;

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub use coded::{CodedEntity, CodedKind};
pub use data::{TableData, Value};
pub use foreign_key::{FkColumnSpec, ForeignKeySpec, ReferentialAction};
pub use index::{IndexColumnSpec, IndexSpec};
pub use name::QualifiedName;
pub use schema::SchemaObject;
pub use table::{CheckConstraintSpec, ColumnSpec, DefaultSpec, IdentitySpec, TableEntity};

use crate::error::ModelError;

/// Database engine a model was captured from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    /// Microsoft SQL Server.
    #[default]
    Mssql,
    /// PostgreSQL.
    Postgres,
}

impl Engine {
    /// Schema objects are created in when none is given.
    pub fn default_schema(&self) -> &'static str {
        match self {
            Self::Mssql => "dbo",
            Self::Postgres => "public",
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mssql => f.write_str("mssql"),
            Self::Postgres => f.write_str("postgres"),
        }
    }
}

impl FromStr for Engine {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mssql" | "sqlserver" | "tsql" => Ok(Self::Mssql),
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            other => Err(ModelError::unknown("engine", other)),
        }
    }
}

/// A structural and data snapshot of one database.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataModel {
    /// Engine the snapshot was taken from.
    #[serde(default)]
    pub engine: Engine,
    /// Schemas.
    #[serde(default)]
    pub schemas: Vec<SchemaObject>,
    /// Tables keyed by qualified name, in load order.
    #[serde(default, with = "tables_as_list")]
    pub tables: IndexMap<QualifiedName, TableEntity>,
    /// Coded entities in creation order.
    #[serde(default)]
    pub coded: Vec<CodedEntity>,
    /// Captured rows.
    #[serde(default)]
    pub data: Vec<TableData>,
}

impl MetadataModel {
    /// Create an empty model for an engine.
    pub fn new(engine: Engine) -> Self {
        Self {
            engine,
            ..Self::default()
        }
    }

    /// Add a schema.
    pub fn with_schema(mut self, schema: SchemaObject) -> Self {
        self.schemas.push(schema);
        self
    }

    /// Add a table, replacing any table of the same name.
    pub fn with_table(mut self, table: TableEntity) -> Self {
        self.tables.insert(table.name.clone(), table);
        self
    }

    /// Add a coded entity.
    pub fn with_coded(mut self, entity: CodedEntity) -> Self {
        self.coded.push(entity);
        self
    }

    /// Add captured rows.
    pub fn with_data(mut self, data: TableData) -> Self {
        self.data.push(data);
        self
    }

    /// Get a table by qualified name.
    pub fn table(&self, name: &QualifiedName) -> Option<&TableEntity> {
        self.tables.get(name)
    }

    /// Get a schema by name.
    pub fn schema(&self, name: &str) -> Option<&SchemaObject> {
        self.schemas.iter().find(|s| s.name == name)
    }

    /// Get captured rows for a table.
    pub fn data_for(&self, table: &QualifiedName) -> Option<&TableData> {
        self.data.iter().find(|d| &d.table == table)
    }

    /// Every schema name the model mentions, in first-seen order.
    pub fn schema_names(&self) -> Vec<smol_str::SmolStr> {
        let mut names: Vec<smol_str::SmolStr> = Vec::new();
        let mentioned = self
            .schemas
            .iter()
            .map(|s| &s.name)
            .chain(self.tables.keys().map(|t| &t.schema))
            .chain(self.coded.iter().map(|c| &c.name.schema));
        for name in mentioned {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }

    /// Total number of foreign keys.
    pub fn foreign_key_count(&self) -> usize {
        self.tables.values().map(|t| t.foreign_keys.len()).sum()
    }
}

/// Tables serialize as a list; the key is derived from each table's name.
mod tables_as_list {
    use indexmap::IndexMap;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{QualifiedName, TableEntity};

    pub fn serialize<S>(
        tables: &IndexMap<QualifiedName, TableEntity>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(tables.values())
    }

    pub fn deserialize<'de, D>(
        deserializer: D,
    ) -> Result<IndexMap<QualifiedName, TableEntity>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let list = Vec::<TableEntity>::deserialize(deserializer)?;
        Ok(list.into_iter().map(|t| (t.name.clone(), t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_from_str() {
        assert_eq!("PostgreSQL".parse::<Engine>().unwrap(), Engine::Postgres);
        assert_eq!("sqlserver".parse::<Engine>().unwrap(), Engine::Mssql);
        assert!("oracle".parse::<Engine>().is_err());
    }

    #[test]
    fn test_schema_names_collects_all_mentions() {
        let model = MetadataModel::new(Engine::Postgres)
            .with_schema(SchemaObject::new("app"))
            .with_table(TableEntity::new(QualifiedName::new("audit", "log")))
            .with_coded(CodedEntity::view(QualifiedName::new("app", "v"), "SELECT 1"));
        assert_eq!(model.schema_names(), vec!["app", "audit"]);
    }

    #[test]
    fn test_tables_serialize_as_list() {
        let model = MetadataModel::new(Engine::Mssql)
            .with_table(TableEntity::new(QualifiedName::new("dbo", "a")));
        let json = serde_json::to_value(&model).unwrap();
        assert!(json["tables"].is_array());
        let back: MetadataModel = serde_json::from_value(json).unwrap();
        assert!(back.table(&QualifiedName::new("dbo", "a")).is_some());
    }
}
