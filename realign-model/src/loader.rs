//! Loader interfaces.
//!
//! Loaders populate a [`MetadataModel`] from some source. Catalog failures
//! for a single entity kind do not abort the load: the kind comes back empty
//! and a warning is logged, so callers always get a best-effort snapshot.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::warn;

use crate::error::ModelResult;
use crate::listing::{EntityListing, ListingFilter, entity_list};
use crate::model::{MetadataModel, QualifiedName, TableData};
use crate::scope::Scope;
use crate::snapshot::read_snapshot;

/// Source of desired-state metadata.
#[async_trait]
pub trait MetadataLoader: Send + Sync {
    /// Load the structural snapshot for a scope.
    async fn load_metadata(&self, scope: &Scope) -> ModelResult<MetadataModel>;

    /// Load captured rows for the given tables.
    async fn load_table_data(&self, tables: &[QualifiedName]) -> ModelResult<Vec<TableData>>;

    /// List entities in dependency order.
    async fn load_entity_list(&self, filter: &ListingFilter) -> ModelResult<Vec<EntityListing>> {
        let scope = Scope::all().with_schemas(filter.schemas.iter().cloned());
        let model = self.load_metadata(&scope).await?;
        Ok(entity_list(&model, filter))
    }
}

/// Collapse a per-kind load failure into an empty result.
pub fn best_effort<T>(kind: &str, result: ModelResult<Vec<T>>) -> Vec<T> {
    result.unwrap_or_else(|err| {
        warn!(
            kind,
            error = %err,
            recoverable = err.is_recoverable(),
            "Catalog load failed, continuing without this kind"
        );
        Vec::new()
    })
}

/// Loader backed by a snapshot file.
#[derive(Debug)]
pub struct SnapshotLoader {
    path: PathBuf,
    model: OnceCell<MetadataModel>,
}

impl SnapshotLoader {
    /// Create a loader for a snapshot file; the file is read on first use.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            model: OnceCell::new(),
        }
    }

    /// Create a loader over an in-memory model.
    pub fn from_model(model: MetadataModel) -> Self {
        Self {
            path: PathBuf::from("<memory>"),
            model: OnceCell::new_with(Some(model)),
        }
    }

    async fn model(&self) -> ModelResult<&MetadataModel> {
        self.model
            .get_or_try_init(|| async { read_snapshot(&self.path).await })
            .await
    }
}

#[async_trait]
impl MetadataLoader for SnapshotLoader {
    async fn load_metadata(&self, scope: &Scope) -> ModelResult<MetadataModel> {
        let full = self.model().await?;
        let schemas = scope.managed_schemas(full);

        let mut model = MetadataModel::new(full.engine);
        model.schemas = full
            .schemas
            .iter()
            .filter(|s| schemas.contains(&s.name))
            .cloned()
            .collect();
        model.tables = full
            .tables
            .iter()
            .filter(|(name, _)| scope.includes_table(full, name))
            .map(|(name, table)| (name.clone(), table.clone()))
            .collect();
        model.coded = full
            .coded
            .iter()
            .filter(|c| schemas.contains(&c.name.schema))
            .cloned()
            .collect();
        model.data = full
            .data
            .iter()
            .filter(|d| model.tables.contains_key(&d.table))
            .filter(|d| scope.data_tables.is_empty() || scope.data_tables.contains(&d.table))
            .cloned()
            .collect();
        Ok(model)
    }

    async fn load_table_data(&self, tables: &[QualifiedName]) -> ModelResult<Vec<TableData>> {
        let full = self.model().await?;
        let mut rows = Vec::with_capacity(tables.len());
        for table in tables {
            match full.data_for(table) {
                Some(data) => rows.push(data.clone()),
                None => warn!(table = %table, "No captured rows for table"),
            }
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;
    use crate::listing::ListedKind;
    use crate::model::{Engine, TableEntity, Value};

    fn model() -> MetadataModel {
        MetadataModel::new(Engine::Mssql)
            .with_table(TableEntity::new(QualifiedName::new("dbo", "a")))
            .with_table(TableEntity::new(QualifiedName::new("hr", "b")))
            .with_data(
                TableData::new(QualifiedName::new("dbo", "a"), &["id"]).with_row(vec![Value::Int(1)]),
            )
    }

    #[tokio::test]
    async fn test_snapshot_loader_applies_scope() {
        let loader = SnapshotLoader::from_model(model());
        let scoped = loader
            .load_metadata(&Scope::all().with_schemas(["dbo"]))
            .await
            .unwrap();
        assert_eq!(scoped.tables.len(), 1);
        assert_eq!(scoped.data.len(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_loader_entity_list() {
        let loader = SnapshotLoader::from_model(model());
        let listing = loader
            .load_entity_list(&ListingFilter::default())
            .await
            .unwrap();
        assert_eq!(listing.len(), 2);
        assert!(listing.iter().all(|l| l.kind == ListedKind::Table));
    }

    #[tokio::test]
    async fn test_load_table_data_skips_missing() {
        let loader = SnapshotLoader::from_model(model());
        let rows = loader
            .load_table_data(&[QualifiedName::new("dbo", "a"), QualifiedName::new("hr", "b")])
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_best_effort_swallows_errors() {
        let items: Vec<u32> = best_effort("indexes", Err(ModelError::loader("timeout")));
        assert!(items.is_empty());
        assert_eq!(best_effort("indexes", Ok(vec![1, 2])), vec![1, 2]);
    }
}
