//! Ordered entity listings.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::graph::DependencyGraph;
use crate::model::{CodedKind, MetadataModel, QualifiedName};

/// Kind column of an entity listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListedKind {
    /// A table.
    Table,
    /// A coded entity.
    Coded(CodedKind),
}

impl ListedKind {
    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::Coded(kind) => kind.label(),
        }
    }
}

/// One row of an entity listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityListing {
    /// Schema name.
    pub schema: SmolStr,
    /// Entity name.
    pub name: SmolStr,
    /// Entity kind.
    pub kind: ListedKind,
    /// Dependency rank; lower ranks are scripted first.
    pub sort_order: u32,
}

/// Restricts which entities a listing returns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingFilter {
    /// Only these schemas; empty means all.
    #[serde(default)]
    pub schemas: Vec<SmolStr>,
    /// Leave coded entities out.
    #[serde(default)]
    pub tables_only: bool,
}

impl ListingFilter {
    fn admits(&self, schema: &SmolStr) -> bool {
        self.schemas.is_empty() || self.schemas.contains(schema)
    }
}

/// List entities in script order.
///
/// Tables carry their dependency rank; every other entity is ranked one past
/// the deepest table, or `2` when the foreign key graph has a cycle.
pub fn entity_list(model: &MetadataModel, filter: &ListingFilter) -> Vec<EntityListing> {
    let tables: Vec<QualifiedName> = model
        .tables
        .keys()
        .filter(|t| filter.admits(&t.schema))
        .cloned()
        .collect();
    let ordering = DependencyGraph::from_model(model, &tables).topological_order();

    let mut listing: Vec<EntityListing> = ordering
        .ranked()
        .iter()
        .map(|(table, rank)| EntityListing {
            schema: table.schema.clone(),
            name: table.name.clone(),
            kind: ListedKind::Table,
            sort_order: *rank,
        })
        .collect();

    if !filter.tables_only {
        let rank = ordering.entity_rank();
        listing.extend(
            model
                .coded
                .iter()
                .filter(|c| filter.admits(&c.name.schema))
                .map(|c| EntityListing {
                    schema: c.name.schema.clone(),
                    name: c.name.name.clone(),
                    kind: ListedKind::Coded(c.kind),
                    sort_order: rank,
                }),
        );
    }

    listing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CodedEntity, Engine, ForeignKeySpec, TableEntity};

    fn model() -> MetadataModel {
        MetadataModel::new(Engine::Mssql)
            .with_table(
                TableEntity::new(QualifiedName::new("dbo", "child")).with_foreign_key(
                    ForeignKeySpec::new(
                        "fk_child_parent",
                        QualifiedName::new("dbo", "parent"),
                        &[("parent_id", "id")],
                    ),
                ),
            )
            .with_table(TableEntity::new(QualifiedName::new("dbo", "parent")))
            .with_table(TableEntity::new(QualifiedName::new("etl", "staging")))
            .with_coded(CodedEntity::view(
                QualifiedName::new("dbo", "v_children"),
                "CREATE VIEW dbo.v_children AS SELECT 1 AS x",
            ))
    }

    #[test]
    fn test_listing_orders_parents_first() {
        let listing = entity_list(&model(), &ListingFilter::default());
        let names: Vec<(&str, u32)> = listing
            .iter()
            .map(|l| (l.name.as_str(), l.sort_order))
            .collect();
        assert_eq!(
            names,
            vec![("parent", 1), ("staging", 1), ("child", 2), ("v_children", 3)]
        );
    }

    #[test]
    fn test_listing_filter() {
        let filter = ListingFilter {
            schemas: vec!["dbo".into()],
            tables_only: true,
        };
        let listing = entity_list(&model(), &filter);
        assert_eq!(listing.len(), 2);
        assert!(listing.iter().all(|l| l.kind == ListedKind::Table));
    }
}
