//! Indexes and their member columns.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// An index, primary key or unique constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    /// Index or constraint name.
    pub name: SmolStr,
    /// Enforces uniqueness.
    #[serde(default)]
    pub is_unique: bool,
    /// Backs the primary key.
    #[serde(default)]
    pub is_primary_key: bool,
    /// Created through `UNIQUE` constraint syntax rather than `CREATE INDEX`.
    #[serde(default)]
    pub is_unique_constraint: bool,
    /// Clustered (SQL Server) or marked for `CLUSTER` (PostgreSQL).
    #[serde(default)]
    pub is_clustered: bool,
    /// Partial index predicate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    /// Member columns: key columns by ordinal, then included columns.
    #[serde(default)]
    pub columns: Vec<IndexColumnSpec>,
}

impl IndexSpec {
    /// Create a non-unique index over the given key columns.
    pub fn new(name: impl Into<SmolStr>, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            is_unique: false,
            is_primary_key: false,
            is_unique_constraint: false,
            is_clustered: false,
            filter: None,
            columns: columns
                .iter()
                .enumerate()
                .map(|(i, c)| IndexColumnSpec::key(*c, i as u32 + 1))
                .collect(),
        }
    }

    /// Create a unique index.
    pub fn unique(name: impl Into<SmolStr>, columns: &[&str]) -> Self {
        let mut index = Self::new(name, columns);
        index.is_unique = true;
        index
    }

    /// Create a primary key.
    pub fn primary_key(name: impl Into<SmolStr>, columns: &[&str]) -> Self {
        let mut index = Self::unique(name, columns);
        index.is_primary_key = true;
        index
    }

    /// Mark as a unique constraint.
    pub fn as_constraint(mut self) -> Self {
        self.is_unique = true;
        self.is_unique_constraint = true;
        self
    }

    /// Mark as clustered.
    pub fn clustered(mut self) -> Self {
        self.is_clustered = true;
        self
    }

    /// Set a filter predicate.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Add an included (non-key) column.
    pub fn include(mut self, column: impl Into<SmolStr>) -> Self {
        self.columns.push(IndexColumnSpec {
            column: column.into(),
            key_ordinal: 0,
            descending: false,
            included: true,
        });
        self
    }

    /// Mark a key column descending.
    pub fn descending(mut self, column: &str) -> Self {
        if let Some(c) = self.columns.iter_mut().find(|c| c.column == column) {
            c.descending = true;
        }
        self
    }

    /// Key columns in key order.
    pub fn key_columns(&self) -> impl Iterator<Item = &IndexColumnSpec> {
        let mut keys: Vec<&IndexColumnSpec> = self.columns.iter().filter(|c| !c.included).collect();
        keys.sort_by_key(|c| c.key_ordinal);
        keys.into_iter()
    }

    /// Included columns.
    pub fn included_columns(&self) -> impl Iterator<Item = &IndexColumnSpec> {
        self.columns.iter().filter(|c| c.included)
    }

    /// Whether dropping or creating goes through `ALTER TABLE ... CONSTRAINT`.
    pub fn is_constraint(&self) -> bool {
        self.is_primary_key || self.is_unique_constraint
    }
}

/// One member column of an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexColumnSpec {
    /// Column name.
    pub column: SmolStr,
    /// 1-based key position; `0` for included columns.
    pub key_ordinal: u32,
    /// Descending sort.
    #[serde(default)]
    pub descending: bool,
    /// Included (covering) column.
    #[serde(default)]
    pub included: bool,
}

impl IndexColumnSpec {
    /// Create an ascending key column.
    pub fn key(column: impl Into<SmolStr>, key_ordinal: u32) -> Self {
        Self {
            column: column.into(),
            key_ordinal,
            descending: false,
            included: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_columns_exclude_included() {
        let index = IndexSpec::new("ix_orders_customer", &["customer_id", "placed_at"])
            .include("total")
            .descending("placed_at");
        let keys: Vec<&str> = index.key_columns().map(|c| c.column.as_str()).collect();
        assert_eq!(keys, vec!["customer_id", "placed_at"]);
        assert_eq!(index.included_columns().count(), 1);
        assert!(index.columns[1].descending);
    }

    #[test]
    fn test_primary_key_is_unique_constraint_kind() {
        let pk = IndexSpec::primary_key("pk_t", &["id"]);
        assert!(pk.is_unique);
        assert!(pk.is_constraint());
        assert!(!IndexSpec::unique("ux", &["a"]).is_constraint());
        assert!(IndexSpec::unique("uq", &["a"]).as_constraint().is_constraint());
    }
}
