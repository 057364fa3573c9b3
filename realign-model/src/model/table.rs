//! Tables, columns, column defaults and check constraints.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use super::{ForeignKeySpec, IndexSpec, QualifiedName};

/// A table and everything it owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableEntity {
    /// Qualified table name.
    pub name: QualifiedName,
    /// Columns in ordinal order.
    #[serde(default)]
    pub columns: Vec<ColumnSpec>,
    /// Indexes, including the primary key and unique constraints.
    #[serde(default)]
    pub indexes: Vec<IndexSpec>,
    /// Foreign keys declared on this table.
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeySpec>,
    /// Check constraints.
    #[serde(default)]
    pub checks: Vec<CheckConstraintSpec>,
    /// Column defaults.
    #[serde(default)]
    pub defaults: Vec<DefaultSpec>,
}

impl TableEntity {
    /// Create an empty table.
    pub fn new(name: QualifiedName) -> Self {
        Self {
            name,
            columns: vec![],
            indexes: vec![],
            foreign_keys: vec![],
            checks: vec![],
            defaults: vec![],
        }
    }

    /// Append a column, assigning the next ordinal when none was given.
    pub fn add_column(&mut self, mut column: ColumnSpec) {
        if column.ordinal == 0 {
            column.ordinal = self.columns.len() as u32 + 1;
        }
        self.columns.push(column);
    }

    /// Builder form of [`TableEntity::add_column`].
    pub fn with_column(mut self, column: ColumnSpec) -> Self {
        self.add_column(column);
        self
    }

    /// Add an index.
    pub fn with_index(mut self, index: IndexSpec) -> Self {
        self.indexes.push(index);
        self
    }

    /// Add a foreign key.
    pub fn with_foreign_key(mut self, fk: ForeignKeySpec) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    /// Add a check constraint.
    pub fn with_check(mut self, check: CheckConstraintSpec) -> Self {
        self.checks.push(check);
        self
    }

    /// Add a column default.
    pub fn with_default(mut self, default: DefaultSpec) -> Self {
        self.defaults.push(default);
        self
    }

    /// Get a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Get the default declared for a column.
    pub fn default_for(&self, column: &str) -> Option<&DefaultSpec> {
        self.defaults.iter().find(|d| d.column == column)
    }

    /// Get the primary key index.
    pub fn primary_key(&self) -> Option<&IndexSpec> {
        self.indexes.iter().find(|i| i.is_primary_key)
    }

    /// Pick the key used to identify rows: the primary key when all of its
    /// columns are available, otherwise the first such unique index whose
    /// key columns are all `NOT NULL`.
    ///
    /// Rows are matched on key equality, and NULL never equals NULL, so a
    /// nullable unique index cannot identify rows.
    pub fn row_key<'a>(&'a self, available: &[SmolStr]) -> Option<&'a IndexSpec> {
        let covered = |index: &&IndexSpec| {
            index
                .key_columns()
                .all(|c| available.iter().any(|a| *a == c.column))
        };
        let not_null = |index: &&IndexSpec| {
            index
                .key_columns()
                .all(|c| self.column(&c.column).is_some_and(|col| !col.nullable))
        };
        self.primary_key()
            .filter(covered)
            .or_else(|| {
                self.indexes
                    .iter()
                    .filter(|i| i.is_unique && !i.is_primary_key && i.filter.is_none())
                    .filter(not_null)
                    .find(covered)
            })
    }

    /// Find a unique index whose key column set equals `columns`.
    pub fn unique_index_on(&self, columns: &[SmolStr]) -> Option<&IndexSpec> {
        let mut wanted: Vec<&str> = columns.iter().map(SmolStr::as_str).collect();
        wanted.sort_unstable();
        let matches = |index: &&IndexSpec| {
            let mut keys: Vec<&str> = index.key_columns().map(|c| c.column.as_str()).collect();
            keys.sort_unstable();
            keys == wanted
        };
        self.primary_key()
            .filter(matches)
            .or_else(|| {
                self.indexes
                    .iter()
                    .filter(|i| i.is_unique && i.filter.is_none())
                    .find(matches)
            })
    }

    /// Whether any column is an identity column.
    pub fn has_identity(&self) -> bool {
        self.columns.iter().any(|c| c.identity.is_some())
    }
}

/// Identity (auto-increment) settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentitySpec {
    /// First value.
    pub seed: i64,
    /// Step.
    pub increment: i64,
}

impl Default for IdentitySpec {
    fn default() -> Self {
        Self {
            seed: 1,
            increment: 1,
        }
    }
}

/// One column of a table.
///
/// Attribute values follow the canonical projection of the live catalog
/// query for the target engine, so they compare directly at run time:
/// `max_length` is in characters with `-1` meaning unbounded, `precision`
/// and `scale` are only set for exact numerics (scale also for fractional
/// time types on SQL Server).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Column name.
    pub name: SmolStr,
    /// 1-based position.
    #[serde(default)]
    pub ordinal: u32,
    /// Engine type name, lower case (`nvarchar`, `int4`, `numeric`).
    pub type_name: SmolStr,
    /// Character or byte length.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<i32>,
    /// Numeric precision.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u8>,
    /// Numeric or fractional-second scale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u8>,
    /// Whether NULL is allowed.
    #[serde(default = "default_true")]
    pub nullable: bool,
    /// Identity settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<IdentitySpec>,
    /// Explicit collation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collation: Option<SmolStr>,
    /// Computed column expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub computed: Option<String>,
    /// Engine-maintained row version (`rowversion`), never written.
    #[serde(default)]
    pub is_row_version: bool,
}

fn default_true() -> bool {
    true
}

impl ColumnSpec {
    /// Create a nullable column of the given type.
    pub fn new(name: impl Into<SmolStr>, type_name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            ordinal: 0,
            type_name: type_name.into(),
            max_length: None,
            precision: None,
            scale: None,
            nullable: true,
            identity: None,
            collation: None,
            computed: None,
            is_row_version: false,
        }
    }

    /// Set the length (`-1` for unbounded).
    pub fn with_length(mut self, length: i32) -> Self {
        self.max_length = Some(length);
        self
    }

    /// Set numeric precision and scale.
    pub fn with_precision(mut self, precision: u8, scale: u8) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }

    /// Disallow NULL.
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Make this an identity column.
    pub fn identity(mut self, seed: i64, increment: i64) -> Self {
        self.identity = Some(IdentitySpec { seed, increment });
        self.nullable = false;
        self
    }

    /// Set the collation.
    pub fn with_collation(mut self, collation: impl Into<SmolStr>) -> Self {
        self.collation = Some(collation.into());
        self
    }

    /// Make this a computed column.
    pub fn computed(mut self, expression: impl Into<String>) -> Self {
        self.computed = Some(expression.into());
        self
    }

    /// Whether rows can carry a value for this column.
    pub fn is_writable(&self) -> bool {
        self.computed.is_none() && !self.is_row_version
    }
}

/// A column default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultSpec {
    /// Constraint name; SQL Server names defaults, PostgreSQL does not.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<SmolStr>,
    /// Column the default applies to.
    pub column: SmolStr,
    /// Default expression as the catalog reports it.
    pub definition: String,
}

impl DefaultSpec {
    /// Create an unnamed default.
    pub fn new(column: impl Into<SmolStr>, definition: impl Into<String>) -> Self {
        Self {
            name: None,
            column: column.into(),
            definition: definition.into(),
        }
    }

    /// Set the constraint name.
    pub fn named(mut self, name: impl Into<SmolStr>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// A check constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckConstraintSpec {
    /// Constraint name.
    pub name: SmolStr,
    /// Boolean expression, without the `CHECK` keyword.
    pub definition: String,
    /// Disabled (`NOCHECK`) or not validated.
    #[serde(default)]
    pub is_disabled: bool,
}

impl CheckConstraintSpec {
    /// Create an enabled check constraint.
    pub fn new(name: impl Into<SmolStr>, definition: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            definition: definition.into(),
            is_disabled: false,
        }
    }

    /// Mark the constraint disabled.
    pub fn disabled(mut self) -> Self {
        self.is_disabled = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::IndexSpec;

    fn orders() -> TableEntity {
        TableEntity::new(QualifiedName::new("dbo", "orders"))
            .with_column(ColumnSpec::new("id", "int").identity(1, 1))
            .with_column(ColumnSpec::new("code", "nvarchar").with_length(20).not_null())
            .with_column(ColumnSpec::new("total", "decimal").with_precision(12, 2))
            .with_index(IndexSpec::primary_key("pk_orders", &["id"]))
            .with_index(IndexSpec::unique("ux_orders_code", &["code"]))
    }

    #[test]
    fn test_ordinals_are_assigned() {
        let table = orders();
        let ordinals: Vec<u32> = table.columns.iter().map(|c| c.ordinal).collect();
        assert_eq!(ordinals, vec![1, 2, 3]);
    }

    #[test]
    fn test_row_key_prefers_primary_key() {
        let table = orders();
        let cols: Vec<SmolStr> = vec!["id".into(), "code".into()];
        assert_eq!(table.row_key(&cols).map(|i| i.name.as_str()), Some("pk_orders"));
    }

    #[test]
    fn test_row_key_falls_back_to_unique_index() {
        let table = orders();
        let cols: Vec<SmolStr> = vec!["code".into(), "total".into()];
        assert_eq!(
            table.row_key(&cols).map(|i| i.name.as_str()),
            Some("ux_orders_code")
        );
    }

    #[test]
    fn test_row_key_skips_nullable_unique_index() {
        let table = TableEntity::new(QualifiedName::new("public", "tags"))
            .with_column(ColumnSpec::new("code", "text"))
            .with_column(ColumnSpec::new("slug", "text").not_null())
            .with_column(ColumnSpec::new("label", "text"))
            .with_index(IndexSpec::unique("ux_tags_code", &["code"]))
            .with_index(IndexSpec::unique("ux_tags_slug", &["slug"]));

        let all: Vec<SmolStr> = vec!["code".into(), "slug".into(), "label".into()];
        assert_eq!(table.row_key(&all).map(|i| i.name.as_str()), Some("ux_tags_slug"));

        let nullable_only: Vec<SmolStr> = vec!["code".into(), "label".into()];
        assert!(table.row_key(&nullable_only).is_none());
    }

    #[test]
    fn test_row_key_missing() {
        let table = orders();
        let cols: Vec<SmolStr> = vec!["total".into()];
        assert!(table.row_key(&cols).is_none());
    }

    #[test]
    fn test_unique_index_on_ignores_order() {
        let table = TableEntity::new(QualifiedName::new("dbo", "t"))
            .with_index(IndexSpec::unique("ux_ab", &["a", "b"]));
        let cols: Vec<SmolStr> = vec!["b".into(), "a".into()];
        assert!(table.unique_index_on(&cols).is_some());
    }

    #[test]
    fn test_identity_implies_not_null() {
        let col = ColumnSpec::new("id", "int").identity(10, 5);
        assert!(!col.nullable);
        assert_eq!(col.identity, Some(IdentitySpec { seed: 10, increment: 5 }));
    }
}
