//! DDL payloads for every entity kind.
//!
//! Payloads are computed at generation time from the desired model and
//! staged as text; the script executes the ones its run-time classification
//! selects. Drop payloads come from the live catalog instead (see
//! [`crate::catalog`]) because live object names may differ from the model.

mod mssql;
mod postgres;

pub use mssql::MssqlDdl;
pub use postgres::PostgresDdl;

use realign_model::{
    CheckConstraintSpec, CodedEntity, ColumnSpec, DefaultSpec, ForeignKeySpec, IndexSpec,
    QualifiedName, SchemaObject, TableEntity,
};

use crate::dialect::Dialect;

/// Builds DDL statements for one engine.
pub trait DdlBuilder: Send + Sync {
    /// Tokens of the engine.
    fn dialect(&self) -> Dialect;

    /// Column type including length, precision and scale.
    fn type_sql(&self, column: &ColumnSpec) -> String;

    /// `CREATE SCHEMA`.
    fn create_schema(&self, schema: &SchemaObject) -> String;

    /// Change a schema's owner.
    fn alter_schema_owner(&self, schema: &str, owner: &str) -> String;

    /// `CREATE TABLE` with columns, defaults, checks and the primary key.
    fn create_table(&self, table: &TableEntity) -> String;

    /// Add a column; nullable unless it is computed or an identity.
    fn add_column(&self, table: &QualifiedName, column: &ColumnSpec) -> String;

    /// Change type or collation in place.
    fn alter_column(&self, table: &QualifiedName, column: &ColumnSpec) -> String;

    /// Allow NULL.
    fn relax_column(&self, table: &QualifiedName, column: &ColumnSpec) -> String;

    /// Backfill NULLs from the default and disallow NULL; `None` when the
    /// column stays nullable or its nullability is fixed by its kind.
    fn tighten_column(&self, table: &TableEntity, column: &ColumnSpec) -> Option<String>;

    /// Add or remove identity behaviour; `None` when the engine cannot.
    fn identity_change(&self, table: &QualifiedName, column: &ColumnSpec) -> Option<String>;

    /// Attach a default.
    fn add_default(&self, table: &QualifiedName, default: &DefaultSpec) -> String;

    /// Add a check constraint, honouring its disabled flag.
    fn add_check(&self, table: &QualifiedName, check: &CheckConstraintSpec) -> String;

    /// Bring an existing check constraint to the desired enabled state.
    fn toggle_check(&self, table: &QualifiedName, check: &CheckConstraintSpec) -> String;

    /// Create an index, primary key or unique constraint.
    fn create_index(&self, table: &QualifiedName, index: &IndexSpec) -> String;

    /// Add a foreign key, honouring its disabled flag.
    fn add_foreign_key(&self, table: &QualifiedName, fk: &ForeignKeySpec) -> String;

    /// Bring an existing foreign key to the desired enabled state.
    fn toggle_foreign_key(&self, table: &QualifiedName, fk: &ForeignKeySpec) -> String;

    /// Create a view, routine or trigger.
    fn create_coded(&self, entity: &CodedEntity) -> String;

    /// Enable or disable a trigger; `None` for other kinds.
    fn toggle_trigger(&self, entity: &CodedEntity) -> Option<String>;
}

/// Wrap an expression in parentheses unless it already is wholly wrapped.
pub fn parenthesize(expr: &str) -> String {
    let expr = expr.trim();
    if is_wrapped(expr) {
        expr.to_string()
    } else {
        format!("({expr})")
    }
}

fn is_wrapped(expr: &str) -> bool {
    if !expr.starts_with('(') || !expr.ends_with(')') {
        return false;
    }
    let mut depth = 0i32;
    let mut in_string = false;
    for (i, ch) in expr.char_indices() {
        match ch {
            '\'' => in_string = !in_string,
            '(' if !in_string => depth += 1,
            ')' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return i == expr.len() - 1;
                }
            }
            _ => {}
        }
    }
    false
}

/// Quoted, comma-separated column list.
pub fn column_list<'a>(dialect: Dialect, columns: impl IntoIterator<Item = &'a str>) -> String {
    columns
        .into_iter()
        .map(|c| dialect.quote(c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Count duplicate keys that would stop a unique index from being created.
pub fn unique_precheck(dialect: Dialect, table: &QualifiedName, index: &IndexSpec) -> String {
    let keys = column_list(dialect, index.key_columns().map(|c| c.column.as_str()));
    let mut filters: Vec<String> = Vec::new();
    if let Some(filter) = &index.filter {
        filters.push(parenthesize(filter));
    }
    if dialect.engine == realign_model::Engine::Postgres {
        filters.extend(
            index
                .key_columns()
                .map(|c| format!("{} IS NOT NULL", dialect.quote(&c.column))),
        );
    }
    let filter = if filters.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", filters.join(" AND "))
    };
    dialect.count_query(&format!(
        "SELECT {keys} FROM {}{filter} GROUP BY {keys} HAVING COUNT(*) > 1",
        dialect.qualified(table)
    ))
}

/// Count child rows with no parent row.
pub fn orphan_precheck(dialect: Dialect, table: &QualifiedName, fk: &ForeignKeySpec) -> String {
    let not_null = fk
        .columns
        .iter()
        .map(|c| format!("c.{} IS NOT NULL", dialect.quote(&c.column)))
        .collect::<Vec<_>>()
        .join(" AND ");
    let join = fk
        .columns
        .iter()
        .map(|c| {
            format!(
                "p.{} = c.{}",
                dialect.quote(&c.referenced_column),
                dialect.quote(&c.column)
            )
        })
        .collect::<Vec<_>>()
        .join(" AND ");
    dialect.count_query(&format!(
        "SELECT 1 AS x FROM {} c WHERE {not_null} AND NOT EXISTS (SELECT 1 FROM {} p WHERE {join})",
        dialect.qualified(table),
        dialect.qualified(&fk.referenced)
    ))
}

/// Count rows violating a check expression.
pub fn check_precheck(dialect: Dialect, table: &QualifiedName, check: &CheckConstraintSpec) -> String {
    dialect.count_query(&format!(
        "SELECT 1 AS x FROM {} WHERE NOT {}",
        dialect.qualified(table),
        parenthesize(&check.definition)
    ))
}

/// Count NULLs that would stop a column from becoming NOT NULL.
pub fn null_precheck(dialect: Dialect, table: &QualifiedName, column: &str) -> String {
    dialect.count_query(&format!(
        "SELECT 1 AS x FROM {} WHERE {} IS NULL",
        dialect.qualified(table),
        dialect.quote(column)
    ))
}
