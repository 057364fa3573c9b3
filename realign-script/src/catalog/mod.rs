//! Live catalog queries.
//!
//! One `SELECT` per kind per engine, projecting exactly the live columns of
//! the kind's descriptor (natural key, compared fields, `sort_order`,
//! `drop_sql`) in that order. The script runs them into the live staging
//! tables with `INSERT INTO ... SELECT`, so projection order is what counts.
//! Drop statements are built here from live names because live objects may
//! be named differently from the model (system-named defaults, for one).

mod mssql;
mod postgres;

use realign_model::Engine;
use smol_str::SmolStr;

use crate::dialect::Dialect;
use crate::entity;
use crate::kind::EntityKind;

/// A live catalog query and the staging columns it fills.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogQuery {
    /// Target columns, in projection order.
    pub columns: Vec<&'static str>,
    /// The `SELECT`.
    pub sql: String,
}

/// Restricts a catalog query to the managed schemas.
#[derive(Debug, Clone)]
pub(crate) struct SchemaFilter {
    list: Option<String>,
}

impl SchemaFilter {
    fn new(d: Dialect, schemas: &[SmolStr]) -> Self {
        let list = (!schemas.is_empty()).then(|| {
            schemas
                .iter()
                .map(|s| d.string(s))
                .collect::<Vec<_>>()
                .join(", ")
        });
        Self { list }
    }

    /// Condition on a schema-name expression.
    pub(crate) fn on(&self, column: &str) -> String {
        match &self.list {
            Some(list) => format!("{column} IN ({list})"),
            None => "1 = 0".to_string(),
        }
    }
}

/// The live query of a kind, restricted to `schemas`.
pub fn live_query(d: Dialect, kind: EntityKind, schemas: &[SmolStr]) -> CatalogQuery {
    let filter = SchemaFilter::new(d, schemas);
    let sql = match d.engine {
        Engine::Mssql => mssql::query(kind, &filter),
        Engine::Postgres => postgres::query(kind, &filter),
    };
    CatalogQuery {
        columns: entity::descriptor(kind).live_columns(),
        sql,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alias_positions(sql: &str, columns: &[&str]) -> Vec<Option<usize>> {
        columns
            .iter()
            .map(|c| sql.find(&format!(" AS {c},")).or_else(|| sql.find(&format!(" AS {c}\n"))))
            .collect()
    }

    #[test]
    fn test_queries_project_descriptor_columns_in_order() {
        for dialect in [Dialect::MSSQL, Dialect::POSTGRES] {
            for kind in EntityKind::ALL {
                let query = live_query(dialect, kind, &["dbo".into()]);
                let positions = alias_positions(&query.sql, &query.columns);
                assert!(
                    positions.iter().all(Option::is_some),
                    "{kind} on {}: missing alias in\n{}",
                    dialect.engine,
                    query.sql
                );
                let found: Vec<usize> = positions.into_iter().flatten().collect();
                let mut sorted = found.clone();
                sorted.sort_unstable();
                assert_eq!(found, sorted, "{kind} on {}: aliases out of order", dialect.engine);
            }
        }
    }

    #[test]
    fn test_empty_schema_list_matches_nothing() {
        let query = live_query(Dialect::MSSQL, EntityKind::Table, &[]);
        assert!(query.sql.contains("1 = 0"));
        let query = live_query(Dialect::POSTGRES, EntityKind::Table, &["a".into(), "b".into()]);
        assert!(query.sql.contains("n.nspname IN ('a', 'b')"));
    }

    #[test]
    fn test_postgres_excludes_extension_objects() {
        for kind in [EntityKind::Table, EntityKind::Coded] {
            let query = live_query(Dialect::POSTGRES, kind, &["public".into()]);
            assert!(query.sql.contains("deptype = 'e'"), "{kind}");
        }
    }
}
