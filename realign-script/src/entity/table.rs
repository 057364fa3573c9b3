//! Tables.
//!
//! A table row carries no compared fields: its shape is reconciled through
//! the child kinds, which bubble their differences up to it. Creation embeds
//! columns, defaults, checks and the primary key.

use super::{Emit, KindDescriptor, Payloads, Removal, StagedRow, Status, status_in};
use crate::context::GenContext;
use crate::kind::EntityKind;
use crate::runtime::Runtime;

/// Tables are keyed by qualified name.
pub const DESCRIPTOR: KindDescriptor = KindDescriptor {
    kind: EntityKind::Table,
    keys: &["schema_name", "table_name"],
    display: &["schema_name", "table_name"],
    fields: &[],
    extras: &[],
    parent: None,
    removal: Removal::ManagedSchemas,
    emits_ddl: true,
};

/// Scripted tables, sorted by dependency rank.
pub fn rows(ctx: &GenContext<'_>) -> Vec<StagedRow> {
    let ddl = ctx.dialect.ddl();
    ctx.tables
        .iter()
        .map(|t| {
            StagedRow::new([t.name.schema.as_str(), t.name.name.as_str()], t.name.to_string())
                .sort_order(i64::from(ctx.rank(&t.name)))
                .payloads(Payloads {
                    create: Some(ddl.create_table(t)),
                    ..Payloads::default()
                })
        })
        .collect()
}

/// Create missing tables, parents first.
pub fn additions(rt: &Runtime) -> String {
    Emit::new(&DESCRIPTOR, "create", "create_sql")
        .filter(status_in("s", &[Status::ToAdd]))
        .render(rt)
}

/// Drop live-only tables.
///
/// Their foreign keys, including keys between two dropped tables, are gone
/// by now: foreign key removal covers dropped tables too.
pub fn drops(rt: &Runtime) -> String {
    Emit::new(&DESCRIPTOR, "drop", "drop_sql")
        .filter(status_in("s", &[Status::ToDrop]))
        .order("s.display_name")
        .render(rt)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use realign_model::{
        ColumnSpec, Engine, ForeignKeySpec, IndexSpec, MetadataModel, QualifiedName, TableEntity,
    };

    use super::*;
    use crate::dialect::Dialect;
    use crate::options::ScriptOptions;

    fn table(name: &str) -> TableEntity {
        TableEntity::new(QualifiedName::new("public", name))
            .with_column(ColumnSpec::new("id", "int4").not_null())
            .with_index(IndexSpec::primary_key(format!("{name}_pkey"), &["id"]))
    }

    #[test]
    fn test_rows_carry_rank_and_create() {
        let child = table("child")
            .with_column(ColumnSpec::new("parent_id", "int4"))
            .with_foreign_key(ForeignKeySpec::new(
                "child_parent_fk",
                QualifiedName::new("public", "parent"),
                &[("parent_id", "id")],
            ));
        let model = MetadataModel::new(Engine::Postgres)
            .with_table(child)
            .with_table(table("parent"));
        let options = ScriptOptions::new(Dialect::POSTGRES);
        let ctx = GenContext::new(&model, &options).unwrap();
        let rows = rows(&ctx);
        let ranked: Vec<(String, i64)> = rows.iter().map(|r| (r.display.clone(), r.sort_order)).collect();
        assert_eq!(
            ranked,
            vec![("public.parent".to_string(), 1), ("public.child".to_string(), 2)]
        );
        let create = rows[0].payloads.create.as_deref().unwrap();
        assert!(create.starts_with("CREATE TABLE \"public\".\"parent\""));
    }

    #[test]
    fn test_additions_follow_sort_order() {
        let rt = Runtime::new(Dialect::MSSQL);
        let sql = additions(&rt);
        assert!(sql.contains("WHERE (s.status = 1) AND s.create_sql IS NOT NULL"));
        assert!(sql.contains("ORDER BY s.sort_order, s.display_name"));
    }
}
