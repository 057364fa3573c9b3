//! Column defaults.
//!
//! Keyed by column rather than constraint name: SQL Server names defaults
//! automatically unless told otherwise, so the live name is only used to
//! drop.

use super::{
    Emit, Field, FieldType, KindDescriptor, OnDiff, Payloads, Removal, StagedRow, adding, dropping,
    table_persists,
};
use crate::context::GenContext;
use crate::kind::EntityKind;
use crate::runtime::Runtime;

/// Defaults are keyed by their column.
pub const DESCRIPTOR: KindDescriptor = KindDescriptor {
    kind: EntityKind::Default,
    keys: &["schema_name", "table_name", "column_name"],
    display: &["schema_name", "table_name", "column_name"],
    fields: &[Field::new("definition", FieldType::LongText, OnDiff::Rebuild)],
    extras: &[],
    parent: None,
    removal: Removal::ManagedTables,
    emits_ddl: true,
};

/// Defaults of writable columns.
pub fn rows(ctx: &GenContext<'_>) -> Vec<StagedRow> {
    let ddl = ctx.dialect.ddl();
    ctx.tables
        .iter()
        .flat_map(|t| t.defaults.iter().map(move |df| (t, df)))
        .filter(|(t, df)| t.column(&df.column).is_some_and(|c| c.computed.is_none()))
        .map(|(t, df)| {
            StagedRow::new(
                [t.name.schema.as_str(), t.name.name.as_str(), df.column.as_str()],
                format!("{}.{}", t.name, df.column),
            )
            .field(Some(df.definition.clone()))
            .payloads(Payloads {
                create: Some(ddl.add_default(&t.name, df)),
                ..Payloads::default()
            })
        })
        .collect()
}

/// Drop removed, changed and blocked defaults.
pub fn pre_drop(rt: &Runtime) -> String {
    let d = rt.dialect();
    Emit::new(&DESCRIPTOR, "drop", "drop_sql")
        .filter(format!("{} AND {}", dropping(d), table_persists(d, "s")))
        .render(rt)
}

/// Re-add new, changed and blocked defaults.
pub fn re_add(rt: &Runtime) -> String {
    let d = rt.dialect();
    Emit::new(&DESCRIPTOR, "add", "create_sql")
        .filter(format!("{} AND {}", adding(d), table_persists(d, "s")))
        .render(rt)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use realign_model::{ColumnSpec, DefaultSpec, Engine, MetadataModel, QualifiedName, TableEntity};

    use super::*;
    use crate::dialect::Dialect;
    use crate::options::ScriptOptions;

    #[test]
    fn test_rows_use_named_constraints_when_given() {
        let model = MetadataModel::new(Engine::Mssql).with_table(
            TableEntity::new(QualifiedName::new("dbo", "orders"))
                .with_column(ColumnSpec::new("status", "int"))
                .with_column(ColumnSpec::new("placed", "datetime2"))
                .with_default(DefaultSpec::new("status", "((0))").named("df_orders_status"))
                .with_default(DefaultSpec::new("placed", "(sysutcdatetime())")),
        );
        let options = ScriptOptions::new(Dialect::MSSQL);
        let ctx = GenContext::new(&model, &options).unwrap();
        let rows = rows(&ctx);
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0].payloads.create.as_deref(),
            Some("ALTER TABLE [dbo].[orders] ADD CONSTRAINT [df_orders_status] DEFAULT ((0)) FOR [status];")
        );
        assert_eq!(
            rows[1].payloads.create.as_deref(),
            Some("ALTER TABLE [dbo].[orders] ADD DEFAULT (sysutcdatetime()) FOR [placed];")
        );
    }

    #[test]
    fn test_phases_skip_created_and_dropped_tables() {
        let rt = Runtime::new(Dialect::POSTGRES);
        let drop = pre_drop(&rt);
        assert!(drop.contains("s.status = 2 OR s.rebuild OR s.blocked"));
        assert!(drop.contains("NOT EXISTS (SELECT 1 FROM realign_tables t"));
        let add = re_add(&rt);
        assert!(add.contains("s.status = 1 OR s.rebuild OR s.blocked"));
    }
}
