//! Foreign keys and their column pairs.
//!
//! Keys are removed for every scripted table, dropped ones included, so a
//! key between two dropped tables is gone before either table is.

use realign_model::{Engine, ReferentialAction};

use super::{
    Emit, Extra, Field, FieldType, KindDescriptor, OnDiff, Parent, Payloads, Removal, StagedRow,
    adding, dropping, toggle_changed,
};
use crate::context::GenContext;
use crate::ddl::orphan_precheck;
use crate::kind::EntityKind;
use crate::runtime::Runtime;

/// Foreign keys are keyed by name within their table.
pub const DESCRIPTOR: KindDescriptor = KindDescriptor {
    kind: EntityKind::ForeignKey,
    keys: &["schema_name", "table_name", "fk_name"],
    display: &["schema_name", "table_name", "fk_name"],
    fields: &[
        Field::new("ref_schema", FieldType::Text, OnDiff::Rebuild),
        Field::new("ref_table", FieldType::Text, OnDiff::Rebuild),
        Field::new("on_delete", FieldType::Text, OnDiff::Rebuild),
        Field::new("on_update", FieldType::Text, OnDiff::Rebuild),
        Field::new("is_disabled", FieldType::Bool, OnDiff::Toggle),
    ],
    extras: &[Extra {
        name: "ref_index",
        ty: FieldType::Text,
    }],
    parent: None,
    removal: Removal::ScriptedTables,
    emits_ddl: true,
};

/// Column pairs of a key.
pub const MEMBER_DESCRIPTOR: KindDescriptor = KindDescriptor {
    kind: EntityKind::FkColumn,
    keys: &["schema_name", "table_name", "fk_name", "column_name"],
    display: &["schema_name", "table_name", "fk_name", "column_name"],
    fields: &[
        Field::new("referenced_column", FieldType::Text, OnDiff::Rebuild),
        Field::new("ordinal", FieldType::Int, OnDiff::Rebuild),
    ],
    extras: &[],
    parent: Some(Parent {
        kind: EntityKind::ForeignKey,
        keys: &["schema_name", "table_name", "fk_name"],
    }),
    removal: Removal::ScriptedTables,
    emits_ddl: false,
};

/// SQL Server reports RESTRICT as NO ACTION.
fn action_code(engine: Engine, action: ReferentialAction) -> &'static str {
    match (engine, action) {
        (Engine::Mssql, ReferentialAction::Restrict) => ReferentialAction::NoAction.code(),
        _ => action.code(),
    }
}

/// Keys whose both ends are scripted, sorted by the rank of the owning table.
pub fn rows(ctx: &GenContext<'_>) -> Vec<StagedRow> {
    let d = ctx.dialect;
    let ddl = d.ddl();
    ctx.foreign_keys
        .iter()
        .map(|r| {
            let table = &r.table.name;
            let fk = r.fk;
            let precheck = (ctx.options.precheck_constraints && !fk.is_disabled)
                .then(|| orphan_precheck(d, table, fk));
            StagedRow::new(
                [table.schema.as_str(), table.name.as_str(), fk.name.as_str()],
                format!("{table}.{}", fk.name),
            )
            .field(Some(fk.referenced.schema.to_string()))
            .field(Some(fk.referenced.name.to_string()))
            .field(Some(action_code(d.engine, fk.on_delete).to_string()))
            .field(Some(action_code(d.engine, fk.on_update).to_string()))
            .field(fk.is_disabled)
            .extra(Some(r.ref_index.name.to_string()))
            .sort_order(i64::from(ctx.rank(table)))
            .payloads(Payloads {
                create: Some(ddl.add_foreign_key(table, fk)),
                toggle: Some(ddl.toggle_foreign_key(table, fk)),
                precheck,
                ..Payloads::default()
            })
        })
        .collect()
}

/// One row per column pair.
pub fn member_rows(ctx: &GenContext<'_>) -> Vec<StagedRow> {
    let mut rows = Vec::new();
    for r in &ctx.foreign_keys {
        let table = &r.table.name;
        for pair in &r.fk.columns {
            rows.push(
                StagedRow::new(
                    [
                        table.schema.as_str(),
                        table.name.as_str(),
                        r.fk.name.as_str(),
                        pair.column.as_str(),
                    ],
                    format!("{table}.{}.{}", r.fk.name, pair.column),
                )
                .field(Some(pair.referenced_column.to_string()))
                .field(i64::from(pair.ordinal)),
            );
        }
    }
    rows
}

/// Drop removed, rebuilt and blocked keys, children of the deepest tables
/// first. Keys of dropped tables are included.
pub fn pre_drop(rt: &Runtime) -> String {
    Emit::new(&DESCRIPTOR, "drop", "drop_sql")
        .filter(dropping(rt.dialect()))
        .order("s.sort_order DESC, s.display_name")
        .render(rt)
}

/// Create new, rebuilt and blocked keys once their referenced indexes exist.
pub fn post_add(rt: &Runtime) -> String {
    Emit::new(&DESCRIPTOR, "create", "create_sql")
        .check("precheck_sql")
        .filter(adding(rt.dialect()))
        .render(rt)
}

/// Enable or disable keys that otherwise stay.
pub fn toggle(rt: &Runtime) -> String {
    toggle_changed(rt, &DESCRIPTOR)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use realign_model::{
        ColumnSpec, ForeignKeySpec, IndexSpec, MetadataModel, QualifiedName, TableEntity,
    };

    use super::*;
    use crate::dialect::Dialect;
    use crate::entity::Cell;
    use crate::options::ScriptOptions;

    fn model(engine: Engine) -> MetadataModel {
        let schema = match engine {
            Engine::Mssql => "dbo",
            Engine::Postgres => "public",
        };
        let orders = TableEntity::new(QualifiedName::new(schema, "orders"))
            .with_column(ColumnSpec::new("id", "int").not_null())
            .with_index(IndexSpec::primary_key("pk_orders", &["id"]));
        let lines = TableEntity::new(QualifiedName::new(schema, "lines"))
            .with_column(ColumnSpec::new("order_id", "int").not_null())
            .with_column(ColumnSpec::new("line_no", "int").not_null())
            .with_index(IndexSpec::primary_key("pk_lines", &["order_id", "line_no"]))
            .with_foreign_key(
                ForeignKeySpec::new(
                    "fk_lines_orders",
                    QualifiedName::new(schema, "orders"),
                    &[("order_id", "id")],
                )
                .on_delete(ReferentialAction::Restrict),
            );
        MetadataModel::new(engine).with_table(lines).with_table(orders)
    }

    #[test]
    fn test_rows_carry_parent_and_actions() {
        let model = model(Engine::Mssql);
        let options = ScriptOptions::new(Dialect::MSSQL).precheck_constraints(true);
        let ctx = GenContext::new(&model, &options).unwrap();
        let rows = rows(&ctx);
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.display, "dbo.lines.fk_lines_orders");
        assert_eq!(row.fields[1], Cell::text("orders"));
        assert_eq!(row.fields[2], Cell::text("NO_ACTION"), "restrict reads back as no action");
        assert_eq!(row.extras, vec![Cell::text("pk_orders")]);
        assert_eq!(row.sort_order, 2);
        assert!(row.payloads.precheck.is_some());
    }

    #[test]
    fn test_restrict_is_kept_on_postgres() {
        let model = model(Engine::Postgres);
        let options = ScriptOptions::new(Dialect::POSTGRES);
        let ctx = GenContext::new(&model, &options).unwrap();
        let rows = rows(&ctx);
        assert_eq!(rows[0].fields[2], Cell::text("RESTRICT"));
        assert!(rows[0].payloads.precheck.is_none());
    }

    #[test]
    fn test_member_rows() {
        let model = model(Engine::Mssql);
        let options = ScriptOptions::new(Dialect::MSSQL);
        let ctx = GenContext::new(&model, &options).unwrap();
        let members = member_rows(&ctx);
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].keys[3], "order_id");
        assert_eq!(members[0].fields, vec![Cell::text("id"), Cell::Int(Some(1))]);
    }

    #[test]
    fn test_pre_drop_covers_dropped_tables() {
        let rt = Runtime::new(Dialect::POSTGRES);
        let sql = pre_drop(&rt);
        assert!(sql.contains("s.status = 2 OR s.rebuild OR s.blocked"));
        assert!(!sql.contains("NOT EXISTS (SELECT 1 FROM realign_tables"));
        assert!(sql.contains("ORDER BY s.sort_order DESC"));
    }
}
