//! Columns.
//!
//! Type attributes are compared as the catalog reports them: length in
//! characters (`-1` for max), precision and scale only where the type takes
//! them, collation only when it differs from the database default. Computed
//! columns are compared on their expression alone and rebuilt when it
//! changes.

use realign_model::{ColumnSpec, TableEntity};

use super::{
    Cell, Emit, Field, FieldType, KindDescriptor, OnDiff, Payloads, Removal, StagedRow, Status,
    status_in, table_persists,
};
use crate::context::GenContext;
use crate::ddl::null_precheck;
use crate::kind::EntityKind;
use crate::runtime::{RowSelect, RowVar, Runtime};

/// Columns are keyed by table and name.
pub const DESCRIPTOR: KindDescriptor = KindDescriptor {
    kind: EntityKind::Column,
    keys: &["schema_name", "table_name", "column_name"],
    display: &["schema_name", "table_name", "column_name"],
    fields: &[
        Field::new("type_name", FieldType::Text, OnDiff::Alter).optional(),
        Field::new("max_length", FieldType::Int, OnDiff::Alter).optional(),
        Field::new("num_precision", FieldType::Int, OnDiff::Alter).optional(),
        Field::new("num_scale", FieldType::Int, OnDiff::Alter).optional(),
        Field::new("collation_name", FieldType::Text, OnDiff::Alter).optional(),
        Field::new("nullable", FieldType::Bool, OnDiff::Nullability).optional(),
        Field::new("is_identity", FieldType::Bool, OnDiff::Identity),
        Field::new("computed_definition", FieldType::LongText, OnDiff::Rebuild),
    ],
    extras: &[],
    parent: None,
    removal: Removal::ManagedTables,
    emits_ddl: true,
};

fn row(ctx: &GenContext<'_>, table: &TableEntity, column: &ColumnSpec) -> StagedRow {
    let ddl = ctx.dialect.ddl();
    let name = &table.name;
    let display = format!("{name}.{}", column.name);
    let keys = [name.schema.as_str(), name.name.as_str(), column.name.as_str()];
    let computed = column.computed.is_some();
    let plain = |v: Option<String>| if computed { None } else { v };
    let number = |v: Option<i64>| if computed { None } else { v };

    let has_default = table.default_for(&column.name).is_some();
    let precheck = (ctx.options.precheck_constraints
        && !column.nullable
        && !computed
        && column.identity.is_none()
        && !has_default)
        .then(|| null_precheck(ctx.dialect, name, &column.name));

    StagedRow::new(keys, display)
        .field(plain(Some(column.type_name.to_ascii_lowercase())))
        .field(number(column.max_length.map(i64::from)))
        .field(number(column.precision.map(i64::from)))
        .field(number(column.scale.map(i64::from)))
        .field(plain(column.collation.as_ref().map(ToString::to_string)))
        .field(Cell::Bool((!computed).then_some(column.nullable)))
        .field(column.identity.is_some())
        .field(column.computed.clone())
        .sort_order(i64::from(column.ordinal))
        .payloads(Payloads {
            create: Some(ddl.add_column(name, column)),
            alter: (!computed).then(|| ddl.alter_column(name, column)),
            relax: (!computed && column.nullable).then(|| ddl.relax_column(name, column)),
            tighten: ddl.tighten_column(table, column),
            identity: ddl.identity_change(name, column),
            precheck,
            ..Payloads::default()
        })
}

/// Every column of the scripted tables.
pub fn rows(ctx: &GenContext<'_>) -> Vec<StagedRow> {
    ctx.tables
        .iter()
        .flat_map(|t| t.columns.iter().map(move |c| (t, c)))
        .map(|(t, c)| row(ctx, t, c))
        .collect()
}

/// Incremental column changes on tables that persist.
///
/// Adds come nullable; the tighten phase applies NOT NULL once data is in.
pub fn changes(rt: &Runtime) -> Vec<String> {
    let d = rt.dialect();
    let persists = table_persists(d, "s");
    let alter_flags = DESCRIPTOR
        .any_flag(d, "s", OnDiff::Alter)
        .unwrap_or_else(|| "1 = 0".to_string());
    let altered = format!(
        "{} AND {} AND {persists}",
        status_in("s", &[Status::ToAlter]),
        d.is_clear("s.rebuild")
    );
    let mut relax = format!("{altered} AND {} AND {}", d.is_set("s.d_nullable"), d.is_set("s.nullable"));
    if d.alter_resets_nullability {
        relax.push_str(&format!(" AND NOT {alter_flags}"));
    }

    vec![
        Emit::new(&DESCRIPTOR, "add", "create_sql")
            .filter(format!("{} AND {persists}", status_in("s", &[Status::ToAdd])))
            .render(rt),
        Emit::new(&DESCRIPTOR, "alter", "alter_sql")
            .filter(format!("{altered} AND {alter_flags}"))
            .render(rt),
        Emit::new(&DESCRIPTOR, "relax", "relax_sql")
            .filter(relax)
            .render(rt),
        Emit::new(&DESCRIPTOR, "rebuild", "drop_sql")
            .then("create_sql")
            .filter(format!(
                "{} AND {} AND {persists}",
                status_in("s", &[Status::ToAlter]),
                d.is_set("s.rebuild")
            ))
            .render(rt),
        Emit::new(&DESCRIPTOR, "drop", "drop_sql")
            .filter(format!("{} AND {persists}", status_in("s", &[Status::ToDrop])))
            .order("s.sort_order DESC, s.display_name")
            .render(rt),
        Emit::new(&DESCRIPTOR, "change identity of", "identity_sql")
            .filter(format!("{altered} AND {}", d.is_set("s.d_is_identity")))
            .render(rt),
        unsupported_identity(rt, &altered),
    ]
}

fn unsupported_identity(rt: &Runtime, altered: &str) -> String {
    let d = rt.dialect();
    let select = RowSelect::from(format!("{} s", DESCRIPTOR.stage(d)))
        .column(RowVar::Name, "s.display_name")
        .filter(format!(
            "{altered} AND {} AND s.identity_sql IS NULL",
            d.is_set("s.d_is_identity")
        ))
        .order("s.display_name");
    let message = d.concat(&[
        RowVar::Name.expr(d),
        d.string(": identity cannot be changed in place, column left as is"),
    ]);
    rt.for_each(&select, vec![rt.record("unsupported", &message)])
}

/// Apply NOT NULL to added columns and to columns whose nullability or
/// (on engines where ALTER COLUMN restates nullability) type changed.
pub fn tighten(rt: &Runtime) -> String {
    let d = rt.dialect();
    let mut changed = d.is_set("s.d_nullable");
    if d.alter_resets_nullability {
        if let Some(alter) = DESCRIPTOR.any_flag(d, "s", OnDiff::Alter) {
            changed = format!("({changed} OR {alter})");
        }
    }
    Emit::new(&DESCRIPTOR, "tighten", "tighten_sql")
        .check("precheck_sql")
        .filter(format!(
            "({} OR ({} AND {} AND {changed})) AND {}",
            status_in("s", &[Status::ToAdd]),
            status_in("s", &[Status::ToAlter]),
            d.is_clear("s.rebuild"),
            table_persists(d, "s")
        ))
        .render(rt)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use realign_model::{DefaultSpec, Engine, MetadataModel, QualifiedName};

    use super::*;
    use crate::dialect::Dialect;
    use crate::options::ScriptOptions;

    fn model() -> MetadataModel {
        MetadataModel::new(Engine::Mssql).with_table(
            TableEntity::new(QualifiedName::new("dbo", "customers"))
                .with_column(ColumnSpec::new("id", "int").identity(1, 1).not_null())
                .with_column(ColumnSpec::new("Email", "NVARCHAR").with_length(200).not_null())
                .with_column(ColumnSpec::new("status", "tinyint").not_null())
                .with_column(ColumnSpec::new("label", "nvarchar").computed("[Email] + N'!'"))
                .with_default(DefaultSpec::new("status", "((0))")),
        )
    }

    #[test]
    fn test_row_values_follow_descriptor() {
        let model = model();
        let options = ScriptOptions::new(Dialect::MSSQL).precheck_constraints(true);
        let ctx = GenContext::new(&model, &options).unwrap();
        let rows = rows(&ctx);
        assert_eq!(rows.len(), 4);

        let email = &rows[1];
        assert_eq!(email.fields.len(), DESCRIPTOR.fields.len());
        assert_eq!(email.fields[0], Cell::text("nvarchar"));
        assert_eq!(email.fields[1], Cell::Int(Some(200)));
        assert_eq!(email.fields[5], Cell::Bool(Some(false)));
        assert!(email.payloads.precheck.is_some());
        assert!(email.payloads.tighten.is_some());

        let status = &rows[2];
        assert!(status.payloads.precheck.is_none(), "defaults backfill NULLs");

        let label = &rows[3];
        assert_eq!(label.fields[0], Cell::Text(None));
        assert_eq!(label.fields[5], Cell::Bool(None));
        assert!(label.payloads.alter.is_none());
        assert_eq!(label.fields[7], Cell::text("[Email] + N'!'"));
    }

    #[test]
    fn test_identity_is_unsupported_on_mssql() {
        let model = model();
        let options = ScriptOptions::new(Dialect::MSSQL);
        let ctx = GenContext::new(&model, &options).unwrap();
        let rows = rows(&ctx);
        assert!(rows[0].payloads.identity.is_none());

        let rt = Runtime::new(Dialect::MSSQL);
        let sql = changes(&rt).join("\n");
        assert!(sql.contains("identity cannot be changed in place"));
    }

    #[test]
    fn test_relax_skips_rows_already_altered_on_mssql() {
        let rt = Runtime::new(Dialect::MSSQL);
        let sql = changes(&rt).join("\n");
        assert!(sql.contains("s.d_nullable = 1 AND s.nullable = 1 AND NOT (s.d_type_name = 1"));
        let rt = Runtime::new(Dialect::POSTGRES);
        let sql = changes(&rt).join("\n");
        assert!(sql.contains("s.d_nullable AND s.nullable) AND s.relax_sql IS NOT NULL"));
    }

    #[test]
    fn test_tighten_runs_prechecks() {
        let rt = Runtime::new(Dialect::POSTGRES);
        let sql = tighten(&rt);
        assert!(sql.contains("s.precheck_sql AS row_check"));
        assert!(sql.contains("EXECUTE r.row_check INTO v_conflict;"));
    }
}
