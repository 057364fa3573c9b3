//! Check constraints.

use super::{
    Emit, Field, FieldType, KindDescriptor, OnDiff, Payloads, Removal, StagedRow, adding, dropping,
    table_persists, toggle_changed,
};
use crate::context::GenContext;
use crate::ddl::check_precheck;
use crate::kind::EntityKind;
use crate::runtime::Runtime;

/// Checks are keyed by constraint name within their table.
pub const DESCRIPTOR: KindDescriptor = KindDescriptor {
    kind: EntityKind::Check,
    keys: &["schema_name", "table_name", "check_name"],
    display: &["schema_name", "table_name", "check_name"],
    fields: &[
        Field::new("definition", FieldType::LongText, OnDiff::Rebuild),
        Field::new("is_disabled", FieldType::Bool, OnDiff::Toggle),
    ],
    extras: &[],
    parent: None,
    removal: Removal::ManagedTables,
    emits_ddl: true,
};

/// Checks of the scripted tables.
pub fn rows(ctx: &GenContext<'_>) -> Vec<StagedRow> {
    let d = ctx.dialect;
    let ddl = d.ddl();
    ctx.tables
        .iter()
        .flat_map(|t| t.checks.iter().map(move |c| (t, c)))
        .map(|(t, check)| {
            let precheck = (ctx.options.precheck_constraints && !check.is_disabled)
                .then(|| check_precheck(d, &t.name, check));
            StagedRow::new(
                [t.name.schema.as_str(), t.name.name.as_str(), check.name.as_str()],
                format!("{}.{}", t.name, check.name),
            )
            .field(Some(check.definition.clone()))
            .field(check.is_disabled)
            .payloads(Payloads {
                create: Some(ddl.add_check(&t.name, check)),
                toggle: Some(ddl.toggle_check(&t.name, check)),
                precheck,
                ..Payloads::default()
            })
        })
        .collect()
}

/// Drop removed, changed and blocked checks.
pub fn pre_drop(rt: &Runtime) -> String {
    let d = rt.dialect();
    Emit::new(&DESCRIPTOR, "drop", "drop_sql")
        .filter(format!("{} AND {}", dropping(d), table_persists(d, "s")))
        .render(rt)
}

/// Re-add new, changed and blocked checks once the data is in place.
pub fn re_add(rt: &Runtime) -> String {
    let d = rt.dialect();
    Emit::new(&DESCRIPTOR, "add", "create_sql")
        .check("precheck_sql")
        .filter(format!("{} AND {}", adding(d), table_persists(d, "s")))
        .render(rt)
}

/// Enable or disable checks that otherwise stay.
pub fn toggle(rt: &Runtime) -> String {
    toggle_changed(rt, &DESCRIPTOR)
}

#[cfg(test)]
mod tests {
    use realign_model::{
        CheckConstraintSpec, ColumnSpec, Engine, MetadataModel, QualifiedName, TableEntity,
    };

    use super::*;
    use crate::dialect::Dialect;
    use crate::options::ScriptOptions;

    fn model() -> MetadataModel {
        MetadataModel::new(Engine::Postgres).with_table(
            TableEntity::new(QualifiedName::new("public", "lines"))
                .with_column(ColumnSpec::new("qty", "int4"))
                .with_check(CheckConstraintSpec::new("lines_qty_check", "(qty > 0)"))
                .with_check(CheckConstraintSpec::new("lines_legacy_check", "(qty < 1000)").disabled()),
        )
    }

    #[test]
    fn test_prechecks_only_for_enforced_checks() {
        let model = model();
        let options = ScriptOptions::new(Dialect::POSTGRES).precheck_constraints(true);
        let ctx = GenContext::new(&model, &options).unwrap();
        let rows = rows(&ctx);
        assert!(rows[0].payloads.precheck.as_deref().unwrap().contains("WHERE NOT (qty > 0)"));
        assert!(rows[1].payloads.precheck.is_none());
        assert!(rows[1].payloads.toggle.is_some());
    }

    #[test]
    fn test_toggle_leaves_rebuilt_rows_alone() {
        let rt = Runtime::new(Dialect::MSSQL);
        let sql = toggle(&rt);
        assert!(sql.contains("s.d_is_disabled = 1 AND s.rebuild = 0 AND s.blocked = 0"));
    }
}
