//! Cross-kind links resolved after classification.
//!
//! Member differences mark their index or key for rebuild. Dependents of
//! changed columns are marked blocked so they are dropped before the column
//! changes and re-created after them. Finally, every table with a changed
//! child is marked ToAlter. Order matters: foreign key blocks read the index
//! rebuild and blocked flags.

use super::{
    KindDescriptor, Status, append_note, check, coded, column, default, foreign_key, index,
    status_in, table,
};
use crate::context::GenContext;
use crate::dialect::Dialect;
use crate::kind::EntityKind;

/// Statements applying member, blocked and table links for the included kinds.
pub fn render(ctx: &GenContext<'_>) -> Vec<String> {
    let d = ctx.dialect;
    let mut out = Vec::new();
    let has_columns = ctx.includes(EntityKind::Column);

    if ctx.includes(EntityKind::Index) {
        out.push(members(d, &index::MEMBER_DESCRIPTOR, &index::DESCRIPTOR));
    }
    if ctx.includes(EntityKind::ForeignKey) {
        out.push(members(d, &foreign_key::MEMBER_DESCRIPTOR, &foreign_key::DESCRIPTOR));
    }

    if has_columns && ctx.includes(EntityKind::Index) {
        out.push(block(
            d,
            &index::DESCRIPTOR,
            &format!(
                "EXISTS (SELECT 1 FROM {} m JOIN {} c ON c.schema_name = m.schema_name AND c.table_name = m.table_name AND c.column_name = m.column_name WHERE m.schema_name = s.schema_name AND m.table_name = s.table_name AND m.index_name = s.index_name AND {})",
                index::MEMBER_DESCRIPTOR.stage(d),
                column::DESCRIPTOR.stage(d),
                status_in("c", &[Status::ToAlter])
            ),
            "member column changed",
        ));
    }

    if ctx.includes(EntityKind::ForeignKey) {
        let mut reasons = Vec::new();
        if has_columns {
            let members = foreign_key::MEMBER_DESCRIPTOR.stage(d);
            let columns = column::DESCRIPTOR.stage(d);
            let altered = status_in("c", &[Status::ToAlter]);
            reasons.push(format!(
                "EXISTS (SELECT 1 FROM {members} m JOIN {columns} c ON c.schema_name = m.schema_name AND c.table_name = m.table_name AND c.column_name = m.column_name WHERE m.schema_name = s.schema_name AND m.table_name = s.table_name AND m.fk_name = s.fk_name AND {altered})"
            ));
            reasons.push(format!(
                "EXISTS (SELECT 1 FROM {members} m JOIN {columns} c ON c.schema_name = s.ref_schema AND c.table_name = s.ref_table AND c.column_name = m.referenced_column WHERE m.schema_name = s.schema_name AND m.table_name = s.table_name AND m.fk_name = s.fk_name AND {altered})"
            ));
        }
        if ctx.includes(EntityKind::Index) {
            let indexes = index::DESCRIPTOR.stage(d);
            reasons.push(format!(
                "EXISTS (SELECT 1 FROM {indexes} i WHERE i.schema_name = s.ref_schema AND i.table_name = s.ref_table AND i.index_name = s.ref_index AND ({} OR {} OR {}))",
                status_in("i", &[Status::ToDrop]),
                d.is_set("i.rebuild"),
                d.is_set("i.blocked")
            ));
        }
        if !reasons.is_empty() {
            out.push(block(
                d,
                &foreign_key::DESCRIPTOR,
                &format!("({})", reasons.join("\n   OR ")),
                "referenced or referencing side changed",
            ));
        }
    }

    if has_columns && ctx.includes(EntityKind::Default) {
        out.push(block(
            d,
            &default::DESCRIPTOR,
            &format!(
                "EXISTS (SELECT 1 FROM {} c WHERE {} AND {})",
                column::DESCRIPTOR.stage(d),
                default::DESCRIPTOR.key_match("c", "s"),
                status_in("c", &[Status::ToAlter])
            ),
            "column changed",
        ));
    }

    if has_columns && ctx.includes(EntityKind::Check) {
        out.push(block(
            d,
            &check::DESCRIPTOR,
            &format!(
                "EXISTS (SELECT 1 FROM {} c WHERE c.schema_name = s.schema_name AND c.table_name = s.table_name AND {})",
                column::DESCRIPTOR.stage(d),
                status_in("c", &[Status::ToAlter])
            ),
            "table columns changed",
        ));
    }

    // Views may select any column; dependencies are not tracked.
    if has_columns && ctx.includes(EntityKind::Coded) {
        out.push(block(
            d,
            &coded::DESCRIPTOR,
            &format!(
                "s.object_type = {} AND EXISTS (SELECT 1 FROM {} c WHERE {})",
                d.string("VIEW"),
                column::DESCRIPTOR.stage(d),
                status_in("c", &[Status::ToDrop, Status::ToAlter])
            ),
            "columns changed",
        ));
    }

    for kind in [
        EntityKind::Column,
        EntityKind::Default,
        EntityKind::Check,
        EntityKind::Index,
        EntityKind::ForeignKey,
    ] {
        if ctx.includes(kind) {
            out.push(bubble_to_table(d, super::descriptor(kind)));
        }
    }
    out
}

/// Mark the parent of changed member rows for rebuild.
fn members(d: Dialect, member: &KindDescriptor, parent: &KindDescriptor) -> String {
    let keys = member.parent.map(|p| p.keys).unwrap_or(parent.keys);
    let on = keys
        .iter()
        .map(|k| format!("m.{k} = s.{k}"))
        .collect::<Vec<_>>()
        .join(" AND ");
    d.update_where(
        &parent.stage(d),
        "s",
        &format!(
            "status = {}, rebuild = {}, diff_desc = {}",
            Status::ToAlter.code(),
            d.true_literal,
            append_note(d, &d.string("members changed"))
        ),
        &format!(
            "{} AND EXISTS (SELECT 1 FROM {} m WHERE {on} AND m.status <> {})",
            status_in("s", &[Status::Unchanged, Status::ToAlter]),
            member.stage(d),
            Status::Unchanged.code()
        ),
    )
}

/// Mark unchanged or altered rows blocked when `reason` holds.
fn block(d: Dialect, desc: &KindDescriptor, reason: &str, note: &str) -> String {
    d.update_where(
        &desc.stage(d),
        "s",
        &format!(
            "blocked = {}, diff_desc = {}",
            d.true_literal,
            append_note(d, &d.string(&format!("blocked: {note}")))
        ),
        &format!(
            "{} AND {reason}",
            status_in("s", &[Status::Unchanged, Status::ToAlter])
        ),
    )
}

/// Mark tables with a changed child of `child`'s kind ToAlter.
fn bubble_to_table(d: Dialect, child: &KindDescriptor) -> String {
    d.update_where(
        &table::DESCRIPTOR.stage(d),
        "s",
        &format!(
            "status = {}, diff_desc = {}",
            Status::ToAlter.code(),
            append_note(d, &d.string(&format!("{} changed", child.kind.stage())))
        ),
        &format!(
            "{} AND EXISTS (SELECT 1 FROM {} c WHERE c.schema_name = s.schema_name AND c.table_name = s.table_name AND (c.status <> {} OR {}))",
            status_in("s", &[Status::Unchanged, Status::ToAlter]),
            child.stage(d),
            Status::Unchanged.code(),
            d.is_set("c.blocked")
        ),
    )
}

#[cfg(test)]
mod tests {
    use realign_model::{ColumnSpec, Engine, IndexSpec, MetadataModel, QualifiedName, TableEntity};

    use super::*;
    use crate::kind::KindSet;
    use crate::options::ScriptOptions;

    fn model(engine: Engine) -> MetadataModel {
        MetadataModel::new(engine).with_table(
            TableEntity::new(QualifiedName::new("dbo", "t"))
                .with_column(ColumnSpec::new("id", "int").not_null())
                .with_index(IndexSpec::primary_key("pk_t", &["id"])),
        )
    }

    fn position(statements: &[String], needle: &str) -> usize {
        statements
            .iter()
            .position(|s| s.contains(needle))
            .unwrap_or_else(|| panic!("no statement contains {needle}"))
    }

    #[test]
    fn test_index_blocks_precede_foreign_key_blocks() {
        let model = model(Engine::Mssql);
        let options = ScriptOptions::new(Dialect::MSSQL);
        let ctx = GenContext::new(&model, &options).unwrap();
        let statements = render(&ctx);
        let members = position(&statements, "members changed");
        let index = position(&statements, "blocked: member column changed");
        let fk = position(&statements, "blocked: referenced or referencing side changed");
        let tables = position(&statements, "N'columns changed'");
        assert!(members < index && index < fk && fk < tables);
        assert!(statements[fk].contains("i.index_name = s.ref_index AND (i.status = 2 OR i.rebuild = 1 OR i.blocked = 1)"));
    }

    #[test]
    fn test_foreign_keys_block_only_on_their_own_referenced_index() {
        let model = model(Engine::Postgres);
        let options = ScriptOptions::new(Dialect::POSTGRES);
        let ctx = GenContext::new(&model, &options).unwrap();
        let statements = render(&ctx);
        let fk = position(&statements, "blocked: referenced or referencing side changed");
        let index_reasons: Vec<&str> = statements[fk]
            .split("OR EXISTS")
            .filter(|reason| reason.contains("FROM realign_indexes i"))
            .collect();
        assert_eq!(index_reasons.len(), 1, "{}", statements[fk]);
        assert!(index_reasons[0].contains("i.index_name = s.ref_index"));
        assert!(!statements[fk].contains("i.is_unique"));
    }

    #[test]
    fn test_views_block_on_any_column_change() {
        let model = model(Engine::Postgres);
        let options = ScriptOptions::new(Dialect::POSTGRES);
        let ctx = GenContext::new(&model, &options).unwrap();
        let statements = render(&ctx);
        let view = position(&statements, "s.object_type = 'VIEW'");
        assert!(statements[view].contains("c.status IN (2, 3)"));
        assert!(statements[view].starts_with("UPDATE realign_coded s SET blocked = TRUE"));
    }

    #[test]
    fn test_rules_follow_included_kinds() {
        let model = model(Engine::Mssql);
        let options = ScriptOptions::new(Dialect::MSSQL)
            .with_kinds(KindSet::from_kinds([EntityKind::Index]));
        let ctx = GenContext::new(&model, &options).unwrap();
        let statements = render(&ctx);
        assert_eq!(statements.len(), 2, "{statements:#?}");
        assert!(statements[0].contains("members changed"));
        assert!(statements[1].contains("N'indexes changed'"));
    }
}
