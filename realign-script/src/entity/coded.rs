//! Views, functions, procedures and triggers.
//!
//! Definitions compare as text and are never altered in place: a changed
//! entity is dropped before the structural changes and created again after
//! them, in model order.

use realign_model::{CodedEntity, CodedKind, Engine};

use super::{
    Emit, Field, FieldType, KindDescriptor, OnDiff, Payloads, Removal, StagedRow, adding, dropping,
    toggle_changed,
};
use crate::context::GenContext;
use crate::kind::EntityKind;
use crate::runtime::Runtime;

/// Coded entities are keyed by name and signature.
pub const DESCRIPTOR: KindDescriptor = KindDescriptor {
    kind: EntityKind::Coded,
    keys: &["schema_name", "object_name", "signature"],
    display: &["schema_name", "object_name"],
    fields: &[
        Field::new("object_type", FieldType::Text, OnDiff::Rebuild),
        Field::new("definition", FieldType::LongText, OnDiff::Rebuild),
        Field::new("is_disabled", FieldType::Bool, OnDiff::Toggle),
    ],
    extras: &[],
    parent: None,
    removal: Removal::ManagedSchemas,
    emits_ddl: true,
};

/// Signature as the live catalog reports it.
fn signature(engine: Engine, entity: &CodedEntity) -> String {
    match (engine, entity.kind, &entity.table) {
        (Engine::Mssql, _, _) => String::new(),
        (Engine::Postgres, CodedKind::Trigger, Some(table)) if entity.signature.is_empty() => {
            table.name.to_string()
        }
        _ => entity.signature.clone(),
    }
}

/// Scripted coded entities, in model order.
pub fn rows(ctx: &GenContext<'_>) -> Vec<StagedRow> {
    let ddl = ctx.dialect.ddl();
    ctx.coded
        .iter()
        .enumerate()
        .map(|(position, entity)| {
            let signature = signature(ctx.dialect.engine, entity);
            StagedRow::new(
                [
                    entity.name.schema.as_str(),
                    entity.name.name.as_str(),
                    signature.as_str(),
                ],
                entity.display_name(),
            )
            .field(Some(entity.kind.code().to_string()))
            .field(Some(entity.definition.clone()))
            .field(entity.is_disabled)
            .sort_order(position as i64 + 1)
            .payloads(Payloads {
                create: Some(ddl.create_coded(entity)),
                toggle: ddl.toggle_trigger(entity),
                ..Payloads::default()
            })
        })
        .collect()
}

/// Drop removed, changed and blocked entities, latest first.
pub fn pre_drop(rt: &Runtime) -> String {
    Emit::new(&DESCRIPTOR, "drop", "drop_sql")
        .filter(dropping(rt.dialect()))
        .order("s.sort_order DESC, s.display_name")
        .render(rt)
}

/// Create new, changed and blocked entities.
pub fn create(rt: &Runtime) -> String {
    Emit::new(&DESCRIPTOR, "create", "create_sql")
        .filter(adding(rt.dialect()))
        .render(rt)
}

/// Enabled-state changes, and disabling of triggers just created.
pub fn toggle(rt: &Runtime) -> Vec<String> {
    let d = rt.dialect();
    vec![
        toggle_changed(rt, &DESCRIPTOR),
        Emit::new(&DESCRIPTOR, "disable", "toggle_sql")
            .filter(format!("{} AND {}", adding(d), d.is_set("s.is_disabled")))
            .render(rt),
    ]
}
