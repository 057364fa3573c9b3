//! Schemas.

use realign_model::SchemaObject;

use super::{Emit, Field, FieldType, KindDescriptor, OnDiff, Payloads, Removal, StagedRow, Status, status_in};
use crate::context::GenContext;
use crate::kind::EntityKind;
use crate::runtime::Runtime;

/// Schemas are keyed by name; only an explicitly desired owner is compared.
pub const DESCRIPTOR: KindDescriptor = KindDescriptor {
    kind: EntityKind::Schema,
    keys: &["schema_name"],
    display: &["schema_name"],
    fields: &[Field::new("owner", FieldType::Text, OnDiff::Alter).optional()],
    extras: &[],
    parent: None,
    removal: Removal::ListedSchemas,
    emits_ddl: true,
};

/// Managed schemas the model mentions.
pub fn rows(ctx: &GenContext<'_>) -> Vec<StagedRow> {
    let ddl = ctx.dialect.ddl();
    let mentioned = ctx.model.schema_names();
    ctx.schemas
        .iter()
        .filter(|name| mentioned.contains(name))
        .map(|name| {
            let schema = ctx
                .model
                .schema(name)
                .cloned()
                .unwrap_or_else(|| SchemaObject::new(name.clone()));
            let owner = schema.owner.as_ref().map(ToString::to_string);
            StagedRow::new([name.as_str()], name.as_str())
                .field(owner.clone())
                .payloads(Payloads {
                    create: Some(ddl.create_schema(&schema)),
                    alter: owner.map(|o| ddl.alter_schema_owner(name, &o)),
                    ..Payloads::default()
                })
        })
        .collect()
}

/// Create missing schemas and hand changed ones to their owner.
pub fn additions(rt: &Runtime) -> Vec<String> {
    let d = rt.dialect();
    vec![
        Emit::new(&DESCRIPTOR, "create", "create_sql")
            .filter(status_in("s", &[Status::ToAdd]))
            .render(rt),
        Emit::new(&DESCRIPTOR, "alter owner of", "alter_sql")
            .filter(format!(
                "{} AND {}",
                status_in("s", &[Status::ToAlter]),
                d.is_set("s.d_owner")
            ))
            .render(rt),
    ]
}

/// Drop live-only schemas.
pub fn drops(rt: &Runtime) -> Vec<String> {
    vec![
        Emit::new(&DESCRIPTOR, "drop", "drop_sql")
            .filter(status_in("s", &[Status::ToDrop]))
            .order("s.display_name")
            .render(rt),
    ]
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use realign_model::{Engine, MetadataModel, QualifiedName, Scope, TableEntity};

    use super::*;
    use crate::dialect::Dialect;
    use crate::entity::Cell;
    use crate::options::ScriptOptions;

    #[test]
    fn test_rows_cover_mentioned_schemas_only() {
        let model = MetadataModel::new(Engine::Mssql)
            .with_schema(SchemaObject::new("sales").with_owner("sales_owner"))
            .with_table(TableEntity::new(QualifiedName::new("sales", "orders")));
        let options = ScriptOptions::new(Dialect::MSSQL)
            .with_scope(Scope::all().with_schemas(["sales", "legacy"]));
        let ctx = GenContext::new(&model, &options).unwrap();
        let rows = rows(&ctx);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].keys, vec!["sales".to_string()]);
        assert_eq!(rows[0].fields, vec![Cell::text("sales_owner")]);
        assert_eq!(
            rows[0].payloads.create.as_deref(),
            Some("CREATE SCHEMA [sales] AUTHORIZATION [sales_owner];")
        );
    }

    #[test]
    fn test_owner_change_is_flag_driven() {
        let rt = Runtime::new(Dialect::POSTGRES);
        let sql = additions(&rt).join("\n");
        assert!(sql.contains("(s.status = 3 AND s.d_owner) AND s.alter_sql IS NOT NULL"));
    }
}
