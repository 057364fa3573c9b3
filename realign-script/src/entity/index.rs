//! Indexes, primary keys and unique constraints, with their member columns.
//!
//! Member rows carry no DDL. A difference in them bubbles up to the index,
//! which is then rebuilt as a whole.

use realign_model::Engine;

use super::{
    Cell, Emit, Field, FieldType, KindDescriptor, OnDiff, Parent, Payloads, Removal, StagedRow, Status,
    adding, dropping, status_in, table_persists, table_status,
};
use crate::context::GenContext;
use crate::ddl::unique_precheck;
use crate::kind::EntityKind;
use crate::runtime::Runtime;

/// Indexes are keyed by name within their table.
pub const DESCRIPTOR: KindDescriptor = KindDescriptor {
    kind: EntityKind::Index,
    keys: &["schema_name", "table_name", "index_name"],
    display: &["schema_name", "table_name", "index_name"],
    fields: &[
        Field::new("is_unique", FieldType::Bool, OnDiff::Rebuild),
        Field::new("is_primary_key", FieldType::Bool, OnDiff::Rebuild),
        Field::new("is_unique_constraint", FieldType::Bool, OnDiff::Rebuild),
        Field::new("is_clustered", FieldType::Bool, OnDiff::Rebuild).optional(),
        Field::new("filter_definition", FieldType::LongText, OnDiff::Rebuild),
    ],
    extras: &[],
    parent: None,
    removal: Removal::ManagedTables,
    emits_ddl: true,
};

/// Member columns, keys and included ones alike.
pub const MEMBER_DESCRIPTOR: KindDescriptor = KindDescriptor {
    kind: EntityKind::IndexColumn,
    keys: &["schema_name", "table_name", "index_name", "column_name"],
    display: &["schema_name", "table_name", "index_name", "column_name"],
    fields: &[
        Field::new("key_ordinal", FieldType::Int, OnDiff::Rebuild),
        Field::new("is_descending", FieldType::Bool, OnDiff::Rebuild),
        Field::new("is_included", FieldType::Bool, OnDiff::Rebuild),
    ],
    extras: &[],
    parent: Some(Parent {
        kind: EntityKind::Index,
        keys: &["schema_name", "table_name", "index_name"],
    }),
    removal: Removal::ManagedTables,
    emits_ddl: false,
};

/// Indexes of the scripted tables; primary keys sort first.
pub fn rows(ctx: &GenContext<'_>) -> Vec<StagedRow> {
    let d = ctx.dialect;
    let ddl = d.ddl();
    ctx.tables
        .iter()
        .flat_map(|t| t.indexes.iter().map(move |i| (t, i)))
        .map(|(t, index)| {
            // PostgreSQL has no persistent clustering; the flag is not managed there.
            let clustered = match d.engine {
                Engine::Mssql => Some(index.is_clustered),
                Engine::Postgres => None,
            };
            let precheck = (ctx.options.precheck_constraints && index.is_unique)
                .then(|| unique_precheck(d, &t.name, index));
            StagedRow::new(
                [t.name.schema.as_str(), t.name.name.as_str(), index.name.as_str()],
                format!("{}.{}", t.name, index.name),
            )
            .field(index.is_unique)
            .field(index.is_primary_key)
            .field(index.is_unique_constraint)
            .field(Cell::Bool(clustered))
            .field(index.filter.clone())
            .sort_order(if index.is_primary_key { 0 } else { 1 })
            .payloads(Payloads {
                create: Some(ddl.create_index(&t.name, index)),
                precheck,
                ..Payloads::default()
            })
        })
        .collect()
}

/// One row per index member; included columns have key ordinal 0.
pub fn member_rows(ctx: &GenContext<'_>) -> Vec<StagedRow> {
    let mut rows = Vec::new();
    for table in &ctx.tables {
        for index in &table.indexes {
            for member in &index.columns {
                let ordinal = if member.included { 0 } else { member.key_ordinal };
                rows.push(
                    StagedRow::new(
                        [
                            table.name.schema.as_str(),
                            table.name.name.as_str(),
                            index.name.as_str(),
                            member.column.as_str(),
                        ],
                        format!("{}.{}.{}", table.name, index.name, member.column),
                    )
                    .field(i64::from(ordinal))
                    .field(member.descending)
                    .field(member.included),
                );
            }
        }
    }
    rows
}

/// Secondary indexes of tables created by this run.
pub fn on_new_tables(rt: &Runtime) -> String {
    let d = rt.dialect();
    Emit::new(&DESCRIPTOR, "create", "create_sql")
        .filter(format!(
            "{} AND {} AND {}",
            status_in("s", &[Status::ToAdd]),
            d.is_clear("s.is_primary_key"),
            table_status(d, "s", &[Status::ToAdd])
        ))
        .render(rt)
}

/// Drop removed, rebuilt and blocked indexes, primary keys last.
pub fn pre_drop(rt: &Runtime) -> String {
    let d = rt.dialect();
    Emit::new(&DESCRIPTOR, "drop", "drop_sql")
        .filter(format!("{} AND {}", dropping(d), table_persists(d, "s")))
        .order("s.sort_order DESC, s.display_name")
        .render(rt)
}

/// Create new, rebuilt and blocked indexes, primary keys first.
pub fn post_add(rt: &Runtime) -> String {
    let d = rt.dialect();
    Emit::new(&DESCRIPTOR, "create", "create_sql")
        .check("precheck_sql")
        .filter(format!("{} AND {}", adding(d), table_persists(d, "s")))
        .render(rt)
}
