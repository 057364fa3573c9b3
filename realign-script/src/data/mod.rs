//! Row reconciliation.
//!
//! Each table with captured rows gets a scratch table shaped like its
//! selected columns plus a status column. The script classifies staged rows
//! against the live table (SourceOnly, TargetOnly, Different), then deletes
//! child-first, inserts parent-first and updates. Classification and DML go
//! through separately compiled batches: the live table may have gained
//! columns earlier in the same script.

pub mod bulk;

use realign_model::{ColumnSpec, Engine, QualifiedName, TableData, TableEntity};
use tracing::debug;

use crate::context::GenContext;
use crate::dialect::{Compare, Dialect};
use crate::entity::{self, Status};
use crate::error::{ScriptError, ScriptResult};
use crate::kind::EntityKind;
use crate::literal::{TypeClass, audit_literal, classify, sql_literal};
use crate::options::DataSource;
use crate::report::{BulkFile, Diagnostic};
use crate::runtime::{Flag, Runtime};

/// Status column of the data staging tables.
pub const STATUS: &str = "realign_status";

/// Row classification stored in [`STATUS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStatus {
    /// Present on both sides with equal values.
    Equal,
    /// Captured only; inserted.
    SourceOnly,
    /// Live only; deleted.
    TargetOnly,
    /// Present on both sides with different values; updated.
    Different,
}

impl RowStatus {
    /// Stored value.
    pub fn code(self) -> i32 {
        match self {
            Self::Equal => 0,
            Self::SourceOnly => 1,
            Self::TargetOnly => 2,
            Self::Different => 3,
        }
    }
}

/// One table whose rows are reconciled.
#[derive(Debug, Clone)]
pub struct TablePlan<'a> {
    /// The table.
    pub table: &'a TableEntity,
    /// Its captured rows.
    pub data: &'a TableData,
    /// Scripted columns with their position in each row.
    pub columns: Vec<(&'a ColumnSpec, usize)>,
    /// Row key columns.
    pub key: Vec<&'a ColumnSpec>,
    /// Staging table suffix.
    pub stage: String,
}

impl TablePlan<'_> {
    fn name(&self) -> &QualifiedName {
        &self.table.name
    }

    fn is_key(&self, column: &ColumnSpec) -> bool {
        self.key.iter().any(|k| k.name == column.name)
    }

    fn non_key(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.columns
            .iter()
            .map(|(c, _)| *c)
            .filter(|c| !self.is_key(c))
    }

    fn identity(&self) -> Option<&ColumnSpec> {
        self.columns
            .iter()
            .map(|(c, _)| *c)
            .find(|c| c.identity.is_some())
    }

    /// Quoted column list.
    pub fn column_list(&self, d: Dialect) -> String {
        self.columns
            .iter()
            .map(|(c, _)| d.quote(&c.name))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn prefixed(&self, d: Dialect, alias: &str) -> String {
        self.columns
            .iter()
            .map(|(c, _)| format!("{alias}.{}", d.quote(&c.name)))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn key_match(&self, d: Dialect, a: &str, b: &str) -> String {
        self.key
            .iter()
            .map(|k| {
                let k = d.quote(&k.name);
                format!("{a}.{k} = {b}.{k}")
            })
            .collect::<Vec<_>>()
            .join(" AND ")
    }
}

/// Scripted tables with captured rows, parent-first, and the tables skipped.
pub fn plan<'a>(ctx: &GenContext<'a>) -> (Vec<TablePlan<'a>>, Vec<Diagnostic>) {
    let mut plans = Vec::new();
    let mut skipped = Vec::new();
    if !ctx.options.data {
        return (plans, skipped);
    }
    let wanted = &ctx.options.scope.data_tables;
    let selected = |name: &QualifiedName| wanted.is_empty() || wanted.contains(name);

    for data in ctx.model.data.iter().filter(|d| selected(&d.table)) {
        if !ctx.tables.iter().any(|t| t.name == data.table) {
            skipped.push(Diagnostic::warning(
                format!("table data {}", data.table),
                "table is outside the scripted tables, rows not reconciled",
            ));
        }
    }
    for name in wanted {
        if ctx.model.data_for(name).is_none() {
            skipped.push(Diagnostic::warning(
                format!("table data {name}"),
                "no captured rows",
            ));
        }
    }

    for table in ctx.tables.iter().copied() {
        let Some(data) = ctx.model.data_for(&table.name).filter(|d| selected(&d.table)) else {
            continue;
        };
        let columns: Vec<(&ColumnSpec, usize)> = data
            .columns
            .iter()
            .enumerate()
            .filter_map(|(i, name)| table.column(name).map(|c| (c, i)))
            .filter(|(c, _)| c.is_writable())
            .collect();
        let available: Vec<_> = columns.iter().map(|(c, _)| c.name.clone()).collect();
        let Some(index) = table.row_key(&available) else {
            skipped.push(Diagnostic::warning(
                format!("table data {}", table.name),
                "no primary key or NOT NULL unique index among the selected columns, rows not reconciled",
            ));
            continue;
        };
        let key = index
            .key_columns()
            .filter_map(|k| table.column(&k.column))
            .collect();
        plans.push(TablePlan {
            table,
            data,
            columns,
            key,
            stage: format!("data_{}", plans.len() + 1),
        });
    }
    (plans, skipped)
}

/// Everything the data section contributes.
#[derive(Debug, Clone, Default)]
pub struct DataSection {
    /// Statements, in order.
    pub statements: Vec<String>,
    /// CSV files for bulk mode.
    pub bulk_files: Vec<BulkFile>,
    /// Tables skipped at generation time.
    pub diagnostics: Vec<Diagnostic>,
}

/// Render row reconciliation for every planned table.
pub fn render(ctx: &GenContext<'_>, rt: &Runtime) -> ScriptResult<DataSection> {
    let (plans, diagnostics) = plan(ctx);
    let mut section = DataSection {
        diagnostics,
        ..DataSection::default()
    };
    if plans.is_empty() {
        return Ok(section);
    }
    let d = rt.dialect();

    for plan in &plans {
        section.statements.extend(stage(d, plan));
        match &ctx.options.data_source {
            DataSource::Bulk { directory } if bulk::eligible(plan.data) => {
                let path = bulk::file_path(directory, plan);
                section.bulk_files.push(bulk::encode(d, plan, path.clone())?);
                section.statements.push(bulk::load(d, plan, &path));
            }
            _ => section.statements.extend(populate(d, plan, ctx.options.batch_size())?),
        }

        let inner = rt.for_batch();
        let mut body = classify_rows(ctx, plan);
        if ctx.options.verbose_data {
            body.extend(audit(&inner, plan, ctx.options.retain_before_values));
        }
        section.statements.push(rt.if_else(
            &ready(ctx, rt, plan.name()),
            rt.batch(body),
            vec![rt.narrate(
                "data",
                &d.string(&format!(
                    "{}: rows not compared, table missing or structural changes not applied",
                    plan.name()
                )),
            )],
        ));
        section.statements.push(counts(rt, plan));
    }

    for plan in plans.iter().rev() {
        section.statements.extend(guarded_dml(rt, plan, RowStatus::TargetOnly, "delete rows from", delete(d, plan)));
    }
    for plan in &plans {
        section.statements.extend(guarded_dml(rt, plan, RowStatus::SourceOnly, "insert rows into", insert(d, plan)));
    }
    for plan in &plans {
        if let Some(update) = update(d, plan) {
            section.statements.extend(guarded_dml(rt, plan, RowStatus::Different, "update rows of", vec![update]));
        }
    }

    debug!(
        tables = plans.len(),
        bulk_files = section.bulk_files.len(),
        "Rendered data reconciliation"
    );
    Ok(section)
}

/// Re-attach the table and column to a value error.
pub(crate) fn rewrap(err: ScriptError, table: &str, column: &str) -> ScriptError {
    match err {
        ScriptError::UnsupportedValue { message, .. } => {
            ScriptError::unsupported_value(table, column, message)
        }
        other => other,
    }
}

fn stage(d: Dialect, plan: &TablePlan<'_>) -> Vec<String> {
    let ddl = d.ddl();
    let mut columns: Vec<String> = plan
        .columns
        .iter()
        .map(|(c, _)| {
            let collation = match (&c.collation, d.engine) {
                (Some(collation), Engine::Mssql) => format!(" COLLATE {collation}"),
                (Some(collation), Engine::Postgres) => format!(" COLLATE {}", d.quote(collation)),
                (None, _) if classify(d.engine, &c.type_name) == TypeClass::Text => {
                    d.text_collation.to_string()
                }
                (None, _) => String::new(),
            };
            format!("{} {}{collation} NULL", d.quote(&c.name), ddl.type_sql(c))
        })
        .collect();
    columns.push(format!("{STATUS} {} NOT NULL DEFAULT 0", d.int_type));
    vec![d.drop_temp(&plan.stage), d.create_temp(&plan.stage, &columns)]
}

fn populate(d: Dialect, plan: &TablePlan<'_>, batch: usize) -> ScriptResult<Vec<String>> {
    let table = plan.name().to_string();
    let mut values = Vec::with_capacity(plan.data.rows.len());
    for row in &plan.data.rows {
        let cells = plan
            .columns
            .iter()
            .map(|(c, i)| sql_literal(d, &row[*i]).map_err(|e| rewrap(e, &table, &c.name)))
            .collect::<ScriptResult<Vec<_>>>()?;
        values.push(format!("({})", cells.join(", ")));
    }
    let stage = d.temp(&plan.stage);
    let columns = plan.column_list(d);
    Ok(values
        .chunks(batch.max(1))
        .map(|chunk| format!("INSERT INTO {stage} ({columns})\nVALUES\n    {};", chunk.join(",\n    ")))
        .collect())
}

/// The live table exists and, unless payloads execute, has no pending change.
fn ready(ctx: &GenContext<'_>, rt: &Runtime, table: &QualifiedName) -> String {
    let d = rt.dialect();
    let exists = d.table_exists(table);
    if !ctx.includes(EntityKind::Table) {
        return exists;
    }
    format!(
        "{exists} AND ({} OR NOT EXISTS (SELECT 1 FROM {} x WHERE x.schema_name = {} AND x.table_name = {} AND x.status <> {}))",
        rt.flag_on(Flag::ExecCode),
        entity::table::DESCRIPTOR.stage(d),
        d.string(&table.schema),
        d.string(&table.name),
        Status::Unchanged.code()
    )
}

fn compare(d: Dialect, column: &ColumnSpec) -> Compare {
    match classify(d.engine, &column.type_name) {
        TypeClass::Lob => Compare::NullOnly,
        TypeClass::Text => Compare::Text,
        _ => Compare::Plain,
    }
}

fn classify_rows(ctx: &GenContext<'_>, plan: &TablePlan<'_>) -> Vec<String> {
    let d = ctx.dialect;
    let stage = d.temp(&plan.stage);
    let live = d.qualified(plan.name());
    let on = plan.key_match(d, "s", "t");
    let mut out = vec![d.update_where(
        &stage,
        "s",
        &format!("{STATUS} = {}", RowStatus::SourceOnly.code()),
        &format!("NOT EXISTS (SELECT 1 FROM {live} t WHERE {on})"),
    )];

    let mut target_only = format!("NOT EXISTS (SELECT 1 FROM {stage} s WHERE {on})");
    if ctx.includes(EntityKind::Table) {
        target_only.push_str(&format!(
            "\n  AND NOT EXISTS (SELECT 1 FROM {} x WHERE x.schema_name = {} AND x.table_name = {} AND x.status = {})",
            entity::table::DESCRIPTOR.stage(d),
            d.string(&plan.name().schema),
            d.string(&plan.name().name),
            Status::ToAdd.code()
        ));
    }
    out.push(format!(
        "INSERT INTO {stage} ({}, {STATUS})\nSELECT {}, {}\nFROM {live} t\nWHERE {target_only};",
        plan.column_list(d),
        plan.prefixed(d, "t"),
        RowStatus::TargetOnly.code()
    ));

    let differs: Vec<String> = plan
        .non_key()
        .map(|c| {
            let q = d.quote(&c.name);
            d.distinct(&format!("s.{q}"), &format!("t.{q}"), compare(d, c))
        })
        .collect();
    if !differs.is_empty() {
        out.push(d.update_join(
            &stage,
            "s",
            &format!("{STATUS} = {}", RowStatus::Different.code()),
            &live,
            "t",
            &on,
            &format!(
                "s.{STATUS} = {} AND ({})",
                RowStatus::Equal.code(),
                differs.join("\n   OR ")
            ),
        ));
    }
    out
}

/// `WHERE` clause text of a row, rendered from the staged values.
fn key_clause(d: Dialect, plan: &TablePlan<'_>, alias: &str) -> String {
    let mut parts = Vec::new();
    for (i, k) in plan.key.iter().enumerate() {
        let prefix = if i == 0 { " WHERE " } else { " AND " };
        parts.push(d.string(&format!("{prefix}{} = ", d.quote(&k.name))));
        parts.push(audit_literal(d, &format!("{alias}.{}", d.quote(&k.name)), &k.type_name));
    }
    d.concat(&parts)
}

fn assignments<'c>(
    d: Dialect,
    columns: impl Iterator<Item = &'c ColumnSpec>,
    alias: &str,
    separator: &str,
) -> Vec<String> {
    let mut parts = Vec::new();
    for (i, c) in columns.enumerate() {
        let lead = if i == 0 { "" } else { separator };
        parts.push(d.string(&format!("{lead}{} = ", d.quote(&c.name))));
        parts.push(audit_literal(d, &format!("{alias}.{}", d.quote(&c.name)), &c.type_name));
    }
    parts
}

/// One literal statement per affected row.
fn audit(rt: &Runtime, plan: &TablePlan<'_>, retain_before: bool) -> Vec<String> {
    let d = rt.dialect();
    let table = d.qualified(plan.name());
    let stage = d.temp(&plan.stage);
    let live = d.qualified(plan.name());
    let status = |s: RowStatus| format!("WHERE s.{STATUS} = {}", s.code());
    let mut out = Vec::new();

    let mut values = vec![d.string(&format!("INSERT INTO {table} ({}) VALUES (", plan.column_list(d)))];
    for (i, (c, _)) in plan.columns.iter().enumerate() {
        if i > 0 {
            values.push(d.string(", "));
        }
        values.push(audit_literal(d, &format!("s.{}", d.quote(&c.name)), &c.type_name));
    }
    values.push(d.string(");"));
    out.push(rt.narrate_from(
        "data",
        &d.concat(&values),
        &format!("FROM {stage} s\n{}", status(RowStatus::SourceOnly)),
    ));

    if plan.non_key().next().is_some() {
        let mut update = vec![d.string(&format!("UPDATE {table} SET "))];
        update.extend(assignments(d, plan.non_key(), "s", ", "));
        update.push(key_clause(d, plan, "s"));
        update.push(d.string(";"));
        if retain_before {
            update.push(d.string(" -- before: "));
            update.extend(assignments(d, plan.non_key(), "t", ", "));
        }
        out.push(rt.narrate_from(
            "data",
            &d.concat(&update),
            &format!(
                "FROM {stage} s\nJOIN {live} t ON {}\n{}",
                plan.key_match(d, "s", "t"),
                status(RowStatus::Different)
            ),
        ));
    }

    let mut delete = vec![d.string(&format!("DELETE FROM {table}"))];
    delete.push(key_clause(d, plan, "s"));
    delete.push(d.string(";"));
    if retain_before {
        delete.push(d.string(" -- values: "));
        delete.extend(assignments(d, plan.columns.iter().map(|(c, _)| *c), "s", ", "));
    }
    out.push(rt.narrate_from(
        "data",
        &d.concat(&delete),
        &format!("FROM {stage} s\n{}", status(RowStatus::TargetOnly)),
    ));
    out
}

/// Narrate per-table row counts.
fn counts(rt: &Runtime, plan: &TablePlan<'_>) -> String {
    let d = rt.dialect();
    let count = |s: RowStatus| {
        d.to_text(&d.null_or(
            &format!("SUM(CASE WHEN {STATUS} = {} THEN 1 ELSE 0 END)", s.code()),
            "0",
        ))
    };
    let message = d.concat(&[
        d.string(&format!("{}: ", plan.name())),
        count(RowStatus::SourceOnly),
        d.string(" to insert, "),
        count(RowStatus::Different),
        d.string(" to update, "),
        count(RowStatus::TargetOnly),
        d.string(" to delete"),
    ]);
    rt.narrate_from("summary", &message, &format!("FROM {}", d.temp(&plan.stage)))
}

fn delete(d: Dialect, plan: &TablePlan<'_>) -> Vec<String> {
    vec![d.delete_where(
        &d.qualified(plan.name()),
        "t",
        &format!(
            "EXISTS (SELECT 1 FROM {} s WHERE s.{STATUS} = {} AND {})",
            d.temp(&plan.stage),
            RowStatus::TargetOnly.code(),
            plan.key_match(d, "s", "t")
        ),
    )]
}

fn insert(d: Dialect, plan: &TablePlan<'_>) -> Vec<String> {
    let table = d.qualified(plan.name());
    let select = format!(
        "SELECT {}\nFROM {} s\nWHERE s.{STATUS} = {};",
        plan.prefixed(d, "s"),
        d.temp(&plan.stage),
        RowStatus::SourceOnly.code()
    );
    let columns = plan.column_list(d);
    match (d.engine, plan.identity()) {
        (_, None) => vec![format!("INSERT INTO {table} ({columns})\n{select}")],
        (Engine::Mssql, Some(_)) => vec![
            format!("SET IDENTITY_INSERT {table} ON;"),
            format!("INSERT INTO {table} ({columns})\n{select}"),
            format!("SET IDENTITY_INSERT {table} OFF;"),
        ],
        (Engine::Postgres, Some(identity)) => {
            let column = d.quote(&identity.name);
            vec![
                format!("INSERT INTO {table} ({columns}) OVERRIDING SYSTEM VALUE\n{select}"),
                format!(
                    "PERFORM setval(pg_get_serial_sequence({}, {}), COALESCE(MAX({column}), 1), MAX({column}) IS NOT NULL) FROM {table};",
                    d.string(&table),
                    d.string(&identity.name)
                ),
            ]
        }
    }
}

fn update(d: Dialect, plan: &TablePlan<'_>) -> Option<String> {
    let set: Vec<String> = plan
        .non_key()
        .map(|c| {
            let q = d.quote(&c.name);
            format!("{q} = s.{q}")
        })
        .collect();
    if set.is_empty() {
        return None;
    }
    Some(d.update_join(
        &d.qualified(plan.name()),
        "t",
        &set.join(", "),
        &d.temp(&plan.stage),
        "s",
        &plan.key_match(d, "s", "t"),
        &format!("s.{STATUS} = {}", RowStatus::Different.code()),
    ))
}

/// DML for one table, run only when payloads execute, the table exists and
/// some staged row carries `status`.
fn guarded_dml(
    rt: &Runtime,
    plan: &TablePlan<'_>,
    status: RowStatus,
    verb: &str,
    dml: Vec<String>,
) -> Option<String> {
    let d = rt.dialect();
    let inner = rt.for_batch();
    let mut body = vec![inner.narrate("action", &d.string(&format!("{verb} {}", plan.name())))];
    body.extend(dml);
    rt.if_then(
        &format!(
            "{} AND {} AND EXISTS (SELECT 1 FROM {} s WHERE s.{STATUS} = {})",
            rt.flag_on(Flag::ExecCode),
            d.table_exists(plan.name()),
            d.temp(&plan.stage),
            status.code()
        ),
        rt.batch(body),
    )
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use realign_model::{ForeignKeySpec, IndexSpec, MetadataModel, Scope, Value};

    use super::*;
    use crate::options::ScriptOptions;

    fn model(engine: Engine) -> MetadataModel {
        let schema = match engine {
            Engine::Mssql => "dbo",
            Engine::Postgres => "public",
        };
        let parent = QualifiedName::new(schema, "parent");
        let child = QualifiedName::new(schema, "child");
        MetadataModel::new(engine)
            .with_table(
                TableEntity::new(child.clone())
                    .with_column(ColumnSpec::new("id", "int").not_null())
                    .with_column(ColumnSpec::new("parent_id", "int"))
                    .with_column(ColumnSpec::new("note", "text"))
                    .with_index(IndexSpec::primary_key("pk_child", &["id"]))
                    .with_foreign_key(ForeignKeySpec::new("fk_child_parent", parent.clone(), &[("parent_id", "id")])),
            )
            .with_table(
                TableEntity::new(parent.clone())
                    .with_column(ColumnSpec::new("id", "int").identity(1, 1))
                    .with_column(ColumnSpec::new("name", "varchar").with_length(40))
                    .with_column(ColumnSpec::new("label", "varchar").computed("upper(name)"))
                    .with_index(IndexSpec::primary_key("pk_parent", &["id"])),
            )
            .with_data(
                TableData::new(parent, &["id", "name", "label"])
                    .with_row(vec![Value::Int(1), Value::from("it's"), Value::from("IT'S")]),
            )
            .with_data(
                TableData::new(child, &["id", "parent_id", "note"])
                    .with_row(vec![Value::Int(10), Value::Int(1), Value::Null]),
            )
    }

    #[test]
    fn test_plans_follow_rank_and_skip_computed_columns() {
        let model = model(Engine::Mssql);
        let options = ScriptOptions::new(Dialect::MSSQL);
        let ctx = GenContext::new(&model, &options).unwrap();
        let (plans, skipped) = plan(&ctx);
        assert!(skipped.is_empty());
        let shape: Vec<(String, Vec<&str>)> = plans
            .iter()
            .map(|p| {
                (
                    p.table.name.to_string(),
                    p.columns.iter().map(|(c, _)| c.name.as_str()).collect(),
                )
            })
            .collect();
        assert_eq!(
            shape,
            vec![
                ("dbo.parent".to_string(), vec!["id", "name"]),
                ("dbo.child".to_string(), vec!["id", "parent_id", "note"]),
            ]
        );
    }

    #[test]
    fn test_table_without_key_is_skipped() {
        let name = QualifiedName::new("dbo", "loose");
        let model = MetadataModel::new(Engine::Mssql)
            .with_table(TableEntity::new(name.clone()).with_column(ColumnSpec::new("v", "int")))
            .with_data(TableData::new(name, &["v"]).with_row(vec![Value::Int(1)]));
        let options = ScriptOptions::new(Dialect::MSSQL);
        let ctx = GenContext::new(&model, &options).unwrap();
        let (plans, skipped) = plan(&ctx);
        assert!(plans.is_empty());
        assert_eq!(skipped.len(), 1);
        assert!(skipped[0].message.contains("no primary key"));
    }

    #[test]
    fn test_nullable_unique_key_is_skipped() {
        let name = QualifiedName::new("public", "tags");
        let model = MetadataModel::new(Engine::Postgres)
            .with_table(
                TableEntity::new(name.clone())
                    .with_column(ColumnSpec::new("code", "text"))
                    .with_column(ColumnSpec::new("label", "text"))
                    .with_index(IndexSpec::unique("ux_tags_code", &["code"])),
            )
            .with_data(
                TableData::new(name, &["code", "label"])
                    .with_row(vec![Value::from("a"), Value::from("A")])
                    .with_row(vec![Value::Null, Value::from("none")]),
            );
        let options = ScriptOptions::new(Dialect::POSTGRES);
        let ctx = GenContext::new(&model, &options).unwrap();
        let (plans, skipped) = plan(&ctx);
        assert!(plans.is_empty());
        assert_eq!(skipped[0].entity, "table data public.tags");
        assert!(skipped[0].message.contains("NOT NULL unique index"));
    }

    #[test]
    fn test_data_table_list_restricts_and_reports_missing_rows() {
        let model = model(Engine::Mssql);
        let options = ScriptOptions::new(Dialect::MSSQL).with_scope(
            Scope::all().with_data_tables([
                QualifiedName::new("dbo", "child"),
                QualifiedName::new("dbo", "other"),
            ]),
        );
        let ctx = GenContext::new(&model, &options).unwrap();
        let (plans, skipped) = plan(&ctx);
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].stage, "data_1");
        assert_eq!(skipped[0].entity, "table data dbo.other");
    }

    #[test]
    fn test_deletes_run_child_first_and_inserts_parent_first() {
        let model = model(Engine::Mssql);
        let options = ScriptOptions::new(Dialect::MSSQL);
        let ctx = GenContext::new(&model, &options).unwrap();
        let rt = Runtime::new(Dialect::MSSQL);
        let text = render(&ctx, &rt).unwrap().statements.join("\n");
        let at = |needle: &str| text.find(needle).unwrap_or_else(|| panic!("missing {needle}"));
        assert!(at("delete rows from dbo.child") < at("delete rows from dbo.parent"));
        assert!(at("delete rows from dbo.parent") < at("insert rows into dbo.parent"));
        assert!(at("insert rows into dbo.parent") < at("insert rows into dbo.child"));
        assert!(text.contains("SET IDENTITY_INSERT [dbo].[parent] ON;"));
        assert!(text.contains("VALUES\n    (1, N'it''s')"));
    }

    #[test]
    fn test_row_actions_run_only_for_matching_status() {
        let model = model(Engine::Postgres);
        let options = ScriptOptions::new(Dialect::POSTGRES);
        let ctx = GenContext::new(&model, &options).unwrap();
        let rt = Runtime::new(Dialect::POSTGRES);
        let text = render(&ctx, &rt).unwrap().statements.join("\n");
        for (verb, status) in [
            ("delete rows from", RowStatus::TargetOnly),
            ("insert rows into", RowStatus::SourceOnly),
            ("update rows of", RowStatus::Different),
        ] {
            let action = text
                .find(&format!("'{verb} public.parent'"))
                .unwrap_or_else(|| panic!("missing {verb}"));
            let guard = &text[..action];
            let guard = &guard[guard.rfind(&rt.flag_on(Flag::ExecCode)).unwrap()..];
            assert!(
                guard.contains(&format!("s.{STATUS} = {}", status.code())),
                "{verb} is not guarded on its status: {guard}"
            );
        }
    }

    #[test]
    fn test_lob_columns_compare_null_only() {
        let model = model(Engine::Mssql);
        let options = ScriptOptions::new(Dialect::MSSQL);
        let ctx = GenContext::new(&model, &options).unwrap();
        let (plans, _) = plan(&ctx);
        let statements = classify_rows(&ctx, &plans[1]);
        let different = statements.last().unwrap();
        assert!(different.contains(
            "((s.[note] IS NULL AND t.[note] IS NOT NULL) OR (s.[note] IS NOT NULL AND t.[note] IS NULL))"
        ));
        assert!(different.contains("(s.[parent_id] <> t.[parent_id] OR"));
    }

    #[test]
    fn test_postgres_identity_insert_resyncs_sequence() {
        let model = model(Engine::Postgres);
        let options = ScriptOptions::new(Dialect::POSTGRES);
        let ctx = GenContext::new(&model, &options).unwrap();
        let (plans, _) = plan(&ctx);
        let statements = insert(Dialect::POSTGRES, &plans[0]);
        assert!(statements[0].contains("OVERRIDING SYSTEM VALUE"));
        assert_eq!(
            statements[1],
            "PERFORM setval(pg_get_serial_sequence('\"public\".\"parent\"', 'id'), COALESCE(MAX(\"id\"), 1), MAX(\"id\") IS NOT NULL) FROM \"public\".\"parent\";"
        );
    }

    #[test]
    fn test_verbose_audit_retains_live_values() {
        let model = model(Engine::Postgres);
        let options = ScriptOptions::new(Dialect::POSTGRES)
            .verbose_data(true)
            .retain_before_values(true);
        let ctx = GenContext::new(&model, &options).unwrap();
        let (plans, _) = plan(&ctx);
        let rt = Runtime::new(Dialect::POSTGRES);
        let statements = audit(&rt, &plans[0], true);
        assert_eq!(statements.len(), 3);
        assert!(statements[1].contains("' -- before: ' || '\"name\" = ' || quote_nullable(t.\"name\")"));
        assert!(statements[2].contains("'DELETE FROM \"public\".\"parent\"' || ' WHERE \"id\" = ' || quote_nullable(s.\"id\")"));
    }

    #[test]
    fn test_skipped_tables_are_narrated() {
        let model = model(Engine::Postgres);
        let options = ScriptOptions::new(Dialect::POSTGRES);
        let ctx = GenContext::new(&model, &options).unwrap();
        let rt = Runtime::new(Dialect::POSTGRES);
        let text = render(&ctx, &rt).unwrap().statements.join("\n");
        assert!(text.contains("IF to_regclass('\"public\".\"parent\"') IS NOT NULL AND (v_execcode OR NOT EXISTS"));
        assert!(text.contains("public.parent: rows not compared"));
    }
}
