//! The ordered sections between header and footer.
//!
//! Every section only renders statements for included kinds. Sections whose
//! kinds are all excluded come back empty and are left out of the script.

use tracing::debug;

use crate::catalog::live_query;
use crate::context::GenContext;
use crate::data;
use crate::entity::{
    self, check, coded, column, default, foreign_key, index, links, schema, table,
};
use crate::error::ScriptResult;
use crate::kind::EntityKind;
use crate::report::{BulkFile, Diagnostic, Section};
use crate::runtime::Runtime;

/// Statements of one section and the kinds that contributed them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionBody {
    /// Which section.
    pub section: Section,
    /// Staging names of contributing kinds.
    pub kinds: Vec<&'static str>,
    /// Top-level statements.
    pub statements: Vec<String>,
}

impl SectionBody {
    fn new(section: Section) -> Self {
        Self {
            section,
            kinds: Vec::new(),
            statements: Vec::new(),
        }
    }

    fn push(&mut self, kind: EntityKind, statements: impl IntoIterator<Item = String>) {
        if !self.kinds.contains(&kind.stage()) {
            self.kinds.push(kind.stage());
        }
        self.statements.extend(statements);
    }

    /// Whether nothing was rendered.
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

/// Everything rendered between header and footer.
#[derive(Debug, Clone, Default)]
pub struct Rendered {
    /// Non-empty sections in emission order.
    pub sections: Vec<SectionBody>,
    /// CSV files written next to the script in bulk mode.
    pub bulk_files: Vec<BulkFile>,
    /// Findings made while rendering.
    pub diagnostics: Vec<Diagnostic>,
}

/// Render every section for the context.
pub fn render(ctx: &GenContext<'_>, rt: &Runtime) -> ScriptResult<Rendered> {
    let data = data::render(ctx, rt)?;
    let mut data_section = SectionBody::new(Section::Data);
    if !data.statements.is_empty() {
        data_section.kinds.push("data");
        data_section.statements = data.statements;
    }

    let sections: Vec<SectionBody> = [
        staging(ctx, rt),
        schema_additions(ctx, rt),
        table_additions(ctx, rt),
        pre_drop(ctx, rt),
        columns(ctx, rt),
        data_section,
        tighten(ctx, rt),
        constraint_re_add(ctx, rt),
        post_add(ctx, rt),
        coded_entities(ctx, rt),
        enable_disable(ctx, rt),
        drops(ctx, rt),
    ]
    .into_iter()
    .filter(|s| !s.is_empty())
    .collect();

    debug!(
        sections = sections.len(),
        statements = sections.iter().map(|s| s.statements.len()).sum::<usize>(),
        "Rendered sections"
    );
    Ok(Rendered {
        sections,
        bulk_files: data.bulk_files,
        diagnostics: data.diagnostics,
    })
}

/// Stage, load and classify every included kind, resolve links, then
/// narrate per-kind summaries.
pub fn staging(ctx: &GenContext<'_>, rt: &Runtime) -> SectionBody {
    let d = ctx.dialect;
    let batch = ctx.options.batch_size();
    let mut body = SectionBody::new(Section::Staging);
    let kinds: Vec<EntityKind> = ctx.options.kinds.iter().collect();

    for &kind in &kinds {
        let desc = entity::descriptor(kind);
        let rows = entity::rows(ctx, kind);
        let mut statements = entity::stage(d, desc);
        statements.extend(entity::populate(d, desc, &rows, batch));
        statements.push(entity::load_live(d, desc, &live_query(d, kind, &ctx.schemas)));
        statements.extend(entity::classify(
            d,
            desc,
            entity::removal_filter(ctx, desc).as_deref(),
        ));
        debug!(kind = kind.stage(), rows = rows.len(), "Staged kind");
        body.push(kind, statements);
    }

    body.statements.extend(links::render(ctx));

    for &kind in &kinds {
        body.push(kind, entity::summary(rt, entity::descriptor(kind)));
    }
    body
}

fn schema_additions(ctx: &GenContext<'_>, rt: &Runtime) -> SectionBody {
    let mut body = SectionBody::new(Section::SchemaAdditions);
    if ctx.includes(EntityKind::Schema) {
        body.push(EntityKind::Schema, schema::additions(rt));
    }
    body
}

fn table_additions(ctx: &GenContext<'_>, rt: &Runtime) -> SectionBody {
    let mut body = SectionBody::new(Section::TableAdditions);
    if ctx.includes(EntityKind::Table) {
        body.push(EntityKind::Table, [table::additions(rt)]);
    }
    if ctx.includes(EntityKind::Index) {
        body.push(EntityKind::Index, [index::on_new_tables(rt)]);
    }
    body
}

/// Dependents go first: foreign keys before the indexes they reference,
/// views before the columns they select.
fn pre_drop(ctx: &GenContext<'_>, rt: &Runtime) -> SectionBody {
    let mut body = SectionBody::new(Section::PreDrop);
    if ctx.includes(EntityKind::ForeignKey) {
        body.push(EntityKind::ForeignKey, [foreign_key::pre_drop(rt)]);
    }
    if ctx.includes(EntityKind::Coded) {
        body.push(EntityKind::Coded, [coded::pre_drop(rt)]);
    }
    if ctx.includes(EntityKind::Index) {
        body.push(EntityKind::Index, [index::pre_drop(rt)]);
    }
    if ctx.includes(EntityKind::Check) {
        body.push(EntityKind::Check, [check::pre_drop(rt)]);
    }
    if ctx.includes(EntityKind::Default) {
        body.push(EntityKind::Default, [default::pre_drop(rt)]);
    }
    body
}

fn columns(ctx: &GenContext<'_>, rt: &Runtime) -> SectionBody {
    let mut body = SectionBody::new(Section::Columns);
    if ctx.includes(EntityKind::Column) {
        body.push(EntityKind::Column, column::changes(rt));
    }
    body
}

fn tighten(ctx: &GenContext<'_>, rt: &Runtime) -> SectionBody {
    let mut body = SectionBody::new(Section::Tighten);
    if ctx.includes(EntityKind::Column) {
        body.push(EntityKind::Column, [column::tighten(rt)]);
    }
    body
}

fn constraint_re_add(ctx: &GenContext<'_>, rt: &Runtime) -> SectionBody {
    let mut body = SectionBody::new(Section::ConstraintReAdd);
    if ctx.includes(EntityKind::Default) {
        body.push(EntityKind::Default, [default::re_add(rt)]);
    }
    if ctx.includes(EntityKind::Check) {
        body.push(EntityKind::Check, [check::re_add(rt)]);
    }
    body
}

/// Indexes first: foreign keys need their referenced unique index.
fn post_add(ctx: &GenContext<'_>, rt: &Runtime) -> SectionBody {
    let mut body = SectionBody::new(Section::PostAdd);
    if ctx.includes(EntityKind::Index) {
        body.push(EntityKind::Index, [index::post_add(rt)]);
    }
    if ctx.includes(EntityKind::ForeignKey) {
        body.push(EntityKind::ForeignKey, [foreign_key::post_add(rt)]);
    }
    body
}

fn coded_entities(ctx: &GenContext<'_>, rt: &Runtime) -> SectionBody {
    let mut body = SectionBody::new(Section::CodedEntities);
    if ctx.includes(EntityKind::Coded) {
        body.push(EntityKind::Coded, [coded::create(rt)]);
    }
    body
}

fn enable_disable(ctx: &GenContext<'_>, rt: &Runtime) -> SectionBody {
    let mut body = SectionBody::new(Section::EnableDisable);
    if ctx.includes(EntityKind::Check) {
        body.push(EntityKind::Check, [check::toggle(rt)]);
    }
    if ctx.includes(EntityKind::ForeignKey) {
        body.push(EntityKind::ForeignKey, [foreign_key::toggle(rt)]);
    }
    if ctx.includes(EntityKind::Coded) {
        body.push(EntityKind::Coded, coded::toggle(rt));
    }
    body
}

/// Tables before schemas; schemas are only dropped when listed.
fn drops(ctx: &GenContext<'_>, rt: &Runtime) -> SectionBody {
    let mut body = SectionBody::new(Section::Drops);
    if ctx.includes(EntityKind::Table) {
        body.push(EntityKind::Table, [table::drops(rt)]);
    }
    if ctx.includes(EntityKind::Schema) && ctx.drops_schemas() {
        body.push(EntityKind::Schema, schema::drops(rt));
    }
    body
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use realign_model::{ColumnSpec, Engine, IndexSpec, MetadataModel, QualifiedName, TableEntity};

    use super::*;
    use crate::dialect::Dialect;
    use crate::kind::KindSet;
    use crate::options::ScriptOptions;

    fn model() -> MetadataModel {
        MetadataModel::new(Engine::Postgres).with_table(
            TableEntity::new(QualifiedName::new("public", "items"))
                .with_column(ColumnSpec::new("id", "int4").not_null())
                .with_index(IndexSpec::primary_key("items_pkey", &["id"])),
        )
    }

    #[test]
    fn test_sections_follow_emission_order() {
        let model = model();
        let options = ScriptOptions::new(Dialect::POSTGRES);
        let ctx = GenContext::new(&model, &options).unwrap();
        let rendered = render(&ctx, &Runtime::new(Dialect::POSTGRES)).unwrap();
        let sections: Vec<Section> = rendered.sections.iter().map(|s| s.section).collect();
        assert_eq!(
            sections,
            vec![
                Section::Staging,
                Section::SchemaAdditions,
                Section::TableAdditions,
                Section::PreDrop,
                Section::Columns,
                Section::Tighten,
                Section::ConstraintReAdd,
                Section::PostAdd,
                Section::CodedEntities,
                Section::EnableDisable,
                Section::Drops,
            ]
        );
        let drops = rendered.sections.last().unwrap();
        assert_eq!(drops.kinds, vec!["tables"], "schemas are not dropped without a list");
    }

    #[test]
    fn test_excluded_kinds_render_nothing() {
        let model = model();
        let options = ScriptOptions::new(Dialect::POSTGRES)
            .with_kinds(KindSet::from_kinds([EntityKind::Schema]));
        let ctx = GenContext::new(&model, &options).unwrap();
        let rendered = render(&ctx, &Runtime::new(Dialect::POSTGRES)).unwrap();
        let sections: Vec<Section> = rendered.sections.iter().map(|s| s.section).collect();
        assert_eq!(sections, vec![Section::Staging, Section::SchemaAdditions]);
        assert_eq!(rendered.sections[0].kinds, vec!["schemas"]);
    }

    #[test]
    fn test_staging_classifies_before_links_and_summaries() {
        let model = model();
        let options = ScriptOptions::new(Dialect::POSTGRES);
        let ctx = GenContext::new(&model, &options).unwrap();
        let body = staging(&ctx, &Runtime::new(Dialect::POSTGRES));
        let at = |needle: &str| {
            body.statements
                .iter()
                .position(|s| s.contains(needle))
                .unwrap_or_else(|| panic!("missing {needle}"))
        };
        assert!(at("CREATE TEMP TABLE realign_coded") < at("members changed"));
        assert!(at("members changed") < at("'schemas: '"));
    }
}
