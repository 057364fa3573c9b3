//! What generation derives from a model before rendering anything.

use realign_model::{
    CodedEntity, CodedKind, DependencyGraph, ForeignKeySpec, IndexSpec, MetadataModel, Ordering,
    QualifiedName, TableEntity, validate_strict,
};
use smol_str::SmolStr;
use tracing::{debug, warn};

use crate::dialect::Dialect;
use crate::error::{ScriptError, ScriptResult};
use crate::kind::EntityKind;
use crate::options::ScriptOptions;
use crate::report::Diagnostic;

/// A foreign key whose both ends are scripted.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedFk<'a> {
    /// Referencing table.
    pub table: &'a TableEntity,
    /// The key itself.
    pub fk: &'a ForeignKeySpec,
    /// Referenced table.
    pub parent: &'a TableEntity,
    /// Unique index on the referenced table the key relies on.
    pub ref_index: &'a IndexSpec,
}

/// Resolved inputs of one generation run.
#[derive(Debug)]
pub struct GenContext<'a> {
    /// Desired state.
    pub model: &'a MetadataModel,
    /// Options.
    pub options: &'a ScriptOptions,
    /// Target dialect.
    pub dialect: Dialect,
    /// Managed schema names.
    pub schemas: Vec<SmolStr>,
    /// Scripted tables, parent-first.
    pub tables: Vec<&'a TableEntity>,
    /// Table ranks.
    pub ordering: Ordering,
    /// Scripted foreign keys.
    pub foreign_keys: Vec<ResolvedFk<'a>>,
    /// Scripted coded entities in model order.
    pub coded: Vec<&'a CodedEntity>,
    /// Generation-time findings.
    pub diagnostics: Vec<Diagnostic>,
}

impl<'a> GenContext<'a> {
    /// Validate the model against the options and resolve everything
    /// rendering needs.
    pub fn new(model: &'a MetadataModel, options: &'a ScriptOptions) -> ScriptResult<Self> {
        options.validate()?;
        if model.engine != options.dialect.engine {
            return Err(ScriptError::EngineMismatch {
                model: model.engine,
                target: options.dialect.engine,
            });
        }

        let mut diagnostics: Vec<Diagnostic> = validate_strict(model)?
            .into_iter()
            .map(|issue| Diagnostic {
                severity: issue.severity,
                entity: format!("{} {}", issue.kind, issue.entity),
                message: issue.message,
            })
            .collect();

        let scope = &options.scope;
        let schemas = scope.managed_schemas(model);
        let in_scope: Vec<&TableEntity> = model
            .tables
            .values()
            .filter(|t| scope.includes_table(model, &t.name))
            .collect();

        let mut foreign_keys = Vec::new();
        for table in in_scope.iter().copied() {
            for fk in &table.foreign_keys {
                match resolve_fk(&in_scope, table, fk) {
                    Ok(resolved) => foreign_keys.push(resolved),
                    Err(Some(message)) => diagnostics.push(Diagnostic::warning(
                        format!("foreign key {}.{}", table.name, fk.name),
                        message,
                    )),
                    Err(None) => {}
                }
            }
        }

        let names: Vec<QualifiedName> = in_scope.iter().map(|t| t.name.clone()).collect();
        let ordering = DependencyGraph::build(
            names.iter(),
            foreign_keys.iter().map(|f| (&f.table.name, &f.parent.name)),
        )
        .topological_order();
        if ordering.has_cycle() {
            let members: Vec<String> = ordering.cycle().iter().map(ToString::to_string).collect();
            diagnostics.push(Diagnostic::warning(
                members.join(", "),
                "foreign key cycle, tables created in flat order",
            ));
        }

        let mut tables = in_scope;
        tables.sort_by(|a, b| {
            let rank = |t: &TableEntity| ordering.rank(&t.name).unwrap_or(1);
            rank(a).cmp(&rank(b)).then_with(|| a.name.cmp(&b.name))
        });

        let coded = model
            .coded
            .iter()
            .filter(|c| schemas.contains(&c.name.schema))
            .filter(|c| match (&c.kind, &c.table) {
                (CodedKind::Trigger, Some(table)) => scope.includes_table(model, table),
                (CodedKind::Trigger, None) => false,
                _ => true,
            })
            .collect();

        for diagnostic in &diagnostics {
            warn!(entity = %diagnostic.entity, "{}", diagnostic.message);
        }
        debug!(
            tables = tables.len(),
            foreign_keys = foreign_keys.len(),
            schemas = schemas.len(),
            "Resolved generation context"
        );

        Ok(Self {
            model,
            options,
            dialect: options.dialect,
            schemas,
            tables,
            ordering,
            foreign_keys,
            coded,
            diagnostics,
        })
    }

    /// Whether a kind is reconciled.
    pub fn includes(&self, kind: EntityKind) -> bool {
        self.options.kinds.contains(kind)
    }

    /// Rank of a scripted table.
    pub fn rank(&self, table: &QualifiedName) -> u32 {
        self.ordering.rank(table).unwrap_or(1)
    }

    /// Whether the scope names tables explicitly.
    pub fn has_table_list(&self) -> bool {
        self.options.scope.has_table_list()
    }

    /// Whether live-only schemas may be dropped.
    pub fn drops_schemas(&self) -> bool {
        !self.options.scope.schemas.is_empty()
    }

    /// Scripted foreign keys of one table.
    pub fn foreign_keys_of(&self, table: &QualifiedName) -> impl Iterator<Item = &ResolvedFk<'a>> {
        self.foreign_keys.iter().filter(move |f| &f.table.name == table)
    }
}

/// `Err(None)` when validation already reported the problem.
fn resolve_fk<'a>(
    in_scope: &[&'a TableEntity],
    table: &'a TableEntity,
    fk: &'a ForeignKeySpec,
) -> Result<ResolvedFk<'a>, Option<String>> {
    if fk.columns.iter().any(|c| table.column(&c.column).is_none()) {
        return Err(None);
    }
    let Some(parent) = in_scope.iter().find(|t| t.name == fk.referenced).copied() else {
        return Err(Some(format!(
            "referenced table {} is outside the scripted tables",
            fk.referenced
        )));
    };
    if fk.columns.iter().any(|c| parent.column(&c.referenced_column).is_none()) {
        return Err(None);
    }
    let Some(ref_index) = parent.unique_index_on(&fk.referenced_names()) else {
        return Err(Some(format!(
            "no unique index on the referenced columns of {}",
            fk.referenced
        )));
    };
    Ok(ResolvedFk {
        table,
        fk,
        parent,
        ref_index,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use realign_model::{ColumnSpec, Engine, Scope};

    use super::*;

    fn fk(name: &str, parent: &str) -> ForeignKeySpec {
        ForeignKeySpec::new(name, QualifiedName::new("dbo", parent), &[("parent_id", "id")])
    }

    fn table(name: &str) -> TableEntity {
        TableEntity::new(QualifiedName::new("dbo", name))
            .with_column(ColumnSpec::new("id", "int").not_null())
            .with_column(ColumnSpec::new("parent_id", "int"))
            .with_index(IndexSpec::primary_key(format!("pk_{name}"), &["id"]))
    }

    fn model() -> MetadataModel {
        MetadataModel::new(Engine::Mssql)
            .with_table(table("child").with_foreign_key(fk("fk_child_parent", "parent")))
            .with_table(table("parent"))
    }

    #[test]
    fn test_tables_are_ranked_parent_first() {
        let model = model();
        let options = ScriptOptions::new(Dialect::MSSQL);
        let ctx = GenContext::new(&model, &options).unwrap();
        let names: Vec<String> = ctx.tables.iter().map(|t| t.name.to_string()).collect();
        assert_eq!(names, vec!["dbo.parent", "dbo.child"]);
        assert_eq!(ctx.foreign_keys.len(), 1);
        assert_eq!(ctx.foreign_keys[0].ref_index.name, "pk_parent");
    }

    #[test]
    fn test_engine_mismatch_is_fatal() {
        let model = model();
        let options = ScriptOptions::new(Dialect::POSTGRES);
        assert!(matches!(
            GenContext::new(&model, &options),
            Err(ScriptError::EngineMismatch { .. })
        ));
    }

    #[test]
    fn test_out_of_scope_parent_is_a_diagnostic() {
        let model = model();
        let options = ScriptOptions::new(Dialect::MSSQL)
            .with_scope(Scope::all().with_tables([QualifiedName::new("dbo", "child")]));
        let ctx = GenContext::new(&model, &options).unwrap();
        assert!(ctx.foreign_keys.is_empty());
        assert_eq!(ctx.diagnostics.len(), 1);
        assert!(ctx.diagnostics[0].message.contains("outside the scripted tables"));
    }

    #[test]
    fn test_missing_unique_index_skips_the_key() {
        let parent = TableEntity::new(QualifiedName::new("dbo", "parent"))
            .with_column(ColumnSpec::new("id", "int"));
        let model = MetadataModel::new(Engine::Mssql)
            .with_table(table("child").with_foreign_key(fk("fk_child_parent", "parent")))
            .with_table(parent);
        let options = ScriptOptions::new(Dialect::MSSQL);
        let ctx = GenContext::new(&model, &options).unwrap();
        assert!(ctx.foreign_keys.is_empty());
        assert!(ctx.diagnostics[0].message.contains("no unique index"));
    }
}
