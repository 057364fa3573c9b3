//! Structural checks on a loaded model.
//!
//! Errors make a model unusable for generation. Warnings describe entities
//! the generator will skip (and narrate) rather than script.

use std::collections::HashSet;
use std::fmt;

use crate::error::{ModelError, ModelResult};
use crate::model::{MetadataModel, TableEntity};

/// How serious an issue is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Entity will be skipped.
    Warning,
    /// Model cannot be scripted.
    Error,
}

/// One finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelIssue {
    /// Severity.
    pub severity: Severity,
    /// Entity kind (`table`, `index`, ...).
    pub kind: &'static str,
    /// Entity display name.
    pub entity: String,
    /// What is wrong.
    pub message: String,
}

impl ModelIssue {
    fn error(kind: &'static str, entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            kind,
            entity: entity.into(),
            message: message.into(),
        }
    }

    fn warning(kind: &'static str, entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            kind,
            entity: entity.into(),
            message: message.into(),
        }
    }

    /// Whether this issue blocks generation.
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for ModelIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} `{}`: {}", self.kind, self.entity, self.message)
    }
}

/// Check a model and return every issue found.
pub fn validate(model: &MetadataModel) -> Vec<ModelIssue> {
    let mut issues = Vec::new();
    for table in model.tables.values() {
        check_table(model, table, &mut issues);
    }
    check_coded(model, &mut issues);
    check_data(model, &mut issues);
    issues
}

/// Check a model, failing on the first error-severity findings.
pub fn validate_strict(model: &MetadataModel) -> ModelResult<Vec<ModelIssue>> {
    let issues = validate(model);
    let errors: Vec<ModelError> = issues
        .iter()
        .filter(|i| i.is_error())
        .map(|i| ModelError::invalid(i.kind, i.entity.clone(), i.message.clone()))
        .collect();
    if errors.is_empty() {
        Ok(issues)
    } else {
        Err(ModelError::ValidationFailed {
            count: errors.len(),
            errors,
        })
    }
}

fn check_table(model: &MetadataModel, table: &TableEntity, issues: &mut Vec<ModelIssue>) {
    let name = table.name.to_string();

    let mut seen = HashSet::new();
    for column in &table.columns {
        if !seen.insert(column.name.as_str()) {
            issues.push(ModelIssue::error(
                "column",
                format!("{name}.{}", column.name),
                "duplicate column",
            ));
        }
    }

    if table.indexes.iter().filter(|i| i.is_primary_key).count() > 1 {
        issues.push(ModelIssue::error("table", &name, "more than one primary key"));
    }

    let mut constraint_names = HashSet::new();
    let names = table
        .indexes
        .iter()
        .map(|i| i.name.as_str())
        .chain(table.foreign_keys.iter().map(|f| f.name.as_str()))
        .chain(table.checks.iter().map(|c| c.name.as_str()));
    for constraint in names {
        if !constraint_names.insert(constraint) {
            issues.push(ModelIssue::error(
                "constraint",
                format!("{name}.{constraint}"),
                "duplicate name",
            ));
        }
    }

    for index in &table.indexes {
        if index.key_columns().next().is_none() {
            issues.push(ModelIssue::error("index", index.name.as_str(), "no key columns"));
        }
        for column in &index.columns {
            if table.column(&column.column).is_none() {
                issues.push(ModelIssue::error(
                    "index",
                    index.name.as_str(),
                    format!("column `{}` not found on {name}", column.column),
                ));
            }
        }
    }

    for fk in &table.foreign_keys {
        if fk.columns.is_empty() {
            issues.push(ModelIssue::error("foreign key", fk.name.as_str(), "no columns"));
        }
        for pair in &fk.columns {
            if table.column(&pair.column).is_none() {
                issues.push(ModelIssue::warning(
                    "foreign key",
                    fk.name.as_str(),
                    format!("column `{}` not found on {name}", pair.column),
                ));
            }
        }
        match model.table(&fk.referenced) {
            None => issues.push(ModelIssue::warning(
                "foreign key",
                fk.name.as_str(),
                format!("referenced table {} is not in the model", fk.referenced),
            )),
            Some(parent) => {
                for pair in &fk.columns {
                    if parent.column(&pair.referenced_column).is_none() {
                        issues.push(ModelIssue::warning(
                            "foreign key",
                            fk.name.as_str(),
                            format!(
                                "referenced column `{}` not found on {}",
                                pair.referenced_column, fk.referenced
                            ),
                        ));
                    }
                }
            }
        }
    }

    for default in &table.defaults {
        if table.column(&default.column).is_none() {
            issues.push(ModelIssue::warning(
                "default",
                format!("{name}.{}", default.column),
                "column not found",
            ));
        }
    }
}

fn check_coded(model: &MetadataModel, issues: &mut Vec<ModelIssue>) {
    let mut seen = HashSet::new();
    for entity in &model.coded {
        if !seen.insert((&entity.name, entity.signature.as_str())) {
            issues.push(ModelIssue::error(
                entity.kind.label(),
                entity.display_name(),
                "duplicate definition",
            ));
        }
        if entity.definition.trim().is_empty() {
            issues.push(ModelIssue::error(
                entity.kind.label(),
                entity.display_name(),
                "empty definition",
            ));
        }
        if entity.kind == crate::model::CodedKind::Trigger && entity.table.is_none() {
            issues.push(ModelIssue::warning(
                "trigger",
                entity.display_name(),
                "owning table unknown",
            ));
        }
    }
}

fn check_data(model: &MetadataModel, issues: &mut Vec<ModelIssue>) {
    for data in &model.data {
        let name = data.table.to_string();
        let Some(table) = model.table(&data.table) else {
            issues.push(ModelIssue::warning("table data", &name, "table is not in the model"));
            continue;
        };
        for column in &data.columns {
            if table.column(column).is_none() {
                issues.push(ModelIssue::warning(
                    "table data",
                    &name,
                    format!("column `{column}` not found"),
                ));
            }
        }
        if let Some(row) = data.rows.iter().position(|r| r.len() != data.columns.len()) {
            issues.push(ModelIssue::error(
                "table data",
                &name,
                format!(
                    "row {} has {} values for {} columns",
                    row + 1,
                    data.rows[row].len(),
                    data.columns.len()
                ),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        ColumnSpec, Engine, ForeignKeySpec, IndexSpec, QualifiedName, TableData, Value,
    };

    fn base() -> TableEntity {
        TableEntity::new(QualifiedName::new("dbo", "orders"))
            .with_column(ColumnSpec::new("id", "int").not_null())
            .with_index(IndexSpec::primary_key("pk_orders", &["id"]))
    }

    #[test]
    fn test_clean_model_has_no_issues() {
        let model = MetadataModel::new(Engine::Mssql).with_table(base());
        assert!(validate(&model).is_empty());
    }

    #[test]
    fn test_missing_index_column_is_error() {
        let model = MetadataModel::new(Engine::Mssql)
            .with_table(base().with_index(IndexSpec::new("ix_missing", &["nope"])));
        let issues = validate(&model);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].is_error());
        assert!(validate_strict(&model).is_err());
    }

    #[test]
    fn test_dangling_foreign_key_is_warning() {
        let model = MetadataModel::new(Engine::Mssql).with_table(base().with_foreign_key(
            ForeignKeySpec::new("fk_x", QualifiedName::new("dbo", "customers"), &[("id", "id")]),
        ));
        let issues = validate_strict(&model).unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Warning);
        assert!(issues[0].to_string().contains("dbo.customers"));
    }

    #[test]
    fn test_ragged_rows_are_errors() {
        let model = MetadataModel::new(Engine::Mssql).with_table(base()).with_data(
            TableData::new(QualifiedName::new("dbo", "orders"), &["id"])
                .with_row(vec![Value::Int(1), Value::Int(2)]),
        );
        let issues = validate(&model);
        assert!(issues.iter().any(|i| i.is_error() && i.message.contains("row 1")));
    }
}
