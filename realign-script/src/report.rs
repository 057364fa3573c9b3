//! What generation produced.

use std::fmt;
use std::path::PathBuf;

use realign_model::{QualifiedName, Severity};

use crate::dialect::Dialect;
use crate::error::{ScriptError, ScriptResult};

/// Named, ordered parts of a script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Section {
    /// Flag declarations, results relation and transaction start.
    Header,
    /// Generation-time skips narrated at run time.
    Diagnostics,
    /// Staging and classification of every kind.
    Staging,
    /// New schemas and owner changes.
    SchemaAdditions,
    /// New tables with their inline parts and indexes.
    TableAdditions,
    /// Drops ahead of column changes.
    PreDrop,
    /// Column additions, changes and drops.
    Columns,
    /// Row reconciliation.
    Data,
    /// NOT NULL enforcement after data.
    Tighten,
    /// Defaults and check constraints.
    ConstraintReAdd,
    /// Indexes, then foreign keys.
    PostAdd,
    /// Views, routines and triggers.
    CodedEntities,
    /// Enabled-state changes.
    EnableDisable,
    /// Table and schema drops.
    Drops,
    /// Transaction end and results output.
    Footer,
}

impl Section {
    /// Emission order.
    pub const ALL: [Section; 15] = [
        Self::Header,
        Self::Diagnostics,
        Self::Staging,
        Self::SchemaAdditions,
        Self::TableAdditions,
        Self::PreDrop,
        Self::Columns,
        Self::Data,
        Self::Tighten,
        Self::ConstraintReAdd,
        Self::PostAdd,
        Self::CodedEntities,
        Self::EnableDisable,
        Self::Drops,
        Self::Footer,
    ];

    /// Banner name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::Diagnostics => "diagnostics",
            Self::Staging => "staging",
            Self::SchemaAdditions => "schema additions",
            Self::TableAdditions => "table additions",
            Self::PreDrop => "pre-drop",
            Self::Columns => "columns",
            Self::Data => "data",
            Self::Tighten => "tighten",
            Self::ConstraintReAdd => "constraint re-add",
            Self::PostAdd => "post-add",
            Self::CodedEntities => "coded entities",
            Self::EnableDisable => "enable/disable",
            Self::Drops => "drops",
            Self::Footer => "footer",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One emitted section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionReport {
    /// Which section.
    pub section: Section,
    /// Staging names of the contributing kinds (`data` for rows).
    pub kinds: Vec<&'static str>,
    /// Top-level statements emitted.
    pub statements: usize,
}

/// A generation-time finding about one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Severity.
    pub severity: Severity,
    /// Entity display name.
    pub entity: String,
    /// What happened.
    pub message: String,
}

impl Diagnostic {
    /// A skipped entity.
    pub fn warning(entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            entity: entity.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.entity, self.message)
    }
}

/// A CSV file the script loads in bulk mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkFile {
    /// Table the rows belong to.
    pub table: QualifiedName,
    /// Path the script reads.
    pub path: PathBuf,
    /// Data rows, header excluded.
    pub rows: usize,
    /// File contents.
    pub contents: String,
}

impl BulkFile {
    /// Write the file.
    pub fn write(&self) -> ScriptResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ScriptError::Io {
                path: parent.display().to_string(),
                source,
            })?;
        }
        std::fs::write(&self.path, &self.contents).map_err(|source| ScriptError::Io {
            path: self.path.display().to_string(),
            source,
        })
    }
}

/// A complete reconciliation script.
#[derive(Debug, Clone)]
pub struct GeneratedScript {
    /// Script text.
    pub text: String,
    /// Dialect it targets.
    pub dialect: Dialect,
    /// Emitted sections in order.
    pub sections: Vec<SectionReport>,
    /// Generation-time findings.
    pub diagnostics: Vec<Diagnostic>,
    /// CSV files to place before running the script.
    pub bulk_files: Vec<BulkFile>,
    /// SHA-256 of the script body, hex encoded.
    pub checksum: String,
}

impl GeneratedScript {
    /// Report of one section, when emitted.
    pub fn section(&self, section: Section) -> Option<&SectionReport> {
        self.sections.iter().find(|s| s.section == section)
    }

    /// Total top-level statements.
    pub fn statement_count(&self) -> usize {
        self.sections.iter().map(|s| s.statements).sum()
    }

    /// Write every bulk file.
    pub fn write_bulk_files(&self) -> ScriptResult<()> {
        self.bulk_files.iter().try_for_each(BulkFile::write)
    }
}
