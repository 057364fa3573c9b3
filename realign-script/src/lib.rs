//! # realign-script
//!
//! Reconciliation script generation for SQL Server and PostgreSQL.
//!
//! Given a desired-state [`MetadataModel`], this crate emits one script that,
//! run against any database of the same engine, brings it to that state:
//! - Structural entities (schemas, tables, columns, defaults, checks,
//!   indexes, foreign keys, coded entities) are staged, compared with the
//!   live catalog and created, altered or dropped
//! - Captured table rows are inserted, updated or deleted
//! - Every change is narrated, and the script only executes payloads when
//!   its `execCode` flag is on
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌────────────────┐     ┌──────────────────┐
//! │ MetadataModel│────▶│ GenContext     │────▶│ Entity reconciler│──┐
//! └──────────────┘     │ (scope, ranks) │     └──────────────────┘  │
//!                      └────────────────┘     ┌──────────────────┐  │
//!                              │              │ Data reconciler  │──┤
//!                              └─────────────▶└──────────────────┘  │
//!                                                                   ▼
//!                                                          ┌──────────────────┐
//!                                                          │ Script assembler │
//!                                                          └──────────────────┘
//! ```
//!
//! Nothing here connects to a database: all comparison happens when the
//! script runs, against staging tables it creates itself. Running it twice
//! is a no-op the second time.
//!
//! ## Example
//!
//! ```rust,ignore
//! use realign_model::load_snapshot;
//! use realign_script::{Dialect, ScriptOptions, generate};
//!
//! let model = load_snapshot("snapshot.json")?;
//! let options = ScriptOptions::new(Dialect::MSSQL).verbose_data(true);
//! let script = generate(&model, &options)?;
//! std::fs::write("reconcile.sql", &script.text)?;
//! script.write_bulk_files()?;
//! ```

pub mod assembler;
pub mod catalog;
pub mod context;
pub mod data;
pub mod ddl;
pub mod dialect;
pub mod entity;
pub mod error;
pub mod kind;
pub mod literal;
pub mod options;
pub mod phases;
pub mod report;
pub mod runtime;

use realign_model::MetadataModel;
use tracing::debug;

// Re-exports
pub use context::{GenContext, ResolvedFk};
pub use dialect::{Compare, Dialect};
pub use entity::{KindDescriptor, Status};
pub use error::{ScriptError, ScriptResult};
pub use kind::{EntityKind, KindSet};
pub use options::{DEFAULT_ROWS_PER_INSERT, DataSource, ScriptOptions};
pub use realign_model::{DependencyGraph, Ordering};
pub use report::{BulkFile, Diagnostic, GeneratedScript, Section, SectionReport};
pub use runtime::{Flag, FlagDefaults};

/// Generate the reconciliation script for a model.
pub fn generate(model: &MetadataModel, options: &ScriptOptions) -> ScriptResult<GeneratedScript> {
    let ctx = GenContext::new(model, options)?;
    debug!(
        engine = %options.dialect.engine,
        kinds = options.kinds.iter().count(),
        data = options.data,
        "Generating script"
    );
    assembler::assemble(&ctx)
}
