//! # realign
//!
//! Generates idempotent reconciliation scripts that bring a live SQL Server
//! or PostgreSQL database in line with a captured desired-state snapshot.
//!
//! realign provides:
//! - A serializable metadata model with table dependency ranking
//! - Generic per-kind reconciliation of schemas, tables, columns, defaults,
//!   checks, indexes, foreign keys and coded entities
//! - Row-level data reconciliation keyed on primary or unique keys
//! - Dialect adapters for T-SQL and PL/pgSQL
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use realign::prelude::*;
//!
//! let model = load_snapshot("snapshot.json")?;
//! let options = ScriptOptions::for_engine(model.engine).verbose_data(true);
//! let script = generate(&model, &options)?;
//! std::fs::write("reconcile.sql", &script.text)?;
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// Metadata model, loaders and dependency ranking.
pub mod model {
    pub use realign_model::*;
}

/// Script generation.
pub mod script {
    pub use realign_script::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::model::{
        DependencyGraph, Engine, MetadataLoader, MetadataModel, QualifiedName, Scope,
        SnapshotLoader, load_snapshot, read_snapshot,
    };
    pub use crate::script::{Dialect, GeneratedScript, KindSet, ScriptOptions, generate};
}

// Re-export key types at the crate root
pub use model::{MetadataModel, ModelError};
pub use script::{GeneratedScript, ScriptError, ScriptOptions, generate};
