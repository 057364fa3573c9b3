//! # realign-model
//!
//! Desired-state metadata for the realign script generator.
//!
//! This crate provides:
//! - The [`MetadataModel`] snapshot and its entity types
//! - The table [`DependencyGraph`] and its level ranking
//! - Loader interfaces, with a snapshot-file implementation
//! - Structural validation of loaded models
//!
//! ## Example
//!
//! ```rust,ignore
//! use realign_model::{DependencyGraph, load_snapshot};
//!
//! let model = load_snapshot("snapshot.json")?;
//! let tables: Vec<_> = model.tables.keys().cloned().collect();
//! let order = DependencyGraph::from_model(&model, &tables).topological_order();
//! for (table, rank) in order.ranked() {
//!     println!("{rank:>3}  {table}");
//! }
//! ```

pub mod error;
pub mod graph;
pub mod listing;
pub mod loader;
pub mod model;
pub mod scope;
pub mod snapshot;
pub mod validate;

pub use error::{ModelError, ModelResult};
pub use graph::{DependencyEdge, DependencyGraph, Ordering};
pub use listing::{EntityListing, ListedKind, ListingFilter, entity_list};
pub use loader::{MetadataLoader, SnapshotLoader, best_effort};
pub use model::*;
pub use scope::Scope;
pub use snapshot::{SnapshotFormat, load_snapshot, read_snapshot, save_snapshot};
pub use validate::{ModelIssue, Severity, validate, validate_strict};
