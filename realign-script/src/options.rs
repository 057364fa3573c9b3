//! Generation options.

use std::path::PathBuf;

use realign_model::{Engine, Scope};

use crate::dialect::Dialect;
use crate::error::{ScriptError, ScriptResult};
use crate::kind::KindSet;
use crate::runtime::FlagDefaults;

/// Default number of rows per `VALUES` list.
pub const DEFAULT_ROWS_PER_INSERT: usize = 500;

/// How desired rows reach the data staging tables.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DataSource {
    /// Literal `VALUES` lists in the script.
    #[default]
    Inline,
    /// CSV files loaded with `BULK INSERT` / `COPY`.
    Bulk {
        /// Directory the server reads the files from.
        directory: PathBuf,
    },
}

/// Options controlling one generated script.
#[derive(Debug, Clone)]
pub struct ScriptOptions {
    /// Target dialect.
    pub dialect: Dialect,
    /// What the script manages.
    pub scope: Scope,
    /// Entity kinds to reconcile.
    pub kinds: KindSet,
    /// Reconcile captured rows.
    pub data: bool,
    /// Flag values declared in the script header.
    pub flags: FlagDefaults,
    /// Record one literal statement per changed row.
    pub verbose_data: bool,
    /// Append live values to recorded updates and deletes.
    pub retain_before_values: bool,
    /// Count violating rows before adding constraints and skip on conflict.
    pub precheck_constraints: bool,
    /// Rows per `VALUES` list.
    pub rows_per_insert: usize,
    /// Where desired rows come from.
    pub data_source: DataSource,
    /// Extra comment written into the script header.
    pub header_comment: Option<String>,
}

impl ScriptOptions {
    /// Defaults for a dialect.
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            scope: Scope::all(),
            kinds: KindSet::all(),
            data: true,
            flags: FlagDefaults::default(),
            verbose_data: false,
            retain_before_values: false,
            precheck_constraints: false,
            rows_per_insert: DEFAULT_ROWS_PER_INSERT,
            data_source: DataSource::Inline,
            header_comment: None,
        }
    }

    /// Defaults for an engine.
    pub fn for_engine(engine: Engine) -> Self {
        Self::new(Dialect::for_engine(engine))
    }

    /// Set the scope.
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Set the entity kinds.
    pub fn with_kinds(mut self, kinds: KindSet) -> Self {
        self.kinds = kinds.normalized();
        self
    }

    /// Enable or disable data reconciliation.
    pub fn with_data(mut self, data: bool) -> Self {
        self.data = data;
        self
    }

    /// Set the header flag defaults.
    pub fn with_flags(mut self, flags: FlagDefaults) -> Self {
        self.flags = flags;
        self
    }

    /// Record literal per-row statements.
    pub fn verbose_data(mut self, verbose: bool) -> Self {
        self.verbose_data = verbose;
        self
    }

    /// Keep live values in recorded statements.
    pub fn retain_before_values(mut self, retain: bool) -> Self {
        self.retain_before_values = retain;
        self
    }

    /// Precheck constraints before adding them.
    pub fn precheck_constraints(mut self, precheck: bool) -> Self {
        self.precheck_constraints = precheck;
        self
    }

    /// Rows per `VALUES` list.
    pub fn rows_per_insert(mut self, rows: usize) -> Self {
        self.rows_per_insert = rows;
        self
    }

    /// Load rows from CSV files in `directory`.
    pub fn bulk(mut self, directory: impl Into<PathBuf>) -> Self {
        self.data_source = DataSource::Bulk {
            directory: directory.into(),
        };
        self
    }

    /// Set a header comment.
    pub fn header_comment(mut self, comment: impl Into<String>) -> Self {
        self.header_comment = Some(comment.into());
        self
    }

    /// Rows per `VALUES` list after the engine cap.
    pub fn batch_size(&self) -> usize {
        self.rows_per_insert.clamp(1, self.dialect.max_values_rows)
    }

    /// Reject inconsistent settings.
    pub fn validate(&self) -> ScriptResult<()> {
        if self.rows_per_insert == 0 {
            return Err(ScriptError::invalid_options("rows_per_insert must be at least 1"));
        }
        if self.retain_before_values && !self.verbose_data {
            return Err(ScriptError::invalid_options(
                "retain_before_values requires verbose_data",
            ));
        }
        if self.kinds.is_empty() && !self.data {
            return Err(ScriptError::invalid_options("nothing to reconcile"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_size_is_capped_on_mssql() {
        let options = ScriptOptions::new(Dialect::MSSQL).rows_per_insert(5000);
        assert_eq!(options.batch_size(), 1000);
        let options = ScriptOptions::new(Dialect::POSTGRES).rows_per_insert(5000);
        assert_eq!(options.batch_size(), 5000);
    }

    #[test]
    fn test_validate() {
        assert!(ScriptOptions::new(Dialect::MSSQL).validate().is_ok());
        let err = ScriptOptions::new(Dialect::MSSQL)
            .retain_before_values(true)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("verbose_data"));
        assert!(ScriptOptions::new(Dialect::MSSQL).rows_per_insert(0).validate().is_err());
    }
}
