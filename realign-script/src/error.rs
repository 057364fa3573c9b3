//! Error types for script generation.

// These warnings are false positives - the fields are used by derive macros
#![allow(unused_assignments)]

use miette::Diagnostic;
use realign_model::{Engine, ModelError};
use thiserror::Error;

/// Result type alias for generation operations.
pub type ScriptResult<T> = Result<T, ScriptError>;

/// Errors that abort script generation.
///
/// Problems with individual entities never end up here: they become
/// [`crate::report::Diagnostic`]s and the entity is skipped.
#[derive(Debug, Error, Diagnostic)]
pub enum ScriptError {
    /// The model failed validation or could not be loaded.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Model(#[from] ModelError),

    /// The model was captured from a different engine than the target.
    #[error("model was captured from {model} but the script targets {target}")]
    #[diagnostic(
        code(realign::script::engine_mismatch),
        help("cross-engine reconciliation is not supported")
    )]
    EngineMismatch { model: Engine, target: Engine },

    /// Invalid generation options.
    #[error("invalid options: {0}")]
    #[diagnostic(code(realign::script::invalid_options))]
    InvalidOptions(String),

    /// A value cannot be written as a literal for the target engine.
    #[error("cannot script value of `{table}.{column}`: {message}")]
    #[diagnostic(code(realign::script::unsupported_value))]
    UnsupportedValue {
        table: String,
        column: String,
        message: String,
    },

    /// No block delimiter could be found that does not occur in the payload.
    #[error("no free dollar-quote delimiter for the script body")]
    #[diagnostic(code(realign::script::delimiter_collision))]
    DelimiterCollision,

    /// Writing a bulk data file failed.
    #[error("failed to write bulk data file {path}")]
    #[diagnostic(code(realign::script::io_error))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// CSV encoding of a bulk data file failed.
    #[error("failed to encode bulk data file {path}")]
    #[diagnostic(code(realign::script::csv_error))]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
}

impl ScriptError {
    /// Create an invalid options error.
    pub fn invalid_options(msg: impl Into<String>) -> Self {
        Self::InvalidOptions(msg.into())
    }

    /// Create an unsupported value error.
    pub fn unsupported_value(
        table: impl Into<String>,
        column: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::UnsupportedValue {
            table: table.into(),
            column: column.into(),
            message: message.into(),
        }
    }

    /// Check if this error is worth retrying with different options.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::InvalidOptions(_) | Self::Io { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_mismatch_display() {
        let err = ScriptError::EngineMismatch {
            model: Engine::Mssql,
            target: Engine::Postgres,
        };
        assert_eq!(
            err.to_string(),
            "model was captured from mssql but the script targets postgres"
        );
    }

    #[test]
    fn test_model_error_is_transparent() {
        let err: ScriptError = ModelError::unknown("table", "dbo.x").into();
        assert_eq!(err.to_string(), "unknown table `dbo.x`");
        assert!(!err.is_recoverable());
    }
}
