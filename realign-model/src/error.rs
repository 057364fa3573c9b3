//! Error types for metadata loading and validation.

// These warnings are false positives - the fields are used by derive macros
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors that can occur while loading, saving or validating a metadata model.
#[derive(Error, Debug, Diagnostic)]
pub enum ModelError {
    /// Error reading or writing a snapshot file.
    #[error("failed to access snapshot file: {path}")]
    #[diagnostic(code(realign::model::io_error))]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON snapshot could not be parsed or produced.
    #[error("invalid JSON snapshot `{path}`")]
    #[diagnostic(code(realign::model::json_error))]
    JsonError {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// TOML snapshot could not be parsed.
    #[error("invalid TOML snapshot `{path}`")]
    #[diagnostic(code(realign::model::toml_error))]
    TomlError {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    /// TOML snapshot could not be written.
    #[error("failed to serialize TOML snapshot `{path}`")]
    #[diagnostic(code(realign::model::toml_write_error))]
    TomlWriteError {
        path: String,
        #[source]
        source: toml::ser::Error,
    },

    /// The snapshot file extension is not recognised.
    #[error("unsupported snapshot format for `{path}`")]
    #[diagnostic(
        code(realign::model::unsupported_format),
        help("use a `.json` or `.toml` file")
    )]
    UnsupportedFormat { path: String },

    /// A referenced entity does not exist in the model.
    #[error("unknown {kind} `{name}`")]
    #[diagnostic(code(realign::model::unknown_entity))]
    UnknownEntity { kind: String, name: String },

    /// An entity definition is structurally invalid.
    #[error("invalid {kind} `{name}`: {message}")]
    #[diagnostic(code(realign::model::invalid_entity))]
    InvalidEntity {
        kind: String,
        name: String,
        message: String,
    },

    /// A loader failed for reasons outside the model.
    #[error("loader error: {message}")]
    #[diagnostic(code(realign::model::loader_error))]
    LoaderError { message: String },

    /// Validation error with multiple issues.
    #[error("model validation failed with {count} error(s)")]
    #[diagnostic(code(realign::model::validation_failed))]
    ValidationFailed {
        count: usize,
        #[related]
        errors: Vec<ModelError>,
    },
}

impl ModelError {
    /// Create an I/O error carrying the offending path.
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            source,
        }
    }

    /// Create an unknown entity error.
    pub fn unknown(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::UnknownEntity {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Create an invalid entity error.
    pub fn invalid(
        kind: impl Into<String>,
        name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidEntity {
            kind: kind.into(),
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a loader error.
    pub fn loader(message: impl Into<String>) -> Self {
        Self::LoaderError {
            message: message.into(),
        }
    }

    /// Check if this error only affects part of a snapshot.
    ///
    /// Loaders treat recoverable errors as "empty result for this kind".
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::LoaderError { .. } | Self::UnknownEntity { .. })
    }
}
