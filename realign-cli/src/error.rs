//! CLI error types and result alias.

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// CLI error types
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// IO error
    #[error("IO error: {0}")]
    #[diagnostic(code(realign::io))]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    #[diagnostic(code(realign::config))]
    Config(String),

    /// Snapshot loading or model error
    #[error("Model error: {0}")]
    #[diagnostic(code(realign::model))]
    Model(#[from] realign_model::ModelError),

    /// Validation error
    #[error("Validation error: {0}")]
    #[diagnostic(code(realign::validation))]
    Validation(String),

    /// Script generation error
    #[error("Generation error: {0}")]
    #[diagnostic(code(realign::generate))]
    Generate(#[from] realign_script::ScriptError),
}

impl From<toml::de::Error> for CliError {
    fn from(err: toml::de::Error) -> Self {
        CliError::Config(format!("Failed to parse TOML: {}", err))
    }
}

impl From<toml::ser::Error> for CliError {
    fn from(err: toml::ser::Error) -> Self {
        CliError::Config(format!("Failed to serialize TOML: {}", err))
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::Config(format!("Failed to serialize JSON: {}", err))
    }
}
