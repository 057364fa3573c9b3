//! Snapshot files.
//!
//! A snapshot is a serialized [`MetadataModel`]. The format follows the file
//! extension: `.json` or `.toml`.

use std::path::Path;

use tracing::debug;

use crate::error::{ModelError, ModelResult};
use crate::model::MetadataModel;

/// Supported snapshot encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    /// JSON.
    Json,
    /// TOML.
    Toml,
}

impl SnapshotFormat {
    /// Pick the format from a path's extension.
    pub fn from_path(path: &Path) -> ModelResult<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(Self::Json),
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Ok(Self::Toml),
            _ => Err(ModelError::UnsupportedFormat {
                path: path.display().to_string(),
            }),
        }
    }
}

/// Parse snapshot text.
pub fn parse_snapshot(text: &str, format: SnapshotFormat, origin: &str) -> ModelResult<MetadataModel> {
    match format {
        SnapshotFormat::Json => serde_json::from_str(text).map_err(|source| ModelError::JsonError {
            path: origin.to_string(),
            source,
        }),
        SnapshotFormat::Toml => toml::from_str(text).map_err(|source| ModelError::TomlError {
            path: origin.to_string(),
            source,
        }),
    }
}

/// Render a model as snapshot text.
pub fn render_snapshot(
    model: &MetadataModel,
    format: SnapshotFormat,
    origin: &str,
) -> ModelResult<String> {
    match format {
        SnapshotFormat::Json => {
            serde_json::to_string_pretty(model).map_err(|source| ModelError::JsonError {
                path: origin.to_string(),
                source,
            })
        }
        SnapshotFormat::Toml => {
            toml::to_string_pretty(model).map_err(|source| ModelError::TomlWriteError {
                path: origin.to_string(),
                source,
            })
        }
    }
}

/// Read a snapshot file.
pub fn load_snapshot(path: impl AsRef<Path>) -> ModelResult<MetadataModel> {
    let path = path.as_ref();
    let format = SnapshotFormat::from_path(path)?;
    let text = std::fs::read_to_string(path)
        .map_err(|e| ModelError::io(path.display().to_string(), e))?;
    let model = parse_snapshot(&text, format, &path.display().to_string())?;
    debug!(
        path = %path.display(),
        tables = model.tables.len(),
        coded = model.coded.len(),
        "Loaded snapshot"
    );
    Ok(model)
}

/// Read a snapshot file without blocking the runtime.
pub async fn read_snapshot(path: impl AsRef<Path>) -> ModelResult<MetadataModel> {
    let path = path.as_ref();
    let format = SnapshotFormat::from_path(path)?;
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ModelError::io(path.display().to_string(), e))?;
    parse_snapshot(&text, format, &path.display().to_string())
}

/// Write a snapshot file.
pub fn save_snapshot(model: &MetadataModel, path: impl AsRef<Path>) -> ModelResult<()> {
    let path = path.as_ref();
    let format = SnapshotFormat::from_path(path)?;
    let text = render_snapshot(model, format, &path.display().to_string())?;
    std::fs::write(path, text).map_err(|e| ModelError::io(path.display().to_string(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ColumnSpec, Engine, IndexSpec, QualifiedName, TableEntity};

    fn sample() -> MetadataModel {
        MetadataModel::new(Engine::Postgres).with_table(
            TableEntity::new(QualifiedName::new("public", "users"))
                .with_column(ColumnSpec::new("id", "int4").not_null())
                .with_column(ColumnSpec::new("email", "varchar").with_length(255))
                .with_index(IndexSpec::primary_key("users_pkey", &["id"])),
        )
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            SnapshotFormat::from_path(Path::new("db.JSON")).unwrap(),
            SnapshotFormat::Json
        );
        assert!(SnapshotFormat::from_path(Path::new("db.yaml")).is_err());
    }

    #[test]
    fn test_save_and_load_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        save_snapshot(&sample(), &path).unwrap();
        let loaded = load_snapshot(&path).unwrap();
        assert_eq!(loaded, sample());
    }

    #[test]
    fn test_parse_minimal_toml() {
        let text = r#"
            engine = "mssql"

            [[tables]]
            name = { schema = "dbo", name = "t" }

            [[tables.columns]]
            name = "id"
            type_name = "int"
            nullable = false
        "#;
        let model = parse_snapshot(text, SnapshotFormat::Toml, "inline").unwrap();
        let table = model.table(&QualifiedName::new("dbo", "t")).unwrap();
        assert!(!table.columns[0].nullable);
        assert_eq!(model.engine, Engine::Mssql);
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = load_snapshot("/nonexistent/realign.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/realign.json"));
    }
}
