//! CLI configuration handling.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use realign_model::{Engine, QualifiedName, Scope};
use realign_script::{Dialect, FlagDefaults, KindSet, ScriptOptions};

use crate::cli::GenerateArgs;
use crate::error::CliResult;

/// Default config file name
pub const CONFIG_FILE_NAME: &str = "realign.toml";

/// realign configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Target database
    pub target: TargetConfig,

    /// What the script manages
    pub scope: ScopeConfig,

    /// Script behavior
    pub script: ScriptConfig,

    /// Where the script goes
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> CliResult<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load `path`, or `./realign.toml` when it exists, or defaults.
    pub fn discover(path: Option<&Path>) -> CliResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default = Path::new(CONFIG_FILE_NAME);
                if default.exists() {
                    Self::load(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Create a default config for a dialect
    pub fn default_for_engine(engine: Engine) -> Self {
        let mut config = Self::default();
        config.target.dialect = Some(engine.to_string());
        config
    }

    /// Configured engine, if any.
    pub fn engine(&self) -> CliResult<Option<Engine>> {
        Ok(self
            .target
            .dialect
            .as_deref()
            .map(Engine::from_str)
            .transpose()?)
    }

    /// Build generation options; command-line flags win over the file.
    pub fn to_options(&self, engine: Engine, args: &GenerateArgs) -> CliResult<ScriptOptions> {
        let default_schema = engine.default_schema();
        let pick = |cli: &[String], file: &[String]| -> Vec<String> {
            if cli.is_empty() { file.to_vec() } else { cli.to_vec() }
        };
        let names = |list: Vec<String>| -> Vec<QualifiedName> {
            list.iter()
                .map(|t| QualifiedName::parse(t, default_schema))
                .collect()
        };

        let scope = Scope::all()
            .with_schemas(pick(&args.schemas, &self.scope.schemas))
            .with_tables(names(pick(&args.tables, &self.scope.tables)))
            .with_data_tables(names(pick(&args.data_tables, &self.scope.data_tables)));

        let kinds = match args.kinds.as_deref().or(self.script.kinds.as_deref()) {
            Some(text) => KindSet::from_str(text)?,
            None => KindSet::all(),
        };

        let flags = FlagDefaults {
            print: self.script.print,
            print_exec: args.print_exec || self.script.print_exec,
            exec_code: !args.no_exec && self.script.exec_code,
        };

        let verbose_data = args.verbose_data || self.script.verbose_data;
        let mut options = ScriptOptions::new(Dialect::for_engine(engine))
            .with_scope(scope)
            .with_kinds(kinds)
            .with_data(!args.no_data && self.script.data)
            .with_flags(flags)
            .verbose_data(verbose_data)
            .retain_before_values(
                verbose_data && (args.retain_before || self.script.retain_before_values),
            )
            .precheck_constraints(args.precheck || self.script.precheck_constraints)
            .rows_per_insert(args.rows_per_insert.unwrap_or(self.script.rows_per_insert));

        if let Some(dir) = args.bulk_dir.as_ref().or(self.script.bulk_directory.as_ref()) {
            options = options.bulk(dir.clone());
        }
        if let Some(comment) = &self.output.header_comment {
            options = options.header_comment(comment.clone());
        }

        options.validate()?;
        Ok(options)
    }
}

/// Target configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Dialect (`mssql` or `postgres`); defaults to the snapshot's engine
    pub dialect: Option<String>,
}

/// Scope configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeConfig {
    /// Managed schemas; empty means every schema in the snapshot
    pub schemas: Vec<String>,

    /// Managed tables; empty means every table in the managed schemas
    pub tables: Vec<String>,

    /// Tables whose rows are reconciled; empty means every captured table
    pub data_tables: Vec<String>,
}

/// Script configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    /// Entity kinds (`all` or a comma list)
    pub kinds: Option<String>,

    /// Reconcile captured rows
    pub data: bool,

    /// Default of the narration flag
    pub print: bool,

    /// Default of the record-executed-text flag
    pub print_exec: bool,

    /// Default of the execute flag
    pub exec_code: bool,

    /// Record one literal statement per changed row
    pub verbose_data: bool,

    /// Include live values in recorded updates and deletes
    pub retain_before_values: bool,

    /// Count violating rows before adding constraints
    pub precheck_constraints: bool,

    /// Rows per VALUES list
    pub rows_per_insert: usize,

    /// Directory the server reads bulk files from
    pub bulk_directory: Option<PathBuf>,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        let flags = FlagDefaults::default();
        Self {
            kinds: None,
            data: true,
            print: flags.print,
            print_exec: flags.print_exec,
            exec_code: flags.exec_code,
            verbose_data: false,
            retain_before_values: false,
            precheck_constraints: false,
            rows_per_insert: realign_script::DEFAULT_ROWS_PER_INSERT,
            bulk_directory: None,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Script path; stdout when unset
    pub path: Option<PathBuf>,

    /// Comment written into the script header
    pub header_comment: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn args() -> GenerateArgs {
        GenerateArgs {
            snapshot: PathBuf::from("snapshot.json"),
            ..GenerateArgs::default()
        }
    }

    #[test]
    fn test_round_trip_through_toml() {
        let config = Config::default_for_engine(Engine::Postgres);
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
        assert_eq!(parsed.engine().unwrap(), Some(Engine::Postgres));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str("[script]\nverbose_data = true\n").unwrap();
        assert!(config.script.verbose_data);
        assert!(config.script.data);
        assert_eq!(config.script.rows_per_insert, 500);
        assert_eq!(config.engine().unwrap(), None);
    }

    #[test]
    fn test_cli_flags_override_file() {
        let mut config = Config::default();
        config.scope.schemas = vec!["sales".into()];
        config.script.rows_per_insert = 100;

        let mut args = args();
        args.schemas = vec!["hr".into()];
        args.no_exec = true;
        args.tables = vec!["orders".into()];

        let options = config.to_options(Engine::Mssql, &args).unwrap();
        assert_eq!(options.scope.schemas, vec!["hr"]);
        assert_eq!(options.scope.tables, vec![QualifiedName::new("dbo", "orders")]);
        assert_eq!(options.rows_per_insert, 100);
        assert!(!options.flags.exec_code);
        assert!(options.flags.print);
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let mut args = args();
        args.kinds = Some("tables,widgets".into());
        assert!(Config::default().to_options(Engine::Mssql, &args).is_err());
    }
}
