//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use realign_model::Engine;

/// realign - generate idempotent reconciliation scripts
#[derive(Parser, Debug)]
#[command(name = "realign")]
#[command(version)]
#[command(about = "Generate idempotent reconciliation scripts for SQL Server and PostgreSQL", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a default realign.toml
    Init(InitArgs),

    /// Generate a reconciliation script from a snapshot
    Generate(GenerateArgs),

    /// List entities in dependency order
    Order(OrderArgs),

    /// Check a snapshot for structural problems
    Validate(ValidateArgs),

    /// Display version information
    Version,
}

// =============================================================================
// Init Command
// =============================================================================

/// Arguments for the `init` command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Directory to write realign.toml into
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Target dialect
    #[arg(short, long, default_value = "mssql")]
    pub dialect: DialectArg,

    /// Overwrite an existing config without prompting
    #[arg(short, long)]
    pub yes: bool,
}

/// Target dialects
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DialectArg {
    #[default]
    Mssql,
    Postgres,
}

impl DialectArg {
    /// Engine for this dialect.
    pub fn engine(self) -> Engine {
        match self {
            Self::Mssql => Engine::Mssql,
            Self::Postgres => Engine::Postgres,
        }
    }
}

// =============================================================================
// Generate Command
// =============================================================================

/// Arguments for the `generate` command
#[derive(Args, Debug, Default)]
pub struct GenerateArgs {
    /// Snapshot file (.json or .toml)
    #[arg(short, long)]
    pub snapshot: PathBuf,

    /// Config file (defaults to ./realign.toml when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Target dialect (defaults to the snapshot's engine)
    #[arg(short, long)]
    pub dialect: Option<DialectArg>,

    /// Write the script here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Entity kinds to reconcile (`all` or a comma list)
    #[arg(short, long)]
    pub kinds: Option<String>,

    /// Schemas the script manages
    #[arg(long, value_delimiter = ',')]
    pub schemas: Vec<String>,

    /// Tables the script manages (schema.name)
    #[arg(long, value_delimiter = ',')]
    pub tables: Vec<String>,

    /// Tables whose rows are reconciled (schema.name)
    #[arg(long, value_delimiter = ',')]
    pub data_tables: Vec<String>,

    /// Skip data reconciliation
    #[arg(long)]
    pub no_data: bool,

    /// Record one literal statement per changed row
    #[arg(long)]
    pub verbose_data: bool,

    /// Include live values in recorded updates and deletes
    #[arg(long, requires = "verbose_data")]
    pub retain_before: bool,

    /// Count violating rows before adding constraints
    #[arg(long)]
    pub precheck: bool,

    /// Default the execute flag to off
    #[arg(long)]
    pub no_exec: bool,

    /// Default the record-executed-text flag to on
    #[arg(long)]
    pub print_exec: bool,

    /// Rows per VALUES list
    #[arg(long)]
    pub rows_per_insert: Option<usize>,

    /// Load rows from CSV files the server reads from this directory
    #[arg(long)]
    pub bulk_dir: Option<PathBuf>,
}

// =============================================================================
// Order Command
// =============================================================================

/// Arguments for the `order` command
#[derive(Args, Debug)]
pub struct OrderArgs {
    /// Snapshot file (.json or .toml)
    #[arg(short, long)]
    pub snapshot: PathBuf,

    /// Only these schemas
    #[arg(long, value_delimiter = ',')]
    pub schemas: Vec<String>,

    /// Leave coded entities out
    #[arg(long)]
    pub tables_only: bool,

    /// Print the listing as JSON
    #[arg(long)]
    pub json: bool,
}

// =============================================================================
// Validate Command
// =============================================================================

/// Arguments for the `validate` command
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Snapshot file (.json or .toml)
    #[arg(short, long)]
    pub snapshot: PathBuf,
}
