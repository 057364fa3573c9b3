//! `realign init` command - Write a default configuration file.

use crate::cli::InitArgs;
use crate::config::{CONFIG_FILE_NAME, Config};
use crate::error::CliResult;
use crate::output::{self, confirm, success};

/// Run the init command
pub async fn run(args: InitArgs) -> CliResult<()> {
    output::header("Initialize realign");

    let dir = args.path.canonicalize().unwrap_or_else(|_| args.path.clone());
    let config_path = dir.join(CONFIG_FILE_NAME);

    if config_path.exists() {
        output::warn(&format!("{} already exists.", CONFIG_FILE_NAME));
        if !args.yes && !confirm("Overwrite it?") {
            return Ok(());
        }
    }

    std::fs::create_dir_all(&dir)?;
    let engine = args.dialect.engine();
    Config::default_for_engine(engine).save(&config_path)?;

    success(&format!("Created {}", config_path.display()));
    output::newline();
    output::section("Next steps");
    output::list_item("Capture a desired-state snapshot (.json or .toml)");
    output::list_item("Run `realign validate --snapshot <file>`");
    output::list_item("Run `realign generate --snapshot <file> --output reconcile.sql`");

    Ok(())
}
