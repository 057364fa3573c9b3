//! `realign version` command - Display version information.

use crate::error::CliResult;
use crate::output::{self, kv};

/// Package version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name
const NAME: &str = env!("CARGO_PKG_NAME");

/// Run the version command
pub async fn run() -> CliResult<()> {
    output::header("realign");

    kv("Version", VERSION);
    kv("Package", NAME);

    #[cfg(debug_assertions)]
    let build_mode = "debug";
    #[cfg(not(debug_assertions))]
    let build_mode = "release";

    kv("Build", build_mode);
    kv("Dialects", "mssql, postgres");

    output::newline();
    output::section("Components");
    kv("realign-model", env!("CARGO_PKG_VERSION"));
    kv("realign-script", env!("CARGO_PKG_VERSION"));

    Ok(())
}
