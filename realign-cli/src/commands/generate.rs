//! `realign generate` command - Write a reconciliation script.

use tracing::info;

use realign_model::read_snapshot;

use crate::cli::GenerateArgs;
use crate::config::Config;
use crate::error::{CliError, CliResult};
use crate::output::{self, success, warn};

/// Run the generate command
pub async fn run(args: GenerateArgs) -> CliResult<()> {
    let config = Config::discover(args.config.as_deref())?;
    let model = read_snapshot(&args.snapshot).await?;

    let engine = match args.dialect {
        Some(dialect) => dialect.engine(),
        None => config.engine()?.unwrap_or(model.engine),
    };
    if engine != model.engine {
        return Err(CliError::Config(format!(
            "snapshot was captured from {} but the target dialect is {}",
            model.engine, engine
        )));
    }

    let options = config.to_options(engine, &args)?;
    let script = realign_script::generate(&model, &options)?;
    info!(
        checksum = %script.checksum,
        statements = script.statement_count(),
        "Generated script"
    );

    let destination = args.output.clone().or_else(|| config.output.path.clone());
    let Some(path) = destination else {
        // Script goes to stdout; keep it free of progress output.
        print!("{}", script.text);
        script.write_bulk_files()?;
        return Ok(());
    };

    output::header("Generate Script");
    output::kv("Snapshot", &args.snapshot.display().to_string());
    output::kv("Dialect", &engine.to_string());
    output::newline();

    output::step(1, 2, "Writing script...");
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    tokio::fs::write(&path, &script.text).await?;

    output::step(2, 2, "Writing bulk files...");
    script.write_bulk_files()?;
    output::newline();

    output::section("Sections");
    for report in &script.sections {
        output::kv(report.section.name(), &report.statements.to_string());
    }

    if !script.diagnostics.is_empty() {
        output::newline();
        output::section("Skipped");
        for diagnostic in &script.diagnostics {
            warn(&diagnostic.to_string());
        }
    }

    output::newline();
    for file in &script.bulk_files {
        output::list_item(&format!("{} ({} rows)", file.path.display(), file.rows));
    }
    output::kv("Checksum", &format!("sha256:{}", script.checksum));
    success(&format!("Wrote {}", path.display()));

    Ok(())
}
