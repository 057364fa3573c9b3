//! `realign validate` command - Check a snapshot for structural problems.

use realign_model::{Severity, read_snapshot, validate};

use crate::cli::ValidateArgs;
use crate::error::{CliError, CliResult};
use crate::output::{self, success, warn};

/// Run the validate command
pub async fn run(args: ValidateArgs) -> CliResult<()> {
    output::header("Validate Snapshot");
    output::kv("Snapshot", &args.snapshot.display().to_string());
    output::newline();

    output::step(1, 2, "Reading snapshot...");
    let model = read_snapshot(&args.snapshot).await?;

    output::step(2, 2, "Running validation checks...");
    let issues = validate(&model);
    output::newline();

    let errors: Vec<_> = issues.iter().filter(|i| i.severity == Severity::Error).collect();
    let warnings: Vec<_> = issues.iter().filter(|i| i.severity == Severity::Warning).collect();

    if errors.is_empty() {
        if warnings.is_empty() {
            success("Snapshot is valid!");
        } else {
            success("Snapshot is valid with warnings:");
            output::newline();
            for issue in &warnings {
                warn(&issue.to_string());
            }
        }
    } else {
        output::error("Snapshot validation failed!");
        output::newline();
        output::section("Errors");
        for issue in &errors {
            output::list_item(&issue.to_string());
        }
        if !warnings.is_empty() {
            output::newline();
            output::section("Warnings");
            for issue in &warnings {
                warn(&issue.to_string());
            }
        }
        return Err(CliError::Validation(format!(
            "Found {} validation errors",
            errors.len()
        )));
    }

    output::newline();
    output::section("Snapshot Summary");
    output::kv("Engine", &model.engine.to_string());
    output::kv("Schemas", &model.schemas.len().to_string());
    output::kv("Tables", &model.tables.len().to_string());
    output::kv("Coded entities", &model.coded.len().to_string());
    output::kv("Data tables", &model.data.len().to_string());

    Ok(())
}
