//! `realign order` command - List entities in dependency order.

use smol_str::SmolStr;

use realign_model::{ListingFilter, MetadataLoader, SnapshotLoader};

use crate::cli::OrderArgs;
use crate::error::CliResult;
use crate::output;

/// Run the order command
pub async fn run(args: OrderArgs) -> CliResult<()> {
    let loader = SnapshotLoader::new(&args.snapshot);
    let filter = ListingFilter {
        schemas: args.schemas.iter().map(SmolStr::from).collect(),
        tables_only: args.tables_only,
    };
    let listing = loader.load_entity_list(&filter).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    output::header("Dependency Order");

    if listing.is_empty() {
        output::warn("No entities found.");
        return Ok(());
    }

    for entry in &listing {
        output::ranked(
            entry.sort_order,
            &format!("{}.{} ({})", entry.schema, entry.name, entry.kind.label()),
        );
    }

    output::newline();
    output::kv("Entities", &listing.len().to_string());

    Ok(())
}
