//! realign - reconciliation script generator.

use clap::Parser;

use realign_cli::cli::{Cli, Command};
use realign_cli::commands;
use realign_cli::error::CliResult;
use realign_cli::{logging, output};

#[tokio::main]
async fn main() {
    logging::init();

    if let Err(e) = run().await {
        output::newline();
        output::error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run() -> CliResult<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Init(args) => commands::init::run(args).await,
        Command::Generate(args) => commands::generate::run(args).await,
        Command::Order(args) => commands::order::run(args).await,
        Command::Validate(args) => commands::validate::run(args).await,
        Command::Version => commands::version::run().await,
    }
}
