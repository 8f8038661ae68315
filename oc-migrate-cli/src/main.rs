//! oc-migrate - command-line runner for OpenCart database migrations.

use clap::Parser;

use oc_migrate_cli::cli::{Cli, Command};
use oc_migrate_cli::commands::{self, Context};
use oc_migrate_cli::error::CliResult;
use oc_migrate_cli::{logging, output};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        output::newline();
        output::error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run() -> CliResult<()> {
    let cli = Cli::parse();
    logging::init(cli.global.verbose);

    let context = Context::resolve(&cli.global)?;

    match cli.command {
        Command::Migrate => commands::migrate::run(&context).await,
        Command::Rollback(args) => commands::rollback::run(&context, args).await,
        Command::Status => commands::status::run(&context).await,
    }
}
