//! `oc-migrate migrate` - apply pending migrations.

use oc_migrate::MigrationRunner;

use crate::commands::Context;
use crate::error::CliResult;
use crate::output::{self, success};

/// Run the migrate command
pub async fn run(context: &Context) -> CliResult<()> {
    output::header("Migrate");
    context.print_target();

    let connection = context.connect().await?;
    let runner = MigrationRunner::new(&connection, context.source());

    let report = runner.migrate().await?;

    if report.applied.is_empty() {
        output::info("Database is up to date");
    } else {
        output::section("Applied");
        for name in &report.applied {
            output::list_item(&output::style_success(name));
        }
    }

    output::newline();
    success(&report.summary());

    Ok(())
}
