//! `oc-migrate rollback <NAME>` - roll back one migration.

use oc_migrate::MigrationRunner;

use crate::cli::RollbackArgs;
use crate::commands::Context;
use crate::error::CliResult;
use crate::output::{self, success, warn};

/// Run the rollback command
pub async fn run(context: &Context, args: RollbackArgs) -> CliResult<()> {
    output::header("Rollback");
    context.print_target();

    let connection = context.connect().await?;
    let runner = MigrationRunner::new(&connection, context.source());

    let report = runner.rollback(&args.name).await?;

    if !report.down_executed {
        warn(&format!(
            "Migration '{}' has no down operation, only its ledger entry was removed",
            report.name
        ));
    }
    if !report.ledger_entry_removed {
        output::info(&format!("Migration '{}' was not recorded as applied", report.name));
    }

    success(&format!("Rolled back '{}'", report.name));

    Ok(())
}
