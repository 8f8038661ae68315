//! `oc-migrate status` - show applied and pending migrations.

use oc_migrate::{MigrationRunner, MigrationState};

use crate::commands::Context;
use crate::error::CliResult;
use crate::output::{self, style_dim, style_pending, style_success};

/// Run the status command
pub async fn run(context: &Context) -> CliResult<()> {
    output::header("Migration Status");
    context.print_target();

    let connection = context.connect().await?;
    let runner = MigrationRunner::new(&connection, context.source());

    let status = runner.status().await?;

    if status.entries.is_empty() {
        output::info("No migrations found");
    }

    for entry in &status.entries {
        match &entry.state {
            MigrationState::Applied { applied_at } => {
                let when = applied_at
                    .map(|t| format!(" (applied {})", t))
                    .unwrap_or_default();
                output::list_item(&format!(
                    "{} {}{}",
                    style_success("applied"),
                    entry.name,
                    style_dim(&when)
                ));
            }
            MigrationState::Pending => {
                output::list_item(&format!("{} {}", style_pending("pending"), entry.name));
            }
        }
    }

    if !status.orphaned.is_empty() {
        output::newline();
        output::warn("Applied migrations with no definition file:");
        for record in &status.orphaned {
            output::list_item(&record.name);
        }
    }

    output::newline();
    output::kv("Applied", &status.applied_count().to_string());
    output::kv("Pending", &status.pending().len().to_string());

    Ok(())
}
