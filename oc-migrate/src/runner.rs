//! The migration runner.

use std::collections::HashSet;
use std::time::Instant;

use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

use crate::connection::Connection;
use crate::error::MigrateResult;
use crate::ledger::{Ledger, MigrationRecord};
use crate::schema::Schema;
use crate::source::MigrationSource;

/// Result of [`MigrationRunner::migrate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrateReport {
    /// Migrations applied by this run, in order.
    pub applied: Vec<String>,
    /// Discovered migrations that were already in the ledger.
    pub skipped: Vec<String>,
    /// Total duration in milliseconds.
    pub duration_ms: i64,
}

impl MigrateReport {
    /// Check if anything was applied.
    pub fn has_changes(&self) -> bool {
        !self.applied.is_empty()
    }

    /// Get a summary of the result.
    pub fn summary(&self) -> String {
        if self.applied.is_empty() {
            return "No migrations applied".to_string();
        }

        let mut parts = vec![format!("{} applied", self.applied.len())];
        if !self.skipped.is_empty() {
            parts.push(format!("{} already applied", self.skipped.len()));
        }
        format!("{} in {}ms", parts.join(", "), self.duration_ms)
    }
}

/// Result of [`MigrationRunner::rollback`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackReport {
    /// The rolled back migration.
    pub name: String,
    /// Whether a down operation ran.
    pub down_executed: bool,
    /// Whether a ledger row was deleted.
    pub ledger_entry_removed: bool,
}

/// State of one discovered migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationState {
    /// Recorded in the ledger.
    Applied {
        /// When it was applied, if known.
        applied_at: Option<NaiveDateTime>,
    },
    /// Not recorded.
    Pending,
}

/// A discovered migration and its state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    /// Migration name.
    pub name: String,
    /// Applied or pending.
    pub state: MigrationState,
}

impl StatusEntry {
    /// Check if the migration is applied.
    pub fn is_applied(&self) -> bool {
        matches!(self.state, MigrationState::Applied { .. })
    }
}

/// Result of [`MigrationRunner::status`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationStatus {
    /// Every discovered migration, sorted.
    pub entries: Vec<StatusEntry>,
    /// Ledger rows whose migration is no longer discovered.
    pub orphaned: Vec<MigrationRecord>,
}

impl MigrationStatus {
    /// Number of applied migrations among the discovered ones.
    pub fn applied_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_applied()).count()
    }

    /// Names of pending migrations, in order.
    pub fn pending(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| !e.is_applied())
            .map(|e| e.name.as_str())
            .collect()
    }
}

/// Applies and rolls back migrations from a source against a connection.
///
/// Every command creates the ledger table if needed and reads it fresh.
pub struct MigrationRunner<'c, S: MigrationSource> {
    connection: &'c Connection,
    source: S,
}

impl<'c, S: MigrationSource> MigrationRunner<'c, S> {
    /// Create a runner.
    pub fn new(connection: &'c Connection, source: S) -> Self {
        Self { connection, source }
    }

    /// The migration source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Apply every pending migration in name order.
    ///
    /// Stops at the first failure. Migrations applied before it stay
    /// recorded; the failing one and those after it stay pending.
    pub async fn migrate(&self) -> MigrateResult<MigrateReport> {
        let start = Instant::now();
        let mut report = MigrateReport::default();

        let ledger = self.ledger();
        ledger.ensure_table().await?;

        let applied: HashSet<String> = ledger.applied_names().await?.into_iter().collect();
        let schema = Schema::new(self.connection);

        for name in self.source.discover().await? {
            if applied.contains(&name) {
                debug!(migration = %name, "Already applied");
                report.skipped.push(name);
                continue;
            }

            let unit = self.source.load(&name).await?;
            let migration_start = Instant::now();
            unit.migration.up(&schema, self.connection).await?;
            ledger.record(&unit.name).await?;

            info!(
                migration = %unit.name,
                duration_ms = migration_start.elapsed().as_millis() as u64,
                "Migration applied"
            );
            report.applied.push(unit.name);
        }

        report.duration_ms = start.elapsed().as_millis() as i64;
        Ok(report)
    }

    /// Roll back one migration by name.
    ///
    /// Runs `down` when the migration has one, then deletes its ledger row
    /// whether or not `down` existed. The migration does not have to be
    /// applied.
    pub async fn rollback(&self, name: &str) -> MigrateResult<RollbackReport> {
        let ledger = self.ledger();
        ledger.ensure_table().await?;

        let unit = self.source.load(name).await?;

        let down_executed = if unit.migration.has_down() {
            let schema = Schema::new(self.connection);
            unit.migration.down(&schema, self.connection).await?;
            true
        } else {
            warn!(migration = %unit.name, "Migration has no down operation, removing ledger entry only");
            false
        };

        let removed = ledger.remove(&unit.name).await?;
        info!(migration = %unit.name, down_executed, "Migration rolled back");

        Ok(RollbackReport {
            name: unit.name,
            down_executed,
            ledger_entry_removed: removed > 0,
        })
    }

    /// Discovered migrations with their ledger state.
    pub async fn status(&self) -> MigrateResult<MigrationStatus> {
        let ledger = self.ledger();
        ledger.ensure_table().await?;

        let records = ledger.records().await?;
        let discovered = self.source.discover().await?;

        let entries = discovered
            .iter()
            .map(|name| {
                let state = match records.iter().find(|r| &r.name == name) {
                    Some(record) => MigrationState::Applied {
                        applied_at: record.applied_at,
                    },
                    None => MigrationState::Pending,
                };
                StatusEntry {
                    name: name.clone(),
                    state,
                }
            })
            .collect();

        let known: HashSet<&str> = discovered.iter().map(String::as_str).collect();
        let orphaned = records
            .into_iter()
            .filter(|r| !known.contains(r.name.as_str()))
            .collect();

        Ok(MigrationStatus { entries, orphaned })
    }

    /// Applied migration names, in ledger order.
    pub async fn applied(&self) -> MigrateResult<Vec<String>> {
        let ledger = self.ledger();
        ledger.ensure_table().await?;
        ledger.applied_names().await
    }

    /// Every migration name the source offers, sorted.
    pub async fn discover(&self) -> MigrateResult<Vec<String>> {
        self.source.discover().await
    }

    fn ledger(&self) -> Ledger<'c> {
        Ledger::new(self.connection)
    }
}
