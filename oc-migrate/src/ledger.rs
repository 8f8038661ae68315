//! The applied-migrations ledger.
//!
//! One row per applied migration in `<prefix>migration`:
//!
//! | column           | meaning                         |
//! |------------------|---------------------------------|
//! | `migration_id`   | auto-generated primary key      |
//! | `migration_name` | unique migration name           |
//! | `date_excluded`  | when the migration was applied  |
//!
//! Nothing is cached; every call reads or writes the table directly.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::connection::Connection;
use crate::error::MigrateResult;

/// Unprefixed ledger table name.
pub const LEDGER_TABLE: &str = "migration";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// A ledger row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRecord {
    /// Migration name.
    pub name: String,
    /// When the migration was applied, if the server value could be parsed.
    pub applied_at: Option<NaiveDateTime>,
}

/// Ledger operations bound to a connection.
#[derive(Debug)]
pub struct Ledger<'c> {
    connection: &'c Connection,
}

impl<'c> Ledger<'c> {
    /// Create a ledger handle.
    pub fn new(connection: &'c Connection) -> Self {
        Self { connection }
    }

    /// Prefixed table name, unquoted.
    pub fn table_name(&self) -> String {
        self.connection.table_name(LEDGER_TABLE)
    }

    /// Create the ledger table if it does not exist.
    pub async fn ensure_table(&self) -> MigrateResult<()> {
        let ddl = self.connection.dialect().ledger_ddl(&self.table_name());
        debug!(table = %self.table_name(), "Ensuring migration ledger");
        self.connection.execute(&ddl).await?;
        Ok(())
    }

    /// Applied migration names, in insertion order.
    pub async fn applied_names(&self) -> MigrateResult<Vec<String>> {
        let dialect = self.connection.dialect();
        let sql = format!(
            "SELECT {} FROM {} ORDER BY {}",
            dialect.quote_identifier("migration_name"),
            self.quoted_table(),
            dialect.quote_identifier("migration_id"),
        );

        let rows = self.connection.query_text(&sql).await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| row.into_iter().next().flatten())
            .collect())
    }

    /// Applied migrations with their timestamps, in insertion order.
    pub async fn records(&self) -> MigrateResult<Vec<MigrationRecord>> {
        let dialect = self.connection.dialect();
        let sql = format!(
            "SELECT {}, {} FROM {} ORDER BY {}",
            dialect.quote_identifier("migration_name"),
            dialect.timestamp_as_text(&dialect.quote_identifier("date_excluded")),
            self.quoted_table(),
            dialect.quote_identifier("migration_id"),
        );

        let rows = self.connection.query_text(&sql).await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let mut columns = row.into_iter();
                let name = columns.next().flatten()?;
                let applied_at = columns.next().flatten().and_then(|t| parse_timestamp(&t));
                Some(MigrationRecord { name, applied_at })
            })
            .collect())
    }

    /// Record a migration as applied now.
    pub async fn record(&self, name: &str) -> MigrateResult<()> {
        let dialect = self.connection.dialect();
        let sql = format!(
            "INSERT INTO {} ({}, {}) VALUES ({}, NOW())",
            self.quoted_table(),
            dialect.quote_identifier("migration_name"),
            dialect.quote_identifier("date_excluded"),
            dialect.placeholder(1),
        );
        self.connection.execute_with(&sql, &[name]).await?;
        Ok(())
    }

    /// Delete the row for `name`, returning the number of rows removed.
    ///
    /// Removing a name that is not present is not an error.
    pub async fn remove(&self, name: &str) -> MigrateResult<u64> {
        let dialect = self.connection.dialect();
        let sql = format!(
            "DELETE FROM {} WHERE {} = {}",
            self.quoted_table(),
            dialect.quote_identifier("migration_name"),
            dialect.placeholder(1),
        );
        self.connection.execute_with(&sql, &[name]).await
    }

    fn quoted_table(&self) -> String {
        self.connection
            .dialect()
            .quote_identifier(&self.table_name())
    }
}

fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), TIMESTAMP_FORMAT).ok()
}
