//! The Schema Builder.
//!
//! [`Schema`] compiles table and column operations with a [`DdlGenerator`]
//! and executes the result through a borrowed [`Connection`]. A statement the
//! server rejects comes back as [`MigrationError::Ddl`] carrying the
//! statement text.
//!
//! [`MigrationError::Ddl`]: crate::error::MigrationError::Ddl

use tracing::debug;

use crate::connection::Connection;
use crate::dialect::Dialect;
use crate::error::MigrateResult;
use crate::sql::DdlGenerator;
use crate::table::{FieldDefinition, TableOptions};

/// DDL operations bound to a connection.
pub struct Schema<'c> {
    connection: &'c Connection,
    generator: DdlGenerator,
}

impl<'c> Schema<'c> {
    /// Create a builder for the connection's dialect and prefix.
    pub fn new(connection: &'c Connection) -> Self {
        Self {
            generator: DdlGenerator::new(connection.dialect(), connection.prefix()),
            connection,
        }
    }

    /// The dialect statements are generated for.
    pub fn dialect(&self) -> Dialect {
        self.generator.dialect()
    }

    /// The table prefix.
    pub fn prefix(&self) -> &str {
        self.generator.prefix()
    }

    /// The underlying DDL generator.
    pub fn generator(&self) -> &DdlGenerator {
        &self.generator
    }

    /// Create a table.
    ///
    /// The generated statements go to the server as one batch. PostgreSQL
    /// runs a multi-statement batch in a single implicit transaction, so a
    /// failing `CREATE INDEX` leaves no table behind.
    pub async fn create_table(
        &self,
        name: &str,
        fields: &[FieldDefinition],
        options: &TableOptions,
    ) -> MigrateResult<()> {
        debug!(table = %name, fields = fields.len(), "Creating table");
        let batch = self.generator.create_table(name, fields, options)?.join(";\n");
        self.run_ddl(&batch).await
    }

    /// Drop a table if it exists.
    pub async fn drop_table(&self, name: &str) -> MigrateResult<()> {
        debug!(table = %name, "Dropping table");
        let statement = self.generator.drop_table(name)?;
        self.run_ddl(&statement).await
    }

    /// Add a column to an existing table.
    pub async fn add_column(
        &self,
        table: &str,
        name: &str,
        definition: &FieldDefinition,
    ) -> MigrateResult<()> {
        debug!(table = %table, column = %name, "Adding column");
        let statement = self.generator.add_column(table, name, definition)?;
        self.run_ddl(&statement).await
    }

    /// Drop a column from an existing table.
    pub async fn drop_column(&self, table: &str, name: &str) -> MigrateResult<()> {
        debug!(table = %table, column = %name, "Dropping column");
        let statement = self.generator.drop_column(table, name)?;
        self.run_ddl(&statement).await
    }

    /// Execute a raw statement. Failures are reported as DDL errors.
    pub async fn execute(&self, sql: &str) -> MigrateResult<()> {
        self.run_ddl(sql).await
    }

    async fn run_ddl(&self, statement: &str) -> MigrateResult<()> {
        self.connection
            .execute(statement)
            .await
            .map(|_| ())
            .map_err(|e| e.into_ddl(statement))
    }
}

impl std::fmt::Debug for Schema<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema")
            .field("dialect", &self.dialect())
            .field("prefix", &self.prefix())
            .finish()
    }
}
