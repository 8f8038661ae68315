//! Error types for the migration engine.

use thiserror::Error;

/// Result type alias for migration operations.
pub type MigrateResult<T> = Result<T, MigrationError>;

/// Errors that can occur during migration operations.
///
/// Nothing in this crate retries or swallows these; every failure is returned
/// to the caller, which decides how to report it.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// The configured driver or dialect token is not MySQL or PostgreSQL.
    #[error("Unsupported database driver: {0}")]
    UnsupportedDriver(String),

    /// Opening the handle failed, or the transport broke mid-statement.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A generated DDL statement was rejected by the server.
    #[error("DDL error: {message}\n  statement: {statement}")]
    Ddl {
        /// The statement that failed.
        statement: String,
        /// Server-provided reason.
        message: String,
    },

    /// Rollback target does not match any discovered migration.
    #[error("Migration not found: {0}")]
    MigrationNotFound(String),

    /// A non-DDL statement failed (ledger reads and writes, raw SQL).
    #[error("Database error: {0}")]
    Database(String),

    /// Malformed configuration value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid migration definition.
    #[error("Invalid migration: {0}")]
    InvalidMigration(String),

    /// File system error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MigrationError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a database error.
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a DDL error for the given statement.
    pub fn ddl(statement: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Ddl {
            statement: statement.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid migration error.
    pub fn invalid_migration(msg: impl Into<String>) -> Self {
        Self::InvalidMigration(msg.into())
    }

    /// Re-tag a statement failure as a DDL failure.
    ///
    /// Connection failures keep their kind so callers can still tell a dead
    /// handle apart from a bad statement.
    pub fn into_ddl(self, statement: &str) -> Self {
        match self {
            Self::Database(message) => Self::ddl(statement, message),
            other => other,
        }
    }
}

impl From<toml::de::Error> for MigrationError {
    fn from(err: toml::de::Error) -> Self {
        MigrationError::InvalidMigration(format!("failed to parse TOML: {}", err))
    }
}
