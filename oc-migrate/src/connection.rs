//! The process-wide database connection.

use tracing::info;

use crate::config::{DEFAULT_PREFIX, DatabaseConfig};
use crate::dialect::Dialect;
use crate::driver::{Executor, MysqlExecutor, PgExecutor, TextRow};
use crate::error::MigrateResult;

/// A live database handle plus the table prefix.
///
/// Immutable after construction. The Schema Builder and the runner borrow it;
/// nothing but the owner ever drops it.
pub struct Connection {
    executor: Box<dyn Executor>,
    prefix: String,
}

impl Connection {
    /// Open a connection from a configuration bundle.
    ///
    /// The driver token is resolved first, so an unsupported driver fails
    /// with [`MigrationError::UnsupportedDriver`] without touching the
    /// network.
    ///
    /// [`MigrationError::UnsupportedDriver`]: crate::error::MigrationError::UnsupportedDriver
    pub async fn open(config: &DatabaseConfig) -> MigrateResult<Self> {
        let dsn = config.dsn()?;
        let dialect = config.dialect()?;

        let executor: Box<dyn Executor> = match dialect {
            Dialect::MySql => Box::new(MysqlExecutor::connect(config).await?),
            Dialect::PostgreSql => Box::new(PgExecutor::connect(config).await?),
        };

        let connection = Self::with_executor(executor, config.prefix.clone());
        info!(
            dsn = %dsn,
            dialect = %connection.dialect(),
            server_version = connection.server_version().unwrap_or("unknown"),
            prefix = %connection.prefix,
            "Database connection established"
        );

        Ok(connection)
    }

    /// Wrap an existing handle.
    ///
    /// An empty prefix falls back to `oc_`.
    pub fn with_executor(executor: Box<dyn Executor>, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self {
            executor,
            prefix: if prefix.is_empty() {
                DEFAULT_PREFIX.to_string()
            } else {
                prefix
            },
        }
    }

    /// Table-name prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Dialect as reported by the server behind the handle, not by the
    /// configuration.
    pub fn dialect(&self) -> Dialect {
        self.executor.dialect()
    }

    /// Version string the server reported when the handle was opened.
    pub fn server_version(&self) -> Option<&str> {
        self.executor.server_version()
    }

    /// Prefix a bare table name.
    pub fn table_name(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    /// Execute a raw statement.
    pub async fn execute(&self, sql: &str) -> MigrateResult<u64> {
        self.executor.execute(sql).await
    }

    /// Execute a raw statement with positional string parameters.
    ///
    /// Placeholders follow the dialect: `?` for MySQL, `$1`, `$2`, ... for
    /// PostgreSQL (see [`Dialect::placeholder`]).
    pub async fn execute_with(&self, sql: &str, params: &[&str]) -> MigrateResult<u64> {
        self.executor.execute_with(sql, params).await
    }

    /// Run a query, returning every column as text.
    pub async fn query_text(&self, sql: &str) -> MigrateResult<Vec<TextRow>> {
        self.executor.query_text(sql).await
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("dialect", &self.dialect())
            .field("prefix", &self.prefix)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MigrationError;
    use async_trait::async_trait;

    struct NullExecutor(Dialect);

    #[async_trait]
    impl Executor for NullExecutor {
        fn dialect(&self) -> Dialect {
            self.0
        }

        async fn execute(&self, _sql: &str) -> MigrateResult<u64> {
            Ok(0)
        }

        async fn execute_with(&self, _sql: &str, _params: &[&str]) -> MigrateResult<u64> {
            Ok(0)
        }

        async fn query_text(&self, _sql: &str) -> MigrateResult<Vec<TextRow>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_open_unsupported_driver_fails_before_connecting() {
        // An unroutable host would hang or error with Connection; the driver
        // check must win.
        let config = DatabaseConfig::new()
            .driver("oracle")
            .hostname("203.0.113.1")
            .database("opencart");

        let err = Connection::open(&config).await.unwrap_err();
        assert!(matches!(err, MigrationError::UnsupportedDriver(ref d) if d == "oracle"));
    }

    #[test]
    fn test_dialect_comes_from_executor() {
        let conn = Connection::with_executor(Box::new(NullExecutor(Dialect::PostgreSql)), "shop_");
        assert_eq!(conn.dialect(), Dialect::PostgreSql);
        assert_eq!(conn.prefix(), "shop_");
        assert_eq!(conn.table_name("product"), "shop_product");
    }

    struct VersionedExecutor;

    #[async_trait]
    impl Executor for VersionedExecutor {
        fn dialect(&self) -> Dialect {
            Dialect::from_server_version("10.11.6-MariaDB").unwrap_or(Dialect::PostgreSql)
        }

        fn server_version(&self) -> Option<&str> {
            Some("10.11.6-MariaDB")
        }

        async fn execute(&self, _sql: &str) -> MigrateResult<u64> {
            Ok(0)
        }

        async fn execute_with(&self, _sql: &str, _params: &[&str]) -> MigrateResult<u64> {
            Ok(0)
        }

        async fn query_text(&self, _sql: &str) -> MigrateResult<Vec<TextRow>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_server_version_comes_from_executor() {
        let conn = Connection::with_executor(Box::new(VersionedExecutor), "oc_");
        assert_eq!(conn.server_version(), Some("10.11.6-MariaDB"));
        assert_eq!(conn.dialect(), Dialect::MySql);

        let unversioned = Connection::with_executor(Box::new(NullExecutor(Dialect::MySql)), "oc_");
        assert_eq!(unversioned.server_version(), None);
    }

    #[test]
    fn test_empty_prefix_defaults() {
        let conn = Connection::with_executor(Box::new(NullExecutor(Dialect::MySql)), "");
        assert_eq!(conn.prefix(), "oc_");
    }
}
