//! Database drivers.
//!
//! An [`Executor`] is the live database handle behind a
//! [`Connection`](crate::connection::Connection). The engine only needs four
//! things from it: the dialect the server reports, plain statement
//! execution, parameterized execution and text-mode queries.

pub mod mysql;
pub mod postgres;

use async_trait::async_trait;

use crate::dialect::Dialect;
use crate::error::MigrateResult;

pub use mysql::MysqlExecutor;
pub use postgres::PgExecutor;

/// One result row with every column rendered as text. `None` is SQL `NULL`.
pub type TextRow = Vec<Option<String>>;

/// A live database handle.
///
/// Every failure must surface as an error: server-side statement failures as
/// [`MigrationError::Database`], transport failures as
/// [`MigrationError::Connection`].
///
/// [`MigrationError::Database`]: crate::error::MigrationError::Database
/// [`MigrationError::Connection`]: crate::error::MigrationError::Connection
#[async_trait]
pub trait Executor: Send + Sync {
    /// Dialect of the server this handle talks to.
    fn dialect(&self) -> Dialect;

    /// Version string reported by the server, when the handle asked for it.
    fn server_version(&self) -> Option<&str> {
        None
    }

    /// Execute a statement, returning the number of affected rows where the
    /// driver reports it.
    async fn execute(&self, sql: &str) -> MigrateResult<u64>;

    /// Execute a statement with positional string parameters.
    async fn execute_with(&self, sql: &str, params: &[&str]) -> MigrateResult<u64>;

    /// Run a query and return its rows as text.
    async fn query_text(&self, sql: &str) -> MigrateResult<Vec<TextRow>>;
}
