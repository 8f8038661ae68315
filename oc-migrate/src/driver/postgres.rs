//! PostgreSQL driver built on `tokio-postgres`.

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls, SimpleQueryMessage};
use tracing::{debug, error};

use crate::config::DatabaseConfig;
use crate::dialect::Dialect;
use crate::driver::{Executor, TextRow};
use crate::error::{MigrateResult, MigrationError};

/// A single PostgreSQL client and the task driving its socket.
pub struct PgExecutor {
    client: Client,
    connection: JoinHandle<()>,
    dialect: Dialect,
    server_version: String,
}

impl PgExecutor {
    /// Open a connection using the given configuration.
    pub async fn connect(config: &DatabaseConfig) -> MigrateResult<Self> {
        let mut pg = tokio_postgres::Config::new();
        pg.host(config.hostname.as_str());
        pg.port(config.effective_port(Dialect::PostgreSql));
        pg.dbname(config.database.as_str());
        pg.application_name("oc-migrate");
        if !config.username.is_empty() {
            pg.user(config.username.as_str());
        }
        if !config.password.is_empty() {
            pg.password(config.password.as_str());
        }

        debug!(
            host = %config.hostname,
            port = config.effective_port(Dialect::PostgreSql),
            database = %config.database,
            "Connecting to PostgreSQL"
        );

        let (client, connection) = pg.connect(NoTls).await.map_err(|e| {
            MigrationError::connection(format!("failed to connect to PostgreSQL: {}", e))
        })?;

        let connection = tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!(error = %e, "PostgreSQL connection terminated");
            }
        });

        let server_version = match query_server_version(&client).await {
            Ok(version) => version,
            Err(e) => {
                connection.abort();
                return Err(e);
            }
        };
        let Some(dialect) = Dialect::from_server_version(&server_version) else {
            connection.abort();
            return Err(MigrationError::connection(format!(
                "unrecognized server version '{}'",
                server_version
            )));
        };

        Ok(Self {
            client,
            connection,
            dialect,
            server_version,
        })
    }
}

async fn query_server_version(client: &Client) -> MigrateResult<String> {
    client
        .simple_query("SELECT version()")
        .await
        .map_err(classify)?
        .into_iter()
        .find_map(|message| match message {
            SimpleQueryMessage::Row(row) => row.get(0).map(str::to_string),
            _ => None,
        })
        .ok_or_else(|| MigrationError::connection("PostgreSQL server did not report a version"))
}

impl Drop for PgExecutor {
    fn drop(&mut self) {
        self.connection.abort();
    }
}

#[async_trait]
impl Executor for PgExecutor {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn server_version(&self) -> Option<&str> {
        Some(&self.server_version)
    }

    async fn execute(&self, sql: &str) -> MigrateResult<u64> {
        debug!(sql = %sql, "Executing statement");
        self.client.batch_execute(sql).await.map_err(classify)?;
        Ok(0)
    }

    async fn execute_with(&self, sql: &str, params: &[&str]) -> MigrateResult<u64> {
        debug!(sql = %sql, params = ?params, "Executing parameterized statement");
        let params: Vec<&(dyn ToSql + Sync)> =
            params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();
        self.client.execute(sql, &params).await.map_err(classify)
    }

    async fn query_text(&self, sql: &str) -> MigrateResult<Vec<TextRow>> {
        debug!(sql = %sql, "Executing query");
        let messages = self.client.simple_query(sql).await.map_err(classify)?;
        Ok(messages
            .into_iter()
            .filter_map(|message| match message {
                SimpleQueryMessage::Row(row) => Some(
                    (0..row.len())
                        .map(|i| row.get(i).map(str::to_string))
                        .collect(),
                ),
                _ => None,
            })
            .collect())
    }
}

/// Errors carrying a server error report are statement failures; the rest
/// (closed socket, TLS, protocol) mean the handle is gone.
fn classify(err: tokio_postgres::Error) -> MigrationError {
    match err.as_db_error() {
        Some(db) => {
            MigrationError::database(format!("{} (SQLSTATE {})", db.message(), db.code().code()))
        }
        None => MigrationError::connection(err.to_string()),
    }
}
