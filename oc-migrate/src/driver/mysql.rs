//! MySQL driver built on `mysql_async`.

use async_trait::async_trait;
use mysql_async::prelude::*;
use mysql_async::{Conn, OptsBuilder, Params, Row, Value};
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::DatabaseConfig;
use crate::dialect::Dialect;
use crate::driver::{Executor, TextRow};
use crate::error::{MigrateResult, MigrationError};

/// A single MySQL connection.
///
/// `mysql_async` needs `&mut Conn` for every call, so the connection sits
/// behind an async mutex. Statements still run one at a time.
pub struct MysqlExecutor {
    conn: Mutex<Conn>,
    dialect: Dialect,
    server_version: String,
}

impl MysqlExecutor {
    /// Open a connection using the given configuration.
    pub async fn connect(config: &DatabaseConfig) -> MigrateResult<Self> {
        let opts = opts_builder(config);

        debug!(
            host = %config.hostname,
            port = config.effective_port(Dialect::MySql),
            database = %config.database,
            "Connecting to MySQL"
        );

        let conn = Conn::new(opts)
            .await
            .map_err(|e| MigrationError::connection(format!("failed to connect to MySQL: {}", e)))?;

        Self::from_conn(conn).await
    }

    /// Wrap an already-open connection, asking the server what it is.
    pub async fn from_conn(mut conn: Conn) -> MigrateResult<Self> {
        let server_version: String = conn
            .query_first::<String, _>("SELECT VERSION()")
            .await
            .map_err(classify)?
            .ok_or_else(|| MigrationError::connection("MySQL server did not report a version"))?;

        let dialect = Dialect::from_server_version(&server_version).ok_or_else(|| {
            MigrationError::connection(format!("unrecognized server version '{}'", server_version))
        })?;

        Ok(Self {
            conn: Mutex::new(conn),
            dialect,
            server_version,
        })
    }
}

#[async_trait]
impl Executor for MysqlExecutor {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn server_version(&self) -> Option<&str> {
        Some(&self.server_version)
    }

    async fn execute(&self, sql: &str) -> MigrateResult<u64> {
        debug!(sql = %sql, "Executing statement");
        let mut conn = self.conn.lock().await;
        conn.query_drop(sql).await.map_err(classify)?;
        Ok(conn.affected_rows())
    }

    async fn execute_with(&self, sql: &str, params: &[&str]) -> MigrateResult<u64> {
        debug!(sql = %sql, params = ?params, "Executing parameterized statement");
        let params = Params::Positional(params.iter().map(|p| Value::from(*p)).collect());
        let mut conn = self.conn.lock().await;
        conn.exec_drop(sql, params).await.map_err(classify)?;
        Ok(conn.affected_rows())
    }

    async fn query_text(&self, sql: &str) -> MigrateResult<Vec<TextRow>> {
        debug!(sql = %sql, "Executing query");
        let mut conn = self.conn.lock().await;
        let rows: Vec<Row> = conn.query(sql).await.map_err(classify)?;
        Ok(rows
            .into_iter()
            .map(|row| {
                row.unwrap_raw()
                    .into_iter()
                    .map(|value| value.and_then(value_to_text))
                    .collect()
            })
            .collect())
    }
}

fn opts_builder(config: &DatabaseConfig) -> OptsBuilder {
    let mut builder = OptsBuilder::default()
        .ip_or_hostname(config.hostname.as_str())
        .tcp_port(config.effective_port(Dialect::MySql))
        .db_name(Some(config.database.as_str()))
        .init(vec!["SET NAMES utf8mb4"]);

    if !config.username.is_empty() {
        builder = builder.user(Some(config.username.as_str()));
    }
    if !config.password.is_empty() {
        builder = builder.pass(Some(config.password.as_str()));
    }

    builder
}

/// Server errors are statement failures; everything else means the handle
/// itself is unusable.
fn classify(err: mysql_async::Error) -> MigrationError {
    match err {
        mysql_async::Error::Server(e) => MigrationError::database(e.to_string()),
        other => MigrationError::connection(other.to_string()),
    }
}

fn value_to_text(value: Value) -> Option<String> {
    match value {
        Value::NULL => None,
        Value::Bytes(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Value::Int(i) => Some(i.to_string()),
        Value::UInt(u) => Some(u.to_string()),
        Value::Float(f) => Some(f.to_string()),
        Value::Double(d) => Some(d.to_string()),
        Value::Date(year, month, day, hour, minute, second, _) => Some(format!(
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            year, month, day, hour, minute, second
        )),
        other => Some(other.as_sql(true)),
    }
}
