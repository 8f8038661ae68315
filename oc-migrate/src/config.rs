//! Database configuration bundle.
//!
//! The recognized keys mirror the storefront's `config.php`:
//! `DB_DRIVER`, `DB_HOSTNAME`, `DB_USERNAME`, `DB_PASSWORD`, `DB_DATABASE`,
//! `DB_PREFIX` and `DB_PORT`.

use serde::{Deserialize, Serialize};

use crate::dialect::Dialect;
use crate::error::{MigrateResult, MigrationError};

/// Table prefix used when none is configured.
pub const DEFAULT_PREFIX: &str = "oc_";

/// Driver token used when none is configured.
pub const DEFAULT_DRIVER: &str = "mysqli";

/// Connection settings consumed by [`Connection::open`].
///
/// `driver` is kept as the raw token so that an unsupported value is
/// reported by `Connection::open`, before any network I/O.
///
/// [`Connection::open`]: crate::connection::Connection::open
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Driver token (`mysqli` or `pgsql`).
    pub driver: String,
    /// Server host name.
    pub hostname: String,
    /// User name.
    pub username: String,
    /// Password.
    pub password: String,
    /// Database (schema) name.
    pub database: String,
    /// Server port; the dialect default is used when unset.
    pub port: Option<u16>,
    /// Table-name prefix.
    pub prefix: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DEFAULT_DRIVER.to_string(),
            hostname: "localhost".to_string(),
            username: String::new(),
            password: String::new(),
            database: String::new(),
            port: None,
            prefix: DEFAULT_PREFIX.to_string(),
        }
    }
}

// Redacts the password.
impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("driver", &self.driver)
            .field("hostname", &self.hostname)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("port", &self.port)
            .field("prefix", &self.prefix)
            .finish()
    }
}

impl DatabaseConfig {
    /// Create a configuration with defaults for everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from a `DB_*` key lookup, such as
    /// `|key| std::env::var(key).ok()`.
    pub fn from_lookup<F>(lookup: F) -> MigrateResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        config.merge_lookup(lookup)?;
        Ok(config)
    }

    /// Overlay values from a `DB_*` key lookup onto this configuration.
    ///
    /// Keys that are absent leave the current value untouched. An empty
    /// `DB_PORT` clears the port, an empty `DB_PREFIX` restores the default.
    pub fn merge_lookup<F>(&mut self, lookup: F) -> MigrateResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(driver) = lookup("DB_DRIVER") {
            self.driver = driver;
        }
        if let Some(hostname) = lookup("DB_HOSTNAME") {
            self.hostname = hostname;
        }
        if let Some(username) = lookup("DB_USERNAME") {
            self.username = username;
        }
        if let Some(password) = lookup("DB_PASSWORD") {
            self.password = password;
        }
        if let Some(database) = lookup("DB_DATABASE") {
            self.database = database;
        }
        if let Some(prefix) = lookup("DB_PREFIX") {
            self.prefix = if prefix.is_empty() {
                DEFAULT_PREFIX.to_string()
            } else {
                prefix
            };
        }
        if let Some(port) = lookup("DB_PORT") {
            self.port = parse_port(&port)?;
        }
        Ok(())
    }

    /// Set the driver token.
    pub fn driver(mut self, driver: impl Into<String>) -> Self {
        self.driver = driver.into();
        self
    }

    /// Set the host name.
    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    /// Set the user name.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    /// Set the password.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// Set the database name.
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Set the port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the table prefix.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Resolve the driver token to a dialect.
    pub fn dialect(&self) -> MigrateResult<Dialect> {
        Dialect::from_driver(&self.driver)
    }

    /// Port to connect to: the configured one or the dialect default.
    pub fn effective_port(&self, dialect: Dialect) -> u16 {
        self.port.unwrap_or_else(|| dialect.default_port())
    }

    /// Render the dialect-specific connection string.
    ///
    /// ```text
    /// mysql:host=localhost;port=3306;dbname=opencart;charset=utf8mb4
    /// pgsql:host=localhost;port=5432;dbname=opencart
    /// ```
    ///
    /// The `port` segment is omitted when no port is configured.
    pub fn dsn(&self) -> MigrateResult<String> {
        let dialect = self.dialect()?;

        let mut dsn = format!("{}:host={}", dialect.driver_name(), self.hostname);
        if let Some(port) = self.port {
            dsn.push_str(&format!(";port={}", port));
        }
        dsn.push_str(&format!(";dbname={}", self.database));
        if dialect == Dialect::MySql {
            dsn.push_str(";charset=utf8mb4");
        }

        Ok(dsn)
    }
}

fn parse_port(value: &str) -> MigrateResult<Option<u16>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<u16>()
        .map(Some)
        .map_err(|_| MigrationError::config(format!("invalid DB_PORT '{}'", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_default() {
        let config = DatabaseConfig::default();
        assert_eq!(config.driver, "mysqli");
        assert_eq!(config.hostname, "localhost");
        assert_eq!(config.prefix, "oc_");
        assert_eq!(config.port, None);
    }

    #[test]
    fn test_config_from_lookup() {
        let config = DatabaseConfig::from_lookup(lookup(&[
            ("DB_DRIVER", "pgsql"),
            ("DB_HOSTNAME", "db"),
            ("DB_USERNAME", "root"),
            ("DB_PASSWORD", "opencart"),
            ("DB_DATABASE", "opencart"),
            ("DB_PORT", "5433"),
        ]))
        .unwrap();

        assert_eq!(config.driver, "pgsql");
        assert_eq!(config.hostname, "db");
        assert_eq!(config.username, "root");
        assert_eq!(config.password, "opencart");
        assert_eq!(config.database, "opencart");
        assert_eq!(config.port, Some(5433));
        assert_eq!(config.prefix, "oc_");
    }

    #[test]
    fn test_config_invalid_port() {
        let err = DatabaseConfig::from_lookup(lookup(&[("DB_PORT", "abc")])).unwrap_err();
        assert!(matches!(err, MigrationError::Config(_)));
    }

    #[test]
    fn test_merge_keeps_unset_values() {
        let mut config = DatabaseConfig::new().database("shop").port(3307);
        config
            .merge_lookup(lookup(&[("DB_HOSTNAME", "mysql"), ("DB_PREFIX", "")]))
            .unwrap();

        assert_eq!(config.database, "shop");
        assert_eq!(config.port, Some(3307));
        assert_eq!(config.hostname, "mysql");
        assert_eq!(config.prefix, "oc_");
    }

    #[test]
    fn test_dsn_mysql() {
        let config = DatabaseConfig::new()
            .hostname("mysql")
            .database("opencart")
            .port(3306);
        assert_eq!(
            config.dsn().unwrap(),
            "mysql:host=mysql;port=3306;dbname=opencart;charset=utf8mb4"
        );
    }

    #[test]
    fn test_dsn_pgsql_without_port() {
        let config = DatabaseConfig::new().driver("pgsql").database("opencart");
        assert_eq!(config.dsn().unwrap(), "pgsql:host=localhost;dbname=opencart");
        assert_eq!(config.effective_port(Dialect::PostgreSql), 5432);
    }

    #[test]
    fn test_dsn_unsupported_driver() {
        let config = DatabaseConfig::new().driver("oracle");
        assert!(matches!(
            config.dsn().unwrap_err(),
            MigrationError::UnsupportedDriver(_)
        ));
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = DatabaseConfig::new().password("hunter2");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_deserialize_toml() {
        let config: DatabaseConfig = toml::from_str(
            r#"
            driver = "pgsql"
            hostname = "db.internal"
            database = "store"
            port = 5432
            "#,
        )
        .unwrap();

        assert_eq!(config.driver, "pgsql");
        assert_eq!(config.port, Some(5432));
        assert_eq!(config.prefix, "oc_");
    }
}
