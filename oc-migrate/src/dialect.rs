//! SQL dialects and their dispatch tables.
//!
//! Every place where MySQL and PostgreSQL disagree is a method on
//! [`Dialect`]: identifier quoting, type mapping, auto-increment syntax,
//! table options, bind placeholders and the ledger table DDL.

use std::fmt;
use std::str::FromStr;

use crate::error::{MigrateResult, MigrationError};
use crate::table::{FieldDefinition, TableOptions};

/// MySQL table options used when a migration does not specify them.
pub const DEFAULT_ENGINE: &str = "InnoDB";
/// Default MySQL character set.
pub const DEFAULT_CHARSET: &str = "utf8mb4";
/// Default MySQL collation.
pub const DEFAULT_COLLATE: &str = "utf8mb4_unicode_ci";

/// A supported SQL dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// MySQL / MariaDB.
    MySql,
    /// PostgreSQL.
    PostgreSql,
}

impl Dialect {
    /// Resolve a configuration driver token (`DB_DRIVER`).
    ///
    /// `mysqli` and `mysql` select MySQL; `pgsql`, `postgres` and
    /// `postgresql` select PostgreSQL.
    pub fn from_driver(token: &str) -> MigrateResult<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "mysqli" | "mysql" => Ok(Self::MySql),
            "pgsql" | "postgres" | "postgresql" => Ok(Self::PostgreSql),
            _ => Err(MigrationError::UnsupportedDriver(token.to_string())),
        }
    }

    /// Identify the dialect from the server's version string, as returned
    /// by `SELECT version()`.
    ///
    /// PostgreSQL reports `PostgreSQL 16.2 on ...`; MySQL reports a bare
    /// number such as `8.0.36`, MariaDB `10.11.6-MariaDB`.
    pub fn from_server_version(version: &str) -> Option<Self> {
        let lowered = version.trim().to_ascii_lowercase();
        if lowered.starts_with("postgresql") {
            Some(Self::PostgreSql)
        } else if lowered.contains("mariadb")
            || lowered.contains("mysql")
            || lowered.starts_with(|c: char| c.is_ascii_digit())
        {
            Some(Self::MySql)
        } else {
            None
        }
    }

    /// Driver name as reported by the live handle.
    pub fn driver_name(self) -> &'static str {
        match self {
            Self::MySql => "mysql",
            Self::PostgreSql => "pgsql",
        }
    }

    /// Human-readable dialect name.
    pub fn name(self) -> &'static str {
        match self {
            Self::MySql => "mysql",
            Self::PostgreSql => "postgresql",
        }
    }

    /// Default server port.
    pub fn default_port(self) -> u16 {
        match self {
            Self::MySql => 3306,
            Self::PostgreSql => 5432,
        }
    }

    /// Quote a table, column or index name.
    pub fn quote_identifier(self, identifier: &str) -> String {
        match self {
            Self::MySql => format!("`{}`", identifier.replace('`', "``")),
            Self::PostgreSql => format!("\"{}\"", identifier.replace('"', "\"\"")),
        }
    }

    /// Quote a string literal. Identical for both dialects.
    pub fn quote_value(self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    /// Map a neutral column type to this dialect's type.
    ///
    /// Unrecognized tokens pass through verbatim.
    pub fn map_type(self, field: &FieldDefinition) -> String {
        match self {
            Self::MySql => map_mysql_type(&field.field_type),
            Self::PostgreSql => map_pgsql_type(&field.field_type, field.auto_increment),
        }
    }

    /// Trailing column keyword for auto-increment columns, if the dialect
    /// uses one. PostgreSQL folds identity into the type instead.
    pub fn auto_increment_suffix(self) -> Option<&'static str> {
        match self {
            Self::MySql => Some("AUTO_INCREMENT"),
            Self::PostgreSql => None,
        }
    }

    /// Clause appended after the closing parenthesis of `CREATE TABLE`.
    pub fn table_options(self, options: &TableOptions) -> String {
        match self {
            Self::MySql => format!(
                " ENGINE={} CHARSET={} COLLATE={}",
                options.engine.as_deref().unwrap_or(DEFAULT_ENGINE),
                options.charset.as_deref().unwrap_or(DEFAULT_CHARSET),
                options.collate.as_deref().unwrap_or(DEFAULT_COLLATE),
            ),
            Self::PostgreSql => String::new(),
        }
    }

    /// Whether secondary indexes can be declared inline in `CREATE TABLE`.
    pub fn inline_indexes(self) -> bool {
        matches!(self, Self::MySql)
    }

    /// Positional bind placeholder, 1-based.
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Self::MySql => "?".to_string(),
            Self::PostgreSql => format!("${}", index),
        }
    }

    /// Expression rendering a timestamp column as text.
    pub fn timestamp_as_text(self, column: &str) -> String {
        match self {
            Self::MySql => format!("CAST({} AS CHAR)", column),
            Self::PostgreSql => format!("CAST({} AS TEXT)", column),
        }
    }

    /// `CREATE TABLE IF NOT EXISTS` statement for the migration ledger.
    pub fn ledger_ddl(self, table: &str) -> String {
        let table = self.quote_identifier(table);
        match self {
            Self::MySql => format!(
                "CREATE TABLE IF NOT EXISTS {} (\n  \
                 `migration_id` int(11) NOT NULL AUTO_INCREMENT,\n  \
                 `migration_name` varchar(255) NOT NULL,\n  \
                 `date_excluded` datetime NOT NULL,\n  \
                 PRIMARY KEY (`migration_id`),\n  \
                 UNIQUE KEY `migration_name` (`migration_name`)\n) \
                 ENGINE={} CHARSET={} COLLATE={}",
                table, DEFAULT_ENGINE, DEFAULT_CHARSET, DEFAULT_COLLATE
            ),
            Self::PostgreSql => format!(
                "CREATE TABLE IF NOT EXISTS {} (\n  \
                 \"migration_id\" INTEGER GENERATED ALWAYS AS IDENTITY PRIMARY KEY,\n  \
                 \"migration_name\" VARCHAR(255) NOT NULL UNIQUE,\n  \
                 \"date_excluded\" TIMESTAMP NOT NULL\n)",
                table
            ),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dialect {
    type Err = MigrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_driver(s)
    }
}

fn map_mysql_type(field_type: &str) -> String {
    match field_type.trim().to_ascii_lowercase().as_str() {
        "text" => "TEXT".to_string(),
        "mediumtext" => "MEDIUMTEXT".to_string(),
        "datetime" => "DATETIME".to_string(),
        "date" => "DATE".to_string(),
        "tinyint(1)" => "TINYINT(1)".to_string(),
        _ => field_type.to_string(),
    }
}

fn map_pgsql_type(field_type: &str, auto_increment: bool) -> String {
    let lowered = field_type.trim().to_ascii_lowercase();

    // tinyint(1) is checked ahead of the generic int( rule.
    match lowered.as_str() {
        "tinyint(1)" => "BOOLEAN".to_string(),
        t if t.contains("int(") && auto_increment => {
            "INTEGER GENERATED ALWAYS AS IDENTITY".to_string()
        }
        t if t.contains("int(") => "INTEGER".to_string(),
        t if t.contains("varchar(") => t.replace("varchar", "VARCHAR"),
        t if t.contains("decimal(") => t.replace("decimal", "DECIMAL"),
        "text" | "mediumtext" => "TEXT".to_string(),
        "datetime" => "TIMESTAMP".to_string(),
        "date" => "DATE".to_string(),
        _ => field_type.to_string(),
    }
}
