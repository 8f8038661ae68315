//! Migration units.
//!
//! A migration is anything implementing [`Migration`]: an `up` operation and
//! an optional `down`, both given the Schema Builder and the raw connection.
//! Units can be written in Rust and put in a
//! [`Registry`](crate::source::Registry), or declared in TOML files and
//! loaded through a [`DirectorySource`](crate::source::DirectorySource).
//!
//! # Definition files
//!
//! ```toml
//! description = "Customer activity"
//!
//! [[up]]
//! op = "create_table"
//! name = "customer_activity"
//! fields = [
//!     { name = "customer_activity_id", type = "int(11)", not_null = true, auto_increment = true, primary = true },
//!     { name = "customer_id", type = "int(11)", not_null = true },
//!     { name = "date_added", type = "datetime", not_null = true },
//! ]
//!
//! [up.options]
//! indexes = [{ name = "customer_id", keys = ["customer_id"] }]
//!
//! [[down]]
//! op = "drop_table"
//! name = "customer_activity"
//! ```
//!
//! A file without `[[down]]` has no down operation.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::connection::Connection;
use crate::dialect::Dialect;
use crate::error::{MigrateResult, MigrationError};
use crate::schema::Schema;
use crate::table::{FieldDefinition, TableOptions};

/// A reversible schema change.
#[async_trait]
pub trait Migration: Send + Sync {
    /// Apply the change.
    async fn up(&self, schema: &Schema<'_>, connection: &Connection) -> MigrateResult<()>;

    /// Revert the change. Only called when [`has_down`](Self::has_down) is true.
    async fn down(&self, _schema: &Schema<'_>, _connection: &Connection) -> MigrateResult<()> {
        Ok(())
    }

    /// Whether this migration defines a down operation.
    fn has_down(&self) -> bool {
        true
    }
}

/// A named migration, as produced by a source.
pub struct MigrationUnit {
    /// Ledger name.
    pub name: String,
    /// The operations.
    pub migration: Arc<dyn Migration>,
}

impl MigrationUnit {
    /// Create a unit.
    pub fn new(name: impl Into<String>, migration: impl Migration + 'static) -> Self {
        Self::from_shared(name, Arc::new(migration))
    }

    /// Create a unit from an already shared migration.
    pub fn from_shared(name: impl Into<String>, migration: Arc<dyn Migration>) -> Self {
        Self {
            name: name.into(),
            migration,
        }
    }
}

impl std::fmt::Debug for MigrationUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationUnit")
            .field("name", &self.name)
            .field("has_down", &self.migration.has_down())
            .finish()
    }
}

/// One declarative schema operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// `Schema::create_table`.
    CreateTable {
        name: String,
        fields: Vec<FieldDefinition>,
        #[serde(default)]
        options: TableOptions,
    },
    /// `Schema::drop_table`.
    DropTable { name: String },
    /// `Schema::add_column`. The column attributes sit beside `table`.
    AddColumn {
        table: String,
        #[serde(flatten)]
        field: FieldDefinition,
    },
    /// `Schema::drop_column`.
    DropColumn { table: String, name: String },
    /// A raw statement. A dialect-specific statement wins over `statement`;
    /// when nothing applies to the current dialect the operation is skipped.
    Sql {
        #[serde(default)]
        statement: Option<String>,
        #[serde(default)]
        mysql: Option<String>,
        #[serde(default)]
        postgresql: Option<String>,
    },
}

impl Operation {
    /// Check the operation before anything is executed.
    pub fn validate(&self) -> MigrateResult<()> {
        match self {
            Self::CreateTable {
                name,
                fields,
                options,
            } => {
                require_name("create_table", name)?;
                if fields.is_empty() {
                    return Err(MigrationError::invalid_migration(format!(
                        "create_table '{}' has no fields",
                        name
                    )));
                }
                fields.iter().try_for_each(FieldDefinition::validate)?;
                options.indexes.iter().try_for_each(|i| i.validate())
            }
            Self::DropTable { name } => require_name("drop_table", name),
            Self::AddColumn { table, field } => {
                require_name("add_column", table)?;
                field.validate()
            }
            Self::DropColumn { table, name } => {
                require_name("drop_column", table)?;
                require_name("drop_column", name)
            }
            Self::Sql {
                statement,
                mysql,
                postgresql,
            } => {
                if statement.is_none() && mysql.is_none() && postgresql.is_none() {
                    return Err(MigrationError::invalid_migration(
                        "sql operation needs statement, mysql or postgresql",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Run the operation.
    pub async fn apply(&self, schema: &Schema<'_>) -> MigrateResult<()> {
        match self {
            Self::CreateTable {
                name,
                fields,
                options,
            } => schema.create_table(name, fields, options).await,
            Self::DropTable { name } => schema.drop_table(name).await,
            Self::AddColumn { table, field } => schema.add_column(table, &field.name, field).await,
            Self::DropColumn { table, name } => schema.drop_column(table, name).await,
            Self::Sql {
                statement,
                mysql,
                postgresql,
            } => {
                let specific = match schema.dialect() {
                    Dialect::MySql => mysql,
                    Dialect::PostgreSql => postgresql,
                };
                match specific.as_ref().or(statement.as_ref()) {
                    Some(sql) => schema.execute(sql).await,
                    None => {
                        debug!(dialect = %schema.dialect(), "No statement for dialect, skipping");
                        Ok(())
                    }
                }
            }
        }
    }
}

fn require_name(op: &str, name: &str) -> MigrateResult<()> {
    if name.trim().is_empty() {
        return Err(MigrationError::invalid_migration(format!(
            "{}: name must not be empty",
            op
        )));
    }
    Ok(())
}

const FIELD_KEYS: &[&str] = &["name", "type", "not_null", "auto_increment", "default", "primary"];
const OPTION_KEYS: &[&str] = &["engine", "charset", "collate", "indexes"];
const INDEX_KEYS: &[&str] = &["name", "keys"];

// `add_column` flattens a field into the operation, which rules out
// `deny_unknown_fields`, so keys are checked on the raw document instead.
fn check_keys(document: &toml::Table) -> MigrateResult<()> {
    for section in ["up", "down"] {
        let Some(toml::Value::Array(operations)) = document.get(section) else {
            continue;
        };
        for (position, operation) in operations.iter().enumerate() {
            if let toml::Value::Table(operation) = operation {
                let context = format!("{}[{}]", section, position);
                check_operation_keys(operation, &context)?;
            }
        }
    }
    Ok(())
}

fn check_operation_keys(operation: &toml::Table, context: &str) -> MigrateResult<()> {
    let op = operation.get("op").and_then(toml::Value::as_str).unwrap_or_default();
    let allowed: Vec<&str> = match op {
        "create_table" => vec!["op", "name", "fields", "options"],
        "drop_table" => vec!["op", "name"],
        "add_column" => ["op", "table"].iter().chain(FIELD_KEYS).copied().collect(),
        "drop_column" => vec!["op", "table", "name"],
        "sql" => vec!["op", "statement", "mysql", "postgresql"],
        // Missing or unknown `op` values are reported by deserialization.
        _ => return Ok(()),
    };
    reject_unknown(operation, &allowed, &format!("{} ({})", context, op))?;

    if let Some(toml::Value::Array(fields)) = operation.get("fields") {
        for field in fields.iter().filter_map(toml::Value::as_table) {
            reject_unknown(field, FIELD_KEYS, &format!("{} field", context))?;
        }
    }

    if let Some(toml::Value::Table(options)) = operation.get("options") {
        reject_unknown(options, OPTION_KEYS, &format!("{} options", context))?;
        if let Some(toml::Value::Array(indexes)) = options.get("indexes") {
            for index in indexes.iter().filter_map(toml::Value::as_table) {
                reject_unknown(index, INDEX_KEYS, &format!("{} index", context))?;
            }
        }
    }

    Ok(())
}

fn reject_unknown(table: &toml::Table, allowed: &[&str], context: &str) -> MigrateResult<()> {
    match table.keys().find(|key| !allowed.contains(&key.as_str())) {
        Some(key) => Err(MigrationError::invalid_migration(format!(
            "{}: unknown key '{}'",
            context, key
        ))),
        None => Ok(()),
    }
}

/// A migration parsed from a TOML definition file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MigrationDefinition {
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Forward operations, in order.
    pub up: Vec<Operation>,
    /// Reverse operations, in order. `None` means no down operation.
    #[serde(default)]
    pub down: Option<Vec<Operation>>,
}

impl MigrationDefinition {
    /// Parse and validate a definition.
    ///
    /// Unknown keys anywhere in an operation are rejected, so a misspelled
    /// attribute such as `not_nul` fails instead of being ignored.
    pub fn parse(content: &str) -> MigrateResult<Self> {
        let table: toml::Table = toml::from_str(content)?;
        check_keys(&table)?;

        let definition: Self = toml::Value::Table(table).try_into()?;
        definition.validate()?;
        Ok(definition)
    }

    /// Validate every operation.
    pub fn validate(&self) -> MigrateResult<()> {
        self.up
            .iter()
            .chain(self.down.iter().flatten())
            .try_for_each(Operation::validate)
    }
}

impl FromStr for MigrationDefinition {
    type Err = MigrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[async_trait]
impl Migration for MigrationDefinition {
    async fn up(&self, schema: &Schema<'_>, _connection: &Connection) -> MigrateResult<()> {
        for operation in &self.up {
            operation.apply(schema).await?;
        }
        Ok(())
    }

    async fn down(&self, schema: &Schema<'_>, _connection: &Connection) -> MigrateResult<()> {
        for operation in self.down.iter().flatten() {
            operation.apply(schema).await?;
        }
        Ok(())
    }

    fn has_down(&self) -> bool {
        self.down.is_some()
    }
}
