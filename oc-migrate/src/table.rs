//! Dialect-neutral table, column and index definitions.
//!
//! These are the inputs of the Schema Builder. Column types are neutral tokens
//! such as `int(11)`, `varchar(255)` or `tinyint(1)`; the [`Dialect`] decides
//! what each token becomes in generated DDL.
//!
//! [`Dialect`]: crate::dialect::Dialect

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{MigrateResult, MigrationError};

/// A single column of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Column name (unprefixed, unquoted).
    pub name: String,
    /// Neutral type token.
    #[serde(rename = "type")]
    pub field_type: String,
    /// Emit `NOT NULL`.
    #[serde(default)]
    pub not_null: bool,
    /// Auto-generated integer key.
    #[serde(default)]
    pub auto_increment: bool,
    /// Default value, always emitted as a quoted string literal.
    #[serde(default, deserialize_with = "deserialize_default")]
    pub default: Option<String>,
    /// Part of the table's primary key.
    #[serde(default)]
    pub primary: bool,
}

impl FieldDefinition {
    /// Create a nullable column of the given neutral type.
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            not_null: false,
            auto_increment: false,
            default: None,
            primary: false,
        }
    }

    /// Mark the column `NOT NULL`.
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Mark the column auto-incrementing.
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Set the default value.
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Add the column to the primary key.
    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    /// Check the structural invariants of the definition.
    pub fn validate(&self) -> MigrateResult<()> {
        if self.name.trim().is_empty() {
            return Err(MigrationError::invalid_migration(
                "field name must not be empty",
            ));
        }
        if self.field_type.trim().is_empty() {
            return Err(MigrationError::invalid_migration(format!(
                "field '{}' has an empty type",
                self.name
            )));
        }
        Ok(())
    }
}

/// A named secondary index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDefinition {
    /// Index name.
    pub name: String,
    /// Indexed columns, in order.
    pub keys: Vec<String>,
}

impl IndexDefinition {
    /// Create an index over the given columns.
    pub fn new<I, S>(name: impl Into<String>, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Check the structural invariants of the definition.
    pub fn validate(&self) -> MigrateResult<()> {
        if self.name.trim().is_empty() {
            return Err(MigrationError::invalid_migration(
                "index name must not be empty",
            ));
        }
        if self.keys.is_empty() {
            return Err(MigrationError::invalid_migration(format!(
                "index '{}' has no keys",
                self.name
            )));
        }
        Ok(())
    }
}

/// Table-level options for `CREATE TABLE`.
///
/// `engine`, `charset` and `collate` only affect MySQL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableOptions {
    /// Storage engine.
    #[serde(default)]
    pub engine: Option<String>,
    /// Character set.
    #[serde(default)]
    pub charset: Option<String>,
    /// Collation.
    #[serde(default)]
    pub collate: Option<String>,
    /// Secondary indexes, emitted in order.
    #[serde(default)]
    pub indexes: Vec<IndexDefinition>,
}

impl TableOptions {
    /// Create empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the storage engine.
    pub fn engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = Some(engine.into());
        self
    }

    /// Set the character set.
    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    /// Set the collation.
    pub fn collate(mut self, collate: impl Into<String>) -> Self {
        self.collate = Some(collate.into());
        self
    }

    /// Append a secondary index.
    pub fn index(mut self, index: IndexDefinition) -> Self {
        self.indexes.push(index);
        self
    }
}

/// Accept `default = "0"`, `default = 0`, `default = 0.5` and
/// `default = true` alike; the value is always rendered as a string literal.
fn deserialize_default<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawDefault {
        Text(String),
        Integer(i64),
        Float(f64),
        Bool(bool),
    }

    let raw = Option::<RawDefault>::deserialize(deserializer)?;
    Ok(raw.map(|value| match value {
        RawDefault::Text(s) => s,
        RawDefault::Integer(i) => i.to_string(),
        RawDefault::Float(f) => f.to_string(),
        RawDefault::Bool(b) => if b { "1" } else { "0" }.to_string(),
    }))
}
