//! DDL generation.
//!
//! [`DdlGenerator`] turns neutral table definitions into statements for one
//! dialect. It performs no I/O; [`Schema`](crate::schema::Schema) executes
//! what it produces.

use crate::dialect::Dialect;
use crate::error::{MigrateResult, MigrationError};
use crate::table::{FieldDefinition, TableOptions};

/// DDL compiler for a dialect and table prefix.
#[derive(Debug, Clone)]
pub struct DdlGenerator {
    dialect: Dialect,
    prefix: String,
}

impl DdlGenerator {
    /// Create a generator.
    pub fn new(dialect: Dialect, prefix: impl Into<String>) -> Self {
        Self {
            dialect,
            prefix: prefix.into(),
        }
    }

    /// The target dialect.
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// The table prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Prefixed, quoted table name.
    pub fn table_name(&self, name: &str) -> String {
        self.dialect
            .quote_identifier(&format!("{}{}", self.prefix, name))
    }

    /// Generate the statements for `createTable`.
    ///
    /// The first statement is always the `CREATE TABLE`. Primary-key columns
    /// are collected into one `PRIMARY KEY (...)` clause. On MySQL the
    /// secondary indexes are inline `KEY` clauses; on PostgreSQL each index
    /// becomes a trailing `CREATE INDEX` named `<table>_<index>`, and
    /// [`Schema`](crate::schema::Schema) sends the statements as one batch.
    pub fn create_table(
        &self,
        name: &str,
        fields: &[FieldDefinition],
        options: &TableOptions,
    ) -> MigrateResult<Vec<String>> {
        validate_name("table", name)?;
        if fields.is_empty() {
            return Err(MigrationError::invalid_migration(format!(
                "table '{}' has no fields",
                name
            )));
        }
        for field in fields {
            field.validate()?;
        }
        for index in &options.indexes {
            index.validate()?;
        }

        let q = |ident: &str| self.dialect.quote_identifier(ident);

        let mut clauses: Vec<String> = fields.iter().map(|f| self.field_sql(f)).collect();

        let primary_keys: Vec<String> = fields
            .iter()
            .filter(|f| f.primary)
            .map(|f| q(&f.name))
            .collect();
        if !primary_keys.is_empty() {
            clauses.push(format!("PRIMARY KEY ({})", primary_keys.join(", ")));
        }

        if self.dialect.inline_indexes() {
            for index in &options.indexes {
                let keys: Vec<String> = index.keys.iter().map(|k| q(k)).collect();
                clauses.push(format!("KEY {} ({})", q(&index.name), keys.join(", ")));
            }
        }

        let table = self.table_name(name);
        let mut statements = vec![format!(
            "CREATE TABLE {} (\n  {}\n){}",
            table,
            clauses.join(",\n  "),
            self.dialect.table_options(options)
        )];

        if !self.dialect.inline_indexes() {
            let bare_table = format!("{}{}", self.prefix, name);
            for index in &options.indexes {
                let keys: Vec<String> = index.keys.iter().map(|k| q(k)).collect();
                statements.push(format!(
                    "CREATE INDEX {} ON {} ({})",
                    q(&format!("{}_{}", bare_table, index.name)),
                    table,
                    keys.join(", ")
                ));
            }
        }

        Ok(statements)
    }

    /// Generate `DROP TABLE IF EXISTS`.
    pub fn drop_table(&self, name: &str) -> MigrateResult<String> {
        validate_name("table", name)?;
        Ok(format!("DROP TABLE IF EXISTS {}", self.table_name(name)))
    }

    /// Generate `ALTER TABLE ... ADD COLUMN`.
    ///
    /// `name` wins over whatever name `definition` carries.
    pub fn add_column(
        &self,
        table: &str,
        name: &str,
        definition: &FieldDefinition,
    ) -> MigrateResult<String> {
        validate_name("table", table)?;
        let field = FieldDefinition {
            name: name.to_string(),
            ..definition.clone()
        };
        field.validate()?;

        Ok(format!(
            "ALTER TABLE {} ADD COLUMN {}",
            self.table_name(table),
            self.field_sql(&field)
        ))
    }

    /// Generate `ALTER TABLE ... DROP COLUMN`.
    pub fn drop_column(&self, table: &str, name: &str) -> MigrateResult<String> {
        validate_name("table", table)?;
        validate_name("column", name)?;
        Ok(format!(
            "ALTER TABLE {} DROP COLUMN {}",
            self.table_name(table),
            self.dialect.quote_identifier(name)
        ))
    }

    /// Column clause: `name type [NOT NULL] [DEFAULT 'v'] [AUTO_INCREMENT]`.
    pub fn field_sql(&self, field: &FieldDefinition) -> String {
        let mut parts = vec![
            self.dialect.quote_identifier(&field.name),
            self.dialect.map_type(field),
        ];

        if field.not_null {
            parts.push("NOT NULL".to_string());
        }

        if let Some(default) = &field.default {
            parts.push(format!("DEFAULT {}", self.dialect.quote_value(default)));
        }

        if field.auto_increment {
            if let Some(suffix) = self.dialect.auto_increment_suffix() {
                parts.push(suffix.to_string());
            }
        }

        parts.join(" ")
    }
}

fn validate_name(kind: &str, name: &str) -> MigrateResult<()> {
    if name.trim().is_empty() {
        return Err(MigrationError::invalid_migration(format!(
            "{} name must not be empty",
            kind
        )));
    }
    Ok(())
}
