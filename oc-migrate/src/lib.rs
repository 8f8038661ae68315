//! # oc-migrate
//!
//! Schema migration engine for OpenCart databases.
//!
//! This crate provides:
//! - A [`Connection`] built from the `DB_*` configuration bundle, for MySQL
//!   and PostgreSQL
//! - A dialect-aware Schema Builder ([`Schema`]) that compiles neutral table,
//!   column and index definitions into DDL
//! - A [`MigrationRunner`] that applies pending migrations in name order,
//!   records them in a ledger table, and rolls individual migrations back
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────────┐     ┌──────────────┐
//! │ MigrationSource  │────▶│ MigrationRunner  │────▶│ Ledger       │
//! │ (dir / registry) │     └──────────────────┘     │ <prefix>     │
//! └──────────────────┘              │               │   migration  │
//!                                   ▼               └──────────────┘
//!                          ┌──────────────────┐            │
//!                          │ Migration::up    │            │
//!                          │ Migration::down  │            │
//!                          └──────────────────┘            │
//!                                   │                      │
//!                                   ▼                      ▼
//!                          ┌──────────────────┐     ┌──────────────┐
//!                          │ Schema (DDL)     │────▶│ Connection   │
//!                          └──────────────────┘     └──────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use oc_migrate::{Connection, DatabaseConfig, DirectorySource, MigrationRunner};
//!
//! async fn run() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DatabaseConfig::from_lookup(|key| std::env::var(key).ok())?;
//!     let connection = Connection::open(&config).await?;
//!
//!     let runner = MigrationRunner::new(&connection, DirectorySource::new("./migrations"));
//!     let report = runner.migrate().await?;
//!     println!("{}", report.summary());
//!
//!     runner.rollback("5-0-0-0-core-002_create_order_tables").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Migrations in code
//!
//! ```rust,ignore
//! use async_trait::async_trait;
//! use oc_migrate::{Connection, FieldDefinition, MigrateResult, Migration, Registry, Schema, TableOptions};
//!
//! struct CreateSetting;
//!
//! #[async_trait]
//! impl Migration for CreateSetting {
//!     async fn up(&self, schema: &Schema<'_>, _connection: &Connection) -> MigrateResult<()> {
//!         let fields = [
//!             FieldDefinition::new("setting_id", "int(11)").not_null().auto_increment().primary(),
//!             FieldDefinition::new("key", "varchar(128)").not_null(),
//!             FieldDefinition::new("value", "text").not_null(),
//!         ];
//!         schema.create_table("setting", &fields, &TableOptions::default()).await
//!     }
//!
//!     async fn down(&self, schema: &Schema<'_>, _connection: &Connection) -> MigrateResult<()> {
//!         schema.drop_table("setting").await
//!     }
//! }
//!
//! let registry = Registry::new().register("5-0-0-0-core-001", CreateSetting)?;
//! ```

pub mod config;
pub mod connection;
pub mod dialect;
pub mod driver;
pub mod error;
pub mod ledger;
pub mod migration;
pub mod runner;
pub mod schema;
pub mod source;
pub mod sql;
pub mod table;

pub use config::DatabaseConfig;
pub use connection::Connection;
pub use dialect::Dialect;
pub use driver::{Executor, TextRow};
pub use error::{MigrateResult, MigrationError};
pub use ledger::{Ledger, MigrationRecord};
pub use migration::{Migration, MigrationDefinition, MigrationUnit, Operation};
pub use runner::{
    MigrateReport, MigrationRunner, MigrationState, MigrationStatus, RollbackReport, StatusEntry,
};
pub use schema::Schema;
pub use source::{DirectorySource, MigrationSource, Registry};
pub use sql::DdlGenerator;
pub use table::{FieldDefinition, IndexDefinition, TableOptions};
