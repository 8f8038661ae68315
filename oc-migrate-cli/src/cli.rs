//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use oc_migrate::DatabaseConfig;
use oc_migrate::config::DEFAULT_PREFIX;

/// oc-migrate - OpenCart database migrations
#[derive(Parser, Debug)]
#[command(name = "oc-migrate")]
#[command(version)]
#[command(about = "oc-migrate - OpenCart database migrations for MySQL and PostgreSQL", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Options shared by every command
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Apply all pending migrations
    Migrate,

    /// Roll back one migration by name
    Rollback(RollbackArgs),

    /// Show applied and pending migrations
    Status,
}

// =============================================================================
// Global Options
// =============================================================================

/// Options accepted before or after the subcommand
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Path to the configuration file (defaults to ./oc-migrate.toml if present)
    #[arg(short, long, global = true, env = "OC_MIGRATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory containing migration definition files
    #[arg(short, long, global = true)]
    pub migrations: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Database connection settings
    #[command(flatten)]
    pub database: DatabaseArgs,
}

/// Database settings, each also read from its `DB_*` variable
#[derive(Args, Debug, Clone, Default)]
#[command(next_help_heading = "Database")]
pub struct DatabaseArgs {
    /// Database driver (mysqli or pgsql)
    #[arg(long, global = true, env = "DB_DRIVER")]
    pub driver: Option<String>,

    /// Database host
    #[arg(long, global = true, env = "DB_HOSTNAME")]
    pub hostname: Option<String>,

    /// Database user
    #[arg(long, global = true, env = "DB_USERNAME")]
    pub username: Option<String>,

    /// Database password
    #[arg(long, global = true, env = "DB_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Database name
    #[arg(long, global = true, env = "DB_DATABASE")]
    pub database: Option<String>,

    /// Database port
    #[arg(long, global = true, env = "DB_PORT")]
    pub port: Option<u16>,

    /// Table prefix
    #[arg(long, global = true, env = "DB_PREFIX")]
    pub prefix: Option<String>,
}

impl DatabaseArgs {
    /// Overlay the values that were given onto `config`. An empty prefix
    /// restores the default.
    pub fn apply(&self, config: &mut DatabaseConfig) {
        if let Some(driver) = &self.driver {
            config.driver = driver.clone();
        }
        if let Some(hostname) = &self.hostname {
            config.hostname = hostname.clone();
        }
        if let Some(username) = &self.username {
            config.username = username.clone();
        }
        if let Some(password) = &self.password {
            config.password = password.clone();
        }
        if let Some(database) = &self.database {
            config.database = database.clone();
        }
        if let Some(port) = self.port {
            config.port = Some(port);
        }
        if let Some(prefix) = &self.prefix {
            config.prefix = if prefix.is_empty() {
                DEFAULT_PREFIX.to_string()
            } else {
                prefix.clone()
            };
        }
    }
}

// =============================================================================
// Rollback Command
// =============================================================================

/// Arguments for the `rollback` command
#[derive(Args, Debug)]
pub struct RollbackArgs {
    /// Migration name (the definition file name without `.toml`)
    pub name: String,
}
