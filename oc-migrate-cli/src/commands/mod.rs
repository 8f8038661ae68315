//! CLI command implementations.

pub mod migrate;
pub mod rollback;
pub mod status;

use std::path::{Path, PathBuf};

use oc_migrate::{Connection, DatabaseConfig, DirectorySource};

use crate::cli::GlobalArgs;
use crate::config::Config;
use crate::error::CliResult;
use crate::output;

/// Settings every command runs with, after layering file, environment and
/// flags.
#[derive(Debug, Clone)]
pub struct Context {
    /// Connection settings
    pub database: DatabaseConfig,
    /// Directory of migration definition files
    pub migrations_dir: PathBuf,
}

impl Context {
    /// Resolve settings relative to the current directory.
    pub fn resolve(args: &GlobalArgs) -> CliResult<Self> {
        let cwd = std::env::current_dir()?;
        Self::resolve_in(args, &cwd)
    }

    /// Resolve settings relative to `cwd`.
    pub fn resolve_in(args: &GlobalArgs, cwd: &Path) -> CliResult<Self> {
        let config = Config::discover(args.config.as_deref(), cwd)?;

        let mut database = config.database;
        args.database.apply(&mut database);

        let migrations_dir = match &args.migrations {
            Some(dir) => cwd.join(dir),
            None => config.migrations.directory,
        };

        Ok(Self {
            database,
            migrations_dir,
        })
    }

    /// Open the database connection.
    pub async fn connect(&self) -> CliResult<Connection> {
        Ok(Connection::open(&self.database).await?)
    }

    /// The migration source.
    pub fn source(&self) -> DirectorySource {
        DirectorySource::new(&self.migrations_dir)
    }

    /// Print where the command is pointed at.
    pub fn print_target(&self) {
        output::kv("Driver", &self.database.driver);
        output::kv(
            "Database",
            &format!("{}@{}", self.database.database, self.database.hostname),
        );
        output::kv("Prefix", &self.database.prefix);
        output::kv("Migrations", &self.migrations_dir.display().to_string());
        output::newline();
    }
}
