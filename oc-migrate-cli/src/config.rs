//! CLI configuration handling.
//!
//! Settings are layered: built-in defaults, then `oc-migrate.toml`, then the
//! `DB_*` environment, then command-line flags.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use oc_migrate::DatabaseConfig;

use crate::error::{CliError, CliResult};

/// Default config file name (lives in the working directory)
pub const CONFIG_FILE_NAME: &str = "oc-migrate.toml";

/// Default migrations directory
pub const MIGRATIONS_DIR: &str = "migrations";

/// oc-migrate configuration file
///
/// ```toml
/// [database]
/// driver = "pgsql"
/// hostname = "localhost"
/// database = "opencart"
/// prefix = "oc_"
///
/// [migrations]
/// directory = "install/migrations"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database configuration
    pub database: DatabaseConfig,

    /// Migration configuration
    pub migrations: MigrationsConfig,
}

/// Migration configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationsConfig {
    /// Directory of definition files. Relative paths are resolved against
    /// the directory of the config file.
    pub directory: PathBuf,
}

impl Default for MigrationsConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(MIGRATIONS_DIR),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;

        if config.migrations.directory.is_relative() {
            if let Some(parent) = path.parent() {
                config.migrations.directory = parent.join(&config.migrations.directory);
            }
        }

        Ok(config)
    }

    /// Load the explicitly given file, or `oc-migrate.toml` in `cwd` if it
    /// exists, or fall back to defaults.
    pub fn discover(explicit: Option<&Path>, cwd: &Path) -> CliResult<Self> {
        match explicit {
            Some(path) if !path.exists() => Err(CliError::Config(format!(
                "config file not found: {}",
                path.display()
            ))),
            Some(path) => Self::load(path),
            None => {
                let path = cwd.join(CONFIG_FILE_NAME);
                if path.exists() {
                    Self::load(&path)
                } else {
                    let mut config = Self::default();
                    config.migrations.directory = cwd.join(MIGRATIONS_DIR);
                    Ok(config)
                }
            }
        }
    }
}
