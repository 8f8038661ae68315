//! Where migration units come from.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{MigrateResult, MigrationError};
use crate::migration::{Migration, MigrationDefinition, MigrationUnit};

/// File extension of definition files.
pub const DEFINITION_EXTENSION: &str = "toml";

/// A set of named migrations.
#[async_trait]
pub trait MigrationSource: Send + Sync {
    /// All migration names, sorted lexically.
    async fn discover(&self) -> MigrateResult<Vec<String>>;

    /// Load one migration by name.
    ///
    /// Fails with [`MigrationError::MigrationNotFound`] for an unknown name.
    async fn load(&self, name: &str) -> MigrateResult<MigrationUnit>;
}

/// Definition files in a directory, one migration per `<name>.toml`.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    directory: PathBuf,
}

impl DirectorySource {
    /// Create a source over a directory.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// The scanned directory.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path of the definition file for `name`.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.directory
            .join(format!("{}.{}", name, DEFINITION_EXTENSION))
    }
}

#[async_trait]
impl MigrationSource for DirectorySource {
    async fn discover(&self) -> MigrateResult<Vec<String>> {
        let mut names = Vec::new();

        let mut entries = match tokio::fs::read_dir(&self.directory).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(directory = %self.directory.display(), "Migrations directory does not exist");
                return Ok(names);
            }
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(DEFINITION_EXTENSION) {
                continue;
            }
            // Follows symlinks, unlike `DirEntry::file_type`.
            if !is_file(&path).await {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }

        names.sort();
        Ok(names)
    }

    async fn load(&self, name: &str) -> MigrateResult<MigrationUnit> {
        if name.is_empty() || name.contains(['/', '\\']) {
            return Err(MigrationError::MigrationNotFound(name.to_string()));
        }

        let path = self.path_for(name);
        if !is_file(&path).await {
            return Err(MigrationError::MigrationNotFound(name.to_string()));
        }

        let content = tokio::fs::read_to_string(&path).await?;
        let definition = MigrationDefinition::parse(&content).map_err(|e| match e {
            MigrationError::InvalidMigration(msg) => {
                MigrationError::invalid_migration(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })?;

        Ok(MigrationUnit::new(name, definition))
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|metadata| metadata.is_file())
        .unwrap_or(false)
}

/// Migrations registered in code.
///
/// ```rust,ignore
/// let registry = Registry::new()
///     .register("5-0-0-0-core-001", CreateCoreTables)?
///     .register("5-0-0-0-core-002", AddCustomerActivity)?;
/// ```
#[derive(Default)]
pub struct Registry {
    migrations: BTreeMap<String, Arc<dyn Migration>>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a migration. Names must be unique.
    pub fn register(
        mut self,
        name: impl Into<String>,
        migration: impl Migration + 'static,
    ) -> MigrateResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(MigrationError::invalid_migration(
                "migration name must not be empty",
            ));
        }
        if self.migrations.contains_key(&name) {
            return Err(MigrationError::invalid_migration(format!(
                "migration '{}' is registered twice",
                name
            )));
        }
        self.migrations.insert(name, Arc::new(migration));
        Ok(self)
    }

    /// Number of registered migrations.
    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("migrations", &self.migrations.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[async_trait]
impl MigrationSource for Registry {
    async fn discover(&self) -> MigrateResult<Vec<String>> {
        Ok(self.migrations.keys().cloned().collect())
    }

    async fn load(&self, name: &str) -> MigrateResult<MigrationUnit> {
        self.migrations
            .get(name)
            .map(|migration| MigrationUnit::from_shared(name, Arc::clone(migration)))
            .ok_or_else(|| MigrationError::MigrationNotFound(name.to_string()))
    }
}
