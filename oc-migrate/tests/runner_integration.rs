//! Integration tests for the migration runner.
//!
//! These run against an in-memory executor that keeps the ledger table as a
//! list of rows and can be told to reject statements touching a given table.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use oc_migrate::{
    Connection, Dialect, DirectorySource, Executor, FieldDefinition, MigrateResult,
    Migration, MigrationError, MigrationRunner, MigrationState, Registry, Schema,
    TableOptions, TextRow,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

#[derive(Default)]
struct DbState {
    ledger_created: bool,
    ledger: Vec<String>,
    statements: Vec<String>,
    fail_on: Option<String>,
}

#[derive(Clone)]
struct FakeDb {
    dialect: Dialect,
    state: Arc<Mutex<DbState>>,
}

impl FakeDb {
    fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            state: Arc::new(Mutex::new(DbState::default())),
        }
    }

    fn connection(&self) -> Connection {
        Connection::with_executor(Box::new(self.clone()), "oc_")
    }

    fn ledger(&self) -> Vec<String> {
        self.state.lock().unwrap().ledger.clone()
    }

    fn seed(&self, name: &str) {
        self.state.lock().unwrap().ledger.push(name.to_string());
    }

    fn fail_on(&self, marker: Option<&str>) {
        self.state.lock().unwrap().fail_on = marker.map(str::to_string);
    }

    fn statements(&self) -> Vec<String> {
        self.state.lock().unwrap().statements.clone()
    }
}

#[async_trait]
impl Executor for FakeDb {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn execute(&self, sql: &str) -> MigrateResult<u64> {
        let mut state = self.state.lock().unwrap();
        state.statements.push(sql.to_string());

        if let Some(marker) = &state.fail_on {
            if sql.contains(marker.as_str()) {
                return Err(MigrationError::database(format!("rejected: {}", marker)));
            }
        }
        if sql.starts_with("CREATE TABLE IF NOT EXISTS") && sql.contains("oc_migration") {
            state.ledger_created = true;
        }
        Ok(0)
    }

    async fn execute_with(&self, sql: &str, params: &[&str]) -> MigrateResult<u64> {
        let mut state = self.state.lock().unwrap();
        state.statements.push(sql.to_string());
        assert!(state.ledger_created, "ledger used before it was created");

        let name = params[0].to_string();
        if sql.starts_with("INSERT INTO") {
            if state.ledger.contains(&name) {
                return Err(MigrationError::database(format!("Duplicate entry '{}'", name)));
            }
            state.ledger.push(name);
            Ok(1)
        } else if sql.starts_with("DELETE FROM") {
            let before = state.ledger.len();
            state.ledger.retain(|n| n != &name);
            Ok((before - state.ledger.len()) as u64)
        } else {
            Ok(0)
        }
    }

    async fn query_text(&self, sql: &str) -> MigrateResult<Vec<TextRow>> {
        let state = self.state.lock().unwrap();
        assert!(state.ledger_created, "ledger read before it was created");

        let with_timestamp = sql.contains("date_excluded");
        Ok(state
            .ledger
            .iter()
            .map(|name| {
                let mut row = vec![Some(name.clone())];
                if with_timestamp {
                    row.push(Some("2026-10-16 09:00:00".to_string()));
                }
                row
            })
            .collect())
    }
}

/// Creates a table named after the migration and logs each call.
struct TableMigration {
    table: String,
    calls: Arc<Mutex<Vec<String>>>,
    with_down: bool,
}

#[async_trait]
impl Migration for TableMigration {
    async fn up(&self, schema: &Schema<'_>, _connection: &Connection) -> MigrateResult<()> {
        self.calls.lock().unwrap().push(format!("up:{}", self.table));
        let fields = [FieldDefinition::new("id", "int(11)")
            .not_null()
            .auto_increment()
            .primary()];
        schema
            .create_table(&self.table, &fields, &TableOptions::default())
            .await
    }

    async fn down(&self, schema: &Schema<'_>, _connection: &Connection) -> MigrateResult<()> {
        self.calls.lock().unwrap().push(format!("down:{}", self.table));
        schema.drop_table(&self.table).await
    }

    fn has_down(&self) -> bool {
        self.with_down
    }
}

fn registry(names: &[&str], calls: &Arc<Mutex<Vec<String>>>) -> Registry {
    names.iter().fold(Registry::new(), |registry, name| {
        registry
            .register(
                *name,
                TableMigration {
                    table: name.to_string(),
                    calls: Arc::clone(calls),
                    with_down: true,
                },
            )
            .unwrap()
    })
}

fn calls() -> Arc<Mutex<Vec<String>>> {
    Arc::new(Mutex::new(Vec::new()))
}

fn taken(calls: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
    std::mem::take(&mut *calls.lock().unwrap())
}

#[tokio::test]
async fn test_migrate_twice_is_idempotent() {
    let db = FakeDb::new(Dialect::MySql);
    let conn = db.connection();
    let calls = calls();
    let runner = MigrationRunner::new(&conn, registry(&["a_001", "a_002"], &calls));

    let first = runner.migrate().await.unwrap();
    assert_eq!(first.applied, vec!["a_001", "a_002"]);
    assert_eq!(db.ledger(), vec!["a_001", "a_002"]);
    taken(&calls);

    let second = runner.migrate().await.unwrap();
    assert!(second.applied.is_empty());
    assert_eq!(second.skipped, vec!["a_001", "a_002"]);
    assert_eq!(second.summary(), "No migrations applied");
    assert!(taken(&calls).is_empty());
    assert_eq!(db.ledger(), vec!["a_001", "a_002"]);
}

#[tokio::test]
async fn test_migrate_applies_in_lexical_order() {
    let db = FakeDb::new(Dialect::PostgreSql);
    let conn = db.connection();
    let calls = calls();
    let runner = MigrationRunner::new(&conn, registry(&["b_001", "a_002", "a_001"], &calls));

    runner.migrate().await.unwrap();

    assert_eq!(taken(&calls), vec!["up:a_001", "up:a_002", "up:b_001"]);
    assert_eq!(db.ledger(), vec!["a_001", "a_002", "b_001"]);
}

#[tokio::test]
async fn test_directory_source_order_and_ledger() {
    let dir = TempDir::new().unwrap();
    for name in ["b_001", "a_002", "a_001"] {
        std::fs::write(
            dir.path().join(format!("{}.toml", name)),
            format!(
                "[[up]]\nop = \"create_table\"\nname = \"{name}\"\nfields = [{{ name = \"id\", type = \"int(11)\", primary = true }}]\n\n[[down]]\nop = \"drop_table\"\nname = \"{name}\"\n"
            ),
        )
        .unwrap();
    }

    let db = FakeDb::new(Dialect::MySql);
    let conn = db.connection();
    let runner = MigrationRunner::new(&conn, DirectorySource::new(dir.path()));

    let report = runner.migrate().await.unwrap();
    assert_eq!(report.applied, vec!["a_001", "a_002", "b_001"]);

    let creates: Vec<String> = db
        .statements()
        .into_iter()
        .filter(|s| s.starts_with("CREATE TABLE `oc_"))
        .map(|s| s.lines().next().unwrap_or_default().to_string())
        .collect();
    assert_eq!(
        creates,
        vec![
            "CREATE TABLE `oc_a_001` (",
            "CREATE TABLE `oc_a_002` (",
            "CREATE TABLE `oc_b_001` (",
        ]
    );
}

#[tokio::test]
async fn test_applied_migration_is_never_rerun() {
    let db = FakeDb::new(Dialect::MySql);
    db.seed("a_001");
    let conn = db.connection();
    let calls = calls();
    let runner = MigrationRunner::new(&conn, registry(&["a_001", "a_002"], &calls));

    let report = runner.migrate().await.unwrap();

    assert_eq!(report.skipped, vec!["a_001"]);
    assert_eq!(report.applied, vec!["a_002"]);
    assert_eq!(taken(&calls), vec!["up:a_002"]);
}

#[tokio::test]
async fn test_rollback_then_migrate_reapplies() {
    let db = FakeDb::new(Dialect::PostgreSql);
    let conn = db.connection();
    let calls = calls();
    let runner = MigrationRunner::new(&conn, registry(&["a_001", "a_002"], &calls));

    runner.migrate().await.unwrap();
    taken(&calls);

    let rollback = runner.rollback("a_001").await.unwrap();
    assert!(rollback.down_executed);
    assert!(rollback.ledger_entry_removed);
    assert_eq!(db.ledger(), vec!["a_002"]);
    assert_eq!(taken(&calls), vec!["down:a_001"]);
    assert!(
        db.statements()
            .contains(&"DROP TABLE IF EXISTS \"oc_a_001\"".to_string())
    );

    let report = runner.migrate().await.unwrap();
    assert_eq!(report.applied, vec!["a_001"]);
    assert_eq!(taken(&calls), vec!["up:a_001"]);
}

#[tokio::test]
async fn test_partial_failure_is_contained() {
    let db = FakeDb::new(Dialect::MySql);
    db.fail_on(Some("`oc_a_002`"));
    let conn = db.connection();
    let calls = calls();
    let runner = MigrationRunner::new(&conn, registry(&["a_001", "a_002", "a_003"], &calls));

    let err = runner.migrate().await.unwrap_err();
    match err {
        MigrationError::Ddl { statement, message } => {
            assert!(statement.starts_with("CREATE TABLE `oc_a_002`"));
            assert!(message.contains("rejected"));
        }
        other => panic!("expected Ddl error, got {other:?}"),
    }
    assert_eq!(db.ledger(), vec!["a_001"]);
    assert_eq!(taken(&calls), vec!["up:a_001", "up:a_002"]);

    db.fail_on(None);
    let report = runner.migrate().await.unwrap();
    assert_eq!(report.applied, vec!["a_002", "a_003"]);
    assert_eq!(taken(&calls), vec!["up:a_002", "up:a_003"]);
    assert_eq!(db.ledger(), vec!["a_001", "a_002", "a_003"]);
}

#[tokio::test]
async fn test_rollback_without_down_still_removes_entry() {
    let db = FakeDb::new(Dialect::MySql);
    let conn = db.connection();
    let calls = calls();
    let source = Registry::new()
        .register(
            "a_001",
            TableMigration {
                table: "a_001".to_string(),
                calls: Arc::clone(&calls),
                with_down: false,
            },
        )
        .unwrap();
    let runner = MigrationRunner::new(&conn, source);

    runner.migrate().await.unwrap();
    taken(&calls);

    let report = runner.rollback("a_001").await.unwrap();
    assert!(!report.down_executed);
    assert!(report.ledger_entry_removed);
    assert!(taken(&calls).is_empty());
    assert!(db.ledger().is_empty());
}

#[tokio::test]
async fn test_rollback_down_failure_keeps_ledger_entry() {
    let db = FakeDb::new(Dialect::MySql);
    let conn = db.connection();
    let calls = calls();
    let runner = MigrationRunner::new(&conn, registry(&["a_001"], &calls));

    runner.migrate().await.unwrap();
    taken(&calls);

    db.fail_on(Some("DROP TABLE"));
    let err = runner.rollback("a_001").await.unwrap_err();

    match err {
        MigrationError::Ddl { statement, .. } => {
            assert_eq!(statement, "DROP TABLE IF EXISTS `oc_a_001`");
        }
        other => panic!("expected Ddl error, got {other:?}"),
    }
    assert_eq!(taken(&calls), vec!["down:a_001"]);
    assert_eq!(db.ledger(), vec!["a_001"]);
    assert!(!db.statements().iter().any(|s| s.starts_with("DELETE FROM")));
}

#[tokio::test]
async fn test_broken_definition_stops_the_sweep() {
    let dir = TempDir::new().unwrap();
    for name in ["a_001", "a_003"] {
        std::fs::write(
            dir.path().join(format!("{}.toml", name)),
            format!(
                "[[up]]\nop = \"create_table\"\nname = \"{name}\"\nfields = [{{ name = \"id\", type = \"int(11)\" }}]\n"
            ),
        )
        .unwrap();
    }
    std::fs::write(dir.path().join("a_002.toml"), "[[up]]\nop = \"create_table\"\nname = \n").unwrap();

    let db = FakeDb::new(Dialect::PostgreSql);
    let conn = db.connection();
    let runner = MigrationRunner::new(&conn, DirectorySource::new(dir.path()));

    let err = runner.migrate().await.unwrap_err();

    match err {
        MigrationError::InvalidMigration(msg) => assert!(msg.contains("a_002.toml")),
        other => panic!("expected InvalidMigration, got {other:?}"),
    }
    assert_eq!(db.ledger(), vec!["a_001"]);
    assert!(!db.statements().iter().any(|s| s.contains("oc_a_003")));
}

#[tokio::test]
async fn test_rollback_of_unapplied_migration_is_tolerated() {
    let db = FakeDb::new(Dialect::MySql);
    let conn = db.connection();
    let calls = calls();
    let runner = MigrationRunner::new(&conn, registry(&["a_001"], &calls));

    let report = runner.rollback("a_001").await.unwrap();
    assert!(report.down_executed);
    assert!(!report.ledger_entry_removed);
    assert_eq!(taken(&calls), vec!["down:a_001"]);
}

#[tokio::test]
async fn test_rollback_unknown_name_fails() {
    let db = FakeDb::new(Dialect::MySql);
    let conn = db.connection();
    let calls = calls();
    let runner = MigrationRunner::new(&conn, registry(&["a_001"], &calls));

    runner.migrate().await.unwrap();

    let err = runner.rollback("z_999").await.unwrap_err();
    assert!(matches!(err, MigrationError::MigrationNotFound(ref n) if n == "z_999"));
    assert_eq!(db.ledger(), vec!["a_001"]);
}

#[tokio::test]
async fn test_status_reports_applied_pending_and_orphaned() {
    let db = FakeDb::new(Dialect::PostgreSql);
    db.seed("a_001");
    db.seed("old_001");
    let conn = db.connection();
    let calls = calls();
    let runner = MigrationRunner::new(&conn, registry(&["a_001", "a_002"], &calls));

    let status = runner.status().await.unwrap();

    assert_eq!(status.entries.len(), 2);
    assert_eq!(status.entries[0].name, "a_001");
    match status.entries[0].state {
        MigrationState::Applied { applied_at } => assert!(applied_at.is_some()),
        MigrationState::Pending => panic!("a_001 should be applied"),
    }
    assert_eq!(status.entries[1].state, MigrationState::Pending);
    assert_eq!(status.pending(), vec!["a_002"]);
    assert_eq!(status.orphaned.len(), 1);
    assert_eq!(status.orphaned[0].name, "old_001");

    assert_eq!(runner.applied().await.unwrap(), vec!["a_001", "old_001"]);
    assert_eq!(runner.discover().await.unwrap(), vec!["a_001", "a_002"]);
}

#[tokio::test]
async fn test_every_command_creates_ledger_first() {
    let db = FakeDb::new(Dialect::MySql);
    let conn = db.connection();
    let calls = calls();
    let runner = MigrationRunner::new(&conn, registry(&[], &calls));

    runner.status().await.unwrap();

    let statements = db.statements();
    assert!(statements[0].starts_with("CREATE TABLE IF NOT EXISTS `oc_migration`"));
}

#[tokio::test]
async fn test_demo_migrations_apply_on_both_dialects() {
    let demos = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../demos/migrations");

    for dialect in [Dialect::MySql, Dialect::PostgreSql] {
        let db = FakeDb::new(dialect);
        let conn = db.connection();
        let runner = MigrationRunner::new(&conn, DirectorySource::new(&demos));

        let report = runner.migrate().await.unwrap();
        assert_eq!(
            report.applied,
            vec![
                "5-0-0-0-core-001_create_core_tables",
                "5-0-0-0-core-002_create_order_tables",
                "5-0-1-0-core-001_add_order_comment",
            ]
        );

        let rollback = runner
            .rollback("5-0-1-0-core-001_add_order_comment")
            .await
            .unwrap();
        assert!(!rollback.down_executed);
        assert!(rollback.ledger_entry_removed);
    }
}
