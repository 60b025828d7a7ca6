#![deny(rust_2018_idioms)]

//! Applies written migration files against an injected [`Executor`].
//! Plays a `commands/up.rs`-style skip-already-applied loop and
//! `tracing::info!` reporting role, generalized from a single
//! imperative-migration list to the permanent/transient file partition
//! this pipeline produces.

use std::collections::HashSet;
use std::path::Path;

use migration_connector::{Executor, MigrationPlan, Result, SqlDriver};

/// What happened when [`run`] scanned the migration directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Permanent files newly applied and recorded this run, in apply order.
    pub applied_permanent: Vec<String>,
    /// Transient files executed and deleted this run, in apply order.
    pub executed_transient: Vec<String>,
}

/// Bootstraps the tracking table, loads the already-applied set, then
/// applies pending files in lexical order. Aborts immediately on the first
/// failing file — already recorded files stay recorded, so a rerun after a
/// crash only replays what's left.
#[tracing::instrument(skip(executor, driver, migrations_dir))]
pub async fn run(executor: &dyn Executor, driver: &dyn SqlDriver, migrations_dir: &Path) -> Result<RunReport> {
    executor.execute_unsafe(&driver.create_migrations_table()).await?;

    let applied_rows = executor
        .execute_unsafe(&driver.get_executed_migrations_query())
        .await?;
    let applied: HashSet<String> = applied_rows
        .iter()
        .filter_map(|row| row.get("migration").and_then(|v| v.as_str()).map(str::to_string))
        .collect();

    let files = scan_sql_files(migrations_dir)?;
    let (transient, permanent): (Vec<String>, Vec<String>) = files.into_iter().partition(|f| is_transient(f));

    let mut applied_permanent = Vec::new();
    for filename in permanent {
        if applied.contains(&filename) {
            tracing::debug!(migration_name = %filename, "already applied, skipping");
            continue;
        }

        let path = migrations_dir.join(&filename);
        let sql = std::fs::read_to_string(&path)?;
        executor.execute_unsafe(&sql).await?;
        executor
            .execute_parameterized(
                &driver.record_migration_query(),
                &[serde_json::Value::String(filename.clone())],
            )
            .await?;

        tracing::info!(migration_name = %filename, "applied permanent migration");
        applied_permanent.push(filename);
    }

    let mut executed_transient = Vec::new();
    for filename in transient {
        let path = migrations_dir.join(&filename);
        let sql = std::fs::read_to_string(&path)?;
        executor.execute_unsafe(&sql).await?;
        std::fs::remove_file(&path)?;

        tracing::info!(migration_name = %filename, "applied transient migration");
        executed_transient.push(filename);
    }

    Ok(RunReport { applied_permanent, executed_transient })
}

/// Resets the database and the on-disk migration history: drops the
/// tracking table, application tables in reverse topological order, then
/// enum types, then clears migration files. Each drop runs inside
/// [`Executor::with_fresh_connection`] so a statement that fails mid-reset
/// cannot poison a later, unrelated drop. The snapshot file itself is the
/// caller's concern (`migration-core` clears it after this returns
/// successfully) since this crate has no dependency on `snapshot-store`.
#[tracing::instrument(skip(executor, driver, plan, migrations_dir))]
pub async fn fresh(
    executor: &dyn Executor,
    driver: &dyn SqlDriver,
    plan: &MigrationPlan,
    migrations_dir: &Path,
) -> Result<()> {
    drop_on_fresh_scope(executor, driver.drop_table("migrations")).await?;

    for table in plan.tables.iter().rev() {
        drop_on_fresh_scope(executor, driver.drop_table(&table.table)).await?;
    }

    for e in &plan.enums {
        if let Some(statement) = driver.drop_enum_type(&e.name) {
            drop_on_fresh_scope(executor, statement).await?;
        }
    }

    clear_migration_files(migrations_dir)?;

    tracing::info!(table_count = plan.tables.len(), enum_count = plan.enums.len(), "reset complete");
    Ok(())
}

async fn drop_on_fresh_scope(executor: &dyn Executor, sql: String) -> Result<()> {
    executor
        .with_fresh_connection(Box::new(move || {
            Box::pin(async move {
                executor.execute_unsafe(&sql).await?;
                Ok(())
            })
        }))
        .await
}

fn clear_migration_files(migrations_dir: &Path) -> Result<()> {
    if !migrations_dir.exists() {
        return Ok(());
    }
    for filename in scan_sql_files(migrations_dir)? {
        std::fs::remove_file(migrations_dir.join(filename))?;
    }
    Ok(())
}

fn scan_sql_files(dir: &Path) -> Result<Vec<String>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut names: Vec<String> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().extension().map(|ext| ext == "sql").unwrap_or(false))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();
    names.sort();
    Ok(names)
}

/// `<ts>-<seq>-<kind>-<subject>.sql`; `alter-`/`fk-` are transient, the rest
/// permanent.
fn is_transient(filename: &str) -> bool {
    let stem = filename.strip_suffix(".sql").unwrap_or(filename);
    match stem.splitn(4, '-').nth(2) {
        Some("alter") | Some("fk") => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use migration_connector::{BoxFuture, ExecuteResult, MigrationError, Row};
    use sql_migration_connector::SqliteDriver;
    use std::sync::Mutex;
    use tempfile::tempdir;

    #[derive(Default)]
    struct MockState {
        recorded: Vec<String>,
        executed: Vec<String>,
        fresh_scope_count: usize,
        fail_trigger: Option<String>,
    }

    struct MockExecutor {
        state: Mutex<MockState>,
    }

    impl MockExecutor {
        fn new() -> Self {
            MockExecutor { state: Mutex::new(MockState::default()) }
        }
    }

    #[async_trait]
    impl Executor for MockExecutor {
        async fn execute_unsafe(&self, sql: &str) -> Result<ExecuteResult> {
            if sql.starts_with("CREATE TABLE IF NOT EXISTS \"migrations\"") {
                return Ok(Vec::new());
            }

            if sql.starts_with("SELECT \"migration\" FROM \"migrations\"") {
                let state = self.state.lock().unwrap();
                let rows = state
                    .recorded
                    .iter()
                    .map(|name| Row::new(vec![("migration".to_string(), serde_json::Value::String(name.clone()))]))
                    .collect();
                return Ok(rows);
            }

            let mut state = self.state.lock().unwrap();
            if state.fail_trigger.as_deref() == Some(sql) {
                return Err(MigrationError::executor_failure("simulated failure", sql));
            }
            state.executed.push(sql.to_string());
            Ok(Vec::new())
        }

        async fn execute_parameterized(&self, _sql: &str, params: &[serde_json::Value]) -> Result<ExecuteResult> {
            if let Some(serde_json::Value::String(name)) = params.first() {
                self.state.lock().unwrap().recorded.push(name.clone());
            }
            Ok(Vec::new())
        }

        async fn with_fresh_connection(
            &self,
            body: Box<dyn FnOnce() -> BoxFuture<'_, ()> + Send + '_>,
        ) -> Result<()> {
            self.state.lock().unwrap().fresh_scope_count += 1;
            body().await
        }
    }

    fn write_file(dir: &Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).unwrap();
    }

    #[async_std::test]
    async fn replay_after_crash_records_only_remaining_files() {
        let dir = tempdir().unwrap();
        let driver = SqliteDriver::default();

        write_file(dir.path(), "20260101000000-001-create-a.sql", "CREATE TABLE a(id integer);");
        write_file(dir.path(), "20260101000000-002-create-b.sql", "CREATE TABLE b(id integer);");
        write_file(dir.path(), "20260101000000-003-create-c.sql", "CREATE TABLE c(id integer);");

        let executor = MockExecutor::new();
        executor.state.lock().unwrap().fail_trigger =
            Some("CREATE TABLE b(id integer);".to_string());

        let first = run(&executor, &driver, dir.path()).await;
        assert!(first.is_err());
        assert_eq!(executor.state.lock().unwrap().recorded, vec!["20260101000000-001-create-a.sql"]);

        executor.state.lock().unwrap().fail_trigger = None;
        let second = run(&executor, &driver, dir.path()).await.unwrap();

        assert_eq!(second.applied_permanent, vec![
            "20260101000000-002-create-b.sql".to_string(),
            "20260101000000-003-create-c.sql".to_string(),
        ]);
        assert_eq!(executor.state.lock().unwrap().recorded.len(), 3);
    }

    #[async_std::test]
    async fn transient_files_are_always_executed_and_deleted() {
        let dir = tempdir().unwrap();
        let driver = SqliteDriver::default();
        write_file(dir.path(), "20260101000000-001-alter-users_age.sql", "ALTER TABLE users ADD COLUMN age integer;");

        let executor = MockExecutor::new();
        let report = run(&executor, &driver, dir.path()).await.unwrap();

        assert_eq!(report.executed_transient, vec!["20260101000000-001-alter-users_age.sql".to_string()]);
        assert!(executor.state.lock().unwrap().recorded.is_empty());
        assert!(!dir.path().join("20260101000000-001-alter-users_age.sql").exists());
    }

    #[async_std::test]
    async fn idempotent_rerun_applies_nothing_new() {
        let dir = tempdir().unwrap();
        let driver = SqliteDriver::default();
        write_file(dir.path(), "20260101000000-001-create-a.sql", "CREATE TABLE a(id integer);");

        let executor = MockExecutor::new();
        run(&executor, &driver, dir.path()).await.unwrap();
        let second = run(&executor, &driver, dir.path()).await.unwrap();

        assert!(second.applied_permanent.is_empty());
        assert_eq!(executor.state.lock().unwrap().recorded.len(), 1);
    }

    #[async_std::test]
    async fn reset_drops_dependents_before_targets_on_fresh_scopes() {
        use migration_connector::{ColumnSpec, AttributeType, ForeignKeySpec, FkAction, TableSpec};

        let dir = tempdir().unwrap();
        let driver = SqliteDriver::default();

        let mut plan = MigrationPlan::new(migration_connector::Dialect::Sqlite);
        plan.tables.push(TableSpec {
            table: "users".to_string(),
            primary_key: "id".to_string(),
            columns: vec![ColumnSpec { name: "id".into(), r#type: AttributeType::Bigint, nullable: false, default: None, unique: false }],
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
        });
        plan.tables.push(TableSpec {
            table: "posts".to_string(),
            primary_key: "id".to_string(),
            columns: vec![ColumnSpec { name: "id".into(), r#type: AttributeType::Bigint, nullable: false, default: None, unique: false }],
            indexes: Vec::new(),
            foreign_keys: vec![ForeignKeySpec {
                column: "user_id".to_string(),
                ref_table: "users".to_string(),
                ref_column: "id".to_string(),
                on_delete: FkAction::Restrict,
                on_update: FkAction::Restrict,
            }],
        });

        let executor = MockExecutor::new();
        fresh(&executor, &driver, &plan, dir.path()).await.unwrap();

        let state = executor.state.lock().unwrap();
        let posts_index = state.executed.iter().position(|s| s.contains("\"posts\"")).unwrap();
        let users_index = state.executed.iter().position(|s| s.contains("\"users\"")).unwrap();
        assert!(posts_index < users_index, "posts must drop before users");
        assert_eq!(state.fresh_scope_count, 3, "migrations table + 2 app tables, each its own fresh scope");
    }
}
