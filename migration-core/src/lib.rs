#![deny(rust_2018_idioms)]

//! Wires the pipeline end to end: `generate` (build → load snapshot → diff
//! → write files), `run` (bootstrap → apply pending → save snapshot),
//! `fresh` (reset). Plays the role a migration engine's core crate plays
//! owning `MigrationEngine<C, D>` and dispatching commands against an
//! injected connector.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use migration_connector::{Dialect, Executor, ModelDefinition, Result};
use migration_executor::RunReport;
use migration_writer::WrittenFile;

fn migrations_dir(workspace: &Path) -> PathBuf {
    workspace.join("database").join("migrations")
}

/// Builds the current plan from `models`, diffs it against the persisted
/// snapshot for `dialect`, writes the resulting operations as `.sql` files,
/// and saves the new plan as the baseline for the next `generate` call.
///
/// `populated_tables` names tables a caller knows already hold rows, so the
/// differ can refuse an unsafe non-null column addition with
/// `UnresolvableDiff`; callers without a live connection to introspect
/// simply pass an empty set. `now` is the writer's injected clock.
#[tracing::instrument(skip(models, populated_tables, workspace, now))]
pub fn generate(
    models: &BTreeMap<String, ModelDefinition>,
    dialect: Dialect,
    populated_tables: &HashSet<String>,
    workspace: &Path,
    now: DateTime<Utc>,
) -> Result<Vec<WrittenFile>> {
    let current = plan_builder::build(models, dialect)?;
    let previous = snapshot_store::load(workspace, dialect)?;
    let ops = plan_differ::diff(previous.as_ref(), &current, populated_tables)?;

    let driver = sql_migration_connector::driver_for(dialect);
    let written = migration_writer::write(&ops, &current, driver.as_ref(), &migrations_dir(workspace), now)?;

    snapshot_store::save(workspace, dialect, &current)?;

    tracing::info!(op_count = ops.len(), file_count = written.len(), "generated migration files");
    Ok(written)
}

/// Bootstraps the tracking table if needed and applies every pending file
/// in `<workspace>/database/migrations` against `executor`, then leaves the
/// snapshot untouched — `run` only ever replays what `generate` already
/// decided.
#[tracing::instrument(skip(executor, workspace))]
pub async fn run(executor: &dyn Executor, dialect: Dialect, workspace: &Path) -> Result<RunReport> {
    let driver = sql_migration_connector::driver_for(dialect);
    migration_executor::run(executor, driver.as_ref(), &migrations_dir(workspace)).await
}

/// Resets the database and the workspace's migration history for
/// `dialect`: drops every table the last-saved plan knows about (reverse
/// topological order) plus the tracking table and enum types, clears
/// migration files, then clears the snapshot so the next `generate` starts
/// from an empty plan.
#[tracing::instrument(skip(executor, workspace))]
pub async fn fresh(executor: &dyn Executor, dialect: Dialect, workspace: &Path) -> Result<()> {
    let driver = sql_migration_connector::driver_for(dialect);
    let plan = snapshot_store::load(workspace, dialect)?
        .unwrap_or_else(|| migration_connector::MigrationPlan::new(dialect));

    migration_executor::fresh(executor, driver.as_ref(), &plan, &migrations_dir(workspace)).await?;
    snapshot_store::clear(workspace, dialect)?;

    tracing::info!("workspace reset to empty state");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use migration_connector::{BoxFuture, ExecuteResult, ModelDefinition, Row, Trait};
    use std::sync::Mutex;
    use tempfile::tempdir;

    #[derive(Default)]
    struct MockState {
        recorded: Vec<String>,
    }

    struct MockExecutor {
        state: Mutex<MockState>,
    }

    #[async_trait]
    impl Executor for MockExecutor {
        async fn execute_unsafe(&self, sql: &str) -> Result<ExecuteResult> {
            if sql.contains("SELECT") && sql.contains("migrations") {
                let state = self.state.lock().unwrap();
                return Ok(state
                    .recorded
                    .iter()
                    .map(|n| Row::new(vec![("migration".to_string(), serde_json::Value::String(n.clone()))]))
                    .collect());
            }
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
            body().await
        }
    }

    fn fixed_now() -> DateTime<Utc> {
        use chrono::TimeZone;
        Utc.ymd(2026, 1, 2).and_hms(3, 4, 5)
    }

    fn user_model() -> ModelDefinition {
        ModelDefinition {
            name: "User".to_string(),
            table: None,
            primary_key: None,
            traits: vec![Trait::UseUuid],
            attributes: Vec::new(),
            relations: BTreeMap::new(),
        }
    }

    #[test]
    fn generate_then_regenerate_produces_empty_diff() {
        let dir = tempdir().unwrap();
        let mut models = BTreeMap::new();
        models.insert("User".to_string(), user_model());

        let first = generate(&models, Dialect::Postgres, &HashSet::new(), dir.path(), fixed_now()).unwrap();
        assert!(!first.is_empty());

        let second = generate(&models, Dialect::Postgres, &HashSet::new(), dir.path(), fixed_now()).unwrap();
        assert!(second.is_empty(), "identical model set should produce no new operations");
    }

    #[async_std::test]
    async fn run_applies_generated_files_end_to_end() {
        let dir = tempdir().unwrap();
        let mut models = BTreeMap::new();
        models.insert("User".to_string(), user_model());

        generate(&models, Dialect::Postgres, &HashSet::new(), dir.path(), fixed_now()).unwrap();

        let executor = MockExecutor { state: Mutex::new(MockState::default()) };
        let report = run(&executor, Dialect::Postgres, dir.path()).await.unwrap();
        assert!(!report.applied_permanent.is_empty());

        let second = run(&executor, Dialect::Postgres, dir.path()).await.unwrap();
        assert!(second.applied_permanent.is_empty(), "rerun should apply nothing new");
    }

    #[async_std::test]
    async fn fresh_clears_snapshot_so_next_generate_starts_over() {
        let dir = tempdir().unwrap();
        let mut models = BTreeMap::new();
        models.insert("User".to_string(), user_model());

        generate(&models, Dialect::Postgres, &HashSet::new(), dir.path(), fixed_now()).unwrap();

        let executor = MockExecutor { state: Mutex::new(MockState::default()) };
        fresh(&executor, Dialect::Postgres, dir.path()).await.unwrap();

        let after_reset = generate(&models, Dialect::Postgres, &HashSet::new(), dir.path(), fixed_now()).unwrap();
        assert!(!after_reset.is_empty(), "a cleared snapshot means the next generate is a full create again");
    }
}
