use crate::error::MigrationError;
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;

/// A boxed, `Send` future, used so `with_fresh_connection` stays object-safe
/// (the executor is typically held as `Arc<dyn Executor>`).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, MigrationError>> + Send + 'a>>;

/// A single returned row. Columns are addressed by name, matching the
/// shape `quaint::connector::ResultRow` exposes (`row.get("version")`-style
/// access).
#[derive(Debug, Clone, Default)]
pub struct Row {
    columns: Vec<(String, serde_json::Value)>,
}

impl Row {
    pub fn new(columns: Vec<(String, serde_json::Value)>) -> Self {
        Row { columns }
    }

    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.columns.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }
}

pub type ExecuteResult = Vec<Row>;

/// The injected SQL executor the core pipeline consumes. Exactly two
/// suspendable operations plus a scoped fresh-connection acquisition — the
/// pipeline never talks to a database directly.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Execute raw, unparameterized SQL text (DDL is always sent this way).
    async fn execute_unsafe(&self, sql: &str) -> Result<ExecuteResult, MigrationError>;

    /// Execute parameterized SQL text with bound values.
    async fn execute_parameterized(
        &self,
        sql: &str,
        params: &[serde_json::Value],
    ) -> Result<ExecuteResult, MigrationError>;

    /// Run `body` against a connection isolated from any other in-flight
    /// work, releasing it on every exit path (success, error, or panic
    /// unwind past the await point). Used by `migrate:fresh`'s per-drop
    /// scoping so a prior failed statement cannot poison a later one. The
    /// default implementation runs `body` against `self`
    /// directly, which is correct for executors that are already
    /// single-connection (e.g. SQLite); pooled executors override this to
    /// check out a dedicated connection.
    async fn with_fresh_connection(
        &self,
        body: Box<dyn FnOnce() -> BoxFuture<'_, ()> + Send + '_>,
    ) -> Result<(), MigrationError> {
        body().await
    }
}
