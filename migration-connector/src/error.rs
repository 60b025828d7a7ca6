use thiserror::Error;

/// The unified error taxonomy, surfaced as a sum type so a caller can match
/// on kind. Component-local error sources convert into this one via
/// `#[from]`, the same shape as a connector's `SqlError` converting into a
/// workspace-wide `ConnectorError`.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("invalid model: {0}")]
    InvalidModel(String),

    #[error("duplicate table name: {0}")]
    DuplicateTable(String),

    #[error("unresolvable diff: {0}")]
    UnresolvableDiff(String),

    #[error("dialect {dialect} does not support: {capability}")]
    DialectUnsupported { dialect: String, capability: String },

    #[error("executor failed running `{sql}`: {message}")]
    ExecutorFailure { message: String, sql: String },

    #[error("snapshot corrupt at {path}: {reason}")]
    SnapshotCorrupt { path: String, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl MigrationError {
    pub fn executor_failure(message: impl Into<String>, sql: impl Into<String>) -> Self {
        MigrationError::ExecutorFailure {
            message: message.into(),
            sql: sql.into(),
        }
    }
}
