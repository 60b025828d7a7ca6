use serde::{Deserialize, Serialize};

/// The SQL dialect a plan, driver, or migration is rendered for.
///
/// Mirrors `quaint::prelude::SqlFamily` in spirit: a small closed tag with
/// `is_*` helpers rather than a trait object, since every plan is produced
/// for exactly one dialect at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Postgres,
    Mysql,
    Sqlite,
}

impl Dialect {
    pub fn as_str(self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::Mysql => "mysql",
            Dialect::Sqlite => "sqlite",
        }
    }

    pub fn is_postgres(self) -> bool {
        matches!(self, Dialect::Postgres)
    }

    pub fn is_mysql(self) -> bool {
        matches!(self, Dialect::Mysql)
    }

    pub fn is_sqlite(self) -> bool {
        matches!(self, Dialect::Sqlite)
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
