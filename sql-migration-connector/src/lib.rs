#![deny(rust_2018_idioms)]

//! Dialect capability implementations and the shared
//! `PlanOp` → SQL rendering they funnel through. Split the way a
//! connector crate splits: one `flavour` per dialect plus a shared
//! `sql_renderer`.

mod mysql;
mod postgres;
mod render;
mod sqlite;

pub use mysql::MysqlDriver;
pub use postgres::PostgresDriver;
pub use sqlite::SqliteDriver;

use migration_connector::{Dialect, SqlDriver};

/// The one place that knows which concrete driver backs a `Dialect`.
#[tracing::instrument]
pub fn driver_for(dialect: Dialect) -> Box<dyn SqlDriver> {
    match dialect {
        Dialect::Postgres => Box::new(PostgresDriver),
        Dialect::Mysql => Box::new(MysqlDriver),
        Dialect::Sqlite => Box::new(SqliteDriver),
    }
}
