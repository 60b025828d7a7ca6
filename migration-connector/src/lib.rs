//! Shared vocabulary for the schema/plan/migration pipeline: the model
//! input types, the canonical `MigrationPlan`, the `PlanOp` diff language,
//! the `SqlDriver` and `Executor` traits, and the unified error taxonomy.
//!
//! Every other crate in this workspace depends on this one by path, the way
//! every connector crate in a Prisma-style engine workspace depends on a
//! central `migration-connector` crate.

#![deny(rust_2018_idioms)]

mod dialect;
mod driver;
mod error;
mod executor;
mod model;
mod ops;
mod plan;

pub use dialect::Dialect;
pub use driver::{MigrationClass, SqlDriver};
pub use error::MigrationError;
pub use executor::{BoxFuture, ExecuteResult, Executor, Row};
pub use model::{
    AttributeDef, AttributeType, DefaultValue, ModelDefinition, RelationDef, RelationKind, Trait,
};
pub use ops::{ColumnChangeKind, EnumValueChange, PlanOp};
pub use plan::{ColumnSpec, EnumSpec, FkAction, ForeignKeySpec, IndexSpec, MigrationPlan, TableSpec};

/// Result alias used throughout the pipeline crates.
pub type Result<T> = std::result::Result<T, MigrationError>;
