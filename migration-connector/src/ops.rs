use crate::plan::{ColumnSpec, EnumSpec, ForeignKeySpec, IndexSpec, TableSpec};
use serde::{Deserialize, Serialize};

/// A single atomic structural change between two plans.
///
/// `RenameColumn` is omitted deliberately: no rename hint is supported
/// today, so a logical rename is always produced as a `DropColumn` +
/// `AddColumn` pair by the differ (see DESIGN.md).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlanOp {
    CreateEnum(EnumSpec),
    DropEnum { name: String },
    /// Value additions/removals on an existing enum, used only when the
    /// target dialect can mutate enum values in place (Postgres).
    AlterEnum {
        name: String,
        changes: Vec<ColumnChangeKind>,
    },
    CreateTable(TableSpec),
    DropTable { table: String },
    AddColumn { table: String, column: ColumnSpec },
    DropColumn { table: String, column: String },
    AlterColumn {
        table: String,
        column: String,
        from: ColumnSpec,
        to: ColumnSpec,
    },
    AddIndex { table: String, index: IndexSpec },
    DropIndex { table: String, index: String },
    AddForeignKey { table: String, foreign_key: ForeignKeySpec },
    DropForeignKey { table: String, column: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnumValueChange {
    Add,
    Remove,
}

/// A single enum value transition, named for readability in `AlterEnum`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnChangeKind {
    pub value: String,
    pub change: EnumValueChange,
}
