use crate::dialect::Dialect;
use crate::model::AttributeType;
use crate::ops::PlanOp;
use crate::plan::{ColumnSpec, MigrationPlan};

/// Whether an applied `PlanOp` should be tracked forever (recorded in the
/// `migrations` table, replayed never) or executed unconditionally every
/// run and then forgotten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationClass {
    Permanent,
    Transient,
}

/// The dialect capability table. Modeled as a trait object per dialect
/// rather than subclassing, the same way a connector holds its flavour as
/// `Box<dyn SqlFlavour + Send + Sync>`.
pub trait SqlDriver: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// Render one `PlanOp` to the SQL statement(s) that implement it.
    /// Multi-statement renders (e.g. MySQL's `FOREIGN_KEY_CHECKS` wrapping)
    /// return more than one string, in execution order.
    fn render_op(&self, op: &PlanOp, plan: &MigrationPlan) -> Vec<String>;

    fn quote_ident(&self, name: &str) -> String;

    /// `plan` is consulted for enum columns: `collect_enums` dedups enum
    /// columns that share a value set onto a single `EnumSpec`, so the
    /// rendered type name must come from `plan.enum_name_for`, not from the
    /// column's own name, or a second column sharing an earlier column's
    /// values would reference a type that was never created.
    fn map_type(&self, column: &ColumnSpec, plan: &MigrationPlan) -> String;

    /// A dialect-specific `CHECK` clause to append to an enum column's
    /// definition. Only SQLite needs this (`enum` maps to `TEXT` +
    /// `CHECK(col IN (...))` there); Postgres and MySQL have first-class
    /// enum representations and return `None`.
    fn enum_check_clause(&self, _column: &ColumnSpec) -> Option<String> {
        None
    }

    /// Full column definition to use instead of the generic `name type`
    /// rendering when `column` is the table's own single-column primary
    /// key, for dialects that give that column identity/auto-increment
    /// syntax (`serial`, `AUTO_INCREMENT`, `INTEGER PRIMARY KEY
    /// AUTOINCREMENT`). `None` falls through to `map_type` plus a separate
    /// `PRIMARY KEY (...)` table constraint, which is also what runs for
    /// non-integer primary keys on dialects that implement this.
    fn identity_pk_definition(&self, _column: &ColumnSpec) -> Option<String> {
        None
    }

    /// Whether `identity_pk_definition`'s output already declares `PRIMARY
    /// KEY` inline, so the caller must skip the separate table constraint.
    /// Only SQLite's `INTEGER PRIMARY KEY AUTOINCREMENT` needs this.
    fn identity_pk_embeds_constraint(&self) -> bool {
        false
    }

    fn create_migrations_table(&self) -> String;

    fn get_executed_migrations_query(&self) -> String;

    /// A parameterized query template; callers bind the filename as the one
    /// positional parameter.
    fn record_migration_query(&self) -> String;

    fn list_tables_query(&self) -> String;

    fn drop_table(&self, name: &str) -> String;

    /// `None` when the dialect has no first-class enum type to drop (MySQL
    /// inlines `ENUM(...)` in the column definition; SQLite has none at
    /// all).
    fn drop_enum_type(&self, name: &str) -> Option<String>;

    /// Statements that must wrap `op` so ordering doesn't trip
    /// referential-integrity checks mid-sequence. `(before, after)`; empty
    /// on dialects/ops that don't need wrapping.
    fn fk_check_wrapping(&self, _op: &PlanOp) -> (Vec<String>, Vec<String>) {
        (Vec::new(), Vec::new())
    }

    /// Mirrors the executor's filename-prefix partition (`alter-`/`fk-` are
    /// transient, everything else permanent) rather than any notion of
    /// "structural vs. cosmetic" — `AlterEnum` renders under the `enum-`
    /// prefix and so is permanent, while plain column alterations render
    /// under `alter-` and are transient.
    fn classify(&self, op: &PlanOp) -> MigrationClass {
        match op {
            PlanOp::CreateTable(_)
            | PlanOp::DropTable { .. }
            | PlanOp::CreateEnum(_)
            | PlanOp::DropEnum { .. }
            | PlanOp::AlterEnum { .. }
            | PlanOp::AddIndex { .. }
            | PlanOp::DropIndex { .. } => MigrationClass::Permanent,
            PlanOp::AddColumn { .. }
            | PlanOp::DropColumn { .. }
            | PlanOp::AlterColumn { .. }
            | PlanOp::AddForeignKey { .. }
            | PlanOp::DropForeignKey { .. } => MigrationClass::Transient,
        }
    }

    /// Whether this dialect can add/remove enum values on an existing type
    /// in place, instead of recreating the type. Only Postgres can today.
    fn supports_in_place_enum_alteration(&self) -> bool {
        false
    }

    /// `true` for the `string`/`enum`-as-varchar type family, which renders
    /// with a length in Postgres/MySQL but is dialect-independent `text` at
    /// the plan layer.
    fn normalizes_varchar_as_text(&self, r#type: &AttributeType) -> bool {
        matches!(r#type, AttributeType::String)
    }
}
