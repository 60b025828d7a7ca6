#![deny(rust_2018_idioms)]

//! Renders a `[PlanOp]` stream to `.sql` files on disk. Plays a
//! migration-file naming role similar to a CLI commands layer that writes
//! one file per applied step, generalized here into an explicit,
//! injectable-clock writer since this crate owns no live connection of its
//! own.

use std::path::Path;

use chrono::{DateTime, Utc};
use migration_connector::{Dialect, MigrationClass, MigrationPlan, PlanOp, Result, SqlDriver};

/// One file written by [`write`], and whether the executor must track it
/// permanently once applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
    pub filename: String,
    pub permanent: bool,
}

/// Writes `ops` to `dir` as one `.sql` file per operation, named per the
/// grammar `<UTC-yyyymmddHHmmss>-<seq>-<kind>-<subject>.sql`. Deterministic
/// for a fixed `(ops, dialect, now)` — `now` is always caller-supplied,
/// never read from the system clock, so tests can assert exact filenames.
#[tracing::instrument(skip(ops, plan, driver, dir))]
pub fn write(
    ops: &[PlanOp],
    plan: &MigrationPlan,
    driver: &dyn SqlDriver,
    dir: &Path,
    now: DateTime<Utc>,
) -> Result<Vec<WrittenFile>> {
    std::fs::create_dir_all(dir)?;

    let timestamp = now.format("%Y%m%d%H%M%S");
    let mut written = Vec::with_capacity(ops.len());

    for (index, op) in ops.iter().enumerate() {
        let kind = kind_of(op);
        let subject = subject_of(op);
        let filename = format!("{}-{:03}-{}-{}.sql", timestamp, index + 1, kind, subject);

        let statements = driver.render_op(op, plan);
        let mut body = statements
            .iter()
            .map(|s| format!("{};\n", s))
            .collect::<String>();
        if body.is_empty() {
            body.push_str(&format!("-- no statement produced for {:?} on {}\n", op, driver.dialect()));
        }

        std::fs::write(dir.join(&filename), body)?;

        let permanent = driver.classify(op) == MigrationClass::Permanent;
        tracing::debug!(filename = %filename, permanent, "wrote migration file");
        written.push(WrittenFile { filename, permanent });
    }

    Ok(written)
}

fn kind_of(op: &PlanOp) -> &'static str {
    match op {
        PlanOp::CreateTable(_) => "create",
        PlanOp::DropTable { .. } => "drop",
        PlanOp::AddColumn { .. } | PlanOp::DropColumn { .. } | PlanOp::AlterColumn { .. } => "alter",
        PlanOp::AddIndex { .. } | PlanOp::DropIndex { .. } => "index",
        PlanOp::AddForeignKey { .. } | PlanOp::DropForeignKey { .. } => "fk",
        PlanOp::CreateEnum(_) | PlanOp::DropEnum { .. } | PlanOp::AlterEnum { .. } => "enum",
    }
}

fn subject_of(op: &PlanOp) -> String {
    match op {
        PlanOp::CreateTable(table) => table.table.clone(),
        PlanOp::DropTable { table } => table.clone(),
        PlanOp::AddColumn { table, column } => format!("{}_{}", table, column.name),
        PlanOp::DropColumn { table, column } => format!("{}_{}", table, column),
        PlanOp::AlterColumn { table, column, .. } => format!("{}_{}", table, column),
        PlanOp::AddIndex { index, .. } => index.name.clone(),
        PlanOp::DropIndex { index, .. } => index.clone(),
        PlanOp::AddForeignKey { table, foreign_key } => format!("{}_{}", table, foreign_key.column),
        PlanOp::DropForeignKey { table, column } => format!("{}_{}", table, column),
        PlanOp::CreateEnum(e) => e.name.clone(),
        PlanOp::DropEnum { name } => name.clone(),
        PlanOp::AlterEnum { name, .. } => name.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use migration_connector::{ColumnSpec, AttributeType, IndexSpec, TableSpec};
    use sql_migration_connector::PostgresDriver;
    use tempfile::tempdir;

    fn fixed_now() -> DateTime<Utc> {
        Utc.ymd(2026, 1, 2).and_hms(3, 4, 5)
    }

    #[test]
    fn first_migration_writes_create_and_index_files() {
        let dir = tempdir().unwrap();
        let driver = PostgresDriver::default();
        let plan = MigrationPlan::new(Dialect::Postgres);

        let ops = vec![
            PlanOp::CreateTable(TableSpec {
                table: "users".to_string(),
                primary_key: "id".to_string(),
                columns: vec![
                    ColumnSpec { name: "id".into(), r#type: AttributeType::Bigint, nullable: false, default: None, unique: false },
                    ColumnSpec { name: "name".into(), r#type: AttributeType::String, nullable: false, default: None, unique: false },
                    ColumnSpec { name: "email".into(), r#type: AttributeType::String, nullable: false, default: None, unique: true },
                ],
                indexes: Vec::new(),
                foreign_keys: Vec::new(),
            }),
            PlanOp::AddIndex {
                table: "users".to_string(),
                index: IndexSpec { name: "users_email_unique".to_string(), columns: vec!["email".to_string()], unique: true },
            },
        ];

        let written = write(&ops, &plan, &driver, dir.path(), fixed_now()).unwrap();

        assert_eq!(written[0].filename, "20260102030405-001-create-users.sql");
        assert!(written[0].permanent);
        assert_eq!(written[1].filename, "20260102030405-002-index-users_email_unique.sql");
        assert!(written[1].permanent);

        let lexical_order = {
            let mut names: Vec<_> = written.iter().map(|w| w.filename.clone()).collect();
            names.sort();
            names
        };
        assert_eq!(lexical_order, written.iter().map(|w| w.filename.clone()).collect::<Vec<_>>());
    }

    #[test]
    fn add_column_is_alter_prefixed_and_transient() {
        let dir = tempdir().unwrap();
        let driver = PostgresDriver::default();
        let plan = MigrationPlan::new(Dialect::Postgres);

        let ops = vec![PlanOp::AddColumn {
            table: "users".to_string(),
            column: ColumnSpec { name: "age".into(), r#type: AttributeType::Integer, nullable: true, default: None, unique: false },
        }];

        let written = write(&ops, &plan, &driver, dir.path(), fixed_now()).unwrap();
        assert_eq!(written[0].filename, "20260102030405-001-alter-users_age.sql");
        assert!(!written[0].permanent);

        let contents = std::fs::read_to_string(dir.path().join(&written[0].filename)).unwrap();
        assert!(contents.contains("ADD COLUMN"));
    }

    #[test]
    fn alter_enum_is_enum_prefixed_and_permanent() {
        let dir = tempdir().unwrap();
        let driver = PostgresDriver::default();
        let plan = MigrationPlan::new(Dialect::Postgres);

        let ops = vec![PlanOp::AlterEnum {
            name: "role_type".to_string(),
            changes: vec![migration_connector::ColumnChangeKind {
                value: "c".to_string(),
                change: migration_connector::EnumValueChange::Add,
            }],
        }];

        let written = write(&ops, &plan, &driver, dir.path(), fixed_now()).unwrap();
        assert_eq!(written[0].filename, "20260102030405-001-enum-role_type.sql");
        assert!(written[0].permanent);
    }

    #[test]
    fn writing_is_deterministic_for_same_inputs() {
        let driver = PostgresDriver::default();
        let plan = MigrationPlan::new(Dialect::Postgres);
        let ops = vec![PlanOp::DropTable { table: "widgets".to_string() }];

        let dir_a = tempdir().unwrap();
        let dir_b = tempdir().unwrap();
        let a = write(&ops, &plan, &driver, dir_a.path(), fixed_now()).unwrap();
        let b = write(&ops, &plan, &driver, dir_b.path(), fixed_now()).unwrap();
        assert_eq!(a, b);
    }
}
