//! Structural comparison between two `MigrationPlan`s, emitting a typed,
//! deterministically ordered `PlanOp` sequence.
//!
//! Plays the same role a `SqlSchemaDiffer` / `SqlSchemaDiff::into_steps`
//! plays for introspected schemas: "drop dependent objects first, create
//! before the matching drops, indexes after table alterations, foreign
//! keys after indexes" — the same shape, re-sequenced into eight lettered
//! phases below.

#![deny(rust_2018_idioms)]

mod columns;
mod enums;
mod indexes;

use migration_connector::{
    ColumnSpec, Dialect, EnumSpec, IndexSpec, MigrationError, MigrationPlan, PlanOp, Result,
    TableSpec,
};
use std::collections::HashSet;

/// Diffs `previous` against `current`, producing the ops needed to turn one
/// into the other.
///
/// `populated_tables` names tables the caller knows already hold rows; it
/// resolves the otherwise-unstated question of when adding a non-null
/// column without a default is unsafe — `UnresolvableDiff` when a
/// non-null, default-less column is added to a populated table. An empty
/// set means "assume nothing is populated", which matches first-migration
/// generation and any from-scratch `diff(None, plan)` call.
#[tracing::instrument(skip(previous, current, populated_tables))]
pub fn diff(
    previous: Option<&MigrationPlan>,
    current: &MigrationPlan,
    populated_tables: &HashSet<String>,
) -> Result<Vec<PlanOp>> {
    let previous = match previous {
        Some(p) => p,
        None => return full_create(current),
    };

    let mut ops = Vec::new();

    let table_pairs: Vec<(&TableSpec, &TableSpec)> = previous
        .tables
        .iter()
        .filter_map(|prev| current.find_table(&prev.table).map(|next| (prev, next)))
        .collect();

    // Phase A: drop indexes/FKs whose columns are about to change or disappear.
    let mut dependent_index_drops = Vec::new();
    let mut dependent_fk_drops = Vec::new();
    let mut remaining_index_drops = Vec::new();
    let mut remaining_index_adds = Vec::new();
    let mut remaining_fk_drops = Vec::new();
    let mut remaining_fk_adds = Vec::new();

    for (prev_table, next_table) in &table_pairs {
        let changing: HashSet<&str> = columns::changing_or_disappearing(prev_table, next_table);

        let (dep_idx, rest_idx_drop) = indexes::dropped(prev_table, next_table, &changing);
        dependent_index_drops.extend(dep_idx);
        remaining_index_drops.extend(rest_idx_drop);
        remaining_index_adds.extend(indexes::added(prev_table, next_table));

        let (dep_fk, rest_fk_drop) = columns::dropped_fks(prev_table, next_table, &changing);
        dependent_fk_drops.extend(dep_fk);
        remaining_fk_drops.extend(rest_fk_drop);
        remaining_fk_adds.extend(columns::added_fks(prev_table, next_table));
    }

    ops.extend(dependent_index_drops.into_iter().map(|(table, index)| PlanOp::DropIndex { table, index }));
    ops.extend(dependent_fk_drops.into_iter().map(|(table, column)| PlanOp::DropForeignKey { table, column }));

    // Phase B: drop tables absent from `current`, reverse topological (reverse
    // declaration) order of `previous`.
    for table in previous.tables.iter().rev() {
        if !current.has_table(&table.table) {
            ops.push(PlanOp::DropTable { table: table.table.clone() });
        }
    }

    // Phase C: drop enum types absent from `current`.
    for e in &previous.enums {
        if !current.enums.iter().any(|n| n.name == e.name) {
            ops.push(PlanOp::DropEnum { name: e.name.clone() });
        }
    }

    // Phase D: create enum types new in `current`.
    for e in &current.enums {
        if !previous.enums.iter().any(|p| p.name == e.name) {
            ops.push(PlanOp::CreateEnum(e.clone()));
        }
    }

    // Phase E: create tables new in `current`, in `current`'s own (already
    // topological) order.
    for table in &current.tables {
        if !previous.has_table(&table.table) {
            ops.push(PlanOp::CreateTable(table.clone()));
        }
    }

    // Phase F: column changes on surviving tables — adds, then alters, then
    // drops (adds before drops so a data-carrying drop+add "rename" keeps
    // both ends visible to anyone replaying the stream).
    let mut alter_enum_ops = Vec::new();
    let mut add_column_ops = Vec::new();
    let mut alter_column_ops = Vec::new();
    let mut drop_column_ops = Vec::new();

    for (prev_table, next_table) in &table_pairs {
        add_column_ops.extend(columns::added(prev_table, next_table));

        for (prev_col, next_col) in columns::paired(prev_table, next_table) {
            if !prev_col.differs_from(next_col) {
                continue;
            }

            match enums::as_in_place_alteration(prev_col, next_col, current.dialect) {
                Some(alter_enum) => alter_enum_ops.push(alter_enum),
                None => {
                    if !next_col.nullable
                        && prev_col.nullable
                        && next_col.default.is_none()
                        && populated_tables.contains(&next_table.table)
                    {
                        return Err(MigrationError::UnresolvableDiff(format!(
                            "cannot add NOT NULL column `{}` without a default to populated table `{}`",
                            next_col.name, next_table.table
                        )));
                    }
                    alter_column_ops.push(PlanOp::AlterColumn {
                        table: next_table.table.clone(),
                        column: prev_col.name.clone(),
                        from: prev_col.clone(),
                        to: next_col.clone(),
                    });
                }
            }
        }

        drop_column_ops.extend(columns::dropped(prev_table, next_table));
    }

    for (table, column) in &add_column_ops {
        if !column.nullable && column.default.is_none() && populated_tables.contains(table) {
            return Err(MigrationError::UnresolvableDiff(format!(
                "cannot add NOT NULL column `{}` without a default to populated table `{}`",
                column.name, table
            )));
        }
    }

    ops.extend(alter_enum_ops);
    ops.extend(
        add_column_ops
            .into_iter()
            .map(|(table, column)| PlanOp::AddColumn { table, column }),
    );
    ops.extend(alter_column_ops);
    ops.extend(
        drop_column_ops
            .into_iter()
            .map(|(table, column)| PlanOp::DropColumn { table, column }),
    );

    // Phase G: index changes on surviving tables, drops then adds.
    ops.extend(
        remaining_index_drops
            .into_iter()
            .map(|(table, index)| PlanOp::DropIndex { table, index }),
    );
    ops.extend(
        remaining_index_adds
            .into_iter()
            .map(|(table, index)| PlanOp::AddIndex { table, index }),
    );

    // Phase H: foreign-key changes, drops then adds.
    ops.extend(
        remaining_fk_drops
            .into_iter()
            .map(|(table, column)| PlanOp::DropForeignKey { table, column }),
    );
    ops.extend(
        remaining_fk_adds
            .into_iter()
            .map(|(table, foreign_key)| PlanOp::AddForeignKey { table, foreign_key }),
    );

    Ok(ops)
}

/// `diff(None, P)` is equivalent to a full create of `P`, as an unordered
/// set of ops. Emits enums, then tables, then each table's
/// indexes and foreign keys, in `current`'s own canonical order.
fn full_create(current: &MigrationPlan) -> Result<Vec<PlanOp>> {
    let mut ops = Vec::with_capacity(current.tables.len() * 2 + current.enums.len());

    for e in &current.enums {
        ops.push(PlanOp::CreateEnum(e.clone()));
    }

    for table in &current.tables {
        ops.push(PlanOp::CreateTable(table.clone()));
    }

    for table in &current.tables {
        for index in &table.indexes {
            ops.push(PlanOp::AddIndex {
                table: table.table.clone(),
                index: index.clone(),
            });
        }
    }

    for table in &current.tables {
        for fk in &table.foreign_keys {
            ops.push(PlanOp::AddForeignKey {
                table: table.table.clone(),
                foreign_key: fk.clone(),
            });
        }
    }

    Ok(ops)
}

#[cfg(test)]
mod tests {
    use super::*;
    use migration_connector::{AttributeType, FkAction, ForeignKeySpec};

    fn users_table() -> TableSpec {
        TableSpec {
            table: "users".to_string(),
            primary_key: "id".to_string(),
            columns: vec![
                ColumnSpec { name: "id".into(), r#type: AttributeType::Bigint, nullable: false, default: None, unique: false },
                ColumnSpec { name: "email".into(), r#type: AttributeType::String, nullable: false, default: None, unique: true },
            ],
            indexes: vec![IndexSpec { name: "users_email_unique".into(), columns: vec!["email".into()], unique: true }],
            foreign_keys: Vec::new(),
        }
    }

    #[test]
    fn diff_identity_is_empty() {
        let mut plan = MigrationPlan::new(Dialect::Postgres);
        plan.tables.push(users_table());
        let ops = diff(Some(&plan), &plan, &HashSet::new()).unwrap();
        assert!(ops.is_empty(), "diff(P, P) should be empty, got {:?}", ops);
    }

    #[test]
    fn add_column_produces_single_op() {
        let mut previous = MigrationPlan::new(Dialect::Postgres);
        previous.tables.push(users_table());

        let mut current = previous.clone();
        current.tables[0].columns.push(ColumnSpec {
            name: "age".into(),
            r#type: AttributeType::Integer,
            nullable: true,
            default: None,
            unique: false,
        });

        let ops = diff(Some(&previous), &current, &HashSet::new()).unwrap();
        assert_eq!(ops.len(), 1);
        match &ops[0] {
            PlanOp::AddColumn { table, column } => {
                assert_eq!(table, "users");
                assert_eq!(column.name, "age");
            }
            other => panic!("expected AddColumn, got {:?}", other),
        }
    }

    #[test]
    fn unresolvable_diff_on_populated_table() {
        let mut previous = MigrationPlan::new(Dialect::Postgres);
        previous.tables.push(users_table());
        let mut current = previous.clone();
        current.tables[0].columns.push(ColumnSpec {
            name: "age".into(),
            r#type: AttributeType::Integer,
            nullable: false,
            default: None,
            unique: false,
        });

        let mut populated = HashSet::new();
        populated.insert("users".to_string());

        let result = diff(Some(&previous), &current, &populated);
        assert!(matches!(result, Err(MigrationError::UnresolvableDiff(_))));
    }

    #[test]
    fn enum_value_mutation_on_postgres_alters_in_place() {
        let mut previous = MigrationPlan::new(Dialect::Postgres);
        previous.tables.push(TableSpec {
            table: "posts".into(),
            primary_key: "id".into(),
            columns: vec![ColumnSpec {
                name: "role".into(),
                r#type: AttributeType::Enum { values: vec!["a".into(), "b".into()] },
                nullable: false,
                default: None,
                unique: false,
            }],
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
        });
        previous.enums.push(EnumSpec { name: "role_type".into(), values: vec!["a".into(), "b".into()] });

        let mut current = previous.clone();
        current.tables[0].columns[0].r#type = AttributeType::Enum { values: vec!["a".into(), "b".into(), "c".into()] };
        current.enums[0].values = vec!["a".into(), "b".into(), "c".into()];

        let ops = diff(Some(&previous), &current, &HashSet::new()).unwrap();
        assert_eq!(ops.len(), 1);
        match &ops[0] {
            PlanOp::AlterEnum { name, changes } => {
                assert_eq!(name, "role_type");
                assert_eq!(changes.len(), 1);
                assert_eq!(changes[0].value, "c");
            }
            other => panic!("expected AlterEnum, got {:?}", other),
        }
    }

    #[test]
    fn fk_cascade_survives_unchanged() {
        let fk = ForeignKeySpec {
            column: "user_id".into(),
            ref_table: "users".into(),
            ref_column: "id".into(),
            on_delete: FkAction::Cascade,
            on_update: FkAction::Cascade,
        };
        let mut plan = MigrationPlan::new(Dialect::Mysql);
        let mut posts = TableSpec {
            table: "posts".into(),
            primary_key: "id".into(),
            columns: vec![ColumnSpec { name: "id".into(), r#type: AttributeType::Bigint, nullable: false, default: None, unique: false }],
            indexes: Vec::new(),
            foreign_keys: vec![fk],
        };
        posts.columns.push(ColumnSpec { name: "user_id".into(), r#type: AttributeType::Bigint, nullable: false, default: None, unique: false });
        plan.tables.push(posts);
        let ops = diff(Some(&plan), &plan, &HashSet::new()).unwrap();
        assert!(ops.is_empty());
    }
}
