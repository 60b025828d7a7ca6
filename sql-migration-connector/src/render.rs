use migration_connector::{ColumnSpec, MigrationPlan, PlanOp, SqlDriver, TableSpec};

/// Shared rendering logic every driver funnels `render_op` through. Each
/// dialect module supplies `quote_ident`/`map_type`/`enum_check_clause` and
/// a handful of syntax hooks (constraint-name convention, `ADD
/// CONSTRAINT` vs `ADD FOREIGN KEY`, etc.) via the `SqlDriver` trait; the
/// statement shape below is otherwise dialect-independent.
///
/// Plays the `sql_renderer` role: one shared entry point per `PlanOp`
/// variant, dialect differences pushed down into small helper calls.
pub(crate) fn render_op(driver: &dyn SqlDriver, op: &PlanOp, plan: &MigrationPlan) -> Vec<String> {
    match op {
        PlanOp::CreateEnum(e) => driver_create_enum(driver, e),
        PlanOp::DropEnum { name } => driver
            .drop_enum_type(name)
            .map(|s| vec![s])
            .unwrap_or_default(),
        PlanOp::AlterEnum { name, changes } => render_alter_enum(driver, name, changes),
        PlanOp::CreateTable(table) => vec![render_create_table(driver, table, plan)],
        PlanOp::DropTable { table } => vec![driver.drop_table(table)],
        PlanOp::AddColumn { table, column } => vec![render_add_column(driver, table, column, plan)],
        PlanOp::DropColumn { table, column } => vec![render_drop_column(driver, table, column)],
        PlanOp::AlterColumn { table, column, from, to } => {
            render_alter_column(driver, table, column, from, to, plan)
        }
        PlanOp::AddIndex { table, index } => vec![render_add_index(driver, table, index)],
        PlanOp::DropIndex { table, index } => vec![render_drop_index(driver, table, index)],
        PlanOp::AddForeignKey { table, foreign_key } => {
            vec![render_add_foreign_key(driver, table, foreign_key)]
        }
        PlanOp::DropForeignKey { table, column } => {
            vec![render_drop_foreign_key(driver, table, column)]
        }
    }
    .into_iter()
    .filter(|s: &String| !s.is_empty())
    .collect()
}

fn driver_create_enum(driver: &dyn SqlDriver, e: &migration_connector::EnumSpec) -> Vec<String> {
    if !driver.dialect().is_postgres() {
        return Vec::new();
    }
    let values = e.values.iter().map(|v| format!("'{}'", escape(v))).collect::<Vec<_>>().join(", ");
    vec![format!("CREATE TYPE {} AS ENUM ({})", driver.quote_ident(&e.name), values)]
}

fn render_alter_enum(driver: &dyn SqlDriver, name: &str, changes: &[migration_connector::ColumnChangeKind]) -> Vec<String> {
    use migration_connector::EnumValueChange;
    changes
        .iter()
        .map(|change| match change.change {
            EnumValueChange::Add => format!(
                "ALTER TYPE {} ADD VALUE '{}'",
                driver.quote_ident(name),
                escape(&change.value)
            ),
            EnumValueChange::Remove => format!(
                "-- unsupported: {} cannot remove value '{}' from {} in place; recreate via a temporary column swap",
                driver.dialect(),
                escape(&change.value),
                driver.quote_ident(name)
            ),
        })
        .collect()
}

fn render_create_table(driver: &dyn SqlDriver, table: &TableSpec, plan: &MigrationPlan) -> String {
    let single_col_pk = !table.primary_key.contains('+') && table.find_column(&table.primary_key).is_some();
    let mut used_identity = false;

    let mut parts: Vec<String> = table
        .columns
        .iter()
        .map(|c| {
            if single_col_pk && c.name == table.primary_key {
                if let Some(def) = driver.identity_pk_definition(c) {
                    used_identity = true;
                    return def;
                }
            }
            column_definition(driver, c, plan)
        })
        .collect();

    if table.primary_key.contains('+') {
        let pk_cols: Vec<String> = table
            .primary_key
            .split('+')
            .map(|c| driver.quote_ident(c))
            .collect();
        parts.push(format!("PRIMARY KEY ({})", pk_cols.join(", ")));
    } else if single_col_pk && !(used_identity && driver.identity_pk_embeds_constraint()) {
        parts.push(format!("PRIMARY KEY ({})", driver.quote_ident(&table.primary_key)));
    }

    for fk in &table.foreign_keys {
        parts.push(foreign_key_clause(driver, table, fk));
    }

    format!(
        "CREATE TABLE {} (\n  {}\n)",
        driver.quote_ident(&table.table),
        parts.join(",\n  ")
    )
}

fn column_definition(driver: &dyn SqlDriver, column: &ColumnSpec, plan: &MigrationPlan) -> String {
    let mut def = format!("{} {}", driver.quote_ident(&column.name), driver.map_type(column, plan));

    if !column.nullable {
        def.push_str(" NOT NULL");
    }

    if let Some(default) = &column.default {
        def.push_str(&format!(" DEFAULT {}", render_default(driver, default)));
    }

    if column.unique {
        def.push_str(" UNIQUE");
    }

    if let Some(check) = driver.enum_check_clause(column) {
        def.push(' ');
        def.push_str(&check);
    }

    def
}

fn render_default(driver: &dyn SqlDriver, default: &migration_connector::DefaultValue) -> String {
    use migration_connector::DefaultValue::*;
    match default {
        String(s) => format!("'{}'", escape(s)),
        Integer(i) => i.to_string(),
        Float(f) => f.to_string(),
        Boolean(b) => b.to_string(),
        Now => {
            if driver.dialect().is_sqlite() {
                "CURRENT_TIMESTAMP".to_string()
            } else {
                "now()".to_string()
            }
        }
        Uuid => {
            if driver.dialect().is_postgres() {
                "gen_random_uuid()".to_string()
            } else {
                "(uuid())".to_string()
            }
        }
    }
}

fn foreign_key_clause(driver: &dyn SqlDriver, table: &TableSpec, fk: &migration_connector::ForeignKeySpec) -> String {
    format!(
        "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {}({}) ON DELETE {} ON UPDATE {}",
        driver.quote_ident(&fk_constraint_name(table.table.as_str(), &fk.column)),
        driver.quote_ident(&fk.column),
        driver.quote_ident(&fk.ref_table),
        driver.quote_ident(&fk.ref_column),
        fk_action(fk.on_delete),
        fk_action(fk.on_update),
    )
}

pub(crate) fn fk_constraint_name(table: &str, column: &str) -> String {
    format!("{}_{}_fkey", table, column)
}

fn fk_action(action: migration_connector::FkAction) -> &'static str {
    use migration_connector::FkAction::*;
    match action {
        Cascade => "CASCADE",
        Restrict => "RESTRICT",
        SetNull => "SET NULL",
        NoAction => "NO ACTION",
    }
}

fn render_add_column(driver: &dyn SqlDriver, table: &str, column: &ColumnSpec, plan: &MigrationPlan) -> String {
    format!(
        "ALTER TABLE {} ADD COLUMN {}",
        driver.quote_ident(table),
        column_definition(driver, column, plan)
    )
}

fn render_drop_column(driver: &dyn SqlDriver, table: &str, column: &str) -> String {
    format!(
        "ALTER TABLE {} DROP COLUMN {}",
        driver.quote_ident(table),
        driver.quote_ident(column)
    )
}

fn render_alter_column(
    driver: &dyn SqlDriver,
    table: &str,
    column: &str,
    from: &ColumnSpec,
    to: &ColumnSpec,
    plan: &MigrationPlan,
) -> Vec<String> {
    if driver.dialect().is_sqlite() {
        return render_sqlite_column_swap(driver, table, column, to, plan);
    }

    if driver.dialect().is_mysql() {
        return vec![format!(
            "ALTER TABLE {} MODIFY COLUMN {}",
            driver.quote_ident(table),
            column_definition(driver, to, plan)
        )];
    }

    // Postgres: one ALTER TABLE statement, comma-separated column alterations.
    let quoted_col = driver.quote_ident(column);
    let mut clauses = Vec::new();

    if from.r#type != to.r#type {
        clauses.push(format!("ALTER COLUMN {} TYPE {}", quoted_col, driver.map_type(to, plan)));
    }
    if from.nullable != to.nullable {
        clauses.push(format!(
            "ALTER COLUMN {} {}",
            quoted_col,
            if to.nullable { "DROP NOT NULL" } else { "SET NOT NULL" }
        ));
    }
    if from.default != to.default {
        clauses.push(match &to.default {
            Some(default) => format!("ALTER COLUMN {} SET DEFAULT {}", quoted_col, render_default(driver, default)),
            None => format!("ALTER COLUMN {} DROP DEFAULT", quoted_col),
        });
    }

    if clauses.is_empty() {
        return Vec::new();
    }

    vec![format!("ALTER TABLE {} {}", driver.quote_ident(table), clauses.join(", "))]
}

/// SQLite has no `ALTER COLUMN`; a changed column is carried over via a
/// temporary column swap, generalized from enum-only to every alteration
/// on this dialect.
fn render_sqlite_column_swap(
    driver: &dyn SqlDriver,
    table: &str,
    column: &str,
    to: &ColumnSpec,
    plan: &MigrationPlan,
) -> Vec<String> {
    let temp_name = format!("{}__qb_tmp", column);
    let mut temp_col = to.clone();
    temp_col.name = temp_name.clone();

    vec![
        format!(
            "ALTER TABLE {} ADD COLUMN {}",
            driver.quote_ident(table),
            column_definition(driver, &temp_col, plan)
        ),
        format!(
            "UPDATE {} SET {} = {}",
            driver.quote_ident(table),
            driver.quote_ident(&temp_name),
            driver.quote_ident(column)
        ),
        format!("ALTER TABLE {} DROP COLUMN {}", driver.quote_ident(table), driver.quote_ident(column)),
        format!(
            "ALTER TABLE {} RENAME COLUMN {} TO {}",
            driver.quote_ident(table),
            driver.quote_ident(&temp_name),
            driver.quote_ident(column)
        ),
    ]
}

fn render_add_index(driver: &dyn SqlDriver, table: &str, index: &migration_connector::IndexSpec) -> String {
    let cols = index.columns.iter().map(|c| driver.quote_ident(c)).collect::<Vec<_>>().join(", ");
    format!(
        "CREATE {}INDEX {} ON {} ({})",
        if index.unique { "UNIQUE " } else { "" },
        driver.quote_ident(&index.name),
        driver.quote_ident(table),
        cols
    )
}

fn render_drop_index(driver: &dyn SqlDriver, table: &str, index: &str) -> String {
    if driver.dialect().is_mysql() {
        format!("DROP INDEX {} ON {}", driver.quote_ident(index), driver.quote_ident(table))
    } else {
        format!("DROP INDEX {}", driver.quote_ident(index))
    }
}

fn render_add_foreign_key(driver: &dyn SqlDriver, table: &str, fk: &migration_connector::ForeignKeySpec) -> String {
    if driver.dialect().is_sqlite() {
        return format!(
            "-- SQLite foreign keys are declared at CREATE TABLE time; re-create {} to add {}",
            driver.quote_ident(table),
            driver.quote_ident(&fk.column)
        );
    }

    format!(
        "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {}({}) ON DELETE {} ON UPDATE {}",
        driver.quote_ident(table),
        driver.quote_ident(&fk_constraint_name(table, &fk.column)),
        driver.quote_ident(&fk.column),
        driver.quote_ident(&fk.ref_table),
        driver.quote_ident(&fk.ref_column),
        fk_action(fk.on_delete),
        fk_action(fk.on_update),
    )
}

fn render_drop_foreign_key(driver: &dyn SqlDriver, table: &str, column: &str) -> String {
    if driver.dialect().is_sqlite() {
        return format!(
            "-- SQLite foreign keys are declared at CREATE TABLE time; re-create {} to drop the key on {}",
            driver.quote_ident(table),
            driver.quote_ident(column)
        );
    }

    let constraint_name = fk_constraint_name(table, column);
    if driver.dialect().is_mysql() {
        format!(
            "ALTER TABLE {} DROP FOREIGN KEY {}",
            driver.quote_ident(table),
            driver.quote_ident(&constraint_name)
        )
    } else {
        format!(
            "ALTER TABLE {} DROP CONSTRAINT {}",
            driver.quote_ident(table),
            driver.quote_ident(&constraint_name)
        )
    }
}

fn escape(value: &str) -> String {
    value.replace('\'', "''")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MysqlDriver, PostgresDriver, SqliteDriver};
    use migration_connector::{AttributeType, Dialect, EnumSpec};

    fn users_table() -> TableSpec {
        TableSpec {
            table: "users".to_string(),
            primary_key: "id".to_string(),
            columns: vec![ColumnSpec {
                name: "id".into(),
                r#type: AttributeType::Bigint,
                nullable: false,
                default: None,
                unique: false,
            }],
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    #[test]
    fn postgres_create_table_renders_serial_identity_pk() {
        let driver = PostgresDriver;
        let plan = MigrationPlan::new(Dialect::Postgres);
        let sql = render_create_table(&driver, &users_table(), &plan);
        assert!(sql.contains("\"id\" bigserial NOT NULL"), "{sql}");
        assert!(!sql.contains("PRIMARY KEY (\"id\")"), "{sql}");
    }

    #[test]
    fn mysql_create_table_renders_auto_increment_identity_pk() {
        let driver = MysqlDriver;
        let plan = MigrationPlan::new(Dialect::Mysql);
        let sql = render_create_table(&driver, &users_table(), &plan);
        assert!(sql.contains("`id` bigint AUTO_INCREMENT NOT NULL"), "{sql}");
        assert!(sql.contains("PRIMARY KEY (`id`)"), "{sql}");
    }

    #[test]
    fn sqlite_create_table_renders_inline_autoincrement_pk_only_once() {
        let driver = SqliteDriver;
        let plan = MigrationPlan::new(Dialect::Sqlite);
        let sql = render_create_table(&driver, &users_table(), &plan);
        assert!(sql.contains("\"id\" integer PRIMARY KEY AUTOINCREMENT"), "{sql}");
        // SQLite rejects a column-level AUTOINCREMENT alongside a separate
        // table-level PRIMARY KEY constraint, so it must appear once.
        assert_eq!(sql.matches("PRIMARY KEY").count(), 1, "{sql}");
    }

    #[test]
    fn composite_pk_pivot_table_is_unaffected_by_identity_rendering() {
        let driver = PostgresDriver;
        let plan = MigrationPlan::new(Dialect::Postgres);
        let table = TableSpec {
            table: "post_tag".to_string(),
            primary_key: "post_id+tag_id".to_string(),
            columns: vec![
                ColumnSpec { name: "post_id".into(), r#type: AttributeType::Bigint, nullable: false, default: None, unique: false },
                ColumnSpec { name: "tag_id".into(), r#type: AttributeType::Bigint, nullable: false, default: None, unique: false },
            ],
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
        };
        let sql = render_create_table(&driver, &table, &plan);
        assert!(sql.contains("\"post_id\" bigint NOT NULL"), "{sql}");
        assert!(sql.contains("PRIMARY KEY (\"post_id\", \"tag_id\")"), "{sql}");
    }

    #[test]
    fn enum_column_type_follows_plan_dedup_across_differently_named_columns() {
        let driver = PostgresDriver;
        let mut plan = MigrationPlan::new(Dialect::Postgres);
        plan.enums.push(EnumSpec {
            name: "status_type".to_string(),
            values: vec!["draft".to_string(), "published".to_string()],
        });

        let table = TableSpec {
            table: "posts".to_string(),
            primary_key: "id".to_string(),
            columns: vec![
                ColumnSpec { name: "id".into(), r#type: AttributeType::Bigint, nullable: false, default: None, unique: false },
                ColumnSpec {
                    name: "workflow_state".into(),
                    r#type: AttributeType::Enum { values: vec!["draft".to_string(), "published".to_string()] },
                    nullable: false,
                    default: None,
                    unique: false,
                },
            ],
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
        };

        let sql = render_create_table(&driver, &table, &plan);
        assert!(sql.contains("\"workflow_state\" \"status_type\""), "{sql}");
    }
}
