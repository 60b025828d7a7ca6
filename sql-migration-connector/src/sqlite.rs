use crate::render;
use migration_connector::{AttributeType, ColumnSpec, Dialect, MigrationPlan, PlanOp, SqlDriver};

/// SQLite 3.35+ capability implementation. The most constrained dialect:
/// no first-class enum type, no `ALTER COLUMN`, and foreign keys declared
/// only at `CREATE TABLE` time.
#[derive(Debug, Default)]
pub struct SqliteDriver;

impl SqlDriver for SqliteDriver {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn render_op(&self, op: &PlanOp, plan: &MigrationPlan) -> Vec<String> {
        let (before, after) = self.fk_check_wrapping(op);
        let mut statements = before;
        statements.extend(render::render_op(self, op, plan));
        statements.extend(after);
        statements
    }

    fn quote_ident(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn map_type(&self, column: &ColumnSpec, _plan: &MigrationPlan) -> String {
        match &column.r#type {
            AttributeType::String => "text".to_string(),
            AttributeType::Text => "text".to_string(),
            AttributeType::Integer => "integer".to_string(),
            AttributeType::Smallint => "integer".to_string(),
            AttributeType::Bigint => "integer".to_string(),
            AttributeType::Float => "real".to_string(),
            AttributeType::Double => "real".to_string(),
            AttributeType::Decimal => "numeric".to_string(),
            AttributeType::Boolean => "integer".to_string(),
            AttributeType::Date => "datetime".to_string(),
            AttributeType::Datetime => "datetime".to_string(),
            AttributeType::Time => "datetime".to_string(),
            AttributeType::Timestamp => "datetime".to_string(),
            AttributeType::TimestampTz => "datetime".to_string(),
            AttributeType::Json => "text".to_string(),
            AttributeType::Blob => "blob".to_string(),
            AttributeType::Enum { .. } => "text".to_string(),
        }
    }

    /// SQLite has no enum type; an enum column is `text` plus a `CHECK`
    /// restricting it to the declared value set.
    fn enum_check_clause(&self, column: &ColumnSpec) -> Option<String> {
        match &column.r#type {
            AttributeType::Enum { values } => {
                let list = values
                    .iter()
                    .map(|v| format!("'{}'", v.replace('\'', "''")))
                    .collect::<Vec<_>>()
                    .join(", ");
                Some(format!("CHECK ({} IN ({}))", self.quote_ident(&column.name), list))
            }
            _ => None,
        }
    }

    fn identity_pk_definition(&self, column: &ColumnSpec) -> Option<String> {
        if !matches!(column.r#type, AttributeType::Integer | AttributeType::Bigint) {
            return None;
        }
        Some(format!("{} integer PRIMARY KEY AUTOINCREMENT", self.quote_ident(&column.name)))
    }

    fn identity_pk_embeds_constraint(&self) -> bool {
        true
    }

    fn create_migrations_table(&self) -> String {
        r#"CREATE TABLE IF NOT EXISTS "migrations" (
  "id" integer PRIMARY KEY AUTOINCREMENT,
  "migration" text NOT NULL UNIQUE,
  "batch" integer NOT NULL DEFAULT 1,
  "executed_at" datetime NOT NULL DEFAULT CURRENT_TIMESTAMP
)"#
            .to_string()
    }

    fn get_executed_migrations_query(&self) -> String {
        r#"SELECT "migration" FROM "migrations" ORDER BY "id" ASC"#.to_string()
    }

    fn record_migration_query(&self) -> String {
        r#"INSERT INTO "migrations" ("migration") VALUES (?)"#.to_string()
    }

    fn list_tables_query(&self) -> String {
        "SELECT name AS table_name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'".to_string()
    }

    fn drop_table(&self, name: &str) -> String {
        format!("DROP TABLE IF EXISTS {}", self.quote_ident(name))
    }

    fn drop_enum_type(&self, _name: &str) -> Option<String> {
        None // no first-class enum type to drop
    }

    /// `migrate:fresh` must drop tables out of dependency order on SQLite,
    /// which enforces FKs within a connection by default; toggle
    /// the pragma off for the drop sequence and back on after.
    fn fk_check_wrapping(&self, op: &PlanOp) -> (Vec<String>, Vec<String>) {
        if matches!(op, PlanOp::DropTable { .. }) {
            (
                vec!["PRAGMA foreign_keys = OFF".to_string()],
                vec!["PRAGMA foreign_keys = ON".to_string()],
            )
        } else {
            (Vec::new(), Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_with_double_quotes() {
        let driver = SqliteDriver;
        assert_eq!(driver.quote_ident("users"), "\"users\"");
    }

    #[test]
    fn enum_column_gets_check_clause() {
        let driver = SqliteDriver;
        let column = ColumnSpec {
            name: "role".into(),
            r#type: AttributeType::Enum { values: vec!["a".into(), "b".into()] },
            nullable: false,
            default: None,
            unique: false,
        };
        let plan = MigrationPlan::new(Dialect::Sqlite);
        assert_eq!(driver.map_type(&column, &plan), "text");
        assert_eq!(
            driver.enum_check_clause(&column).unwrap(),
            "CHECK (\"role\" IN ('a', 'b'))"
        );
    }

    #[test]
    fn identity_pk_renders_inline_autoincrement_and_embeds_constraint() {
        let driver = SqliteDriver;
        let column = ColumnSpec {
            name: "id".into(),
            r#type: AttributeType::Bigint,
            nullable: false,
            default: None,
            unique: false,
        };
        assert_eq!(driver.identity_pk_definition(&column).unwrap(), "\"id\" integer PRIMARY KEY AUTOINCREMENT");
        assert!(driver.identity_pk_embeds_constraint());
    }

    #[test]
    fn drop_table_wraps_foreign_key_pragma() {
        let driver = SqliteDriver;
        let plan = MigrationPlan::new(Dialect::Sqlite);
        let statements = driver.render_op(&PlanOp::DropTable { table: "posts".into() }, &plan);
        assert_eq!(statements.first().unwrap(), "PRAGMA foreign_keys = OFF");
        assert_eq!(statements.last().unwrap(), "PRAGMA foreign_keys = ON");
    }
}
