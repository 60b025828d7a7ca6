use crate::render;
use migration_connector::{AttributeType, ColumnSpec, Dialect, MigrationPlan, PlanOp, SqlDriver};

/// MySQL 8.0+ / MariaDB 10.5+ capability implementation.
#[derive(Debug, Default)]
pub struct MysqlDriver;

impl SqlDriver for MysqlDriver {
    fn dialect(&self) -> Dialect {
        Dialect::Mysql
    }

    fn render_op(&self, op: &PlanOp, plan: &MigrationPlan) -> Vec<String> {
        let (before, after) = self.fk_check_wrapping(op);
        let mut statements = before;
        statements.extend(render::render_op(self, op, plan));
        statements.extend(after);
        statements
    }

    fn quote_ident(&self, name: &str) -> String {
        format!("`{}`", name.replace('`', "``"))
    }

    fn map_type(&self, column: &ColumnSpec, _plan: &MigrationPlan) -> String {
        match &column.r#type {
            AttributeType::String => "varchar(255)".to_string(),
            AttributeType::Text => "text".to_string(),
            AttributeType::Integer => "int".to_string(),
            AttributeType::Smallint => "smallint".to_string(),
            AttributeType::Bigint => "bigint".to_string(),
            AttributeType::Float => "float".to_string(),
            AttributeType::Double => "double".to_string(),
            AttributeType::Decimal => "decimal(10,2)".to_string(),
            AttributeType::Boolean => "tinyint(1)".to_string(),
            AttributeType::Date => "date".to_string(),
            AttributeType::Datetime => "datetime".to_string(),
            AttributeType::Time => "time".to_string(),
            AttributeType::Timestamp => "timestamp".to_string(),
            AttributeType::TimestampTz => "timestamp".to_string(),
            AttributeType::Json => "json".to_string(),
            AttributeType::Blob => "blob".to_string(),
            AttributeType::Enum { values } => {
                let rendered = values
                    .iter()
                    .map(|v| format!("'{}'", v.replace('\'', "''")))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("ENUM({})", rendered)
            }
        }
    }

    fn identity_pk_definition(&self, column: &ColumnSpec) -> Option<String> {
        let ty = match column.r#type {
            AttributeType::Integer => "int",
            AttributeType::Bigint => "bigint",
            _ => return None,
        };
        Some(format!("{} {} AUTO_INCREMENT NOT NULL", self.quote_ident(&column.name), ty))
    }

    fn create_migrations_table(&self) -> String {
        "CREATE TABLE IF NOT EXISTS `migrations` (\n\
  `id` int AUTO_INCREMENT PRIMARY KEY,\n\
  `migration` varchar(255) NOT NULL UNIQUE,\n\
  `batch` int NOT NULL DEFAULT 1,\n\
  `executed_at` timestamp NOT NULL DEFAULT CURRENT_TIMESTAMP\n\
)"
            .to_string()
    }

    fn get_executed_migrations_query(&self) -> String {
        "SELECT `migration` FROM `migrations` ORDER BY `id` ASC".to_string()
    }

    fn record_migration_query(&self) -> String {
        "INSERT INTO `migrations` (`migration`) VALUES (?)".to_string()
    }

    fn list_tables_query(&self) -> String {
        "SELECT table_name FROM information_schema.tables WHERE table_schema = DATABASE()".to_string()
    }

    fn drop_table(&self, name: &str) -> String {
        format!("DROP TABLE IF EXISTS {}", self.quote_ident(name))
    }

    fn drop_enum_type(&self, _name: &str) -> Option<String> {
        None // MySQL enums are inlined in the column definition, nothing to drop separately.
    }

    /// Wraps any drop or alter that could trip referential-integrity
    /// checks mid-sequence in `SET FOREIGN_KEY_CHECKS = 0/1`.
    fn fk_check_wrapping(&self, op: &PlanOp) -> (Vec<String>, Vec<String>) {
        let needs_wrapping = matches!(
            op,
            PlanOp::DropTable { .. }
                | PlanOp::DropColumn { .. }
                | PlanOp::AlterColumn { .. }
                | PlanOp::DropForeignKey { .. }
        );

        if needs_wrapping {
            (
                vec!["SET FOREIGN_KEY_CHECKS = 0".to_string()],
                vec!["SET FOREIGN_KEY_CHECKS = 1".to_string()],
            )
        } else {
            (Vec::new(), Vec::new())
        }
    }
}
