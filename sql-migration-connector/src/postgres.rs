use crate::render;
use migration_connector::{AttributeType, ColumnSpec, Dialect, MigrationPlan, PlanOp, SqlDriver};

/// PostgreSQL 12+ capability implementation. Plays the `flavour::SqlFlavour`
/// role a connector's Postgres flavour plays for a live connection,
/// generalized from "describe/init a live connection" to "render plan
/// operations and bootstrap queries".
#[derive(Debug, Default)]
pub struct PostgresDriver;

impl SqlDriver for PostgresDriver {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn render_op(&self, op: &PlanOp, plan: &MigrationPlan) -> Vec<String> {
        render::render_op(self, op, plan)
    }

    fn quote_ident(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn map_type(&self, column: &ColumnSpec, plan: &MigrationPlan) -> String {
        match &column.r#type {
            AttributeType::String => "varchar(255)".to_string(),
            AttributeType::Text => "text".to_string(),
            AttributeType::Integer => "integer".to_string(),
            AttributeType::Smallint => "smallint".to_string(),
            AttributeType::Bigint => "bigint".to_string(),
            AttributeType::Float => "real".to_string(),
            AttributeType::Double => "double precision".to_string(),
            AttributeType::Decimal => "numeric".to_string(),
            AttributeType::Boolean => "boolean".to_string(),
            AttributeType::Date => "date".to_string(),
            AttributeType::Datetime => "timestamp".to_string(),
            AttributeType::Time => "time".to_string(),
            AttributeType::Timestamp => "timestamp".to_string(),
            AttributeType::TimestampTz => "timestamptz".to_string(),
            AttributeType::Json => "jsonb".to_string(),
            AttributeType::Blob => "bytea".to_string(),
            AttributeType::Enum { values } => {
                let name = plan
                    .enum_name_for(values)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("{}_type", column.name));
                self.quote_ident(&name)
            }
        }
    }

    fn identity_pk_definition(&self, column: &ColumnSpec) -> Option<String> {
        let ty = match column.r#type {
            AttributeType::Integer => "serial",
            AttributeType::Bigint => "bigserial",
            _ => return None,
        };
        Some(format!("{} {} NOT NULL", self.quote_ident(&column.name), ty))
    }

    fn create_migrations_table(&self) -> String {
        r#"CREATE TABLE IF NOT EXISTS "migrations" (
  "id" serial PRIMARY KEY,
  "migration" text NOT NULL UNIQUE,
  "batch" integer NOT NULL DEFAULT 1,
  "executed_at" timestamp NOT NULL DEFAULT now()
)"#
            .to_string()
    }

    fn get_executed_migrations_query(&self) -> String {
        r#"SELECT "migration" FROM "migrations" ORDER BY "id" ASC"#.to_string()
    }

    fn record_migration_query(&self) -> String {
        r#"INSERT INTO "migrations" ("migration") VALUES ($1)"#.to_string()
    }

    fn list_tables_query(&self) -> String {
        "SELECT table_name FROM information_schema.tables WHERE table_schema = 'public'".to_string()
    }

    fn drop_table(&self, name: &str) -> String {
        format!("DROP TABLE IF EXISTS {} CASCADE", self.quote_ident(name))
    }

    fn drop_enum_type(&self, name: &str) -> Option<String> {
        Some(format!("DROP TYPE IF EXISTS {}", self.quote_ident(name)))
    }

    fn supports_in_place_enum_alteration(&self) -> bool {
        true
    }
}
