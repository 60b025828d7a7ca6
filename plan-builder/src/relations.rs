use crate::ident;
use migration_connector::{
    AttributeType, ColumnSpec, FkAction, ForeignKeySpec, ModelDefinition, RelationKind, Result,
    TableSpec,
};
use std::collections::BTreeMap;

/// Resolve relations into foreign-key edges.
///
/// `belongsTo` emits a non-null integer FK column on the owning table and
/// a `ForeignKeySpec`. `hasOne`/`hasMany` add no column (the inverse side
/// holds the FK). `belongsToMany` is handled separately by
/// `pivot::synthesize_pivots`, since it needs to see every model's
/// relations before deciding whether a pivot table already exists.
pub(crate) fn resolve(models: &BTreeMap<String, ModelDefinition>, tables: &mut [TableSpec]) -> Result<()> {
    for model in models.values() {
        let normalized_table_name = ident::normalize(&model.table_name(), "table")?;
        let table = tables
            .iter_mut()
            .find(|t| t.table == normalized_table_name)
            .expect("table synthesized in build_tables for every model");

        for (_, relation) in &model.relations {
            if relation.kind != RelationKind::BelongsTo {
                continue;
            }

            let target = &models[&relation.model];
            let column_name = relation
                .foreign_key
                .clone()
                .unwrap_or_else(|| format!("{}_id", ident::normalize(&singularize(&relation.model), "relation").unwrap_or_else(|_| relation.model.to_lowercase())));
            let column_name = ident::normalize(&column_name, "column")?;

            if table.columns.iter().any(|c| c.name == column_name) {
                continue; // explicit FK column already declared as an attribute
            }

            table.columns.push(ColumnSpec {
                name: column_name.clone(),
                r#type: AttributeType::Bigint,
                nullable: false,
                default: None,
                unique: false,
            });

            let ref_column = relation
                .owner_or_local_key
                .clone()
                .unwrap_or_else(|| target.primary_key_name().to_string());

            table.foreign_keys.push(ForeignKeySpec {
                column: column_name,
                ref_table: target.table_name(),
                ref_column,
                on_delete: FkAction::Restrict,
                on_update: FkAction::Restrict,
            });
        }
    }

    Ok(())
}

/// A conservative singularization used only to name `belongsTo` foreign
/// keys from the target model's name (e.g. `Users` -> `user`). Mirrors the
/// inverse of `model::pluralize_snake` closely enough for model names,
/// which the caller controls and can always override via `foreign_key`.
pub(crate) fn singularize(model_name: &str) -> String {
    let snake = to_snake(model_name);
    if let Some(stripped) = snake.strip_suffix("ies") {
        format!("{}y", stripped)
    } else if snake.ends_with("ses") || snake.ends_with("xes") || snake.ends_with("ches") || snake.ends_with("shes") {
        snake[..snake.len() - 2].to_string()
    } else if let Some(stripped) = snake.strip_suffix('s') {
        stripped.to_string()
    } else {
        snake
    }
}

fn to_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_uppercase() {
            if i != 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::singularize;

    #[test]
    fn singularizes_common_shapes() {
        assert_eq!(singularize("Users"), "user");
        assert_eq!(singularize("Categories"), "category");
        assert_eq!(singularize("Post"), "post");
    }
}
