use crate::ident;
use crate::relations::singularize;
use migration_connector::{
    AttributeType, ColumnSpec, FkAction, ForeignKeySpec, ModelDefinition, RelationKind, Result,
    TableSpec,
};
use std::collections::{BTreeMap, BTreeSet};

/// `belongsToMany` synthesizes the pivot table with a composite primary key
/// if one doesn't already exist among the declared models (the "pivot"
/// field on the relation names an existing model to reuse instead).
///
/// Pivot tables participate in snapshot-driven diffs rather than being
/// regenerated each time: a synthesized pivot becomes an ordinary
/// `TableSpec` in the plan, so the differ treats it exactly like any other
/// table (see DESIGN.md).
pub(crate) fn synthesize_pivots(models: &BTreeMap<String, ModelDefinition>, tables: &mut Vec<TableSpec>) -> Result<()> {
    let mut seen_pivots: BTreeSet<String> = BTreeSet::new();

    for model in models.values() {
        for relation in model.relations.values() {
            if relation.kind != RelationKind::BelongsToMany {
                continue;
            }

            if let Some(pivot_model) = &relation.pivot {
                if models.contains_key(pivot_model) {
                    continue; // an explicit model already represents the pivot
                }
            }

            let other = &models[&relation.model];
            let pivot_name = relation
                .pivot
                .clone()
                .unwrap_or_else(|| synthesized_pivot_name(&model.name, &other.name));
            let pivot_name = ident::normalize(&pivot_name, "table")?;

            if !seen_pivots.insert(pivot_name.clone()) {
                continue; // already synthesized from the inverse side
            }

            if tables.iter().any(|t| t.table == pivot_name) {
                continue;
            }

            let left_col = ident::normalize(&format!("{}_id", singularize(&model.name)), "column")?;
            let right_col = ident::normalize(&format!("{}_id", singularize(&other.name)), "column")?;

            let columns = vec![
                ColumnSpec {
                    name: left_col.clone(),
                    r#type: AttributeType::Bigint,
                    nullable: false,
                    default: None,
                    unique: false,
                },
                ColumnSpec {
                    name: right_col.clone(),
                    r#type: AttributeType::Bigint,
                    nullable: false,
                    default: None,
                    unique: false,
                },
            ];

            let foreign_keys = vec![
                ForeignKeySpec {
                    column: left_col.clone(),
                    ref_table: model.table_name(),
                    ref_column: model.primary_key_name().to_string(),
                    on_delete: FkAction::Cascade,
                    on_update: FkAction::Cascade,
                },
                ForeignKeySpec {
                    column: right_col.clone(),
                    ref_table: other.table_name(),
                    ref_column: other.primary_key_name().to_string(),
                    on_delete: FkAction::Cascade,
                    on_update: FkAction::Cascade,
                },
            ];

            tables.push(TableSpec {
                table: pivot_name,
                // Composite primary key: represented as the synthesized
                // table's two FK columns joined, since `TableSpec.primary_key`
                // is a single name slot. Drivers render a composite PK by
                // recognizing this `col_a+col_b` convention.
                primary_key: format!("{}+{}", left_col, right_col),
                columns,
                indexes: Vec::new(),
                foreign_keys,
            });
        }
    }

    Ok(())
}

fn synthesized_pivot_name(a: &str, b: &str) -> String {
    let mut names = [singularize(a), singularize(b)];
    names.sort();
    format!("{}_{}", names[0], names[1])
}
