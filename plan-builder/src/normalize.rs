use crate::ident;
use migration_connector::{
    AttributeDef, AttributeType, ColumnSpec, DefaultValue, EnumSpec, IndexSpec, MigrationError,
    ModelDefinition, Result, TableSpec, Trait,
};
use std::collections::BTreeMap;

/// Resolves the implicit `id` column and the `useUuid` trait, then lays
/// declared attributes out in canonical
/// order. Relation-derived foreign-key columns and the `useTimestamps`/
/// `useSoftDeletes` tail are appended afterwards by `relations::resolve`
/// and `append_trait_tail` respectively, so that trait columns always land
/// at the same position regardless of where the relation happens to sit
/// in the model's declaration.
pub(crate) fn build_tables(models: &BTreeMap<String, ModelDefinition>) -> Result<Vec<TableSpec>> {
    let mut tables = Vec::with_capacity(models.len());

    for model in models.values() {
        let mut columns = Vec::new();

        if model.has_trait(Trait::UseUuid) {
            columns.push(ColumnSpec {
                name: "uuid".to_string(),
                r#type: AttributeType::String,
                nullable: false,
                default: None,
                unique: true,
            });
        }

        let pk_name = model.primary_key_name().to_string();
        let pk_declared = model.attributes.iter().any(|(name, _)| name == &pk_name);
        if pk_name == "id" && !pk_declared {
            columns.push(ColumnSpec {
                name: "id".to_string(),
                r#type: AttributeType::Bigint,
                nullable: false,
                default: None,
                unique: false,
            });
        }

        for (name, attr) in ordered_attributes(&model.attributes) {
            if let AttributeType::Enum { values } = &attr.r#type {
                if values.is_empty() {
                    return Err(MigrationError::InvalidModel(format!(
                        "model `{}` attribute `{}` declares an empty enum",
                        model.name, name
                    )));
                }
            }
            columns.push(attribute_to_column(&ident::normalize(name, "column")?, attr));
        }

        tables.push(TableSpec {
            table: ident::normalize(&model.table_name(), "table")?,
            primary_key: pk_name,
            columns,
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
        });
    }

    Ok(tables)
}

/// Appends the `useTimestamps` and `useSoftDeletes` trait columns last.
/// Called after relation resolution so the fixed
/// trailing position holds even when `belongsTo` foreign keys are added.
pub(crate) fn append_trait_tail(models: &BTreeMap<String, ModelDefinition>, tables: &mut [TableSpec]) {
    for table in tables.iter_mut() {
        let model = models.values().find(|m| m.table_name() == table.table);
        let model = match model {
            Some(m) => m,
            None => continue, // synthesized pivot table, no traits to apply
        };

        if model.has_trait(Trait::UseTimestamps) {
            table.columns.push(ColumnSpec {
                name: "created_at".to_string(),
                r#type: AttributeType::Datetime,
                nullable: false,
                default: Some(DefaultValue::Now),
                unique: false,
            });
            table.columns.push(ColumnSpec {
                name: "updated_at".to_string(),
                r#type: AttributeType::Datetime,
                nullable: false,
                default: Some(DefaultValue::Now),
                unique: false,
            });
        }

        if model.has_trait(Trait::UseSoftDeletes) {
            table.columns.push(ColumnSpec {
                name: "deleted_at".to_string(),
                r#type: AttributeType::Datetime,
                nullable: true,
                default: None,
                unique: false,
            });
        }
    }
}

/// Declared attributes in canonical order: attributes carrying an explicit
/// `order` sort by that value; attributes without one keep their original
/// declaration position. A single stable sort on `order.unwrap_or(index)`
/// achieves both, since declaration index is itself a valid ordering key
/// for undeclared attributes.
fn ordered_attributes(attributes: &[(String, AttributeDef)]) -> Vec<(&str, &AttributeDef)> {
    let mut indexed: Vec<(i32, &str, &AttributeDef)> = attributes
        .iter()
        .enumerate()
        .map(|(i, (name, attr))| (attr.order.unwrap_or(i as i32), name.as_str(), attr))
        .collect();
    indexed.sort_by_key(|(order, _, _)| *order);
    indexed.into_iter().map(|(_, name, attr)| (name, attr)).collect()
}

fn attribute_to_column(name: &str, attr: &AttributeDef) -> ColumnSpec {
    ColumnSpec {
        name: name.to_string(),
        r#type: attr.r#type.clone(),
        nullable: attr.nullable,
        default: attr.default.clone(),
        unique: attr.unique,
    }
}

/// Unique attributes get a unique index, every FK column gets a non-unique
/// index. Must run after relation resolution so
/// FK columns are already present on the table.
pub(crate) fn derive_indexes(tables: &mut [TableSpec]) {
    for table in tables.iter_mut() {
        let mut indexes = Vec::new();

        for column in &table.columns {
            if column.unique {
                indexes.push(IndexSpec {
                    name: format!("{}_{}_unique", table.table, column.name),
                    columns: vec![column.name.clone()],
                    unique: true,
                });
            }
        }

        for fk in &table.foreign_keys {
            indexes.push(IndexSpec {
                name: format!("{}_{}_index", table.table, fk.column),
                columns: vec![fk.column.clone()],
                unique: false,
            });
        }

        indexes.sort_by(|a, b| a.name.cmp(&b.name));
        table.indexes = indexes;
    }
}

/// Emits an `EnumSpec` named `<column>_type` for every `enum`-typed column;
/// merges duplicates by value-set equality, with
/// the first occurrence's name winning the tie.
pub(crate) fn collect_enums(tables: &[TableSpec]) -> Vec<EnumSpec> {
    let mut enums: Vec<EnumSpec> = Vec::new();

    for table in tables {
        for column in &table.columns {
            if let AttributeType::Enum { values } = &column.r#type {
                let candidate = EnumSpec {
                    name: format!("{}_type", column.name),
                    values: values.clone(),
                };

                if !enums.iter().any(|e| e.same_value_set(&candidate)) {
                    enums.push(candidate);
                }
            }
        }
    }

    enums.sort_by(|a, b| a.name.cmp(&b.name));
    enums
}
