//! Walks a model set, normalizes attributes, resolves relations into
//! foreign-key edges, derives indexes from traits, and produces a
//! canonical `MigrationPlan`.
//!
//! Plays the schema-synthesis role a connector's `sql_schema_*` family
//! plays for introspection, generalized from "describe a live database" to
//! "synthesize a schema from declared models".

#![deny(rust_2018_idioms)]

mod ident;
mod normalize;
mod pivot;
mod relations;
mod topo;

use migration_connector::{Dialect, MigrationError, MigrationPlan, ModelDefinition, Result};
use std::collections::BTreeMap;

/// Builds a `MigrationPlan` from a model set for the given dialect.
///
/// `models` is a mapping of model name -> definition; `BTreeMap` so
/// iteration order is alphabetical and therefore deterministic without an
/// extra sort step, keeping repeated builds from the same input byte-identical.
#[tracing::instrument(skip(models))]
pub fn build(models: &BTreeMap<String, ModelDefinition>, dialect: Dialect) -> Result<MigrationPlan> {
    for (name, model) in models {
        for (rel_name, relation) in &model.relations {
            if !models.contains_key(&relation.model) {
                return Err(MigrationError::InvalidModel(format!(
                    "model `{}` relation `{}` refers to undefined model `{}`",
                    name, rel_name, relation.model
                )));
            }
        }
    }

    topo::check_for_required_fk_cycles(models)?;

    let mut tables = normalize::build_tables(models)?;
    relations::resolve(models, &mut tables)?;
    pivot::synthesize_pivots(models, &mut tables)?;
    normalize::append_trait_tail(models, &mut tables);

    let mut table_names = std::collections::HashSet::new();
    for table in &tables {
        if !table_names.insert(table.table.clone()) {
            return Err(MigrationError::DuplicateTable(table.table.clone()));
        }
    }

    normalize::derive_indexes(&mut tables);

    let enums = normalize::collect_enums(&tables);

    let ordered_tables = topo::topological_sort(tables)?;

    let mut plan = MigrationPlan::new(dialect);
    plan.tables = ordered_tables;
    plan.enums = enums;

    tracing::debug!(tables = plan.tables.len(), enums = plan.enums.len(), "plan built");

    Ok(plan)
}
