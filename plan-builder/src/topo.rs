use migration_connector::{MigrationError, ModelDefinition, RelationKind, Result, TableSpec};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Fails fast (before any table is synthesized) when two or more models
/// have `belongsTo` edges that form a cycle, with
/// `InvalidModel("cyclic required FKs between A and B")`.
/// `belongsTo` always produces a non-null FK, so any
/// cycle among `belongsTo` edges is a cycle of *required* foreign keys:
/// there is no insertion order that satisfies every row's NOT NULL FK at
/// creation time.
pub(crate) fn check_for_required_fk_cycles(models: &BTreeMap<String, ModelDefinition>) -> Result<()> {
    let mut graph: HashMap<&str, Vec<&str>> = HashMap::new();
    for model in models.values() {
        let edges = graph.entry(model.name.as_str()).or_default();
        for relation in model.relations.values() {
            if relation.kind == RelationKind::BelongsTo && relation.model != model.name {
                edges.push(relation.model.as_str());
            }
        }
    }

    let mut visiting: HashSet<&str> = HashSet::new();
    let mut visited: HashSet<&str> = HashSet::new();
    let mut stack: Vec<&str> = Vec::new();

    for &start in graph.keys() {
        if visited.contains(start) {
            continue;
        }
        if let Some(cycle) = dfs(start, &graph, &mut visiting, &mut visited, &mut stack) {
            let mut names: BTreeSet<&str> = cycle.into_iter().collect();
            let mut joined: Vec<&str> = names.drain(..).collect();
            joined.sort();
            let message = if joined.len() == 2 {
                format!("cyclic required FKs between {} and {}", joined[0], joined[1])
            } else {
                format!("cyclic required FKs among {}", joined.join(", "))
            };
            return Err(MigrationError::InvalidModel(message));
        }
    }

    Ok(())
}

fn dfs<'a>(
    node: &'a str,
    graph: &HashMap<&'a str, Vec<&'a str>>,
    visiting: &mut HashSet<&'a str>,
    visited: &mut HashSet<&'a str>,
    stack: &mut Vec<&'a str>,
) -> Option<Vec<&'a str>> {
    visiting.insert(node);
    stack.push(node);

    if let Some(edges) = graph.get(node) {
        for &next in edges {
            if visiting.contains(next) {
                let start = stack.iter().position(|&n| n == next).unwrap_or(0);
                return Some(stack[start..].to_vec());
            }
            if !visited.contains(next) {
                if let Some(cycle) = dfs(next, graph, visiting, visited, stack) {
                    return Some(cycle);
                }
            }
        }
    }

    stack.pop();
    visiting.remove(node);
    visited.insert(node);
    None
}

/// Tables topologically sorted such that an FK
/// source never precedes its target, alphabetical tie-break. Self-referencing
/// foreign keys (a table pointing at itself) don't constrain ordering — the
/// table exists before its own rows do — so they're excluded from the
/// dependency graph.
pub(crate) fn topological_sort(tables: Vec<TableSpec>) -> Result<Vec<TableSpec>> {
    let mut by_name: BTreeMap<String, TableSpec> =
        tables.into_iter().map(|t| (t.table.clone(), t)).collect();

    let mut depends_on: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for (name, table) in &by_name {
        let deps = table
            .foreign_keys
            .iter()
            .map(|fk| fk.ref_table.clone())
            .filter(|target| target != name)
            .collect();
        depends_on.insert(name.clone(), deps);
    }

    let mut ordered_names: Vec<String> = Vec::with_capacity(depends_on.len());
    let mut placed: BTreeSet<String> = BTreeSet::new();

    while ordered_names.len() < depends_on.len() {
        let mut progressed = false;

        for (name, deps) in &depends_on {
            if placed.contains(name) {
                continue;
            }
            if deps.iter().all(|d| placed.contains(d) || !depends_on.contains_key(d)) {
                ordered_names.push(name.clone());
                placed.insert(name.clone());
                progressed = true;
            }
        }

        if !progressed {
            let remaining: Vec<&String> = depends_on.keys().filter(|n| !placed.contains(*n)).collect();
            return Err(MigrationError::InvalidModel(format!(
                "cyclic required FKs among tables: {}",
                remaining
                    .iter()
                    .map(|s| s.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }
    }

    Ok(ordered_names
        .into_iter()
        .map(|name| by_name.remove(&name).expect("name came from by_name's own keys"))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use migration_connector::{ColumnSpec, AttributeType, FkAction, ForeignKeySpec};

    fn table(name: &str, fk_to: Option<&str>) -> TableSpec {
        TableSpec {
            table: name.to_string(),
            primary_key: "id".to_string(),
            columns: vec![ColumnSpec {
                name: "id".to_string(),
                r#type: AttributeType::Bigint,
                nullable: false,
                default: None,
                unique: false,
            }],
            indexes: Vec::new(),
            foreign_keys: fk_to
                .map(|target| {
                    vec![ForeignKeySpec {
                        column: "x_id".to_string(),
                        ref_table: target.to_string(),
                        ref_column: "id".to_string(),
                        on_delete: FkAction::Restrict,
                        on_update: FkAction::Restrict,
                    }]
                })
                .unwrap_or_default(),
        }
    }

    #[test]
    fn orders_dependents_after_targets() {
        let tables = vec![table("posts", Some("users")), table("users", None)];
        let sorted = topological_sort(tables).unwrap();
        let names: Vec<&str> = sorted.iter().map(|t| t.table.as_str()).collect();
        assert_eq!(names, vec!["users", "posts"]);
    }

    #[test]
    fn self_reference_does_not_block_ordering() {
        let tables = vec![table("categories", Some("categories"))];
        let sorted = topological_sort(tables).unwrap();
        assert_eq!(sorted.len(), 1);
    }
}
