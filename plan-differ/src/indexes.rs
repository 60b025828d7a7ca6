use migration_connector::TableSpec;
use std::collections::HashSet;

/// Indexes dropped from `prev` that no longer appear in `next` (by name),
/// split into those covering a changing/disappearing column (phase A) and
/// the rest (phase G).
pub(crate) fn dropped(
    prev: &TableSpec,
    next: &TableSpec,
    changing: &HashSet<&str>,
) -> (Vec<(String, String)>, Vec<(String, String)>) {
    let mut dependent = Vec::new();
    let mut rest = Vec::new();

    for index in &prev.indexes {
        if next.indexes.iter().any(|n| n.name == index.name) {
            continue;
        }
        let entry = (prev.table.clone(), index.name.clone());
        if index.columns.iter().any(|c| changing.contains(c.as_str())) {
            dependent.push(entry);
        } else {
            rest.push(entry);
        }
    }

    (dependent, rest)
}

pub(crate) fn added(prev: &TableSpec, next: &TableSpec) -> Vec<(String, migration_connector::IndexSpec)> {
    next.indexes
        .iter()
        .filter(|n| !prev.indexes.iter().any(|p| p.name == n.name))
        .map(|index| (next.table.clone(), index.clone()))
        .collect()
}
