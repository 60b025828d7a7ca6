use migration_connector::{ColumnSpec, ForeignKeySpec, TableSpec};
use std::collections::HashSet;

/// Columns present in `next` but not `prev`.
pub(crate) fn added(prev: &TableSpec, next: &TableSpec) -> Vec<(String, ColumnSpec)> {
    next.columns
        .iter()
        .filter(|c| prev.find_column(&c.name).is_none())
        .map(|c| (next.table.clone(), c.clone()))
        .collect()
}

/// Columns present in `prev` but not `next`.
pub(crate) fn dropped(prev: &TableSpec, next: &TableSpec) -> Vec<(String, String)> {
    prev.columns
        .iter()
        .filter(|c| next.find_column(&c.name).is_none())
        .map(|c| (next.table.clone(), c.name.clone()))
        .collect()
}

/// Columns present in both tables, paired up for alteration detection.
pub(crate) fn paired<'a>(prev: &'a TableSpec, next: &'a TableSpec) -> Vec<(&'a ColumnSpec, &'a ColumnSpec)> {
    prev.columns
        .iter()
        .filter_map(|p| next.find_column(&p.name).map(|n| (p, n)))
        .collect()
}

/// The set of column names that are either dropped outright or altered —
/// used by phase A to find indexes/foreign keys that must be dropped
/// before the column itself changes.
pub(crate) fn changing_or_disappearing<'a>(prev: &'a TableSpec, next: &'a TableSpec) -> HashSet<&'a str> {
    let mut set: HashSet<&str> = dropped(prev, next)
        .iter()
        .map(|(_, name)| prev.find_column(name).unwrap().name.as_str())
        .collect();

    for (p, n) in paired(prev, next) {
        if p.differs_from(n) {
            set.insert(p.name.as_str());
        }
    }

    set
}

/// Foreign keys dropped from `prev` that no longer appear in `next`, split
/// into those anchored on a changing/disappearing column (phase A) and the
/// rest (phase H).
pub(crate) fn dropped_fks(
    prev: &TableSpec,
    next: &TableSpec,
    changing: &HashSet<&str>,
) -> (Vec<(String, String)>, Vec<(String, String)>) {
    let mut dependent = Vec::new();
    let mut rest = Vec::new();

    for fk in &prev.foreign_keys {
        let still_present = next.foreign_keys.iter().any(|n| fks_match(fk, n));
        if still_present {
            continue;
        }
        let entry = (prev.table.clone(), fk.column.clone());
        if changing.contains(fk.column.as_str()) {
            dependent.push(entry);
        } else {
            rest.push(entry);
        }
    }

    (dependent, rest)
}

pub(crate) fn added_fks(prev: &TableSpec, next: &TableSpec) -> Vec<(String, ForeignKeySpec)> {
    next.foreign_keys
        .iter()
        .filter(|n| !prev.foreign_keys.iter().any(|p| fks_match(p, n)))
        .map(|fk| (next.table.clone(), fk.clone()))
        .collect()
}

fn fks_match(a: &ForeignKeySpec, b: &ForeignKeySpec) -> bool {
    a.column == b.column && a.ref_table == b.ref_table && a.ref_column == b.ref_column
}
