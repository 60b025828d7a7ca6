use migration_connector::{ColumnChangeKind, ColumnSpec, Dialect, EnumValueChange, PlanOp};
use migration_connector::AttributeType;

/// When two enum-typed columns of the same name differ only in their value
/// set, and the dialect can add/remove enum values in place (Postgres
/// today), produce an `AlterEnum` op instead of an `AlterColumn`. Otherwise
/// returns `None`, leaving the caller to fall back to `AlterColumn`, which
/// implies a full recreate via temporary column swap for dialects that
/// can't alter in place.
pub(crate) fn as_in_place_alteration(prev: &ColumnSpec, next: &ColumnSpec, dialect: Dialect) -> Option<PlanOp> {
    if !dialect.is_postgres() {
        return None;
    }

    let (prev_values, next_values) = match (&prev.r#type, &next.r#type) {
        (AttributeType::Enum { values: p }, AttributeType::Enum { values: n }) => (p, n),
        _ => return None,
    };

    if prev.nullable != next.nullable || prev.default != next.default || prev.unique != next.unique {
        return None;
    }

    if prev_values == next_values {
        return None;
    }

    let mut changes = Vec::new();
    for value in next_values {
        if !prev_values.contains(value) {
            changes.push(ColumnChangeKind { value: value.clone(), change: EnumValueChange::Add });
        }
    }
    for value in prev_values {
        if !next_values.contains(value) {
            changes.push(ColumnChangeKind { value: value.clone(), change: EnumValueChange::Remove });
        }
    }

    if changes.is_empty() {
        return None;
    }

    Some(PlanOp::AlterEnum {
        name: format!("{}_type", prev.name),
        changes,
    })
}
