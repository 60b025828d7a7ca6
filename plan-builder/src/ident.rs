use migration_connector::{MigrationError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

/// A plan never mixes case for identifiers: all names are lower-snake after
/// normalization. Uses `once_cell::Lazy` + `regex` for the static pattern,
/// the same pairing a connector reaches for to hold static pattern tables
/// (e.g. an ignored-tables allowlist).
static LOWER_SNAKE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_]*$").unwrap());

/// Normalizes `name` to lower-snake if it isn't already, and fails with
/// `InvalidModel` when nothing sensible survives (e.g. an all-punctuation
/// name).
pub(crate) fn normalize(name: &str, context: &str) -> Result<String> {
    if LOWER_SNAKE.is_match(name) {
        return Ok(name.to_string());
    }

    let normalized = migration_connector_snake_case(name);

    if normalized.is_empty() || !LOWER_SNAKE.is_match(&normalized) {
        return Err(MigrationError::InvalidModel(format!(
            "{} name `{}` cannot be normalized to a lower-snake identifier",
            context, name
        )));
    }

    Ok(normalized)
}

fn migration_connector_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_uppercase() {
            if i != 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else if ch.is_alphanumeric() {
            out.push(ch);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches('_').to_string()
}
