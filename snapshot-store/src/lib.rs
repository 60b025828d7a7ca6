#![deny(rust_2018_idioms)]

//! File-based persistence for the last-accepted `MigrationPlan` per
//! dialect. Plays a `sql_migration_persistence` role, re-grounded from "a
//! row in the target database" onto plain filesystem JSON, since this
//! crate has no live connection to persist against.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use migration_connector::{Dialect, MigrationError, MigrationPlan, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotFile {
    plan: MigrationPlan,
    hash: u64,
    dialect: Dialect,
    #[serde(rename = "updatedAt")]
    updated_at: DateTime<Utc>,
}

fn content_hash(plan: &MigrationPlan) -> Result<u64> {
    let bytes = plan.canonical_json()?;
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    Ok(hasher.finish())
}

fn current_path(workspace: &Path, dialect: Dialect) -> PathBuf {
    workspace.join(".qb").join(format!("model-snapshot.{}.json", dialect.as_str()))
}

/// Pre-`.qb/` flat layout, consulted once per `load` when the current
/// location has nothing.
fn legacy_path(workspace: &Path, dialect: Dialect) -> PathBuf {
    workspace.join(format!(".migration-snapshot.{}.json", dialect.as_str()))
}

/// Loads the last-accepted plan for `dialect`, or `None` if there isn't
/// one yet. A missing or structurally invalid file is "no previous plan",
/// not an error — this function never returns `SnapshotCorrupt` itself; it
/// downgrades it.
#[tracing::instrument(skip(workspace))]
pub fn load(workspace: &Path, dialect: Dialect) -> Result<Option<MigrationPlan>> {
    let path = current_path(workspace, dialect);
    if path.exists() {
        return Ok(read_snapshot(&path, dialect));
    }

    let legacy = legacy_path(workspace, dialect);
    if !legacy.exists() {
        return Ok(None);
    }

    match read_snapshot(&legacy, dialect) {
        Some(plan) => {
            write_snapshot(&path, dialect, &plan)?;
            Ok(Some(plan))
        }
        None => Ok(None),
    }
}

fn read_snapshot(path: &Path, dialect: Dialect) -> Option<MigrationPlan> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "snapshot unreadable, treating as absent");
            return None;
        }
    };

    let snapshot: SnapshotFile = match serde_json::from_slice(&bytes) {
        Ok(s) => s,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "snapshot structurally invalid, treating as absent");
            return None;
        }
    };

    if snapshot.dialect != dialect {
        tracing::warn!(
            path = %path.display(),
            expected = %dialect,
            found = %snapshot.dialect,
            "snapshot dialect mismatch, treating as absent"
        );
        return None;
    }

    match content_hash(&snapshot.plan) {
        Ok(hash) if hash == snapshot.hash => Some(snapshot.plan),
        _ => {
            tracing::warn!(path = %path.display(), "snapshot hash mismatch, treating as absent");
            None
        }
    }
}

/// Persists `plan` as the new baseline for `dialect`, atomically
/// (write-to-temp, then rename). Deletes the legacy-location file if one
/// still exists, completing the
/// migration started by a prior `load`.
#[tracing::instrument(skip(workspace, plan))]
pub fn save(workspace: &Path, dialect: Dialect, plan: &MigrationPlan) -> Result<()> {
    let path = current_path(workspace, dialect);
    write_snapshot(&path, dialect, plan)?;

    let legacy = legacy_path(workspace, dialect);
    if legacy.exists() {
        std::fs::remove_file(&legacy)?;
    }

    Ok(())
}

/// Removes the persisted baseline for `dialect`, current and legacy
/// locations both, so the next `load` sees no previous plan. Used by
/// `migrate:fresh`'s reset, which clears migration files and snapshot
/// together.
#[tracing::instrument(skip(workspace))]
pub fn clear(workspace: &Path, dialect: Dialect) -> Result<()> {
    let path = current_path(workspace, dialect);
    if path.exists() {
        std::fs::remove_file(&path)?;
    }

    let legacy = legacy_path(workspace, dialect);
    if legacy.exists() {
        std::fs::remove_file(&legacy)?;
    }

    Ok(())
}

fn write_snapshot(path: &Path, dialect: Dialect, plan: &MigrationPlan) -> Result<()> {
    let parent = path.parent().ok_or_else(|| {
        MigrationError::SnapshotCorrupt {
            path: path.display().to_string(),
            reason: "snapshot path has no parent directory".to_string(),
        }
    })?;
    std::fs::create_dir_all(parent)?;

    let snapshot = SnapshotFile {
        plan: plan.clone(),
        hash: content_hash(plan)?,
        dialect,
        updated_at: Utc::now(),
    };
    let bytes = serde_json::to_vec_pretty(&snapshot)?;

    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, &bytes)?;
    std::fs::rename(&tmp_path, path)?;

    Ok(())
}
