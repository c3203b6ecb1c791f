// ABOUTME: On-disk layout of schema and data artifacts
// ABOUTME: Maps table names to `<table>.sql` / `<table>.tsv` files and back

use crate::error::TransferError;
use crate::utils::validate_identifier;
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// The two files every table produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// `<table>.sql`: the table's create statement
    Schema,
    /// `<table>.tsv`: the table's rows, tab-separated, no header
    Data,
}

impl ArtifactKind {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Schema => "sql",
            Self::Data => "tsv",
        }
    }
}

/// Path of the artifact of `kind` for `table` inside `dir`
pub fn artifact_path(dir: &Path, table: &str, kind: ArtifactKind) -> PathBuf {
    dir.join(format!("{}.{}", table, kind.extension()))
}

/// Recover the table name from an artifact file name
///
/// Only the final extension is stripped, so `events.daily.tsv` names the
/// table `events.daily`.
///
/// ```
/// # use clickhouse_transfer::artifacts::{table_name_from_path, ArtifactKind};
/// # use std::path::Path;
/// let table = table_name_from_path(Path::new("data/users.tsv"), ArtifactKind::Data).unwrap();
/// assert_eq!(table, "users");
/// assert!(table_name_from_path(Path::new("data/.tsv"), ArtifactKind::Data).is_err());
/// ```
pub fn table_name_from_path(path: &Path, kind: ArtifactKind) -> Result<String> {
    if !has_extension(path, kind) {
        bail!(
            "{} is not a .{} artifact",
            path.display(),
            kind.extension()
        );
    }

    let table = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .with_context(|| format!("Cannot derive a table name from {}", path.display()))?;

    validate_identifier(table)
        .with_context(|| format!("Invalid table name derived from {}", path.display()))?;

    Ok(table.to_string())
}

/// List the artifacts of `kind` in `dir`, sorted by file name
///
/// Entries are matched on extension only, so a dangling link still shows up
/// and is reported by whoever tries to read it.
pub fn list_artifacts(dir: &Path, kind: ArtifactKind) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| TransferError::read(dir, e))?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| TransferError::read(dir, e))?;
        let path = entry.path();
        if has_extension(&path, kind) {
            paths.push(path);
        }
    }

    paths.sort();
    Ok(paths)
}

fn has_extension(path: &Path, kind: ArtifactKind) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some(kind.extension())
}
