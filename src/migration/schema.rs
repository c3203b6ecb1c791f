// ABOUTME: Schema discovery, dump, and replay
// ABOUTME: Lists tables, writes `<table>.sql` files, classifies views, replays DDL on import

use crate::artifacts::{artifact_path, list_artifacts, ArtifactKind};
use crate::catalog::{Catalog, VIEW_ENGINE};
use crate::error::TransferError;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// List every table in `database`, views included
pub async fn list_tables<C: Catalog + ?Sized>(catalog: &C, database: &str) -> Result<Vec<String>> {
    let tables = catalog
        .list_tables(database)
        .await
        .with_context(|| format!("Failed to list tables in database '{}'", database))?;

    tracing::info!("Found {} table(s) in database '{}'", tables.len(), database);
    Ok(tables)
}

/// Write the create statement of `database.table` to `<schema_dir>/<table>.sql`
///
/// Any existing file of that name is truncated. Returns the path written.
pub async fn dump_table_schema<C: Catalog + ?Sized>(
    catalog: &C,
    database: &str,
    table: &str,
    schema_dir: &Path,
) -> Result<PathBuf> {
    let ddl = catalog
        .show_create_table(database, table)
        .await
        .with_context(|| format!("Failed to read create statement for table '{}'", table))?;

    let path = artifact_path(schema_dir, table, ArtifactKind::Schema);
    fs::write(&path, ddl.as_bytes()).map_err(|e| TransferError::write(&path, e))?;

    tracing::debug!("Schema for '{}' written to {}", table, path.display());
    Ok(path)
}

/// Whether `database.table` is a view
///
/// A missing catalog entry is an error, never "not a view".
pub async fn is_view<C: Catalog + ?Sized>(
    catalog: &C,
    database: &str,
    table: &str,
) -> Result<bool> {
    let engine = catalog
        .table_engine(database, table)
        .await
        .with_context(|| format!("Failed to check if table '{}' is a view", table))?;
    Ok(engine == VIEW_ENGINE)
}

/// Execute every `.sql` file in `schema_dir` in file-name order
///
/// Stops at the first file that cannot be read or executed; later files are
/// left unprocessed. Returns the files applied.
pub async fn replay_schema<C: Catalog + ?Sized>(
    catalog: &C,
    schema_dir: &Path,
) -> Result<Vec<PathBuf>> {
    let files = list_artifacts(schema_dir, ArtifactKind::Schema).with_context(|| {
        format!("Failed to read schema directory {}", schema_dir.display())
    })?;

    let mut applied = Vec::with_capacity(files.len());
    for path in files {
        let ddl = fs::read_to_string(&path)
            .map_err(|e| TransferError::read(&path, e))
            .with_context(|| format!("Failed to read schema file {}", path.display()))?;

        catalog
            .execute(&ddl)
            .await
            .with_context(|| format!("Failed to execute schema file {}", path.display()))?;

        tracing::info!("✓ Schema imported from {}", path.display());
        applied.push(path);
    }

    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::connect;
    use crate::config::RunConfig;
    use tempfile::tempdir;

    #[tokio::test]
    #[ignore]
    async fn test_dump_table_schema_live() {
        let database = std::env::var("TEST_CLICKHOUSE_DATABASE").unwrap();
        let config = RunConfig::for_database(&database);
        let catalog = connect(&config, Some(&database)).await.unwrap();
        let dir = tempdir().unwrap();

        let tables = list_tables(&catalog, &database).await.unwrap();
        for table in tables.iter().take(3) {
            let path = dump_table_schema(&catalog, &database, table, dir.path())
                .await
                .unwrap();
            let ddl = std::fs::read_to_string(path).unwrap();
            assert!(ddl.starts_with("CREATE"));
        }
    }
}
