// ABOUTME: Target database creation and table data replay
// ABOUTME: Streams `<table>.tsv` files into the external client, isolating per-table failures

use crate::artifacts::{list_artifacts, table_name_from_path, ArtifactKind};
use crate::catalog::Catalog;
use crate::client::{RowStreamer, TABULAR_FORMAT};
use crate::config::RunConfig;
use crate::error::TransferError;
use crate::migration::estimation::format_bytes;
use crate::migration::schema::is_view;
use crate::migration::summary::{SkipReason, TransferSummary};
use crate::utils::{qualified_table, quote_identifier};
use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{self, ErrorKind};
use std::path::Path;
use std::time::Instant;

/// Create `database` if it does not exist yet
///
/// Safe to call repeatedly.
pub async fn ensure_database<C: Catalog + ?Sized>(catalog: &C, database: &str) -> Result<()> {
    let statement = format!("CREATE DATABASE IF NOT EXISTS {}", quote_identifier(database));
    catalog
        .execute(&statement)
        .await
        .with_context(|| format!("Failed to create database '{}'", database))?;

    tracing::info!("✓ Database '{}' is present", database);
    Ok(())
}

/// Insert statement the external client runs for one table
pub fn insert_statement(database: &str, table: &str) -> String {
    format!(
        "INSERT INTO {} FORMAT {}",
        qualified_table(database, table),
        TABULAR_FORMAT
    )
}

/// What happened to one table's data file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableOutcome {
    Imported { bytes: u64 },
    Skipped(SkipReason),
}

/// Import one data file into `table`
///
/// Views are skipped before the file is touched; a zero-length file is
/// skipped silently; a missing file is an error.
pub async fn restore_table_data<C, S>(
    config: &RunConfig,
    catalog: &C,
    streamer: &S,
    table: &str,
    data_file: &Path,
) -> Result<TableOutcome>
where
    C: Catalog + ?Sized,
    S: RowStreamer + ?Sized,
{
    tracing::info!(
        "Importing data for table {} from file {}",
        table,
        data_file.display()
    );

    if is_view(catalog, &config.database, table).await? {
        tracing::info!("Skipping data import for view {}", table);
        return Ok(TableOutcome::Skipped(SkipReason::View));
    }

    let metadata = match fs::metadata(data_file) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(TransferError::read(data_file, e))
                .with_context(|| format!("Data file does not exist: {}", data_file.display()));
        }
        Err(e) => return Err(TransferError::read(data_file, e).into()),
    };

    if !metadata.is_file() {
        let reason = io::Error::new(ErrorKind::InvalidInput, "not a regular file");
        return Err(TransferError::read(data_file, reason))
            .with_context(|| format!("Data file is not a regular file: {}", data_file.display()));
    }

    if metadata.len() == 0 {
        tracing::info!("Data file is empty: {}", data_file.display());
        return Ok(TableOutcome::Skipped(SkipReason::EmptyDataFile));
    }

    tracing::debug!(
        "Data file {} exists and is not empty. Size: {}",
        data_file.display(),
        format_bytes(metadata.len())
    );

    let file = File::open(data_file).map_err(|e| TransferError::read(data_file, e))?;

    streamer
        .stream_insert(&insert_statement(&config.database, table), file)
        .with_context(|| format!("Failed to insert data into table '{}'", table))?;

    Ok(TableOutcome::Imported {
        bytes: metadata.len(),
    })
}

/// Import every `.tsv` file in the configured data directory
///
/// A failing table is recorded in the summary and the pass moves on to the
/// next file. Only an unreadable data directory fails the call.
pub async fn restore_data<C, S>(
    config: &RunConfig,
    catalog: &C,
    streamer: &S,
) -> Result<TransferSummary>
where
    C: Catalog + ?Sized,
    S: RowStreamer + ?Sized,
{
    let started = Instant::now();
    let files = list_artifacts(&config.data_dir, ArtifactKind::Data).with_context(|| {
        format!("Failed to read data directory {}", config.data_dir.display())
    })?;

    let mut summary = TransferSummary::default();
    for path in files {
        let table = match table_name_from_path(&path, ArtifactKind::Data) {
            Ok(table) => table,
            Err(e) => {
                tracing::error!("Skipping {}: {:#}", path.display(), e);
                summary.record_failure(path.display().to_string(), e);
                continue;
            }
        };

        match restore_table_data(config, catalog, streamer, &table, &path).await {
            Ok(TableOutcome::Imported { bytes }) => {
                tracing::info!("✓ Data imported for table {} ({})", table, format_bytes(bytes));
                summary.record_success(table);
            }
            Ok(TableOutcome::Skipped(reason)) => summary.record_skip(table, reason),
            Err(e) => {
                tracing::error!("Failed to import data for table {}: {:#}", table, e);
                summary.record_failure(table, e);
            }
        }
    }

    summary.elapsed = started.elapsed();
    Ok(summary)
}
