// ABOUTME: Export command: dump every table's schema and data to disk
// ABOUTME: One table at a time, skipping tables that fail and reporting them at the end

use crate::catalog::{self, Catalog};
use crate::client::{ClickHouseClient, RowStreamer};
use crate::config::RunConfig;
use crate::error::TransferError;
use crate::migration::{self, format_bytes, ExportProgress, SkipReason, TransferSummary};
use crate::utils;
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::time::Instant;

/// Dump schema and data of every table in the configured database
///
/// Creates the schema and data directories, connects to the source, and runs
/// [`run_export`] with the external ClickHouse client.
///
/// # Errors
///
/// Fails if the client is missing, the directories cannot be created, the
/// connection cannot be established, or the table listing fails. Individual
/// table failures are reported in the returned summary instead.
pub async fn export(config: &RunConfig) -> Result<TransferSummary> {
    let client_path = utils::check_client_tool(&config.client_path)?;
    tracing::info!("Using ClickHouse client at {}", client_path.display());

    let catalog = catalog::connect(config, Some(&config.database))
        .await
        .context("Database connection failed")?;
    let streamer = ClickHouseClient::from_config(config);

    run_export(config, &catalog, &streamer).await
}

/// Export pipeline over an already connected catalog and row streamer
pub async fn run_export<C, S>(
    config: &RunConfig,
    catalog: &C,
    streamer: &S,
) -> Result<TransferSummary>
where
    C: Catalog + ?Sized,
    S: RowStreamer + ?Sized,
{
    let started = Instant::now();

    for dir in [&config.schema_dir, &config.data_dir] {
        fs::create_dir_all(dir)
            .map_err(|e| TransferError::write(dir, e))
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    }

    let tables = migration::list_tables(catalog, &config.database).await?;

    let mut summary = TransferSummary::default();
    for table in tables {
        if let Err(e) = utils::validate_identifier(&table) {
            tracing::error!("Skipping table with unusable name: {:#}", e);
            summary.record_failure(utils::sanitize_identifier(&table), e);
            continue;
        }

        let schema =
            migration::dump_table_schema(catalog, &config.database, &table, &config.schema_dir);
        if let Err(e) = schema.await {
            tracing::error!("Error dumping schema for table {}: {:#}", table, e);
            summary.record_failure(table, e);
            continue;
        }

        match migration::is_view(catalog, &config.database, &table).await {
            Ok(true) => {
                tracing::info!("Skipping data export for view {}", table);
                summary.record_skip(table, SkipReason::View);
                continue;
            }
            Ok(false) => {}
            Err(e) => {
                tracing::error!("Error classifying table {}: {:#}", table, e);
                summary.record_failure(table, e);
                continue;
            }
        }

        let bar = progress_bar(&table);
        let mut on_progress = |progress: ExportProgress| {
            bar.set_position(progress.percentage() as u64);
        };
        let result =
            migration::dump_table_data(config, catalog, streamer, &table, &mut on_progress).await;
        bar.finish_and_clear();

        match result {
            Ok(stats) => {
                tracing::info!(
                    "✓ Exported table {} ({} rows, {} batch(es), {})",
                    table,
                    stats.total_rows,
                    stats.batches,
                    format_bytes(stats.bytes_written)
                );
                summary.record_success(table);
            }
            Err(e) => {
                tracing::error!("Error dumping data for table {}: {:#}", table, e);
                summary.record_failure(table, e);
            }
        }
    }

    summary.elapsed = started.elapsed();
    Ok(summary)
}

/// Percentage bar for one table; draws nothing when stderr is not a terminal
fn progress_bar(table: &str) -> ProgressBar {
    let bar = ProgressBar::new(100);
    let style = ProgressStyle::with_template("{prefix:>24} [{bar:40}] {pos:>3}%")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    bar.set_style(style);
    bar.set_prefix(utils::sanitize_identifier(table));
    bar
}
