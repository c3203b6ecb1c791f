// ABOUTME: Import command: replay dumped schema and data against a target
// ABOUTME: Schema replay aborts on first failure; data replay continues past failing tables

use crate::catalog::{self, Catalog};
use crate::client::{ClickHouseClient, RowStreamer};
use crate::config::RunConfig;
use crate::migration::{self, TransferSummary};
use crate::utils;
use anyhow::{bail, Context, Result};
use dialoguer::{theme::ColorfulTheme, Confirm};
use std::time::Instant;

/// Restore the dumps in the configured directories into the target database
///
/// Connects without selecting a database, creates the target database if
/// needed, reconnects bound to it, then runs [`run_import`].
///
/// Unless `skip_confirmation` is set, asks the operator before writing.
///
/// # Errors
///
/// Fails on connection errors, database creation errors, and any schema
/// replay error. Per-table data failures are reported in the summary.
pub async fn import(config: &RunConfig, skip_confirmation: bool) -> Result<TransferSummary> {
    let client_path = utils::check_client_tool(&config.client_path)?;
    tracing::info!("Using ClickHouse client at {}", client_path.display());

    if !skip_confirmation {
        let prompt = format!(
            "Import {} and {} into database '{}' on {}?",
            config.schema_dir.display(),
            config.data_dir.display(),
            config.database,
            config.host
        );
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .default(false)
            .interact()
            .context("Failed to get confirmation")?;
        if !confirmed {
            bail!("Import cancelled by user");
        }
    }

    let server = catalog::connect(config, None)
        .await
        .context("Initial database connection failed")?;
    migration::ensure_database(&server, &config.database).await?;
    drop(server);

    let catalog = catalog::connect(config, Some(&config.database))
        .await
        .with_context(|| format!("Database connection to {} failed", config.database))?;
    let streamer = ClickHouseClient::from_config(config);

    run_import(config, &catalog, &streamer).await
}

/// Import pipeline over a catalog already bound to the target database
pub async fn run_import<C, S>(
    config: &RunConfig,
    catalog: &C,
    streamer: &S,
) -> Result<TransferSummary>
where
    C: Catalog + ?Sized,
    S: RowStreamer + ?Sized,
{
    let started = Instant::now();

    let applied = migration::replay_schema(catalog, &config.schema_dir)
        .await
        .context("Schema import failed")?;
    tracing::info!("✓ Applied {} schema file(s)", applied.len());

    let mut summary = migration::restore_data(config, catalog, streamer).await?;
    summary.elapsed = started.elapsed();
    Ok(summary)
}
