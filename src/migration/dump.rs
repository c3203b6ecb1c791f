// ABOUTME: Batched table data export through the external client
// ABOUTME: Partitions rows into LIMIT/OFFSET windows and appends each batch to `<table>.tsv`

use crate::artifacts::{artifact_path, ArtifactKind};
use crate::catalog::Catalog;
use crate::client::{RowStreamer, TABULAR_FORMAT};
use crate::config::RunConfig;
use crate::error::TransferError;
use crate::utils::qualified_table;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::num::NonZeroU64;
use std::path::PathBuf;

/// Contiguous slice `[offset, offset + size)` of a table's rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchWindow {
    pub offset: u64,
    pub size: u64,
}

impl BatchWindow {
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }
}

/// Iterator over the windows covering `[0, total_rows)`
#[derive(Debug, Clone)]
pub struct BatchWindows {
    next_offset: u64,
    total_rows: u64,
    batch_size: u64,
}

impl Iterator for BatchWindows {
    type Item = BatchWindow;

    fn next(&mut self) -> Option<BatchWindow> {
        if self.next_offset >= self.total_rows {
            return None;
        }
        let size = self.batch_size.min(self.total_rows - self.next_offset);
        let window = BatchWindow {
            offset: self.next_offset,
            size,
        };
        self.next_offset += size;
        Some(window)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total_rows.saturating_sub(self.next_offset);
        let count = remaining.div_ceil(self.batch_size) as usize;
        (count, Some(count))
    }
}

impl ExactSizeIterator for BatchWindows {}

/// Partition `[0, total_rows)` into consecutive windows of `batch_size` rows
///
/// The last window is shorter when `total_rows` is not a multiple of the
/// batch size; zero rows yields no windows.
///
/// ```
/// # use clickhouse_transfer::migration::dump::{batch_windows, BatchWindow};
/// # use std::num::NonZeroU64;
/// let windows: Vec<_> = batch_windows(25, NonZeroU64::new(10).unwrap()).collect();
/// assert_eq!(windows.last(), Some(&BatchWindow { offset: 20, size: 5 }));
/// ```
pub fn batch_windows(total_rows: u64, batch_size: NonZeroU64) -> BatchWindows {
    BatchWindows {
        next_offset: 0,
        total_rows,
        batch_size: batch_size.get(),
    }
}

/// Read query for one window. No ORDER BY is applied: batches rely on the
/// engine returning rows in the same order on each call within a run.
pub fn batch_query(database: &str, table: &str, window: BatchWindow) -> String {
    format!(
        "SELECT * FROM {} LIMIT {} OFFSET {}",
        qualified_table(database, table),
        window.size,
        window.offset
    )
}

/// Progress of one table's export after a batch completes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportProgress {
    pub rows_requested: u64,
    pub total_rows: u64,
}

impl ExportProgress {
    /// `min(100, 100 * rows_requested / total_rows)`
    pub fn percentage(&self) -> f64 {
        if self.total_rows == 0 {
            return 100.0;
        }
        (self.rows_requested as f64 / self.total_rows as f64 * 100.0).min(100.0)
    }
}

/// Outcome of a successful table data export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataDumpStats {
    pub path: PathBuf,
    pub total_rows: u64,
    pub batches: usize,
    pub bytes_written: u64,
}

/// Export the rows of `table` into `<data_dir>/<table>.tsv`
///
/// Counts the rows, truncates the data file, then runs one external client
/// invocation per batch window in increasing offset order, appending each
/// batch's output once the invocation has succeeded. `on_progress` is called
/// after every batch.
///
/// A table with zero rows leaves a zero-length file and spawns no client.
///
/// # Errors
///
/// The first failing batch aborts the table; the error names the table.
pub async fn dump_table_data<C, S>(
    config: &RunConfig,
    catalog: &C,
    streamer: &S,
    table: &str,
    on_progress: &mut dyn FnMut(ExportProgress),
) -> Result<DataDumpStats>
where
    C: Catalog + ?Sized,
    S: RowStreamer + ?Sized,
{
    let database = config.database.as_str();

    let total_rows = catalog
        .count_rows(database, table)
        .await
        .with_context(|| format!("Failed to count rows of table '{}'", table))?;

    let path = artifact_path(&config.data_dir, table, ArtifactKind::Data);
    let file = File::create(&path).map_err(|e| TransferError::write(&path, e))?;
    let mut writer = BufWriter::new(file);

    tracing::info!(
        "Exporting {} row(s) of table '{}' in batches of {} ({})",
        total_rows,
        table,
        config.batch_size,
        TABULAR_FORMAT
    );

    let mut stats = DataDumpStats {
        path: path.clone(),
        total_rows,
        batches: 0,
        bytes_written: 0,
    };

    for window in batch_windows(total_rows, config.batch_size) {
        let query = batch_query(database, table, window);
        tracing::debug!("Fetching batch [{}, {}) of '{}'", window.offset, window.end(), table);

        let batch = streamer.fetch_batch(&query).with_context(|| {
            format!(
                "Failed to export batch at offset {} of table '{}'",
                window.offset, table
            )
        })?;
        writer
            .write_all(&batch)
            .map_err(|e| TransferError::write(&path, e))
            .with_context(|| format!("Failed to append batch to data of table '{}'", table))?;

        stats.batches += 1;
        stats.bytes_written += batch.len() as u64;

        let progress = ExportProgress {
            rows_requested: window.end(),
            total_rows,
        };
        tracing::info!(
            "Export progress for table {}: {:.2}%",
            table,
            progress.percentage()
        );
        on_progress(progress);
    }

    writer
        .flush()
        .map_err(|e| TransferError::write(&path, e))
        .with_context(|| format!("Failed to finish data file for table '{}'", table))?;

    Ok(stats)
}
