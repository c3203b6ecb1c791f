// ABOUTME: Per-table outcome tracking for export and import runs
// ABOUTME: Collects succeeded, skipped, and failed tables and logs the final tally

use crate::error::classify;
use crate::migration::estimation::format_duration;
use std::fmt;
use std::time::Duration;

/// Why a table was passed over without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Views hold no data of their own
    View,
    EmptyDataFile,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::View => write!(f, "view"),
            Self::EmptyDataFile => write!(f, "empty data file"),
        }
    }
}

#[derive(Debug)]
pub struct TableFailure {
    pub table: String,
    pub error: anyhow::Error,
}

#[derive(Debug, Default)]
pub struct TransferSummary {
    pub succeeded: Vec<String>,
    pub skipped: Vec<(String, SkipReason)>,
    pub failed: Vec<TableFailure>,
    pub elapsed: Duration,
}

impl TransferSummary {
    pub fn record_success(&mut self, table: impl Into<String>) {
        self.succeeded.push(table.into());
    }

    pub fn record_skip(&mut self, table: impl Into<String>, reason: SkipReason) {
        self.skipped.push((table.into(), reason));
    }

    pub fn record_failure(&mut self, table: impl Into<String>, error: anyhow::Error) {
        self.failed.push(TableFailure {
            table: table.into(),
            error,
        });
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failed_tables(&self) -> Vec<&str> {
        self.failed.iter().map(|f| f.table.as_str()).collect()
    }

    /// Log the tally, one line per failed table
    pub fn log(&self, operation: &str) {
        tracing::info!(
            "{} finished in {}: {} succeeded, {} skipped, {} failed",
            operation,
            format_duration(self.elapsed),
            self.succeeded.len(),
            self.skipped.len(),
            self.failed.len()
        );

        for failure in &self.failed {
            tracing::warn!(
                "  ✗ {} [{}]: {:#}",
                failure.table,
                classify(&failure.error).unwrap_or("other"),
                failure.error
            );
        }
    }
}
