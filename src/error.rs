// ABOUTME: Failure taxonomy shared by the export and import pipelines
// ABOUTME: Carried as the root cause inside anyhow errors so callers can classify them

use std::path::PathBuf;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Classified failure of a transfer step.
///
/// Pipeline functions return `anyhow::Result` with context layered on top;
/// use `err.downcast_ref::<TransferError>()` to recover the class.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Handle creation or liveness check failed
    #[error("failed to connect to ClickHouse at {endpoint}")]
    Connection {
        endpoint: String,
        #[source]
        source: BoxError,
    },

    /// A statement could not run or its result could not be read
    #[error("query failed: {statement}")]
    Query {
        statement: String,
        #[source]
        source: BoxError,
    },

    #[error("failed to write {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The external client could not be spawned or exited unsuccessfully
    #[error("external client '{program}' failed: {reason}")]
    ExternalProcess {
        program: String,
        reason: String,
        #[source]
        source: Option<std::io::Error>,
    },
}

impl TransferError {
    pub fn query(statement: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Query {
            statement: statement.into(),
            source: source.into(),
        }
    }

    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Short name of the failure class, used in run summaries
    pub fn class(&self) -> &'static str {
        match self {
            Self::Connection { .. } => "connection",
            Self::Query { .. } => "query",
            Self::Write { .. } => "write",
            Self::Read { .. } => "read",
            Self::ExternalProcess { .. } => "external-process",
        }
    }
}

/// Failure class of an anyhow error, if it carries a [`TransferError`]
pub fn classify(err: &anyhow::Error) -> Option<&'static str> {
    err.downcast_ref::<TransferError>().map(TransferError::class)
}
