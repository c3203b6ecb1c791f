// ABOUTME: Catalog access used by the export and import pipelines
// ABOUTME: Narrow trait over the live database handle plus the ClickHouse implementation

pub mod connection;

pub use connection::{connect, ClickHouseCatalog};

use anyhow::Result;
use async_trait::async_trait;

/// Engine name ClickHouse reports for plain views
pub const VIEW_ENGINE: &str = "View";

/// Statements the pipelines run against a live database handle.
///
/// Implementations report failures as [`crate::error::TransferError::Query`]
/// (or `Connection` for [`Catalog::ping`]).
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Liveness check
    async fn ping(&self) -> Result<()>;

    /// Table names in `database`, views included, in the order the server lists them
    async fn list_tables(&self, database: &str) -> Result<Vec<String>>;

    /// Canonical create statement of `database.table`
    async fn show_create_table(&self, database: &str, table: &str) -> Result<String>;

    async fn count_rows(&self, database: &str, table: &str) -> Result<u64>;

    /// Engine name from `system.tables`; a missing entry is an error
    async fn table_engine(&self, database: &str, table: &str) -> Result<String>;

    /// Execute `statement` verbatim, discarding any result
    async fn execute(&self, statement: &str) -> Result<()>;
}
