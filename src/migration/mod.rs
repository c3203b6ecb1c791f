// ABOUTME: Migration building blocks shared by the export and import commands
// ABOUTME: Schema dump/replay, batched data dump, data restore, and run summaries

pub mod dump;
pub mod estimation;
pub mod restore;
pub mod schema;
pub mod summary;

pub use dump::{batch_windows, dump_table_data, BatchWindow, DataDumpStats, ExportProgress};
pub use estimation::{format_bytes, format_duration};
pub use restore::{ensure_database, restore_data, restore_table_data, TableOutcome};
pub use schema::{dump_table_schema, is_view, list_tables, replay_schema};
pub use summary::{SkipReason, TableFailure, TransferSummary};
