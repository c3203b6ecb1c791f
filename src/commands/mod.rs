// ABOUTME: Command implementations for each pipeline
// ABOUTME: Exports the export and import commands

pub mod export;
pub mod import;

pub use export::{export, run_export};
pub use import::{import, run_import};
