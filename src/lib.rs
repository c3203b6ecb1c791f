// ABOUTME: Library module for clickhouse-transfer
// ABOUTME: Exports all core functionality for use in binary and tests

pub mod artifacts;
pub mod catalog;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod migration;
pub mod utils;
