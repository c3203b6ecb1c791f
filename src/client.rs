// ABOUTME: Wrapper for the external `clickhouse client` executable
// ABOUTME: Collects query results as TSV and pipes TSV files in as inserts

use crate::config::RunConfig;
use crate::error::TransferError;
use anyhow::Result;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};

/// Tabular text format used for data artifacts
pub const TABULAR_FORMAT: &str = "TSV";

/// Out-of-process row transport.
///
/// The pipelines only need two operations from it, so a native driver can
/// replace the external executable without touching pipeline code.
pub trait RowStreamer {
    /// Run `query` and return its complete result set in TSV.
    ///
    /// Nothing is returned from an invocation that fails, so a partial
    /// batch never reaches the data file.
    fn fetch_batch(&self, query: &str) -> Result<Vec<u8>>;

    /// Run `insert` (an `INSERT ... FORMAT TSV` statement) reading rows from `source`
    fn stream_insert(&self, insert: &str, source: File) -> Result<()>;
}

/// `clickhouse client` invocation parameters
#[derive(Debug, Clone)]
pub struct ClickHouseClient {
    program: PathBuf,
    host: String,
    port: u16,
    user: String,
    password: String,
    receive_timeout_secs: u64,
    send_timeout_secs: u64,
}

impl ClickHouseClient {
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            program: config.client_path.clone(),
            host: config.host.clone(),
            port: config.port,
            user: config.user.clone(),
            password: config.password.clone(),
            receive_timeout_secs: config.read_timeout.as_secs(),
            send_timeout_secs: config.write_timeout.as_secs(),
        }
    }

    fn program_name(&self) -> String {
        self.program.display().to_string()
    }

    /// Shared prefix of every invocation: connection parameters and the query
    fn base_command(&self, query: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("client")
            .arg("--host")
            .arg(&self.host)
            .arg("--port")
            .arg(self.port.to_string())
            .arg("--user")
            .arg(&self.user);

        // Only pass a password when one is configured
        if !self.password.is_empty() {
            cmd.arg("--password").arg(&self.password);
        }

        cmd.arg(format!("--receive_timeout={}", self.receive_timeout_secs))
            .arg(format!("--send_timeout={}", self.send_timeout_secs))
            .arg("--query")
            .arg(query);
        cmd
    }

    /// Command that prints the result of `query` as TSV on stdout
    pub fn export_command(&self, query: &str) -> Command {
        let mut cmd = self.base_command(query);
        cmd.arg("--format")
            .arg(TABULAR_FORMAT)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        cmd
    }

    /// Command that inserts TSV read from stdin using `insert`
    pub fn import_command(&self, insert: &str) -> Command {
        let mut cmd = self.base_command(insert);
        cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        cmd
    }

    fn spawn_error(&self, source: io::Error) -> TransferError {
        TransferError::ExternalProcess {
            program: self.program_name(),
            reason: "failed to start. Is the ClickHouse client installed?".to_string(),
            source: Some(source),
        }
    }

    fn exit_error(&self, status: ExitStatus) -> TransferError {
        TransferError::ExternalProcess {
            program: self.program_name(),
            reason: format!("exited with {}", status),
            source: None,
        }
    }
}

impl RowStreamer for ClickHouseClient {
    fn fetch_batch(&self, query: &str) -> Result<Vec<u8>> {
        let output = self
            .export_command(query)
            .output()
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            return Err(self.exit_error(output.status).into());
        }
        Ok(output.stdout)
    }

    fn stream_insert(&self, insert: &str, source: File) -> Result<()> {
        let status = self
            .import_command(insert)
            .stdin(Stdio::from(source))
            .status()
            .map_err(|e| self.spawn_error(e))?;

        if !status.success() {
            return Err(self.exit_error(status).into());
        }
        Ok(())
    }
}
