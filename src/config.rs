// ABOUTME: Run configuration for export and import invocations
// ABOUTME: Merges an optional TOML file with command-line overrides into one immutable value

use crate::utils::validate_identifier;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::num::NonZeroU64;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_NATIVE_PORT: u16 = 9000;
pub const DEFAULT_HTTP_PORT: u16 = 8123;
pub const DEFAULT_USER: &str = "default";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_BATCH_SIZE: u64 = 10_000;
const DEFAULT_BATCH_ROWS: NonZeroU64 = match NonZeroU64::new(DEFAULT_BATCH_SIZE) {
    Some(size) => size,
    None => panic!("default batch size must be non-zero"),
};
pub const DEFAULT_CLIENT_PATH: &str = "clickhouse";
pub const DEFAULT_SCHEMA_DIR: &str = "./schema";
pub const DEFAULT_DATA_DIR: &str = "./data";

/// Fully resolved parameters of one invocation.
///
/// Built once in `main` and passed by reference to every pipeline step.
#[derive(Clone)]
pub struct RunConfig {
    pub host: String,
    /// Native protocol port used by the external client
    pub port: u16,
    /// HTTP interface port used by the catalog connection
    pub http_port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    /// Rows per export batch
    pub batch_size: NonZeroU64,
    pub client_path: PathBuf,
    pub schema_dir: PathBuf,
    pub data_dir: PathBuf,
}

impl RunConfig {
    /// Configuration with every default applied, targeting `database`
    pub fn for_database(database: &str) -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_NATIVE_PORT,
            http_port: DEFAULT_HTTP_PORT,
            user: DEFAULT_USER.to_string(),
            password: String::new(),
            database: database.to_string(),
            read_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            write_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            batch_size: DEFAULT_BATCH_ROWS,
            client_path: PathBuf::from(DEFAULT_CLIENT_PATH),
            schema_dir: PathBuf::from(DEFAULT_SCHEMA_DIR),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
        }
    }

    /// Resolve the configuration from an optional TOML file and CLI overrides.
    ///
    /// Values given on the command line win over values from the file; anything
    /// left unset falls back to the documented defaults.
    pub fn resolve(config_file: Option<&Path>, cli: ConfigOverrides) -> Result<Self> {
        let file = match config_file {
            Some(path) => ConfigOverrides::from_file(path)?,
            None => ConfigOverrides::default(),
        };
        Self::from_overrides(cli.or(file))
    }

    pub fn from_overrides(values: ConfigOverrides) -> Result<Self> {
        let database = values
            .database
            .filter(|db| !db.trim().is_empty())
            .context("A database name is required (--dbname or `database` in the config file)")?;

        let mut config = Self::for_database(&database);
        if let Some(host) = values.host {
            config.host = host;
        }
        if let Some(port) = values.port {
            config.port = port;
        }
        if let Some(http_port) = values.http_port {
            config.http_port = http_port;
        }
        if let Some(user) = values.user {
            config.user = user;
        }
        if let Some(password) = values.password {
            config.password = password;
        }
        if let Some(secs) = values.read_timeout {
            config.read_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = values.write_timeout {
            config.write_timeout = Duration::from_secs(secs);
        }
        if let Some(size) = values.chunk_size {
            config.batch_size = NonZeroU64::new(size)
                .context("Batch size must be at least 1 row (--chunk-size)")?;
        }
        if let Some(path) = values.clickhouse_client_path {
            config.client_path = path;
        }
        if let Some(dir) = values.schema_dir {
            config.schema_dir = dir;
        }
        if let Some(dir) = values.data_dir {
            config.data_dir = dir;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            bail!("Host cannot be empty");
        }
        if self.user.trim().is_empty() {
            bail!("User cannot be empty");
        }
        validate_identifier(&self.database).context("Invalid database name")?;
        if self.client_path.as_os_str().is_empty() {
            bail!("ClickHouse client path cannot be empty");
        }
        Ok(())
    }
}

impl fmt::Display for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "host={} port={} http_port={} user={} password={} database={} \
             read_timeout={}s write_timeout={}s batch_size={} client={} schema_dir={} data_dir={}",
            self.host,
            self.port,
            self.http_port,
            self.user,
            if self.password.is_empty() { "<empty>" } else { "****" },
            self.database,
            self.read_timeout.as_secs(),
            self.write_timeout.as_secs(),
            self.batch_size,
            self.client_path.display(),
            self.schema_dir.display(),
            self.data_dir.display(),
        )
    }
}

impl fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RunConfig {{ {} }}", self)
    }
}

/// Partially specified configuration, as read from a TOML file or the CLI
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub http_port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    pub read_timeout: Option<u64>,
    pub write_timeout: Option<u64>,
    pub chunk_size: Option<u64>,
    pub clickhouse_client_path: Option<PathBuf>,
    pub schema_dir: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
}

impl ConfigOverrides {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("Failed to parse TOML config at {}", path.display()))
    }

    /// Field-wise merge preferring `self`
    pub fn or(self, fallback: Self) -> Self {
        Self {
            host: self.host.or(fallback.host),
            port: self.port.or(fallback.port),
            http_port: self.http_port.or(fallback.http_port),
            user: self.user.or(fallback.user),
            password: self.password.or(fallback.password),
            database: self.database.or(fallback.database),
            read_timeout: self.read_timeout.or(fallback.read_timeout),
            write_timeout: self.write_timeout.or(fallback.write_timeout),
            chunk_size: self.chunk_size.or(fallback.chunk_size),
            clickhouse_client_path: self
                .clickhouse_client_path
                .or(fallback.clickhouse_client_path),
            schema_dir: self.schema_dir.or(fallback.schema_dir),
            data_dir: self.data_dir.or(fallback.data_dir),
        }
    }
}
