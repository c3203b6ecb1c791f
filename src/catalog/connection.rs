// ABOUTME: ClickHouse connection utilities over the HTTP interface
// ABOUTME: Builds the client from run configuration, pings it, and implements Catalog

use super::Catalog;
use crate::config::RunConfig;
use crate::error::TransferError;
use crate::utils::escape_placeholders;
use anyhow::Result;
use async_trait::async_trait;
use clickhouse::sql::Identifier;
use clickhouse::Client;

/// HTTP endpoint of the server described by `config`
///
/// ```
/// # use clickhouse_transfer::catalog::connection::http_endpoint;
/// # use clickhouse_transfer::config::RunConfig;
/// let config = RunConfig::for_database("events");
/// assert_eq!(http_endpoint(&config), "http://localhost:8123");
/// ```
pub fn http_endpoint(config: &RunConfig) -> String {
    format!("http://{}:{}", config.host, config.http_port)
}

/// Live catalog handle backed by the `clickhouse` HTTP client
#[derive(Clone)]
pub struct ClickHouseCatalog {
    client: Client,
    endpoint: String,
}

impl ClickHouseCatalog {
    /// Build a handle without contacting the server
    ///
    /// `database` selects the default database of the session; `None` leaves
    /// the server default in place, which is what the importer needs before
    /// the target database exists.
    pub fn new(config: &RunConfig, database: Option<&str>) -> Self {
        let endpoint = http_endpoint(config);
        let mut client = Client::default()
            .with_url(&endpoint)
            .with_user(&config.user)
            .with_password(&config.password)
            .with_option("receive_timeout", config.read_timeout.as_secs().to_string())
            .with_option("send_timeout", config.write_timeout.as_secs().to_string());

        if let Some(database) = database {
            client = client.with_database(database);
        }

        Self { client, endpoint }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Connect to ClickHouse and verify the server answers
///
/// # Errors
///
/// Returns [`TransferError::Connection`] if the ping fails; callers treat
/// this as fatal for the run.
///
/// # Examples
///
/// ```no_run
/// # use clickhouse_transfer::catalog::connect;
/// # use clickhouse_transfer::config::RunConfig;
/// # async fn example() -> anyhow::Result<()> {
/// let config = RunConfig::for_database("events");
/// let catalog = connect(&config, Some("events")).await?;
/// # Ok(())
/// # }
/// ```
pub async fn connect(config: &RunConfig, database: Option<&str>) -> Result<ClickHouseCatalog> {
    let catalog = ClickHouseCatalog::new(config, database);
    catalog.ping().await?;

    match database {
        Some(db) => tracing::info!(
            "Connection to ClickHouse {} (database '{}') successful",
            catalog.endpoint,
            db
        ),
        None => tracing::info!("Connection to ClickHouse {} successful", catalog.endpoint),
    }

    Ok(catalog)
}

#[async_trait]
impl Catalog for ClickHouseCatalog {
    async fn ping(&self) -> Result<()> {
        self.client
            .query("SELECT 1")
            .fetch_one::<u8>()
            .await
            .map_err(|e| TransferError::Connection {
                endpoint: self.endpoint.clone(),
                source: Box::new(e),
            })?;
        Ok(())
    }

    async fn list_tables(&self, database: &str) -> Result<Vec<String>> {
        let statement = format!("SHOW TABLES FROM {}", database);
        let tables = self
            .client
            .query("SHOW TABLES FROM ?")
            .bind(Identifier(database))
            .fetch_all::<String>()
            .await
            .map_err(|e| TransferError::query(statement, e))?;
        Ok(tables)
    }

    async fn show_create_table(&self, database: &str, table: &str) -> Result<String> {
        let statement = format!("SHOW CREATE TABLE {}.{}", database, table);
        let ddl = self
            .client
            .query("SHOW CREATE TABLE ?.?")
            .bind(Identifier(database))
            .bind(Identifier(table))
            .fetch_one::<String>()
            .await
            .map_err(|e| TransferError::query(statement, e))?;
        Ok(ddl)
    }

    async fn count_rows(&self, database: &str, table: &str) -> Result<u64> {
        let statement = format!("SELECT count() FROM {}.{}", database, table);
        let count = self
            .client
            .query("SELECT count() FROM ?.?")
            .bind(Identifier(database))
            .bind(Identifier(table))
            .fetch_one::<u64>()
            .await
            .map_err(|e| TransferError::query(statement, e))?;
        Ok(count)
    }

    async fn table_engine(&self, database: &str, table: &str) -> Result<String> {
        let statement = format!(
            "SELECT engine FROM system.tables WHERE database = '{}' AND name = '{}'",
            database, table
        );
        let engine = self
            .client
            .query("SELECT engine FROM system.tables WHERE database = ? AND name = ?")
            .bind(database)
            .bind(table)
            .fetch_optional::<String>()
            .await
            .map_err(|e| TransferError::query(statement.clone(), e))?;

        engine.ok_or_else(|| {
            TransferError::query(
                statement,
                format!("no system.tables entry for {}.{}", database, table),
            )
            .into()
        })
    }

    async fn execute(&self, statement: &str) -> Result<()> {
        tracing::debug!("Executing: {}", statement);
        self.client
            .query(&escape_placeholders(statement))
            .execute()
            .await
            .map_err(|e| TransferError::query(statement, e))?;
        Ok(())
    }
}
