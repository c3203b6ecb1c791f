// ABOUTME: CLI entry point for clickhouse-transfer
// ABOUTME: Parses commands, resolves configuration, and routes to export or import

use clap::{Args, Parser, Subcommand};
use clickhouse_transfer::commands;
use clickhouse_transfer::config::{ConfigOverrides, RunConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "clickhouse-transfer")]
#[command(
    about = "Move ClickHouse schema and data between deployments via on-disk dumps",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Dump every table's schema (<table>.sql) and data (<table>.tsv)
    Export {
        #[command(flatten)]
        connection: ConnectionArgs,
        /// Number of rows to fetch per batch [default: 10000]
        #[arg(long)]
        chunk_size: Option<u64>,
    },
    /// Create the target database and replay dumped schema and data into it
    Import {
        #[command(flatten)]
        connection: ConnectionArgs,
        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

#[derive(Args)]
struct ConnectionArgs {
    /// TOML file with any of the settings below; flags take precedence
    #[arg(long)]
    config: Option<PathBuf>,
    /// ClickHouse host [default: localhost]
    #[arg(long)]
    host: Option<String>,
    /// Native protocol port used by the ClickHouse client [default: 9000]
    #[arg(long)]
    port: Option<u16>,
    /// HTTP interface port used for catalog queries [default: 8123]
    #[arg(long)]
    http_port: Option<u16>,
    /// ClickHouse user [default: default]
    #[arg(long)]
    user: Option<String>,
    /// ClickHouse password
    #[arg(long)]
    password: Option<String>,
    /// ClickHouse database name
    #[arg(long, alias = "database")]
    dbname: Option<String>,
    /// Read timeout in seconds [default: 30]
    #[arg(long)]
    read_timeout: Option<u64>,
    /// Write timeout in seconds [default: 30]
    #[arg(long)]
    write_timeout: Option<u64>,
    /// Path to the ClickHouse client executable [default: clickhouse]
    #[arg(long)]
    clickhouse_client_path: Option<PathBuf>,
    /// Directory holding <table>.sql files [default: ./schema]
    #[arg(long)]
    schema_dir: Option<PathBuf>,
    /// Directory holding <table>.tsv files [default: ./data]
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

impl ConnectionArgs {
    fn resolve(self, chunk_size: Option<u64>) -> anyhow::Result<RunConfig> {
        let overrides = ConfigOverrides {
            host: self.host,
            port: self.port,
            http_port: self.http_port,
            user: self.user,
            password: self.password,
            database: self.dbname,
            read_timeout: self.read_timeout,
            write_timeout: self.write_timeout,
            chunk_size,
            clickhouse_client_path: self.clickhouse_client_path,
            schema_dir: self.schema_dir,
            data_dir: self.data_dir,
        };
        RunConfig::resolve(self.config.as_deref(), overrides)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging - default to INFO level if RUST_LOG not set
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let summary = match cli.command {
        Commands::Export {
            connection,
            chunk_size,
        } => {
            let config = connection.resolve(chunk_size)?;
            tracing::info!("{}", config);
            let summary = commands::export(&config).await?;
            summary.log("Export");
            summary
        }
        Commands::Import { connection, yes } => {
            let config = connection.resolve(None)?;
            tracing::info!("{}", config);
            let summary = commands::import(&config, yes).await?;
            summary.log("Import");
            summary
        }
    };

    if !summary.is_clean() {
        anyhow::bail!(
            "{} table(s) failed: {}",
            summary.failed.len(),
            summary.failed_tables().join(", ")
        );
    }

    Ok(())
}
