use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indexsync::config::{SyncConfig, DEFAULT_CONFIG_FILE};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "indexsync")]
#[command(about = "Provision a search index and sync it from an external data source")]
#[command(version)]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Search service endpoint URL (overrides the config file)
    #[arg(long, global = true, env = "INDEXSYNC_ENDPOINT")]
    endpoint: Option<String>,

    /// Search service admin API key (overrides the config file)
    #[arg(long, global = true, env = "INDEXSYNC_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Recreate the index, register the data source and indexer, run it and wait
    Provision {
        /// Data source connection string (overrides the config file)
        #[arg(long, env = "INDEXSYNC_CONNECTION_STRING", hide_env_values = true)]
        connection_string: Option<String>,

        /// Give up waiting for the indexer after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Do not draw the progress spinner
        #[arg(long)]
        no_progress: bool,

        /// Wait for Enter before exiting
        #[arg(long)]
        pause: bool,
    },

    /// Show the current status of an indexer
    Status {
        /// Indexer name (defaults to the configured indexer)
        indexer: Option<String>,
    },

    /// Query the provisioned index
    Search {
        /// Free-text query ("*" matches everything)
        query: String,

        /// Filter expression, e.g. "STATE_ALPHA eq 'RI'"
        #[arg(short, long, default_value = "")]
        filter: String,

        /// Fields to return (comma-separated)
        #[arg(short, long)]
        select: Option<String>,

        /// Maximum number of documents
        #[arg(long)]
        top: Option<u32>,

        /// Index name (defaults to the configured index)
        #[arg(long)]
        index: Option<String>,
    },

    /// Write a default config file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(&cli.config)?;
    if let Some(endpoint) = cli.endpoint {
        config.service.endpoint = Some(endpoint);
    }
    if let Some(api_key) = cli.api_key {
        config.service.api_key = api_key;
    }

    init_logging(&config.logging.level, cli.json_logs);

    match cli.command {
        Commands::Provision {
            connection_string,
            timeout_secs,
            no_progress,
            pause,
        } => {
            if let Some(connection_string) = connection_string {
                config.datasource.connection_string = connection_string;
            }
            if timeout_secs.is_some() {
                config.poll.timeout_secs = timeout_secs;
            }
            let progress = !no_progress && !cli.json_logs;
            commands::run_provision(config, progress, pause).await?;
        }
        Commands::Status { indexer } => {
            let indexer = indexer.unwrap_or_else(|| config.indexer.name.clone());
            commands::run_status(&config, &indexer).await?;
        }
        Commands::Search {
            query,
            filter,
            select,
            top,
            index,
        } => {
            let index = index.unwrap_or_else(|| config.index.name.clone());
            commands::run_search(&config, &index, &query, &filter, select.as_deref(), top)
                .await?;
        }
        Commands::InitConfig { force } => {
            commands::run_init_config(&cli.config, force)?;
        }
    }

    Ok(())
}

fn load_config(path: &Path) -> Result<SyncConfig> {
    SyncConfig::load_or_default(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}

fn init_logging(level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
