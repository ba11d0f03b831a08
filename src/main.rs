//! CLI entry point for the transit feed archiver.
//!
//! Fetches the TransLink GTFS static and realtime feeds and archives raw and
//! normalized copies under the data directory.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use transit_feed_archiver::{
    config::{API_KEY_VAR, Config},
    logging::LogConfig,
    normalize::{normalize_alerts, normalize_positions, normalize_trip_updates},
    parser::parse_feed,
    pipeline::{FeedKind, run_realtime},
    static_feed::run_static,
};

#[derive(Parser)]
#[command(name = "transit_feed_archiver")]
#[command(about = "Archive GTFS static and realtime feeds", long_about = None)]
struct Cli {
    /// Override the run stamp used in file names (default: now, %Y-%m-%dT%H-%M)
    #[arg(long, global = true)]
    stamp: Option<String>,

    /// Data directory (overrides DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch and archive the three realtime feeds
    Realtime {
        /// Request timeout in seconds
        #[arg(short, long, default_value_t = 5)]
        timeout: u64,

        /// Also write flattened CSV rows next to the clean JSON
        #[arg(long, default_value_t = false)]
        csv: bool,
    },
    /// Download and extract the static GTFS zip
    Static {
        /// Request timeout in seconds
        #[arg(short, long, default_value_t = 10)]
        timeout: u64,
    },
    /// Download the static feed, then the realtime feeds, with one shared stamp
    RunAll {
        /// Also write flattened CSV rows next to the clean JSON
        #[arg(long, default_value_t = false)]
        csv: bool,
    },
    /// Normalize a local GTFS-RT protobuf file and print the records as JSON
    Normalize {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[arg(short, long, value_enum)]
        kind: FeedKind,
    },
}

impl Commands {
    /// Name of the top-level `<name>_<stamp>.log`. `static` already writes
    /// its own file from `run_static`, and `normalize` only logs to stderr.
    fn log_name(&self) -> Option<&'static str> {
        match self {
            Commands::Realtime { .. } | Commands::RunAll { .. } => Some("realtime"),
            Commands::Static { .. } | Commands::Normalize { .. } => None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(stamp) = cli.stamp {
        config.stamp = stamp;
    }
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    let _log_guard = match cli.command.log_name() {
        Some(name) => {
            let mut log_config = LogConfig::new(config.runs_dir(), &config.stamp);
            if let Some(key) = &config.api_key {
                log_config = log_config.with_secret(key.as_str());
            }
            Some(log_config.init_global(name)?)
        }
        None => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_env_filter(EnvFilter::from_default_env())
                .init();
            None
        }
    };

    match cli.command {
        Commands::Realtime { timeout, csv } => {
            config.realtime_timeout = Duration::from_secs(timeout);
            config.write_csv = csv;
            realtime(&config).await?;
        }
        Commands::Static { timeout } => {
            config.static_timeout = Duration::from_secs(timeout);
            let dir = run_static(&config).await?;
            info!(dir = %dir.display(), "Static feed archived");
        }
        Commands::RunAll { csv } => {
            config.write_csv = csv;
            let dir = run_static(&config).await?;
            info!(dir = %dir.display(), "Static feed archived");
            realtime(&config).await?;
        }
        Commands::Normalize { file, kind } => normalize_file(&file, kind)?,
    }

    Ok(())
}

/// Runs the realtime pipelines and fails if any of them failed.
async fn realtime(config: &Config) -> Result<()> {
    config
        .api_key()
        .with_context(|| format!("{API_KEY_VAR} must be set"))?;

    let outcomes = run_realtime(config).await?;
    let failed: Vec<_> = outcomes
        .iter()
        .filter(|(_, outcome)| outcome.is_err())
        .map(|(kind, _)| kind.log_name())
        .collect();

    if !failed.is_empty() {
        error!(failed = ?failed, "Some realtime pipelines failed");
        anyhow::bail!("realtime pipelines failed: {}", failed.join(", "));
    }
    Ok(())
}

fn normalize_file(file: &Path, kind: FeedKind) -> Result<()> {
    let bytes = std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    let feed = parse_feed(&bytes)?;

    let json = match kind {
        FeedKind::Positions => serde_json::to_string_pretty(&normalize_positions(&feed))?,
        FeedKind::TripUpdates => serde_json::to_string_pretty(&normalize_trip_updates(&feed))?,
        FeedKind::Alerts => serde_json::to_string_pretty(&normalize_alerts(&feed)?)?,
    };

    info!(entities = feed.entity.len(), "Feed normalized");
    println!("{json}");
    Ok(())
}
