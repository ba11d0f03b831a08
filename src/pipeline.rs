//! Fetch → decode → normalize → write, once per feed kind.
//!
//! [`FeedPipeline`] holds what differs between kinds (normalization, CSV
//! flattening, output names); [`run_pipeline`] sequences the stages. The
//! three kinds run concurrently in [`run_realtime`] and fail independently.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::instrument::WithSubscriber;
use tracing::{error, info, warn};

use crate::config::{API_KEY_PARAM, Config};
use crate::error::{Error, Result};
use crate::fetch::auth::UrlParam;
use crate::fetch::{BasicClient, HttpClient, fetch_bytes};
use crate::gtfs_rt::FeedMessage;
use crate::logging::LogConfig;
use crate::normalize::{
    AlertRecord, AlertRow, StopTimeRow, TripUpdateRecord, VehiclePositionRecord,
    normalize_alerts, normalize_positions, normalize_trip_updates,
};
use crate::output::FileSaver;
use crate::parser::{parse_feed, raw_json};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum FeedKind {
    Positions,
    TripUpdates,
    Alerts,
}

impl FeedKind {
    pub const ALL: [FeedKind; 3] = [FeedKind::Positions, FeedKind::TripUpdates, FeedKind::Alerts];

    /// Output directory and file prefix.
    pub fn dir_name(self) -> &'static str {
        match self {
            FeedKind::Positions => "position_updates",
            FeedKind::TripUpdates => "trip_updates",
            FeedKind::Alerts => "service_alerts",
        }
    }

    /// Endpoint path below the provider base URL.
    pub fn endpoint(self) -> &'static str {
        match self {
            FeedKind::Positions => "gtfsposition",
            FeedKind::TripUpdates => "gtfsrealtime",
            FeedKind::Alerts => "gtfsalerts",
        }
    }

    pub fn log_name(self) -> &'static str {
        match self {
            FeedKind::Positions => "positions",
            FeedKind::TripUpdates => "trip_updates",
            FeedKind::Alerts => "alerts",
        }
    }
}

/// Per-kind behaviour of a realtime pipeline.
pub trait FeedPipeline: Send + Sync {
    type Record: Serialize + Send + Sync;
    type Row: Serialize;

    fn kind(&self) -> FeedKind;

    fn normalize(&self, feed: &FeedMessage) -> Result<Vec<Self::Record>>;

    /// Flattens records into CSV rows.
    fn rows(&self, records: &[Self::Record]) -> Vec<Self::Row>;

    fn write_raw(&self, sink: &FileSaver, feed: &FeedMessage) -> Result<PathBuf> {
        sink.write_json(self.kind().dir_name(), &raw_json(feed)?)
    }

    fn write_clean(&self, sink: &FileSaver, records: &[Self::Record]) -> Result<PathBuf> {
        sink.write_json(self.kind().dir_name(), records)
    }
}

pub struct PositionsPipeline;

impl FeedPipeline for PositionsPipeline {
    type Record = VehiclePositionRecord;
    type Row = VehiclePositionRecord;

    fn kind(&self) -> FeedKind {
        FeedKind::Positions
    }

    fn normalize(&self, feed: &FeedMessage) -> Result<Vec<Self::Record>> {
        Ok(normalize_positions(feed))
    }

    fn rows(&self, records: &[Self::Record]) -> Vec<Self::Row> {
        records.to_vec()
    }
}

pub struct TripUpdatesPipeline;

impl FeedPipeline for TripUpdatesPipeline {
    type Record = TripUpdateRecord;
    type Row = StopTimeRow;

    fn kind(&self) -> FeedKind {
        FeedKind::TripUpdates
    }

    fn normalize(&self, feed: &FeedMessage) -> Result<Vec<Self::Record>> {
        Ok(normalize_trip_updates(feed))
    }

    fn rows(&self, records: &[Self::Record]) -> Vec<Self::Row> {
        records.iter().flat_map(TripUpdateRecord::rows).collect()
    }
}

pub struct AlertsPipeline;

impl FeedPipeline for AlertsPipeline {
    type Record = AlertRecord;
    type Row = AlertRow;

    fn kind(&self) -> FeedKind {
        FeedKind::Alerts
    }

    fn normalize(&self, feed: &FeedMessage) -> Result<Vec<Self::Record>> {
        normalize_alerts(feed)
    }

    fn rows(&self, records: &[Self::Record]) -> Vec<Self::Row> {
        records.iter().flat_map(AlertRecord::rows).collect()
    }
}

/// Where one pipeline run reads from and writes to.
#[derive(Debug, Clone)]
pub struct FeedTarget {
    pub url: String,
    pub timeout: Duration,
    pub raw: FileSaver,
    pub clean: FileSaver,
    pub write_csv: bool,
}

impl FeedTarget {
    /// Resolves the endpoint and output directories of `kind`, creating the
    /// directories.
    pub fn for_kind(config: &Config, kind: FeedKind) -> Result<Self> {
        Ok(Self {
            url: format!("{}/{}", config.base_url, kind.endpoint()),
            timeout: config.realtime_timeout,
            raw: FileSaver::new(config.raw_realtime_dir(kind.dir_name()), &config.stamp)?,
            clean: FileSaver::new(config.clean_realtime_dir(kind.dir_name()), &config.stamp)?,
            write_csv: config.write_csv,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub kind: FeedKind,
    pub entities: usize,
    pub records: usize,
    pub raw_path: PathBuf,
    pub clean_path: PathBuf,
    pub csv_path: Option<PathBuf>,
}

/// Runs one pipeline: fetch, decode, normalize, then write the raw and clean
/// JSON (and CSV rows when enabled). Any failure aborts the run and is
/// logged before being returned.
#[tracing::instrument(skip_all, fields(kind = pipeline.kind().log_name()))]
pub async fn run_pipeline<P, C>(pipeline: &P, client: &C, target: &FeedTarget) -> Result<RunSummary>
where
    P: FeedPipeline,
    C: HttpClient,
{
    let result = run_stages(pipeline, client, target).await;
    if let Err(e) = &result {
        error!(error = %e, "Pipeline run failed");
    }
    result
}

async fn run_stages<P, C>(pipeline: &P, client: &C, target: &FeedTarget) -> Result<RunSummary>
where
    P: FeedPipeline,
    C: HttpClient,
{
    let name = pipeline.kind().dir_name();

    let bytes = fetch_bytes(client, &target.url, target.timeout).await?;
    let feed = parse_feed(&bytes)?;
    info!(entity_count = feed.entity.len(), "Feed parsed");

    let records = pipeline.normalize(&feed)?;

    let raw_path = pipeline.write_raw(&target.raw, &feed)?;
    info!(path = %raw_path.display(), "Saved raw feed");

    let clean_path = pipeline.write_clean(&target.clean, &records)?;
    info!(path = %clean_path.display(), records = records.len(), "Saved clean feed");

    let csv_path = if target.write_csv {
        let rows = pipeline.rows(&records);
        if rows.is_empty() {
            warn!("No rows to write, skipping CSV");
            None
        } else {
            Some(target.clean.write_csv(name, &rows)?)
        }
    } else {
        None
    };

    Ok(RunSummary {
        kind: pipeline.kind(),
        entities: feed.entity.len(),
        records: records.len(),
        raw_path,
        clean_path,
        csv_path,
    })
}

/// Runs the pipeline of `kind` against `client`.
pub async fn run_kind<C: HttpClient>(kind: FeedKind, client: &C, config: &Config) -> Result<RunSummary> {
    let target = FeedTarget::for_kind(config, kind)?;
    match kind {
        FeedKind::Positions => run_pipeline(&PositionsPipeline, client, &target).await,
        FeedKind::TripUpdates => run_pipeline(&TripUpdatesPipeline, client, &target).await,
        FeedKind::Alerts => run_pipeline(&AlertsPipeline, client, &target).await,
    }
}

/// Runs all three realtime pipelines concurrently over one connection pool.
///
/// Each run logs to its own file under the runs directory. A failing kind
/// does not stop the others; the outcome of every kind is returned.
pub async fn run_realtime(config: &Config) -> Result<Vec<(FeedKind, Result<RunSummary>)>> {
    let api_key = config.api_key()?.to_string();
    let client = UrlParam::new(BasicClient::new(), API_KEY_PARAM, api_key.as_str());
    let log_config = LogConfig::new(config.runs_dir(), &config.stamp).with_secret(api_key);

    let mut tasks = vec![];

    for kind in FeedKind::ALL {
        info!(kind = kind.log_name(), "Running pipeline");

        let client = client.clone();
        let config = config.clone();
        let log_config = log_config.clone();

        let task = tokio::spawn(async move {
            let (dispatch, _guard) = log_config.dispatch(kind.log_name())?;
            run_kind(kind, &client, &config)
                .with_subscriber(dispatch)
                .await
        });

        tasks.push((kind, task));
    }

    let mut outcomes = Vec::with_capacity(tasks.len());
    for (kind, task) in tasks {
        let outcome = task.await.map_err(Error::from).and_then(|r| r);
        match &outcome {
            Ok(summary) => info!(
                kind = kind.log_name(),
                records = summary.records,
                entities = summary.entities,
                "Pipeline complete"
            ),
            Err(e) => error!(kind = kind.log_name(), error = %e, "Pipeline failed"),
        }
        outcomes.push((kind, outcome));
    }

    info!("Run complete");
    Ok(outcomes)
}
