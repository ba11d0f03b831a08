//! Download and extraction of the GTFS static schedule.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::instrument::WithSubscriber;
use tracing::{error, info};

use crate::config::Config;
use crate::error::Result;
use crate::fetch::{BasicClient, HttpClient, fetch_bytes};
use crate::logging::LogConfig;

/// Extracts a ZIP archive held in memory into `dir`, returning the number of
/// entries.
pub fn extract_zip(bytes: &[u8], dir: &Path) -> Result<usize> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    archive.extract(dir)?;
    Ok(archive.len())
}

/// Downloads the static ZIP and unpacks it into `<data>/raw/static/gtfs_static_<stamp>`.
#[tracing::instrument(skip_all, fields(url = %config.static_url))]
pub async fn fetch_static<C: HttpClient>(client: &C, config: &Config) -> Result<PathBuf> {
    let output_dir = config.static_dir();
    std::fs::create_dir_all(&output_dir)?;
    info!(dir = %output_dir.display(), "Created output directory");

    let bytes = fetch_bytes(client, &config.static_url, config.static_timeout)
        .await
        .inspect_err(|e| error!(error = %e, "Failed to download the ZIP file"))?;

    info!(bytes = bytes.len(), "Unzipping the file");
    let entries = extract_zip(&bytes, &output_dir)
        .inspect_err(|e| error!(error = %e, "The downloaded file is not a valid ZIP"))?;

    info!(entries, dir = %output_dir.display(), "Extraction completed");
    Ok(output_dir)
}

/// Runs [`fetch_static`] with its own `static_<stamp>.log`.
pub async fn run_static(config: &Config) -> Result<PathBuf> {
    let log_config = LogConfig::new(config.runs_dir(), &config.stamp);
    let (dispatch, _guard) = log_config.dispatch("static")?;

    fetch_static(&BasicClient::new(), config)
        .with_subscriber(dispatch)
        .await
}
