//! Runtime configuration, resolved from the environment (`.env` included).

use chrono::{DateTime, Local};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

pub const API_KEY_VAR: &str = "TRANSLINK_API_KEY";
pub const API_KEY_PARAM: &str = "apikey";
pub const DEFAULT_BASE_URL: &str = "https://gtfsapi.translink.ca/v3";
pub const DEFAULT_STATIC_URL: &str = "https://gtfs-static.translink.ca/gtfs/google_transit.zip";
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_REALTIME_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_STATIC_TIMEOUT: Duration = Duration::from_secs(10);

/// Formats a run stamp as used in file and directory names.
pub fn run_stamp(now: DateTime<Local>) -> String {
    now.format("%Y-%m-%dT%H-%M").to_string()
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub base_url: String,
    pub static_url: String,
    pub data_dir: PathBuf,
    pub realtime_timeout: Duration,
    pub static_timeout: Duration,
    /// Shared by every file written during one run.
    pub stamp: String,
    pub write_csv: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable source. Unset or empty
    /// variables fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());

        Self {
            api_key: var(API_KEY_VAR),
            base_url: var("TRANSLINK_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            static_url: var("GTFS_STATIC_URL").unwrap_or_else(|| DEFAULT_STATIC_URL.to_string()),
            data_dir: var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            realtime_timeout: DEFAULT_REALTIME_TIMEOUT,
            static_timeout: DEFAULT_STATIC_TIMEOUT,
            stamp: run_stamp(Local::now()),
            write_csv: false,
        }
    }

    pub fn api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or(Error::MissingEnv(API_KEY_VAR))
    }

    pub fn runs_dir(&self) -> PathBuf {
        self.data_dir.join("runs")
    }

    pub fn raw_realtime_dir(&self, kind_dir: &str) -> PathBuf {
        self.data_dir.join("raw/realtime").join(kind_dir)
    }

    pub fn clean_realtime_dir(&self, kind_dir: &str) -> PathBuf {
        self.data_dir.join("clean/realtime").join(kind_dir)
    }

    pub fn static_dir(&self) -> PathBuf {
        self.data_dir
            .join("raw/static")
            .join(format!("gtfs_static_{}", self.stamp))
    }
}
