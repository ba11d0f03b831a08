//! Per-run logging setup.
//!
//! A [`LogConfig`] is handed to every pipeline run and builds a
//! [`Dispatch`] scoped to it: a file layer writing
//! `timestamp - name - level - message` lines to `<dir>/<name>_<stamp>.log`,
//! and a stderr layer with the same format where configured secrets are
//! replaced by [`MASK`]. The file output is not masked.

use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{Dispatch, Event, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::{self, FormatEvent, FormatFields};
use tracing_subscriber::fmt::{FmtContext, MakeWriter};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt};

use crate::error::{Error, Result};

/// Replacement for secrets in console output.
pub const MASK: &str = "***";

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub log_dir: PathBuf,
    pub stamp: String,
    pub secrets: Vec<String>,
    pub console: bool,
}

impl LogConfig {
    pub fn new(log_dir: impl Into<PathBuf>, stamp: impl Into<String>) -> Self {
        Self {
            log_dir: log_dir.into(),
            stamp: stamp.into(),
            secrets: Vec::new(),
            console: true,
        }
    }

    /// Adds a value that must never reach the console. Empty values are ignored.
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        let secret = secret.into();
        if !secret.is_empty() {
            self.secrets.push(secret);
        }
        self
    }

    pub fn without_console(mut self) -> Self {
        self.console = false;
        self
    }

    pub fn log_path(&self, name: &str) -> PathBuf {
        self.log_dir.join(format!("{}_{}.log", name, self.stamp))
    }

    /// Builds the subscriber for one run named `name`.
    ///
    /// The returned guard flushes the log file when dropped and must be kept
    /// alive for the duration of the run.
    pub fn dispatch(&self, name: &str) -> Result<(Dispatch, WorkerGuard)> {
        self.build_dispatch(name, std::io::stderr)
    }

    /// Installs the subscriber for `name` as the process-wide default.
    pub fn init_global(&self, name: &str) -> Result<WorkerGuard> {
        let (dispatch, guard) = self.dispatch(name)?;
        tracing::dispatcher::set_global_default(dispatch)
            .map_err(|e| Error::Logging(e.to_string()))?;
        Ok(guard)
    }

    fn build_dispatch<W>(&self, name: &str, console: W) -> Result<(Dispatch, WorkerGuard)>
    where
        W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
    {
        fs::create_dir_all(&self.log_dir)?;

        let file_appender = RollingFileAppender::builder()
            .rotation(Rotation::NEVER)
            .filename_prefix(format!("{}_{}", name, self.stamp))
            .filename_suffix("log")
            .build(&self.log_dir)
            .map_err(|e| Error::Logging(e.to_string()))?;
        let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

        let file_layer = tracing_subscriber::fmt::layer()
            .event_format(LineFormat::new(name, Vec::new()))
            .with_ansi(false)
            .with_writer(non_blocking_file)
            .with_filter(LevelFilter::INFO);

        let console_layer = self.console.then(|| {
            tracing_subscriber::fmt::layer()
                .event_format(LineFormat::new(name, self.secrets.clone()))
                .with_ansi(false)
                .with_writer(console)
                .with_filter(EnvFilter::from_env("RUST_LOG").add_directive(LevelFilter::INFO.into()))
        });

        let subscriber = tracing_subscriber::registry()
            .with(file_layer)
            .with(console_layer);

        Ok((Dispatch::new(subscriber), guard))
    }
}

/// Replaces every occurrence of each secret in `text` with [`MASK`].
pub fn mask(text: &str, secrets: &[String]) -> String {
    secrets
        .iter()
        .filter(|s| !s.is_empty())
        .fold(text.to_string(), |acc, secret| acc.replace(secret.as_str(), MASK))
}

/// `timestamp - name - level - message` event format.
struct LineFormat {
    name: String,
    secrets: Arc<[String]>,
}

impl LineFormat {
    fn new(name: &str, secrets: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            secrets: secrets.into(),
        }
    }
}

impl<S, N> FormatEvent<S, N> for LineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut message = String::new();
        ctx.field_format()
            .format_fields(format::Writer::new(&mut message), event)?;

        let line = format!(
            "{} - {} - {} - {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S,%3f"),
            self.name,
            event.metadata().level(),
            message
        );

        writeln!(writer, "{}", mask(&line, &self.secrets))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::Mutex;
    use tracing::{error, info};

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Buffer {
        type Writer = Buffer;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    impl Buffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn test_mask_replaces_every_secret() {
        let secrets = vec!["abc123".to_string(), String::new()];
        assert_eq!(
            mask("url?apikey=abc123&again=abc123", &secrets),
            "url?apikey=***&again=***"
        );
    }

    #[test]
    fn test_with_secret_ignores_empty() {
        let config = LogConfig::new("logs", "t").with_secret("").with_secret("k");
        assert_eq!(config.secrets, vec!["k".to_string()]);
    }

    #[test]
    fn test_console_is_masked_and_file_is_not() {
        let tmp = tempfile::tempdir().unwrap();
        let config = LogConfig::new(tmp.path(), "2024-01-01T00-00").with_secret("abc123");
        let console = Buffer::default();

        let (dispatch, guard) = config.build_dispatch("positions", console.clone()).unwrap();
        tracing::dispatcher::with_default(&dispatch, || {
            info!("Fetching from https://host/feed?apikey=abc123");
            error!(status = 500, "HTTP error");
        });
        drop(guard);

        let console = console.contents();
        assert!(console.contains(" - positions - INFO - Fetching from https://host/feed?apikey=***"));
        assert!(console.contains(" - positions - ERROR - HTTP error status=500"));
        assert!(!console.contains("abc123"));

        let file = fs::read_to_string(config.log_path("positions")).unwrap();
        assert!(file.contains("apikey=abc123"));
        assert_eq!(file.lines().count(), 2);
    }

    #[test]
    fn test_file_skips_debug_events() {
        let tmp = tempfile::tempdir().unwrap();
        let config = LogConfig::new(tmp.path(), "t").without_console();

        let (dispatch, guard) = config.dispatch("alerts").unwrap();
        tracing::dispatcher::with_default(&dispatch, || {
            tracing::debug!("noise");
            info!("kept");
        });
        drop(guard);

        let file = fs::read_to_string(config.log_path("alerts")).unwrap();
        assert!(file.contains(" - alerts - INFO - kept"));
        assert!(!file.contains("noise"));
    }

    #[test]
    fn test_dispatch_names_file_after_run() {
        let tmp = tempfile::tempdir().unwrap();
        let config = LogConfig::new(tmp.path(), "2024-01-01T00-00").without_console();

        let (_dispatch, guard) = config.dispatch("realtime").unwrap();
        drop(guard);

        assert!(tmp.path().join("realtime_2024-01-01T00-00.log").is_file());
    }

    #[test]
    fn test_dispatch_reports_unwritable_log_file() {
        let tmp = tempfile::tempdir().unwrap();
        let config = LogConfig::new(tmp.path(), "t").without_console();
        fs::create_dir(config.log_path("static")).unwrap();

        let err = config.dispatch("static").unwrap_err();

        assert!(matches!(err, Error::Logging(_)));
    }
}
