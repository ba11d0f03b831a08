//! Error types for the feed archiver.
//!
//! Every pipeline stage returns [`Result`]; an error aborts the run of the
//! feed kind that produced it and nothing else.

use thiserror::Error;

/// Failures while fetching a feed over HTTP.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("connection error: {0}")]
    Connection(#[source] reqwest::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// Classifies a transport error from reqwest.
    ///
    /// The request URL carries the API key, so it is stripped from the
    /// wrapped error; `url` is the endpoint without credentials.
    pub fn from_reqwest(err: reqwest::Error, url: &str) -> Self {
        if err.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else if let Some(status) = err.status() {
            FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            }
        } else {
            FetchError::Connection(err.without_url())
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("failed to decode feed: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("unknown {field} value {value}")]
    UnknownEnumValue { field: &'static str, value: i32 },

    #[error("cannot write {name}: rows are empty")]
    EmptyInput { name: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("missing environment variable {0}")]
    MissingEnv(&'static str),

    #[error("pipeline task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("logging setup failed: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_enum_value_message() {
        let err = Error::UnknownEnumValue {
            field: "cause",
            value: 42,
        };
        assert_eq!(err.to_string(), "unknown cause value 42");
    }

    #[test]
    fn test_fetch_error_wraps_into_error() {
        let err: Error = FetchError::Status {
            status: 503,
            url: "https://example.com/feed".to_string(),
        }
        .into();
        assert!(matches!(err, Error::Fetch(FetchError::Status { status: 503, .. })));
        assert_eq!(
            err.to_string(),
            "fetch failed: HTTP 503 from https://example.com/feed"
        );
    }
}
