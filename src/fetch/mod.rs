//! HTTP fetching of binary feed payloads.

mod basic;
mod client;
pub mod auth;

pub use basic::BasicClient;
pub use client::HttpClient;

use std::time::Duration;
use tracing::{error, info};

use crate::error::FetchError;

/// Fetches `url` and returns the response body.
///
/// The timeout bounds the whole request. Non-2xx responses are reported as
/// [`FetchError::Status`]; nothing is retried.
#[tracing::instrument(skip(client, url), fields(url = %url))]
pub async fn fetch_bytes<C: HttpClient>(
    client: &C,
    url: &str,
    timeout: Duration,
) -> Result<Vec<u8>, FetchError> {
    let parsed =
        reqwest::Url::parse(url).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;

    let mut req = reqwest::Request::new(reqwest::Method::GET, parsed);
    *req.timeout_mut() = Some(timeout);

    info!("Fetching feed");
    let resp = match client.execute(req).await {
        Ok(resp) => resp,
        Err(e) => {
            let err = FetchError::from_reqwest(e, url);
            error!(error = %err, "Feed request failed");
            return Err(err);
        }
    };

    let status = resp.status();
    if !status.is_success() {
        let err = FetchError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        };
        error!(status = status.as_u16(), "HTTP error while fetching feed");
        return Err(err);
    }

    let bytes = resp.bytes().await.map_err(|e| {
        let err = FetchError::from_reqwest(e, url);
        error!(error = %err, "Failed reading feed body");
        err
    })?;

    info!(bytes = bytes.len(), "Fetch successful");
    Ok(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::auth::UrlParam;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_bytes_returns_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/gtfsposition"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x0a, 0x00]))
            .mount(&mock_server)
            .await;

        let url = format!("{}/gtfsposition", mock_server.uri());
        let bytes = fetch_bytes(&BasicClient::new(), &url, Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(bytes, vec![0x0a, 0x00]);
    }

    #[tokio::test]
    async fn test_fetch_bytes_non_success_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&mock_server)
            .await;

        let url = format!("{}/gtfsrealtime", mock_server.uri());
        let err = fetch_bytes(&BasicClient::new(), &url, Duration::from_secs(5))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Status { status: 403, .. }));
    }

    #[tokio::test]
    async fn test_fetch_bytes_timeout() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&mock_server)
            .await;

        let url = format!("{}/gtfsalerts", mock_server.uri());
        let err = fetch_bytes(&BasicClient::new(), &url, Duration::from_millis(50))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_fetch_bytes_connection_refused() {
        let client = UrlParam::new(BasicClient::new(), "apikey", "s3cret");
        let err = fetch_bytes(&client, "http://127.0.0.1:1/gtfsposition", Duration::from_secs(2))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Connection(_)));
        assert!(!err.to_string().contains("s3cret"));
    }

    #[tokio::test]
    async fn test_fetch_bytes_invalid_url() {
        let err = fetch_bytes(&BasicClient::new(), "not a url", Duration::from_secs(1))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::InvalidUrl(_)));
    }
}
