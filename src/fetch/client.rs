use async_trait::async_trait;
use reqwest::{Request, Response};

/// Executes a prepared request. Implementations are shared across the
/// concurrently running feed pipelines.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
