use async_trait::async_trait;
use reqwest::{Request, Response};

/// Something that can execute a single HTTP request.
///
/// Dropping the returned future must abort the request; the executor relies
/// on this to enforce its timeout.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
