use async_trait::async_trait;
use reqwest::{Request, Response};

/// Executes prepared requests. Lets tests and wrappers stand in for
/// [`super::BasicClient`].
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
