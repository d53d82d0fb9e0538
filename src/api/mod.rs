pub mod error;
pub mod types;

#[cfg(test)]
pub(crate) mod fake;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

pub use error::{ApiError, ApiResult};
use types::{ChatRequest, ChatResponse, CreateRepoRequest, CreatedRepo, IndexResult, RepoRecord};

pub const API_BASE_ENV: &str = "CODEDOC_API_BASE_URL";

/// The remote indexing/chat service.
#[async_trait]
pub trait RepoApi: Send + Sync {
    async fn create_repo(&self, name: Option<&str>, github_url: &str) -> ApiResult<CreatedRepo>;
    async fn list_repos(&self) -> ApiResult<Vec<RepoRecord>>;
    async fn index_repo(&self, repo_id: &str) -> ApiResult<IndexResult>;
    async fn chat(&self, repo_id: &str, question: &str) -> ApiResult<ChatResponse>;
}

pub struct ApiClient {
    client: reqwest::Client,
    base_url: Option<Url>,
}

impl ApiClient {
    pub fn from_env() -> Result<Self> {
        let base_url = dotenv::var(API_BASE_ENV).ok();
        Self::new(base_url.as_deref())
    }

    /// An empty or unparsable base URL is accepted here and reported as a
    /// configuration error by every request.
    pub fn new(base_url: Option<&str>) -> Result<Self> {
        let base_url = base_url
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .and_then(|b| Url::parse(b).ok())
            .filter(|u| !u.cannot_be_a_base());

        let client = reqwest::Client::builder()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, base_url })
    }

    pub fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }

    /// Resolve `base/<segments...>`, percent-escaping each segment.
    fn endpoint(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = self
            .base_url
            .clone()
            .ok_or_else(|| ApiError::Configuration(API_BASE_ENV.to_string()))?;
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| ApiError::Configuration(API_BASE_ENV.to_string()))?;
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    async fn send<B, T>(&self, method: Method, segments: &[&str], body: Option<&B>) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned + Default,
    {
        let url = self.endpoint(segments)?;
        debug!(%method, %url, "API request");

        let mut req = self.client.request(method, url);
        if let Some(body) = body {
            req = req.json(body);
        }
        let resp = req.send().await?;
        handle_response(resp).await
    }
}

/// Read the whole body before branching on status so error bodies are kept
/// and empty success bodies map to `T::default()`.
async fn handle_response<T: DeserializeOwned + Default>(resp: reqwest::Response) -> ApiResult<T> {
    let status = resp.status();
    let text = resp.text().await?;

    if !status.is_success() {
        return Err(ApiError::from_status(status.as_u16(), text));
    }
    if text.trim().is_empty() {
        return Ok(T::default());
    }
    Ok(serde_json::from_str(&text)?)
}

#[async_trait]
impl RepoApi for ApiClient {
    async fn create_repo(&self, name: Option<&str>, github_url: &str) -> ApiResult<CreatedRepo> {
        let body = CreateRepoRequest { name, github_url };
        self.send(Method::POST, &["repos"], Some(&body)).await
    }

    async fn list_repos(&self) -> ApiResult<Vec<RepoRecord>> {
        self.send::<(), _>(Method::GET, &["repos"], None).await
    }

    async fn index_repo(&self, repo_id: &str) -> ApiResult<IndexResult> {
        self.send::<(), _>(Method::POST, &["repos", repo_id, "index"], None)
            .await
    }

    async fn chat(&self, repo_id: &str, question: &str) -> ApiResult<ChatResponse> {
        let body = ChatRequest { question };
        self.send(Method::POST, &["repos", repo_id, "chat"], Some(&body))
            .await
    }
}
