// Web search collaborator seam, used for company-website discovery.

use async_trait::async_trait;

use crate::error::AppError;

/// One web search result, ordered by relevance by the provider.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub url: String,
    pub title: String,
    pub description: String,
}

#[async_trait]
pub trait WebSearcher: Send + Sync {
    /// Search the web; may return fewer than `count` results, or none.
    async fn search(&self, query: &str, count: usize) -> Result<Vec<SearchHit>, AppError>;
}

/// Brave Search API client.
pub struct BraveSearcher {
    api_key: String,
    client: reqwest::Client,
}

const BRAVE_ENDPOINT: &str = "https://api.search.brave.com/res/v1/web/search";

impl BraveSearcher {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl WebSearcher for BraveSearcher {
    async fn search(&self, query: &str, count: usize) -> Result<Vec<SearchHit>, AppError> {
        #[derive(serde::Deserialize)]
        struct Response {
            web: Option<Web>,
        }

        #[derive(serde::Deserialize)]
        struct Web {
            results: Vec<BraveResult>,
        }

        #[derive(serde::Deserialize)]
        struct BraveResult {
            url: String,
            title: Option<String>,
            description: Option<String>,
        }

        let resp = self
            .client
            .get(BRAVE_ENDPOINT)
            .query(&[("q", query), ("count", &count.to_string())])
            .header("Accept", "application/json")
            .header("X-Subscription-Token", &self.api_key)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(AppError::Search(format!(
                "Brave Search returned {}",
                resp.status()
            )));
        }

        let body: Response = resp.json().await?;

        let hits = body
            .web
            .map(|w| w.results)
            .unwrap_or_default()
            .into_iter()
            .map(|r| SearchHit {
                url: r.url,
                title: r.title.unwrap_or_default(),
                description: r.description.unwrap_or_default(),
            })
            .collect();

        Ok(hits)
    }
}
