use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use gleaner_common::{GleanerError, Result};

use crate::traits::WebSearcher;

/// Serper.dev search client. One POST per query; organic results come back
/// in rank order.
pub struct SerperSearcher {
    api_key: String,
    client: reqwest::Client,
}

#[derive(Debug, serde::Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<SerperResult>,
}

#[derive(Debug, serde::Deserialize)]
struct SerperResult {
    #[serde(default)]
    link: String,
}

impl SerperSearcher {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
        }
    }
}

#[async_trait]
impl WebSearcher for SerperSearcher {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<String>> {
        debug!(query, max_results, "Serper search");

        let body = serde_json::json!({
            "q": query,
            "num": max_results,
        });

        let resp = self
            .client
            .post("https://google.serper.dev/search")
            .header("X-API-KEY", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| GleanerError::Search(format!("Serper request failed: {e}")))?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GleanerError::SearchRateLimited);
        }
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(GleanerError::Search(format!(
                "Serper returned {status}: {message}"
            )));
        }

        let data: SerperResponse = resp
            .json()
            .await
            .map_err(|e| GleanerError::Search(format!("Failed to parse Serper response: {e}")))?;

        let links: Vec<String> = data
            .organic
            .into_iter()
            .map(|r| r.link)
            .filter(|link| !link.is_empty())
            .take(max_results)
            .collect();

        info!(query, count = links.len(), "Serper search complete");
        Ok(links)
    }
}
