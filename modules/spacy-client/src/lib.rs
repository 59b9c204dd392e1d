pub mod error;

pub use error::{Result, SpacyError};

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// One token from the sidecar's analysis: surface text plus the linguistic
/// annotations the filters care about (fine-grained tag, coarse POS, lemma,
/// named-entity type; empty string when the token is not part of an entity).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub lemma: String,
    pub pos: String,
    pub tag: String,
    #[serde(default)]
    pub ent_type: String,
}

#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnalyzeResponse {
    #[serde(default)]
    tokens: Vec<Token>,
}

#[derive(Debug, Serialize)]
struct SimilarityRequest<'a> {
    a: &'a str,
    b: &'a str,
}

#[derive(Debug, Deserialize)]
struct SimilarityResponse {
    similarity: f64,
}

pub struct SpacyClient {
    client: reqwest::Client,
    base_url: String,
}

impl SpacyClient {
    pub fn new(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Tokenize and annotate a text. Empty input yields an empty token list.
    pub async fn analyze(&self, text: &str) -> Result<Vec<Token>> {
        let endpoint = format!("{}/analyze", self.base_url);
        let resp = self
            .client
            .post(&endpoint)
            .json(&AnalyzeRequest { text })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            tracing::warn!(%status, "spaCy analyze request failed");
            return Err(SpacyError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: AnalyzeResponse = resp.json().await?;
        Ok(parsed.tokens)
    }

    /// Vector similarity of two texts as the model reports it.
    pub async fn similarity(&self, a: &str, b: &str) -> Result<f64> {
        let endpoint = format!("{}/similarity", self.base_url);
        let resp = self
            .client
            .post(&endpoint)
            .json(&SimilarityRequest { a, b })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            tracing::warn!(%status, "spaCy similarity request failed");
            return Err(SpacyError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: SimilarityResponse = resp.json().await?;
        Ok(parsed.similarity)
    }
}
