use async_trait::async_trait;

use gleaner_common::{GleanerError, Result};
use spacy_client::{SpacyClient, Token};

use crate::traits::TextAnalyzer;

#[async_trait]
impl TextAnalyzer for SpacyClient {
    async fn tokens(&self, text: &str) -> Result<Vec<Token>> {
        self.analyze(text)
            .await
            .map_err(|e| GleanerError::Analyzer(e.to_string()))
    }

    async fn similarity(&self, a: &str, b: &str) -> Result<f64> {
        SpacyClient::similarity(self, a, b)
            .await
            .map_err(|e| GleanerError::Analyzer(e.to_string()))
    }
}
