use gleaner_common::Result;

use crate::normalize::normalize_title;
use crate::traits::TextAnalyzer;

/// Semantic closeness of two question titles in [0, 1].
///
/// Both titles are normalized first. When either normalizes to nothing there
/// is no content to compare and the score is 0.0 without consulting the
/// analyzer (some models error on empty input, others return NaN-ish junk).
/// The analyzer's raw score is clamped into [0, 1].
pub async fn title_similarity(analyzer: &dyn TextAnalyzer, a: &str, b: &str) -> Result<f64> {
    let a = normalize_title(a);
    let b = normalize_title(b);
    if a.is_empty() || b.is_empty() {
        return Ok(0.0);
    }
    let raw = analyzer.similarity(&a, &b).await?;
    Ok(raw.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::CannedAnalyzer;

    #[tokio::test]
    async fn identical_titles_score_one() {
        let analyzer = CannedAnalyzer::new();
        let score = title_similarity(&analyzer, "What is the best advice?", "what is the best advice?")
            .await
            .unwrap();
        assert_eq!(score, 1.0);
    }

    #[tokio::test]
    async fn boilerplate_does_not_change_the_comparison() {
        let analyzer = CannedAnalyzer::new();
        let score = title_similarity(
            &analyzer,
            "[Serious] Reddit, what is the best advice?",
            "what is the best advice?",
        )
        .await
        .unwrap();
        assert_eq!(score, 1.0);
    }

    #[tokio::test]
    async fn empty_titles_score_zero_without_analyzer_calls() {
        let analyzer = CannedAnalyzer::new();
        assert_eq!(
            title_similarity(&analyzer, "", "what is x?").await.unwrap(),
            0.0
        );
        assert_eq!(
            title_similarity(&analyzer, "[Serious]", "what is x?")
                .await
                .unwrap(),
            0.0
        );
        assert_eq!(analyzer.similarity_calls(), 0);
    }

    #[tokio::test]
    async fn registered_pairs_are_symmetric_and_clamped() {
        let analyzer = CannedAnalyzer::new()
            .on_similarity("what is x?", "what is y?", 0.42)
            .on_similarity("near twin a", "near twin b", 1.7);
        assert_eq!(
            title_similarity(&analyzer, "what is x?", "what is y?")
                .await
                .unwrap(),
            0.42
        );
        assert_eq!(
            title_similarity(&analyzer, "what is y?", "what is x?")
                .await
                .unwrap(),
            0.42
        );
        assert_eq!(
            title_similarity(&analyzer, "near twin a", "near twin b")
                .await
                .unwrap(),
            1.0
        );
    }
}
