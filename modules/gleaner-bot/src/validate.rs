use chrono::{DateTime, Utc};

use gleaner_common::{Config, Question, QuestionCheck, Result, SkipReason};

use crate::traits::TextAnalyzer;

/// Screen a question for processing: uniqueness (supplied by the ledger) and
/// validity. `reason` is the first failed check in the `SkipReason` order;
/// the title-length check is the only one that costs an analyzer call and
/// runs after the cheap field checks.
pub async fn screen_question(
    question: &Question,
    already_seen: bool,
    analyzer: &dyn TextAnalyzer,
    now: DateTime<Utc>,
    cfg: &Config,
) -> Result<QuestionCheck> {
    let reason = disqualifier(question, analyzer, now, cfg).await?;
    Ok(QuestionCheck {
        is_unique: !already_seen,
        is_valid: reason.is_none(),
        reason,
    })
}

async fn disqualifier(
    question: &Question,
    analyzer: &dyn TextAnalyzer,
    now: DateTime<Utc>,
    cfg: &Config,
) -> Result<Option<SkipReason>> {
    if question.age_hours(now) > cfg.max_question_age_hours {
        return Ok(Some(SkipReason::OverAge));
    }
    if !question.author_present {
        return Ok(Some(SkipReason::AuthorMissing));
    }
    let tokens = analyzer.tokens(&question.title).await?;
    if tokens.len() > cfg.max_title_tokens {
        return Ok(Some(SkipReason::TitleTooLong));
    }
    if question.comment_count > cfg.max_question_replies {
        return Ok(Some(SkipReason::RepliesSaturated));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{question, CannedAnalyzer};

    #[tokio::test]
    async fn fresh_authored_question_passes() {
        let analyzer = CannedAnalyzer::new();
        let q = question("q1", "What is the best advice you have received?", 5);
        let check = screen_question(&q, false, &analyzer, Utc::now(), &Config::default())
            .await
            .unwrap();
        assert!(check.accepted());
        assert_eq!(check.reason, None);
    }

    #[tokio::test]
    async fn seen_question_is_not_unique_but_still_screened() {
        let analyzer = CannedAnalyzer::new();
        let q = question("q1", "What is the best advice you have received?", 5);
        let check = screen_question(&q, true, &analyzer, Utc::now(), &Config::default())
            .await
            .unwrap();
        assert!(!check.is_unique);
        assert!(check.is_valid);
        assert!(!check.accepted());
    }

    #[tokio::test]
    async fn over_age_wins_over_other_problems() {
        let analyzer = CannedAnalyzer::new();
        let mut q = question("q1", "Ancient question?", 400);
        q.author_present = false;
        let check = screen_question(&q, false, &analyzer, Utc::now(), &Config::default())
            .await
            .unwrap();
        assert_eq!(check.reason, Some(SkipReason::OverAge));
    }

    #[tokio::test]
    async fn missing_author_is_invalid() {
        let analyzer = CannedAnalyzer::new();
        let mut q = question("q1", "Who asked this?", 5);
        q.author_present = false;
        let check = screen_question(&q, false, &analyzer, Utc::now(), &Config::default())
            .await
            .unwrap();
        assert_eq!(check.reason, Some(SkipReason::AuthorMissing));
    }

    #[tokio::test]
    async fn rambling_title_is_invalid() {
        let analyzer = CannedAnalyzer::new();
        let title = vec!["word"; 25].join(" ");
        let q = question("q1", &title, 5);
        let check = screen_question(&q, false, &analyzer, Utc::now(), &Config::default())
            .await
            .unwrap();
        assert_eq!(check.reason, Some(SkipReason::TitleTooLong));
    }

    #[tokio::test]
    async fn saturated_question_is_invalid() {
        let analyzer = CannedAnalyzer::new();
        let mut q = question("q1", "Busy thread?", 5);
        q.comment_count = 500;
        let check = screen_question(&q, false, &analyzer, Utc::now(), &Config::default())
            .await
            .unwrap();
        assert_eq!(check.reason, Some(SkipReason::RepliesSaturated));
    }
}
