use tracing::debug;

use gleaner_common::{Config, Reply, Result};
use spacy_client::Token;

use crate::traits::TextAnalyzer;

/// Lemmas that mark a reply as a personal anecdote rather than a reusable
/// general-knowledge answer.
const FIRST_PERSON_LEMMAS: &[&str] = &[
    "i", "me", "my", "mine", "we", "us", "our", "ours", "myself", "ourselves",
];

/// Why a candidate reply was dropped from the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    TooLong,
    NonPrintable,
    LowScore,
    Edited,
    Pinned,
    AuthorMissing,
    Empty,
    BannedWord,
    PersonalVoice,
    Dated,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::TooLong => write!(f, "body over the length cap"),
            RejectReason::NonPrintable => write!(f, "non-printable characters"),
            RejectReason::LowScore => write!(f, "score below the floor"),
            RejectReason::Edited => write!(f, "edited after posting"),
            RejectReason::Pinned => write!(f, "pinned by a moderator"),
            RejectReason::AuthorMissing => write!(f, "author deleted"),
            RejectReason::Empty => write!(f, "no tokens"),
            RejectReason::BannedWord => write!(f, "banned word"),
            RejectReason::PersonalVoice => write!(f, "reads as a personal anecdote"),
            RejectReason::Dated => write!(f, "contains a date or time reference"),
        }
    }
}

/// Drop invalid replies and rank the survivors by score, descending.
///
/// The sort is stable, so equally scored replies keep the order they were
/// harvested in. Empty input is not an error.
pub async fn filter_and_rank(
    replies: Vec<Reply>,
    analyzer: &dyn TextAnalyzer,
    cfg: &Config,
) -> Result<Vec<Reply>> {
    let mut kept = Vec::new();
    for reply in replies {
        match reject_reason(&reply, analyzer, cfg).await? {
            None => kept.push(reply),
            Some(reason) => {
                debug!(reply_id = %reply.id, %reason, "Rejected candidate reply");
            }
        }
    }
    kept.sort_by(|a, b| b.score.cmp(&a.score));
    Ok(kept)
}

/// The first check a reply fails, or `None` when it is a usable answer.
///
/// Cheap field checks run first; the analyzer is consulted once, and only
/// for replies that survive them.
pub async fn reject_reason(
    reply: &Reply,
    analyzer: &dyn TextAnalyzer,
    cfg: &Config,
) -> Result<Option<RejectReason>> {
    if reply.body.chars().count() > cfg.max_reply_chars {
        return Ok(Some(RejectReason::TooLong));
    }
    if cfg.printable_only && !is_printable(&reply.body) {
        return Ok(Some(RejectReason::NonPrintable));
    }
    if reply.score < cfg.min_reply_score {
        return Ok(Some(RejectReason::LowScore));
    }
    if reply.edited {
        return Ok(Some(RejectReason::Edited));
    }
    if reply.pinned {
        return Ok(Some(RejectReason::Pinned));
    }
    if !reply.author_present {
        return Ok(Some(RejectReason::AuthorMissing));
    }

    let tokens = analyzer.tokens(&reply.body).await?;
    if tokens.is_empty() {
        return Ok(Some(RejectReason::Empty));
    }
    if !cfg.banned_words.is_empty()
        && tokens
            .iter()
            .any(|t| cfg.banned_words.contains(&t.text.to_lowercase()))
    {
        return Ok(Some(RejectReason::BannedWord));
    }
    if pronoun_ratio(&tokens) > cfg.max_pronoun_ratio {
        return Ok(Some(RejectReason::PersonalVoice));
    }
    if cfg.reject_first_person && contains_first_person(&tokens) {
        return Ok(Some(RejectReason::PersonalVoice));
    }
    if cfg.reject_dated && contains_datetime(&tokens) {
        return Ok(Some(RejectReason::Dated));
    }
    Ok(None)
}

/// Share of tokens tagged as personal pronouns (`PRP`, `PRP$`). Zero-token
/// input is defined as 0.0, though the `Empty` check fires before this is
/// ever reached on one.
pub fn pronoun_ratio(tokens: &[Token]) -> f64 {
    if tokens.is_empty() {
        return 0.0;
    }
    let pronouns = tokens
        .iter()
        .filter(|t| t.tag == "PRP" || t.tag == "PRP$")
        .count();
    pronouns as f64 / tokens.len() as f64
}

fn contains_first_person(tokens: &[Token]) -> bool {
    tokens
        .iter()
        .any(|t| t.pos == "PRON" && FIRST_PERSON_LEMMAS.contains(&t.lemma.to_lowercase().as_str()))
}

fn contains_datetime(tokens: &[Token]) -> bool {
    tokens
        .iter()
        .any(|t| t.ent_type == "DATE" || t.ent_type == "TIME")
}

/// Printable ASCII plus ordinary whitespace. Replies full of emoji or
/// zero-width tricks are not worth re-posting.
fn is_printable(text: &str) -> bool {
    text.chars().all(|c| {
        c.is_ascii_graphic() || c == ' ' || matches!(c, '\t' | '\n' | '\r' | '\x0B' | '\x0C')
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{date_token, pronoun_token, reply, word_token, CannedAnalyzer};

    fn lax_config() -> Config {
        Config {
            min_reply_score: 1,
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn ranks_by_score_descending() {
        let analyzer = CannedAnalyzer::new();
        let pool = vec![
            reply("r1", "first answer", 10),
            reply("r2", "second answer", 50),
            reply("r3", "third answer", 5),
        ];
        let ranked = filter_and_rank(pool, &analyzer, &lax_config()).await.unwrap();
        let scores: Vec<i64> = ranked.iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![50, 10, 5]);
    }

    #[tokio::test]
    async fn ties_keep_encounter_order() {
        let analyzer = CannedAnalyzer::new();
        let pool = vec![reply("first", "answer one", 50), reply("second", "answer two", 50)];
        let ranked = filter_and_rank(pool, &analyzer, &lax_config()).await.unwrap();
        let ids: Vec<&str> = ranked.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn empty_pool_is_not_an_error() {
        let analyzer = CannedAnalyzer::new();
        let ranked = filter_and_rank(Vec::new(), &analyzer, &lax_config())
            .await
            .unwrap();
        assert!(ranked.is_empty());
    }

    #[tokio::test]
    async fn edited_is_always_excluded() {
        let analyzer = CannedAnalyzer::new();
        let mut touched = reply("r1", "a great answer", 9000);
        touched.edited = true;
        let ranked = filter_and_rank(vec![touched], &analyzer, &lax_config())
            .await
            .unwrap();
        assert!(ranked.is_empty());
    }

    #[tokio::test]
    async fn field_checks_reject_without_the_analyzer() {
        let analyzer = CannedAnalyzer::new();
        let cfg = lax_config();

        let long = reply("r1", &"x".repeat(cfg.max_reply_chars + 1), 80);
        assert_eq!(
            reject_reason(&long, &analyzer, &cfg).await.unwrap(),
            Some(RejectReason::TooLong)
        );

        let low = reply("r2", "meh", 0);
        assert_eq!(
            reject_reason(&low, &analyzer, &cfg).await.unwrap(),
            Some(RejectReason::LowScore)
        );

        let mut pinned = reply("r3", "announcement", 80);
        pinned.pinned = true;
        assert_eq!(
            reject_reason(&pinned, &analyzer, &cfg).await.unwrap(),
            Some(RejectReason::Pinned)
        );

        let mut orphan = reply("r4", "who wrote this", 80);
        orphan.author_present = false;
        assert_eq!(
            reject_reason(&orphan, &analyzer, &cfg).await.unwrap(),
            Some(RejectReason::AuthorMissing)
        );

        assert_eq!(analyzer.token_calls(), 0);
    }

    #[tokio::test]
    async fn non_printable_rejected_unless_allowed() {
        let analyzer = CannedAnalyzer::new();
        let fancy = reply("r1", "great answer \u{1F600}", 80);

        let strict = lax_config();
        assert_eq!(
            reject_reason(&fancy, &analyzer, &strict).await.unwrap(),
            Some(RejectReason::NonPrintable)
        );

        let relaxed = Config {
            printable_only: false,
            ..lax_config()
        };
        assert_eq!(reject_reason(&fancy, &analyzer, &relaxed).await.unwrap(), None);
    }

    #[tokio::test]
    async fn zero_token_body_is_rejected() {
        let analyzer = CannedAnalyzer::new();
        let blank = reply("r1", "", 80);
        assert_eq!(
            reject_reason(&blank, &analyzer, &lax_config()).await.unwrap(),
            Some(RejectReason::Empty)
        );
    }

    #[tokio::test]
    async fn personal_voice_rejected_by_pronoun_ratio() {
        let analyzer = CannedAnalyzer::new().on_tokens(
            "i loved it",
            vec![pronoun_token("i"), word_token("loved"), word_token("it")],
        );
        let anecdote = reply("r1", "i loved it", 80);
        assert_eq!(
            reject_reason(&anecdote, &analyzer, &lax_config())
                .await
                .unwrap(),
            Some(RejectReason::PersonalVoice)
        );
    }

    #[tokio::test]
    async fn first_person_lemma_check_is_optional() {
        // One pronoun in twenty tokens stays under the ratio threshold.
        let mut tokens: Vec<Token> = (0..19).map(|i| word_token(&format!("w{i}"))).collect();
        tokens.push(pronoun_token("we"));
        let analyzer = CannedAnalyzer::new().on_tokens("long collective answer", tokens);
        let body = reply("r1", "long collective answer", 80);

        assert_eq!(
            reject_reason(&body, &analyzer, &lax_config()).await.unwrap(),
            None
        );

        let strict = Config {
            reject_first_person: true,
            ..lax_config()
        };
        assert_eq!(
            reject_reason(&body, &analyzer, &strict).await.unwrap(),
            Some(RejectReason::PersonalVoice)
        );
    }

    #[tokio::test]
    async fn dated_check_is_optional() {
        let analyzer = CannedAnalyzer::new().on_tokens(
            "the event is tomorrow",
            vec![
                word_token("the"),
                word_token("event"),
                word_token("is"),
                date_token("tomorrow"),
            ],
        );
        let timely = reply("r1", "the event is tomorrow", 80);

        assert_eq!(
            reject_reason(&timely, &analyzer, &lax_config()).await.unwrap(),
            None
        );

        let strict = Config {
            reject_dated: true,
            ..lax_config()
        };
        assert_eq!(
            reject_reason(&timely, &analyzer, &strict).await.unwrap(),
            Some(RejectReason::Dated)
        );
    }

    #[tokio::test]
    async fn banned_words_match_tokens() {
        let cfg = Config {
            banned_words: vec!["spoiler".to_string()],
            ..lax_config()
        };
        let analyzer = CannedAnalyzer::new();
        let tainted = reply("r1", "huge SPOILER ahead", 80);
        assert_eq!(
            reject_reason(&tainted, &analyzer, &cfg).await.unwrap(),
            Some(RejectReason::BannedWord)
        );

        let clean = reply("r2", "a perfectly fine answer", 80);
        assert_eq!(reject_reason(&clean, &analyzer, &cfg).await.unwrap(), None);
    }

    #[test]
    fn pronoun_ratio_is_total() {
        assert_eq!(pronoun_ratio(&[]), 0.0);
        let tokens = vec![
            pronoun_token("i"),
            word_token("like"),
            word_token("rust"),
            word_token("a"),
        ];
        assert_eq!(pronoun_ratio(&tokens), 0.25);
    }
}
