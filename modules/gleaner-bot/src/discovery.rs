use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use url::Url;

use gleaner_common::{CommentView, Config, Discussion, GleanerError, Question, Reply, Result};

use crate::normalize::normalize_title;
use crate::pacer::Pacer;
use crate::similarity::title_similarity;
use crate::traits::{Forum, TextAnalyzer, WebSearcher};

/// Find prior discussions of the same question and pool their replies.
///
/// The web search is restricted to the community (`site:` query on the
/// normalized title); each hit is fetched through the forum and kept only when
/// it is old enough to have settled, scored well, and its title reads as the
/// same question. Replies of accepted discussions are pooled unfiltered; the
/// ranker downstream decides what is postable.
pub async fn discover(
    question: &Question,
    forum: &dyn Forum,
    searcher: &dyn WebSearcher,
    analyzer: &dyn TextAnalyzer,
    pacer: &Pacer,
    cfg: &Config,
    now: DateTime<Utc>,
) -> Result<Vec<Reply>> {
    let query = format!(
        "site:{}/r/{} {}",
        cfg.search_domain,
        cfg.community,
        normalize_title(&question.title)
    );
    debug!(question_id = %question.id, %query, "Searching for prior discussions");

    let links = search_with_retry(searcher, pacer, cfg, &query).await?;
    let view = CommentView {
        limit: cfg.comment_fetch_limit,
        ..CommentView::default()
    };

    let mut pool = Vec::new();
    for link in &links {
        let Some(id) = extract_discussion_id(link) else {
            debug!(%link, "Skipping link without a discussion id");
            continue;
        };
        let discussion = fetch_with_retry(forum, pacer, cfg, &id, &view).await?;

        let age_days = discussion.age_days(now);
        if age_days < cfg.min_discussion_age_days {
            debug!(
                discussion_id = %discussion.id,
                age_days,
                "Discussion too recent to have settled"
            );
            continue;
        }

        let sim = title_similarity(analyzer, &question.title, &discussion.title).await?;
        if sim > cfg.similarity_threshold && discussion.score > cfg.min_discussion_score {
            info!(
                question_id = %question.id,
                discussion_id = %discussion.id,
                similarity = sim,
                score = discussion.score,
                replies = discussion.replies.len(),
                "Accepted prior discussion"
            );
            pool.extend(discussion.replies);
        } else {
            debug!(
                discussion_id = %discussion.id,
                similarity = sim,
                score = discussion.score,
                "Rejected candidate discussion"
            );
        }
    }
    Ok(pool)
}

/// Run the search, cooling down and retrying on provider rate limits.
///
/// Bounded loop: `search_retry_budget` attempts with `search_cooldown_secs *
/// 2^attempt` between them. The last failure propagates so the caller can
/// abandon the question without treating it as fatal.
async fn search_with_retry(
    searcher: &dyn WebSearcher,
    pacer: &Pacer,
    cfg: &Config,
    query: &str,
) -> Result<Vec<String>> {
    for attempt in 0..cfg.search_retry_budget {
        match searcher.search(query, cfg.search_results).await {
            Ok(links) => return Ok(links),
            Err(GleanerError::SearchRateLimited) if attempt + 1 < cfg.search_retry_budget => {
                let cooldown = cfg.search_cooldown_secs * 2u64.pow(attempt);
                warn!(attempt, cooldown_secs = cooldown, "Search rate limited, cooling down");
                if !pacer.wait(Duration::from_secs(cooldown)).await {
                    return Err(GleanerError::SearchRateLimited);
                }
            }
            Err(e) => return Err(e),
        }
    }
    Err(GleanerError::SearchRateLimited)
}

/// Fetch a discussion, pausing and retrying when the forum rate-limits us.
async fn fetch_with_retry(
    forum: &dyn Forum,
    pacer: &Pacer,
    cfg: &Config,
    id: &str,
    view: &CommentView,
) -> Result<Discussion> {
    for attempt in 0..cfg.search_retry_budget {
        match forum.discussion(id, view).await {
            Ok(d) => return Ok(d),
            Err(GleanerError::RateLimited { retry_after_secs })
                if attempt + 1 < cfg.search_retry_budget =>
            {
                let pause =
                    retry_after_secs.unwrap_or(cfg.search_cooldown_secs * 2u64.pow(attempt));
                warn!(attempt, pause_secs = pause, "Forum rate limited, pausing");
                if !pacer.wait(Duration::from_secs(pause)).await {
                    return Err(GleanerError::RateLimited { retry_after_secs });
                }
            }
            Err(e) => return Err(e),
        }
    }
    Err(GleanerError::RateLimited {
        retry_after_secs: None,
    })
}

/// Pull the discussion id out of a result URL.
///
/// Forum permalinks embed the id as `/comments/<id>/`; anything else (user
/// pages, wiki links, off-site noise the `site:` filter let through) yields
/// `None`.
pub(crate) fn extract_discussion_id(link: &str) -> Option<String> {
    let url = Url::parse(link).ok()?;
    let re = regex::Regex::new(r"comments/([a-z0-9]+)/").expect("valid regex");
    re.captures(url.path())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}
