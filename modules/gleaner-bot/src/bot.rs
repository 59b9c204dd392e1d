use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use gleaner_common::{Config, GleanerError, Question, Result, SkipReason, SortOrder};
use gleaner_ledger::Ledger;

use crate::discovery::discover;
use crate::filter::filter_and_rank;
use crate::pacer::{AccountStats, Pacer};
use crate::traits::{Forum, TextAnalyzer, WebSearcher};
use crate::validate::screen_question;

/// How many of the account's own replies the retirement pass inspects.
const RETIRE_SCAN_LIMIT: u32 = 100;

/// Own-reply scores carried into the pacer snapshot after each cycle.
const RECENT_SCORE_SAMPLE: u32 = 5;

/// Re-check interval while outside the active-hours window.
const OFF_HOURS_RECHECK_SECS: u64 = 300;

/// Dry-run previews are cut to this many characters in the log.
const PREVIEW_CHARS: usize = 120;

/// What became of one question.
#[derive(Debug, PartialEq)]
pub enum Outcome {
    /// Already in the ledger; recency refreshed, nothing else done.
    Duplicate,
    /// Screened out before any search.
    Invalid(SkipReason),
    /// Searched, but nothing postable survived the filter.
    NoAnswer,
    /// A reply was selected. `posted_id` is `None` in dry-run mode.
    Answered { posted_id: Option<String> },
}

/// Tally of one cycle.
#[derive(Debug, Default)]
pub struct RunStats {
    pub questions_seen: u32,
    pub duplicates: u32,
    pub invalid: u32,
    pub no_answer: u32,
    pub answered: u32,
    pub errors: u32,
    pub retired: u32,
}

impl std::fmt::Display for RunStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Gleaner Cycle Complete ===")?;
        writeln!(f, "Questions seen: {}", self.questions_seen)?;
        writeln!(f, "Duplicates:     {}", self.duplicates)?;
        writeln!(f, "Invalid:        {}", self.invalid)?;
        writeln!(f, "No answer:      {}", self.no_answer)?;
        writeln!(f, "Answered:       {}", self.answered)?;
        writeln!(f, "Errors:         {}", self.errors)?;
        if self.retired > 0 {
            writeln!(f, "Retired:        {}", self.retired)?;
        }
        Ok(())
    }
}

/// The answer bot: watches the community's question streams, reposts the
/// best-rated reply from prior discussions of the same question, and curates
/// its own posting history.
///
/// All collaborators are injected so the whole pipeline runs against
/// in-memory fakes in tests.
pub struct Gleaner {
    forum: Arc<dyn Forum>,
    searcher: Arc<dyn WebSearcher>,
    analyzer: Arc<dyn TextAnalyzer>,
    ledger: Ledger,
    pacer: Arc<Pacer>,
    config: Config,
}

impl Gleaner {
    pub fn new(
        forum: Arc<dyn Forum>,
        searcher: Arc<dyn WebSearcher>,
        analyzer: Arc<dyn TextAnalyzer>,
        ledger: Ledger,
        config: Config,
    ) -> Self {
        Self::with_pacer(forum, searcher, analyzer, ledger, config, Arc::new(Pacer::new()))
    }

    pub fn with_pacer(
        forum: Arc<dyn Forum>,
        searcher: Arc<dyn WebSearcher>,
        analyzer: Arc<dyn TextAnalyzer>,
        ledger: Ledger,
        config: Config,
        pacer: Arc<Pacer>,
    ) -> Self {
        Self {
            forum,
            searcher,
            analyzer,
            ledger,
            pacer,
            config,
        }
    }

    /// Handle for cancellation and snapshot inspection.
    pub fn pacer(&self) -> Arc<Pacer> {
        Arc::clone(&self.pacer)
    }

    /// Run one question through the whole pipeline.
    ///
    /// The ledger is updated before anything else: every question we lay eyes
    /// on is recorded (refreshing recency for duplicates) and the cap is
    /// enforced, so a crash later in the pipeline never causes a re-answer.
    pub async fn process_question(
        &self,
        question: &Question,
        now: DateTime<Utc>,
    ) -> Result<Outcome> {
        let already_seen = self.ledger.contains(&question.id).await?;
        self.ledger.record(&question.id, now).await?;
        self.ledger.enforce_cap().await?;

        let check =
            screen_question(question, already_seen, &*self.analyzer, now, &self.config).await?;
        if !check.is_unique {
            debug!(question_id = %question.id, "Already handled, recency refreshed");
            return Ok(Outcome::Duplicate);
        }
        if let Some(reason) = check.reason {
            debug!(question_id = %question.id, %reason, "Question screened out");
            return Ok(Outcome::Invalid(reason));
        }

        let pool = discover(
            question,
            &*self.forum,
            &*self.searcher,
            &*self.analyzer,
            &self.pacer,
            &self.config,
            now,
        )
        .await?;
        let ranked = filter_and_rank(pool, &*self.analyzer, &self.config).await?;
        let Some(best) = ranked.into_iter().next() else {
            info!(question_id = %question.id, "No usable reply found");
            return Ok(Outcome::NoAnswer);
        };

        if self.config.dry_run {
            info!(
                question_id = %question.id,
                score = best.score,
                preview = %preview(&best.body),
                "Dry run, would have posted"
            );
            return Ok(Outcome::Answered { posted_id: None });
        }

        let posted_id = self.post_with_retry(&question.id, &best.body).await?;
        info!(
            question_id = %question.id,
            reply_id = %posted_id,
            score = best.score,
            "Posted reply"
        );
        Ok(Outcome::Answered {
            posted_id: Some(posted_id),
        })
    }

    /// Post through the forum's failure taxonomy, bounded by
    /// `post_retry_budget` attempts.
    ///
    /// `Forbidden` is ambiguous: it is what a suspended account sees, but
    /// also what a transient permission hiccup looks like. The account check
    /// disambiguates; only suspension and a community ban are fatal.
    async fn post_with_retry(&self, question_id: &str, body: &str) -> Result<String> {
        for attempt in 0..self.config.post_retry_budget {
            match self.forum.post_reply(question_id, body).await {
                Ok(id) => return Ok(id),
                Err(GleanerError::Forbidden) => {
                    warn!(question_id, attempt, "Post forbidden, checking the account");
                    let me = self.forum.me().await?;
                    if me.suspended {
                        error!(account = %me.name, "Account is suspended");
                        return Err(GleanerError::AccountSuspended);
                    }
                    let minutes = pick_minutes(&self.config.sleep_minutes);
                    warn!(minutes, "Account looks fine, backing off before the retry");
                    if !self.pacer.wait(Duration::from_secs(minutes * 60)).await {
                        return Err(GleanerError::Forbidden);
                    }
                }
                Err(GleanerError::RateLimited { retry_after_secs }) => {
                    let pause = retry_after_secs.unwrap_or_else(|| {
                        self.config.sleep_minutes.iter().copied().min().unwrap_or(5) * 60
                    });
                    warn!(question_id, attempt, pause_secs = pause, "Post rate limited");
                    if !self.pacer.wait(Duration::from_secs(pause)).await {
                        return Err(GleanerError::RateLimited { retry_after_secs });
                    }
                }
                Err(e @ GleanerError::CommunityBan) => {
                    error!(question_id, "Banned from the community");
                    return Err(e);
                }
                Err(e) => return Err(e),
            }
        }
        Err(GleanerError::Forum(format!(
            "post retries exhausted for question {question_id}"
        )))
    }

    /// One pass over both question streams plus the retirement sweep.
    pub async fn run_cycle(&self) -> Result<RunStats> {
        let run_id = Uuid::new_v4();
        info!(
            %run_id,
            community = %self.config.community,
            dry_run = self.config.dry_run,
            "Cycle starting"
        );
        let mut stats = RunStats::default();

        'streams: for sort in [SortOrder::Rising, SortOrder::New] {
            let limit = match sort {
                SortOrder::New => self.config.new_limit,
                SortOrder::Rising => self.config.rising_limit,
            };
            let questions = match self.forum.questions(sort, limit).await {
                Ok(qs) => qs,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(%sort, error = %e, "Stream fetch failed");
                    stats.errors += 1;
                    continue;
                }
            };
            info!(%sort, count = questions.len(), "Fetched question stream");

            for question in &questions {
                stats.questions_seen += 1;
                match self.process_question(question, Utc::now()).await {
                    Ok(Outcome::Duplicate) => stats.duplicates += 1,
                    Ok(Outcome::Invalid(reason)) => {
                        stats.invalid += 1;
                        // A new-sorted stream is reverse-chronological, so
                        // everything after an over-age question is older
                        // still. Rising is not ordered by age.
                        if sort == SortOrder::New && reason == SkipReason::OverAge {
                            debug!("Over-age question in the new stream, rest is older");
                            break;
                        }
                    }
                    Ok(Outcome::NoAnswer) => stats.no_answer += 1,
                    Ok(Outcome::Answered { posted_id }) => {
                        stats.answered += 1;
                        if posted_id.is_some() {
                            let minutes = pick_minutes(&self.config.sleep_minutes);
                            info!(minutes, "Pacing after a live post");
                            if !self.pacer.wait(Duration::from_secs(minutes * 60)).await {
                                info!("Pacer cancelled, ending the cycle early");
                                break 'streams;
                            }
                        }
                    }
                    Err(e) if e.is_fatal() => {
                        error!(question_id = %question.id, error = %e, "Fatal, aborting cycle");
                        return Err(e);
                    }
                    Err(e) => {
                        warn!(question_id = %question.id, error = %e, "Question failed");
                        stats.errors += 1;
                    }
                }
            }
        }

        if self.config.retire_replies && !self.config.dry_run && !self.pacer.is_cancelled() {
            match self.retire_poor_replies().await {
                Ok(retired) => stats.retired = retired,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(error = %e, "Retirement pass failed");
                    stats.errors += 1;
                }
            }
        }

        info!(%run_id, "{stats}");
        Ok(stats)
    }

    /// Run cycles until the pacer is cancelled. Only fatal errors escape.
    pub async fn run(&self) -> Result<()> {
        info!(
            community = %self.config.community,
            dry_run = self.config.dry_run,
            "Gleaner starting"
        );
        loop {
            if self.pacer.is_cancelled() {
                info!("Pacer cancelled, shutting down");
                return Ok(());
            }
            if !self.config.in_active_window(Utc::now()) {
                debug!("Outside the active-hours window");
                if !self
                    .pacer
                    .wait(Duration::from_secs(OFF_HOURS_RECHECK_SECS))
                    .await
                {
                    return Ok(());
                }
                continue;
            }

            self.run_cycle().await?;
            self.refresh_account_snapshot().await;

            if !self
                .pacer
                .wait(Duration::from_secs(self.config.cycle_pause_secs))
                .await
            {
                info!("Pacer cancelled, shutting down");
                return Ok(());
            }
        }
    }

    /// Delete own replies that had time to mature and still scored poorly.
    async fn retire_poor_replies(&self) -> Result<u32> {
        let now = Utc::now();
        let own = self.forum.my_recent_replies(RETIRE_SCAN_LIMIT).await?;
        let mut retired = 0;
        for reply in own {
            let age_hours = now.signed_duration_since(reply.created_at).num_hours();
            if reply.score >= self.config.min_own_reply_score
                || age_hours <= self.config.maturing_hours
            {
                continue;
            }
            match self.forum.delete_reply(&reply.id).await {
                Ok(()) => {
                    info!(reply_id = %reply.id, score = reply.score, age_hours, "Retired reply");
                    retired += 1;
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => warn!(reply_id = %reply.id, error = %e, "Retirement delete failed"),
            }
        }
        Ok(retired)
    }

    /// Best-effort refresh of the karma and own-reply scores shown in the
    /// pacer snapshot. Failures are logged, never escalated.
    async fn refresh_account_snapshot(&self) {
        let me = match self.forum.me().await {
            Ok(m) => m,
            Err(e) => {
                warn!(error = %e, "Account refresh failed");
                return;
            }
        };
        let recent = match self.forum.my_recent_replies(RECENT_SCORE_SAMPLE).await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "Own-reply refresh failed");
                return;
            }
        };
        let karma = me.total_karma();
        debug!(account = %me.name, karma, "Account snapshot refreshed");
        self.pacer.set_account(AccountStats {
            name: me.name,
            karma,
            recent_scores: recent.iter().map(|r| r.score).collect(),
        });
    }
}

/// Random pause length from the configured choices. Total even for an empty
/// list, which the config layer should never produce.
fn pick_minutes(choices: &[u64]) -> u64 {
    match choices.len() {
        0 => 5,
        1 => choices[0],
        n => choices[rand::rng().random_range(0..n)],
    }
}

fn preview(body: &str) -> String {
    if body.chars().count() <= PREVIEW_CHARS {
        body.to_string()
    } else {
        let cut: String = body.chars().take(PREVIEW_CHARS).collect();
        format!("{cut}...")
    }
}
