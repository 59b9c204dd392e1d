// Test mocks for the answer pipeline.
//
// Three mocks matching the three trait boundaries:
// - MockForum (Forum) — registered streams/discussions plus scripted failures
// - MockSearcher (WebSearcher) — fixed link list with optional rate limits
// - CannedAnalyzer (TextAnalyzer) — registered tokens/pairs with fallbacks
//
// Plus fixture helpers for Question, Reply, Discussion, OwnReply, Token and
// a live-mode Config with all sleeps zeroed.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};

use gleaner_common::{
    AccountStatus, CommentView, Config, Discussion, GleanerError, OwnReply, Question, Reply,
    Result, SortOrder,
};
use spacy_client::Token;

use crate::normalize::normalize_title;
use crate::traits::{Forum, TextAnalyzer, WebSearcher};

// ---------------------------------------------------------------------------
// MockForum
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ForumInner {
    streams: HashMap<SortOrder, Vec<Question>>,
    discussions: HashMap<String, Discussion>,
    question_failures: VecDeque<GleanerError>,
    discussion_failures: VecDeque<GleanerError>,
    post_failures: VecDeque<GleanerError>,
    delete_failures: VecDeque<GleanerError>,
    me: Option<AccountStatus>,
    own_replies: Vec<OwnReply>,
    posted: Vec<(String, String)>,
    deleted: Vec<String>,
    me_calls: usize,
    discussion_calls: usize,
}

/// Scripted forum. Streams and discussions are registered up front; each
/// failure queue is drained one error per call before the registered
/// behavior resumes. Builder pattern: `.with_questions()`,
/// `.with_discussion()`, `.with_post_failures()` and friends.
pub struct MockForum {
    inner: Mutex<ForumInner>,
}

impl MockForum {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(ForumInner::default()),
        }
    }

    pub fn with_questions(self, sort: SortOrder, questions: Vec<Question>) -> Self {
        self.inner.lock().unwrap().streams.insert(sort, questions);
        self
    }

    pub fn with_discussion(self, discussion: Discussion) -> Self {
        self.inner
            .lock()
            .unwrap()
            .discussions
            .insert(discussion.id.clone(), discussion);
        self
    }

    pub fn with_question_failures(self, failures: Vec<GleanerError>) -> Self {
        self.inner.lock().unwrap().question_failures.extend(failures);
        self
    }

    pub fn with_discussion_failures(self, failures: Vec<GleanerError>) -> Self {
        self.inner
            .lock()
            .unwrap()
            .discussion_failures
            .extend(failures);
        self
    }

    pub fn with_post_failures(self, failures: Vec<GleanerError>) -> Self {
        self.inner.lock().unwrap().post_failures.extend(failures);
        self
    }

    pub fn with_delete_failures(self, failures: Vec<GleanerError>) -> Self {
        self.inner.lock().unwrap().delete_failures.extend(failures);
        self
    }

    pub fn with_me(self, status: AccountStatus) -> Self {
        self.inner.lock().unwrap().me = Some(status);
        self
    }

    pub fn with_own_replies(self, replies: Vec<OwnReply>) -> Self {
        self.inner.lock().unwrap().own_replies = replies;
        self
    }

    /// `(question_id, body)` pairs in posting order.
    pub fn posted(&self) -> Vec<(String, String)> {
        self.inner.lock().unwrap().posted.clone()
    }

    /// Reply ids deleted, in order.
    pub fn deleted(&self) -> Vec<String> {
        self.inner.lock().unwrap().deleted.clone()
    }

    pub fn me_calls(&self) -> usize {
        self.inner.lock().unwrap().me_calls
    }

    pub fn discussion_calls(&self) -> usize {
        self.inner.lock().unwrap().discussion_calls
    }
}

#[async_trait]
impl Forum for MockForum {
    async fn questions(&self, sort: SortOrder, limit: u32) -> Result<Vec<Question>> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(err) = inner.question_failures.pop_front() {
            return Err(err);
        }
        let mut questions = inner.streams.get(&sort).cloned().unwrap_or_default();
        questions.truncate(limit as usize);
        Ok(questions)
    }

    async fn discussion(&self, id: &str, _view: &CommentView) -> Result<Discussion> {
        let mut inner = self.inner.lock().unwrap();
        inner.discussion_calls += 1;
        if let Some(err) = inner.discussion_failures.pop_front() {
            return Err(err);
        }
        inner
            .discussions
            .get(id)
            .cloned()
            .ok_or_else(|| GleanerError::Forum(format!("no such discussion: {id}")))
    }

    async fn post_reply(&self, question_id: &str, body: &str) -> Result<String> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(err) = inner.post_failures.pop_front() {
            return Err(err);
        }
        let id = format!("t1_posted{}", inner.posted.len() + 1);
        inner
            .posted
            .push((question_id.to_string(), body.to_string()));
        Ok(id)
    }

    async fn delete_reply(&self, reply_id: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(err) = inner.delete_failures.pop_front() {
            return Err(err);
        }
        inner.deleted.push(reply_id.to_string());
        Ok(())
    }

    async fn me(&self) -> Result<AccountStatus> {
        let mut inner = self.inner.lock().unwrap();
        inner.me_calls += 1;
        Ok(inner.me.clone().unwrap_or_else(|| AccountStatus {
            name: "gleaner".to_string(),
            link_karma: 10,
            comment_karma: 100,
            suspended: false,
        }))
    }

    async fn my_recent_replies(&self, limit: u32) -> Result<Vec<OwnReply>> {
        let inner = self.inner.lock().unwrap();
        let mut replies = inner.own_replies.clone();
        replies.truncate(limit as usize);
        Ok(replies)
    }
}

// ---------------------------------------------------------------------------
// MockSearcher
// ---------------------------------------------------------------------------

#[derive(Default)]
struct SearcherInner {
    links: Vec<String>,
    rate_limits_left: usize,
    queries: Vec<String>,
}

/// Fixed-result searcher. `.with_rate_limits(n)` makes the first `n` calls
/// fail with `SearchRateLimited` before the links come back.
pub struct MockSearcher {
    inner: Mutex<SearcherInner>,
}

impl MockSearcher {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(SearcherInner::default()),
        }
    }

    pub fn with_links(self, links: &[&str]) -> Self {
        self.inner.lock().unwrap().links = links.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn with_rate_limits(self, count: usize) -> Self {
        self.inner.lock().unwrap().rate_limits_left = count;
        self
    }

    pub fn search_count(&self) -> usize {
        self.inner.lock().unwrap().queries.len()
    }

    pub fn queries(&self) -> Vec<String> {
        self.inner.lock().unwrap().queries.clone()
    }
}

#[async_trait]
impl WebSearcher for MockSearcher {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<String>> {
        let mut inner = self.inner.lock().unwrap();
        inner.queries.push(query.to_string());
        if inner.rate_limits_left > 0 {
            inner.rate_limits_left -= 1;
            return Err(GleanerError::SearchRateLimited);
        }
        Ok(inner.links.iter().take(max_results).cloned().collect())
    }
}

// ---------------------------------------------------------------------------
// CannedAnalyzer
// ---------------------------------------------------------------------------

#[derive(Default)]
struct AnalyzerInner {
    tokens: HashMap<String, Vec<Token>>,
    pairs: HashMap<(String, String), f64>,
    token_calls: usize,
    similarity_calls: usize,
}

/// Deterministic analyzer. Unregistered text tokenizes by whitespace into
/// plain word tokens; unregistered pairs score 1.0 when the normalized
/// titles are equal and 0.0 otherwise. Registered similarity pairs are
/// symmetric. Call counters let tests assert the analyzer was skipped.
pub struct CannedAnalyzer {
    inner: Mutex<AnalyzerInner>,
}

impl CannedAnalyzer {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(AnalyzerInner::default()),
        }
    }

    pub fn on_tokens(self, text: &str, tokens: Vec<Token>) -> Self {
        self.inner
            .lock()
            .unwrap()
            .tokens
            .insert(text.to_string(), tokens);
        self
    }

    pub fn on_similarity(self, a: &str, b: &str, score: f64) -> Self {
        self.inner
            .lock()
            .unwrap()
            .pairs
            .insert(pair_key(a, b), score);
        self
    }

    pub fn token_calls(&self) -> usize {
        self.inner.lock().unwrap().token_calls
    }

    pub fn similarity_calls(&self) -> usize {
        self.inner.lock().unwrap().similarity_calls
    }
}

/// Order-free lookup key so registered pairs match in either direction.
fn pair_key(a: &str, b: &str) -> (String, String) {
    let a = normalize_title(a);
    let b = normalize_title(b);
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[async_trait]
impl TextAnalyzer for CannedAnalyzer {
    async fn tokens(&self, text: &str) -> Result<Vec<Token>> {
        let mut inner = self.inner.lock().unwrap();
        inner.token_calls += 1;
        if let Some(tokens) = inner.tokens.get(text) {
            return Ok(tokens.clone());
        }
        Ok(text.split_whitespace().map(word_token).collect())
    }

    async fn similarity(&self, a: &str, b: &str) -> Result<f64> {
        let mut inner = self.inner.lock().unwrap();
        inner.similarity_calls += 1;
        if let Some(score) = inner.pairs.get(&pair_key(a, b)) {
            return Ok(*score);
        }
        if normalize_title(a) == normalize_title(b) {
            Ok(1.0)
        } else {
            Ok(0.0)
        }
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A question posted `age_hours` ago by a present author.
pub fn question(id: &str, title: &str, age_hours: i64) -> Question {
    Question {
        id: id.to_string(),
        title: title.to_string(),
        author_present: true,
        created_at: Utc::now() - Duration::hours(age_hours),
        comment_count: 3,
        self_text: None,
    }
}

/// A clean reply: authored, untouched, not pinned.
pub fn reply(id: &str, body: &str, score: i64) -> Reply {
    Reply {
        id: id.to_string(),
        body: body.to_string(),
        score,
        author_present: true,
        edited: false,
        pinned: false,
    }
}

/// A discussion created `age_days` ago.
pub fn discussion(
    id: &str,
    title: &str,
    score: i64,
    age_days: i64,
    replies: Vec<Reply>,
) -> Discussion {
    Discussion {
        id: id.to_string(),
        title: title.to_string(),
        score,
        created_at: Utc::now() - Duration::days(age_days),
        replies,
    }
}

/// One of the account's own replies, posted `age_hours` ago.
pub fn own_reply(id: &str, score: i64, age_hours: i64) -> OwnReply {
    OwnReply {
        id: id.to_string(),
        score,
        created_at: Utc::now() - Duration::hours(age_hours),
    }
}

pub fn word_token(text: &str) -> Token {
    Token {
        text: text.to_string(),
        lemma: text.to_lowercase(),
        pos: "NOUN".to_string(),
        tag: "NN".to_string(),
        ent_type: String::new(),
    }
}

pub fn pronoun_token(text: &str) -> Token {
    Token {
        text: text.to_string(),
        lemma: text.to_lowercase(),
        pos: "PRON".to_string(),
        tag: "PRP".to_string(),
        ent_type: String::new(),
    }
}

pub fn date_token(text: &str) -> Token {
    Token {
        text: text.to_string(),
        lemma: text.to_lowercase(),
        pos: "NOUN".to_string(),
        tag: "NN".to_string(),
        ent_type: "DATE".to_string(),
    }
}

/// Live-mode config with every sleep zeroed so tests never wait.
pub fn live_config() -> Config {
    Config {
        dry_run: false,
        search_cooldown_secs: 0,
        sleep_minutes: vec![0],
        cycle_pause_secs: 0,
        ..Config::default()
    }
}
