// Trait seams for the answer pipeline.
//
// Three collaborators sit behind traits so the orchestrator can be exercised
// against in-memory fakes: the question forum, the web-search provider, and
// the NLP sidecar. Production wiring lives in `forum.rs`, `search.rs` and
// `analyzer.rs`; the mocks live in `testing.rs`.

use async_trait::async_trait;

use gleaner_common::{
    AccountStatus, CommentView, Discussion, OwnReply, Question, Result, SortOrder,
};
use spacy_client::Token;

// ---------------------------------------------------------------------------
// Forum
// ---------------------------------------------------------------------------

/// Read/write access to the question forum.
///
/// All write paths surface the forum's failure taxonomy as typed errors
/// (`RateLimited`, `Forbidden`, `CommunityBan`) so the orchestrator can pick
/// the right recovery.
#[async_trait]
pub trait Forum: Send + Sync {
    /// One page of the community's question stream for the given sort order.
    async fn questions(&self, sort: SortOrder, limit: u32) -> Result<Vec<Question>>;

    /// A discussion and its replies, fetched under the given comment-view
    /// preferences. The view is part of the fetch: reading a default-sorted
    /// or nested tree yields an incomplete reply set.
    async fn discussion(&self, id: &str, view: &CommentView) -> Result<Discussion>;

    /// Post a reply to the question. Returns the new reply's id.
    async fn post_reply(&self, question_id: &str, body: &str) -> Result<String>;

    /// Delete one of the account's own replies.
    async fn delete_reply(&self, reply_id: &str) -> Result<()>;

    /// The acting account: karma totals and suspension state.
    async fn me(&self) -> Result<AccountStatus>;

    /// The account's own recent replies, newest first.
    async fn my_recent_replies(&self, limit: u32) -> Result<Vec<OwnReply>>;
}

// ---------------------------------------------------------------------------
// Web search
// ---------------------------------------------------------------------------

/// Domain-restricted web search used to find previously answered duplicates.
#[async_trait]
pub trait WebSearcher: Send + Sync {
    /// Result links in rank order, at most `max_results` of them.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<String>>;
}

// ---------------------------------------------------------------------------
// Text analysis
// ---------------------------------------------------------------------------

/// Tokenization and semantic similarity from the NLP sidecar.
#[async_trait]
pub trait TextAnalyzer: Send + Sync {
    /// Tokenize with part-of-speech, lemma and entity annotations. Empty
    /// input yields an empty token list.
    async fn tokens(&self, text: &str) -> Result<Vec<Token>>;

    /// Semantic similarity of two texts, nominally in [0, 1].
    async fn similarity(&self, a: &str, b: &str) -> Result<f64>;
}
