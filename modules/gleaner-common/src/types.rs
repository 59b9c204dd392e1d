use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- Question streams ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    New,
    Rising,
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortOrder::New => write!(f, "new"),
            SortOrder::Rising => write!(f, "rising"),
        }
    }
}

/// An unanswered question pulled from a community stream. Immutable snapshot;
/// age is always derived from `created_at`, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub title: String,
    pub author_present: bool,
    pub created_at: DateTime<Utc>,
    pub comment_count: u32,
    pub self_text: Option<String>,
}

impl Question {
    pub fn age_hours(&self, now: DateTime<Utc>) -> i64 {
        now.signed_duration_since(self.created_at).num_hours()
    }
}

// --- Harvested discussions ---

/// A previously answered discussion found via web search. Transient: built
/// during candidate discovery, mined for replies, then discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discussion {
    pub id: String,
    pub title: String,
    pub score: i64,
    pub created_at: DateTime<Utc>,
    pub replies: Vec<Reply>,
}

impl Discussion {
    pub fn age_days(&self, now: DateTime<Utc>) -> i64 {
        now.signed_duration_since(self.created_at).num_days()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub id: String,
    pub body: String,
    pub score: i64,
    pub author_present: bool,
    pub edited: bool,
    pub pinned: bool,
}

/// A reply previously posted by the bot itself, as seen in its own history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnReply {
    pub id: String,
    pub score: i64,
    pub created_at: DateTime<Utc>,
}

// --- Comment view preferences ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentSort {
    Top,
    Best,
    New,
}

impl std::fmt::Display for CommentSort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommentSort::Top => write!(f, "top"),
            CommentSort::Best => write!(f, "best"),
            CommentSort::New => write!(f, "new"),
        }
    }
}

/// How a discussion's reply tree is fetched. Must be applied as part of the
/// fetch itself; harvesting from a default-sorted or nested view misses
/// replies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CommentView {
    pub sort: CommentSort,
    pub limit: u32,
    pub flatten: bool,
}

impl Default for CommentView {
    fn default() -> Self {
        Self {
            sort: CommentSort::Top,
            limit: 50,
            flatten: true,
        }
    }
}

// --- Account ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountStatus {
    pub name: String,
    pub link_karma: i64,
    pub comment_karma: i64,
    pub suspended: bool,
}

impl AccountStatus {
    pub fn total_karma(&self) -> i64 {
        self.link_karma + self.comment_karma
    }
}

// --- Question validation ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    OverAge,
    AuthorMissing,
    TitleTooLong,
    RepliesSaturated,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::OverAge => write!(f, "past the age horizon"),
            SkipReason::AuthorMissing => write!(f, "author deleted or missing"),
            SkipReason::TitleTooLong => write!(f, "title too long"),
            SkipReason::RepliesSaturated => write!(f, "already has too many replies"),
        }
    }
}

/// Outcome of screening a question. `reason` holds the first disqualifier
/// when `is_valid` is false.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuestionCheck {
    pub is_unique: bool,
    pub is_valid: bool,
    pub reason: Option<SkipReason>,
}

impl QuestionCheck {
    pub fn accepted(&self) -> bool {
        self.is_unique && self.is_valid
    }
}

// --- Ledger pruning ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PruneStrategy {
    Half,
    Tenth,
}

impl PruneStrategy {
    /// Rows to delete for a ledger currently holding `count` entries.
    pub fn batch_size(&self, count: u64) -> u64 {
        match self {
            PruneStrategy::Half => count / 2,
            PruneStrategy::Tenth => count / 10,
        }
    }
}

impl std::str::FromStr for PruneStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "half" => Ok(PruneStrategy::Half),
            "tenth" => Ok(PruneStrategy::Tenth),
            other => Err(format!("unknown prune strategy: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn question_age_is_derived() {
        let now = Utc::now();
        let q = Question {
            id: "abc123".into(),
            title: "What is the best advice you have received?".into(),
            author_present: true,
            created_at: now - Duration::hours(30),
            comment_count: 4,
            self_text: None,
        };
        assert_eq!(q.age_hours(now), 30);
    }

    #[test]
    fn prune_batch_sizes() {
        assert_eq!(PruneStrategy::Half.batch_size(100), 50);
        assert_eq!(PruneStrategy::Tenth.batch_size(100), 10);
        assert_eq!(PruneStrategy::Tenth.batch_size(5), 0);
    }

    #[test]
    fn prune_strategy_parses() {
        assert_eq!("half".parse::<PruneStrategy>(), Ok(PruneStrategy::Half));
        assert_eq!("Tenth".parse::<PruneStrategy>(), Ok(PruneStrategy::Tenth));
        assert!("quarter".parse::<PruneStrategy>().is_err());
    }
}
