use thiserror::Error;

pub type Result<T> = std::result::Result<T, GleanerError>;

#[derive(Error, Debug)]
pub enum GleanerError {
    #[error("Forum rate limited (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Search provider rate limited")]
    SearchRateLimited,

    #[error("Forum refused the submission")]
    Forbidden,

    #[error("Account suspended")]
    AccountSuspended,

    #[error("Banned from the target community")]
    CommunityBan,

    #[error("Forum error: {0}")]
    Forum(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Analyzer error: {0}")]
    Analyzer(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl GleanerError {
    /// Fatal errors terminate the whole run; everything else is contained
    /// to the question being processed.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            GleanerError::AccountSuspended | GleanerError::CommunityBan
        )
    }
}
