use thiserror::Error;

pub type Result<T> = std::result::Result<T, SpacyError>;

#[derive(Debug, Error)]
pub enum SpacyError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for SpacyError {
    fn from(err: reqwest::Error) -> Self {
        SpacyError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for SpacyError {
    fn from(err: serde_json::Error) -> Self {
        SpacyError::Parse(err.to_string())
    }
}
