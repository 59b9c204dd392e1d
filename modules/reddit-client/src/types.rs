use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

/// Author value the API substitutes for deleted accounts.
const DELETED_AUTHOR: &str = "[deleted]";

// --- Listing envelopes ---

/// The `{"kind": "Listing", "data": {"children": [...]}}` envelope wrapping
/// every multi-item response.
#[derive(Debug, Deserialize)]
pub struct Listing<T> {
    pub data: ListingData<T>,
}

#[derive(Debug, Deserialize)]
pub struct ListingData<T> {
    #[serde(default = "Vec::new")]
    pub children: Vec<Thing<T>>,
}

#[derive(Debug, Deserialize)]
pub struct Thing<T> {
    pub kind: String,
    pub data: T,
}

impl<T> Listing<T> {
    /// Unwrap children of the given kind, dropping `more` stubs and anything
    /// else the API interleaves.
    pub fn children_of_kind(self, kind: &str) -> Vec<T> {
        self.data
            .children
            .into_iter()
            .filter(|c| c.kind == kind)
            .map(|c| c.data)
            .collect()
    }
}

// --- Submissions ---

#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionData {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub created_utc: f64,
    #[serde(default)]
    pub num_comments: u32,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub selftext: Option<String>,
    #[serde(default)]
    pub stickied: bool,
}

impl SubmissionData {
    pub fn author_present(&self) -> bool {
        matches!(self.author.as_deref(), Some(a) if !a.is_empty() && a != DELETED_AUTHOR)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.created_utc as i64, 0).unwrap_or(DateTime::UNIX_EPOCH)
    }
}

// --- Comments ---

#[derive(Debug, Clone, Deserialize)]
pub struct CommentData {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub score: i64,
    #[serde(default, deserialize_with = "edited_flag")]
    pub edited: bool,
    #[serde(default)]
    pub stickied: bool,
    #[serde(default)]
    pub created_utc: f64,
}

impl CommentData {
    pub fn author_present(&self) -> bool {
        matches!(self.author.as_deref(), Some(a) if !a.is_empty() && a != DELETED_AUTHOR)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.created_utc as i64, 0).unwrap_or(DateTime::UNIX_EPOCH)
    }

    /// The `t1_`-prefixed fullname used when addressing this comment in
    /// follow-up API calls.
    pub fn fullname(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("t1_{}", self.id))
    }
}

/// The `edited` field is `false` for untouched comments and an edit
/// timestamp (float seconds) once the author revises it.
fn edited_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Bool(b) => b,
        serde_json::Value::Number(_) => true,
        _ => false,
    })
}

// --- Account ---

#[derive(Debug, Clone, Deserialize)]
pub struct AccountData {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub link_karma: i64,
    #[serde(default)]
    pub comment_karma: i64,
    #[serde(default)]
    pub is_suspended: bool,
}

// --- OAuth ---

#[derive(Debug, Deserialize)]
pub struct TokenData {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub token_type: String,
}

// --- Write-endpoint envelope ---

/// Responses from `/api/comment` and friends come back as
/// `{"json": {"errors": [[code, message, field], ...], "data": {...}}}`,
/// usually with HTTP 200 even when `errors` is non-empty.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope {
    pub json: ApiEnvelopeBody,
}

#[derive(Debug, Deserialize)]
pub struct ApiEnvelopeBody {
    #[serde(default = "Vec::new")]
    pub errors: Vec<Vec<Option<String>>>,
    #[serde(default)]
    pub data: Option<ThingsData>,
}

#[derive(Debug, Deserialize)]
pub struct ThingsData {
    #[serde(default = "Vec::new")]
    pub things: Vec<Thing<CommentData>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edited_parses_bool_and_timestamp() {
        let untouched: CommentData =
            serde_json::from_str(r#"{"id": "c1", "body": "text", "edited": false}"#).unwrap();
        assert!(!untouched.edited);

        let revised: CommentData =
            serde_json::from_str(r#"{"id": "c2", "body": "text", "edited": 1437465395.0}"#)
                .unwrap();
        assert!(revised.edited);
    }

    #[test]
    fn deleted_author_is_absent() {
        let gone: CommentData =
            serde_json::from_str(r#"{"id": "c1", "author": "[deleted]"}"#).unwrap();
        assert!(!gone.author_present());

        let missing: CommentData = serde_json::from_str(r#"{"id": "c2"}"#).unwrap();
        assert!(!missing.author_present());

        let present: CommentData =
            serde_json::from_str(r#"{"id": "c3", "author": "someone"}"#).unwrap();
        assert!(present.author_present());
    }

    #[test]
    fn listing_drops_more_stubs() {
        let raw = r#"{
            "kind": "Listing",
            "data": {
                "children": [
                    {"kind": "t1", "data": {"id": "c1", "body": "first", "score": 5}},
                    {"kind": "more", "data": {"count": 120, "children": ["d2", "d3"]}},
                    {"kind": "t1", "data": {"id": "c2", "body": "second", "score": 3}}
                ]
            }
        }"#;
        let listing: Listing<CommentData> = serde_json::from_str(raw).unwrap();
        let comments = listing.children_of_kind("t1");
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].id, "c1");
        assert_eq!(comments[1].id, "c2");
    }

    #[test]
    fn comment_fullname_prefers_name() {
        let named: CommentData =
            serde_json::from_str(r#"{"id": "c9", "name": "t1_c9"}"#).unwrap();
        assert_eq!(named.fullname(), "t1_c9");

        let bare: CommentData = serde_json::from_str(r#"{"id": "c9"}"#).unwrap();
        assert_eq!(bare.fullname(), "t1_c9");
    }

    #[test]
    fn submission_timestamp_converts() {
        let s: SubmissionData =
            serde_json::from_str(r#"{"id": "q1", "title": "t", "created_utc": 1700000000.0}"#)
                .unwrap();
        assert_eq!(s.created_at().timestamp(), 1_700_000_000);
    }
}
