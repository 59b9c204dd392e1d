pub mod error;
pub mod types;

pub use error::{RedditError, Result};
pub use types::{AccountData, ApiEnvelope, CommentData, Listing, SubmissionData, TokenData};

use reqwest::StatusCode;

/// Error codes surfaced inside the `/api/comment` envelope.
const RATELIMIT_CODE: &str = "RATELIMIT";
const BANNED_CODE: &str = "BANNED_FROM_SUBREDDIT";

struct Credentials {
    client_id: String,
    client_secret: String,
    username: String,
    password: String,
}

/// Script-app client for the Reddit JSON API. Authenticates with the OAuth2
/// password grant and transparently re-authenticates when the hour-lived
/// token expires mid-run.
pub struct RedditClient {
    client: reqwest::Client,
    base_url: String,
    auth_base_url: String,
    user_agent: String,
    creds: Credentials,
    token: std::sync::RwLock<String>,
}

impl RedditClient {
    /// Authenticate and return a ready client.
    #[allow(clippy::too_many_arguments)]
    pub async fn login(
        auth_base_url: &str,
        base_url: &str,
        client_id: &str,
        client_secret: &str,
        username: &str,
        password: &str,
        user_agent: &str,
    ) -> Result<Self> {
        let client = reqwest::Client::new();
        let creds = Credentials {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        };
        let token = fetch_token(&client, auth_base_url, &creds, user_agent).await?;
        tracing::info!(username, "Authenticated with the forum API");

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_base_url: auth_base_url.trim_end_matches('/').to_string(),
            user_agent: user_agent.to_string(),
            creds,
            token: std::sync::RwLock::new(token),
        })
    }

    /// The account behind the token, including karma and suspension state.
    pub async fn me(&self) -> Result<AccountData> {
        let resp = self.get("/api/v1/me", &[]).await?;
        Ok(resp.json().await?)
    }

    /// One page of a community listing, e.g. `new` or `rising`.
    pub async fn listing(
        &self,
        community: &str,
        sort: &str,
        limit: u32,
    ) -> Result<Vec<SubmissionData>> {
        let path = format!("/r/{community}/{sort}.json");
        let resp = self
            .get(
                &path,
                &[
                    ("limit", limit.to_string()),
                    ("raw_json", "1".to_string()),
                ],
            )
            .await?;
        let listing: Listing<SubmissionData> = resp.json().await?;
        Ok(listing.children_of_kind("t3"))
    }

    /// A submission plus its comment page, fetched with explicit view
    /// parameters. `depth=1` flattens the tree to top-level comments.
    pub async fn submission(
        &self,
        id: &str,
        sort: &str,
        limit: u32,
        depth: u32,
    ) -> Result<(SubmissionData, Vec<CommentData>)> {
        let path = format!("/comments/{id}.json");
        let resp = self
            .get(
                &path,
                &[
                    ("sort", sort.to_string()),
                    ("limit", limit.to_string()),
                    ("depth", depth.to_string()),
                    ("raw_json", "1".to_string()),
                ],
            )
            .await?;
        let (submissions, comments): (Listing<SubmissionData>, Listing<CommentData>) =
            resp.json().await?;
        let submission = submissions
            .children_of_kind("t3")
            .into_iter()
            .next()
            .ok_or_else(|| RedditError::Parse(format!("submission {id} missing from response")))?;
        Ok((submission, comments.children_of_kind("t1")))
    }

    /// Post a comment under the given `t3_`/`t1_` fullname. Returns the new
    /// comment's fullname. Submission errors arrive inside an HTTP 200
    /// envelope and are mapped to typed errors here.
    pub async fn post_comment(&self, parent_fullname: &str, text: &str) -> Result<String> {
        let resp = self
            .post_form(
                "/api/comment",
                &[
                    ("api_type", "json".to_string()),
                    ("thing_id", parent_fullname.to_string()),
                    ("text", text.to_string()),
                ],
            )
            .await?;
        let envelope: ApiEnvelope = resp.json().await?;
        if let Some(err) = envelope_error(&envelope) {
            return Err(err);
        }
        envelope
            .json
            .data
            .and_then(|d| d.things.into_iter().next())
            .map(|t| t.data.fullname())
            .ok_or_else(|| RedditError::Parse("comment response carried no thing".to_string()))
    }

    /// Delete one of the account's own comments by fullname.
    pub async fn delete_comment(&self, fullname: &str) -> Result<()> {
        self.post_form("/api/del", &[("id", fullname.to_string())])
            .await?;
        Ok(())
    }

    /// The account's own comment history, newest first.
    pub async fn user_comments(&self, username: &str, limit: u32) -> Result<Vec<CommentData>> {
        let path = format!("/user/{username}/comments.json");
        let resp = self
            .get(
                &path,
                &[
                    ("limit", limit.to_string()),
                    ("raw_json", "1".to_string()),
                ],
            )
            .await?;
        let listing: Listing<CommentData> = resp.json().await?;
        Ok(listing.children_of_kind("t1"))
    }

    fn bearer(&self) -> String {
        self.token
            .read()
            .unwrap_or_else(|poison| poison.into_inner())
            .clone()
    }

    async fn refresh_token(&self) -> Result<()> {
        let fresh = fetch_token(&self.client, &self.auth_base_url, &self.creds, &self.user_agent)
            .await?;
        tracing::debug!("Refreshed expired access token");
        *self
            .token
            .write()
            .unwrap_or_else(|poison| poison.into_inner()) = fresh;
        Ok(())
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        let mut resp = self
            .client
            .get(&url)
            .bearer_auth(self.bearer())
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .query(query)
            .send()
            .await?;
        if resp.status() == StatusCode::UNAUTHORIZED {
            self.refresh_token().await?;
            resp = self
                .client
                .get(&url)
                .bearer_auth(self.bearer())
                .header(reqwest::header::USER_AGENT, &self.user_agent)
                .query(query)
                .send()
                .await?;
        }
        check_status(resp).await
    }

    async fn post_form(&self, path: &str, form: &[(&str, String)]) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        let mut resp = self
            .client
            .post(&url)
            .bearer_auth(self.bearer())
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .form(form)
            .send()
            .await?;
        if resp.status() == StatusCode::UNAUTHORIZED {
            self.refresh_token().await?;
            resp = self
                .client
                .post(&url)
                .bearer_auth(self.bearer())
                .header(reqwest::header::USER_AGENT, &self.user_agent)
                .form(form)
                .send()
                .await?;
        }
        check_status(resp).await
    }
}

async fn fetch_token(
    client: &reqwest::Client,
    auth_base_url: &str,
    creds: &Credentials,
    user_agent: &str,
) -> Result<String> {
    let url = format!(
        "{}/api/v1/access_token",
        auth_base_url.trim_end_matches('/')
    );
    let resp = client
        .post(&url)
        .basic_auth(&creds.client_id, Some(&creds.client_secret))
        .header(reqwest::header::USER_AGENT, user_agent)
        .form(&[
            ("grant_type", "password"),
            ("username", creds.username.as_str()),
            ("password", creds.password.as_str()),
        ])
        .send()
        .await?;
    let resp = check_status(resp).await?;
    let token: TokenData = resp.json().await?;
    Ok(token.access_token)
}

/// Map transport-level status codes to typed errors; leaves successful
/// responses untouched for the caller to parse.
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = resp
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        return Err(RedditError::RateLimited { retry_after_secs });
    }
    if status == StatusCode::FORBIDDEN {
        return Err(RedditError::Forbidden);
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(RedditError::Api {
            status: status.as_u16(),
            message: body,
        });
    }
    Ok(resp)
}

/// Map the first error triple in a write-endpoint envelope, if any.
fn envelope_error(envelope: &ApiEnvelope) -> Option<RedditError> {
    let first = envelope.json.errors.first()?;
    let code = first.first().cloned().flatten().unwrap_or_default();
    let message = first.get(1).cloned().flatten().unwrap_or_default();
    Some(match code.as_str() {
        RATELIMIT_CODE => RedditError::RateLimited {
            retry_after_secs: parse_retry_after(&message),
        },
        BANNED_CODE => RedditError::BannedFromCommunity,
        _ => RedditError::Api {
            status: 200,
            message: format!("{code}: {message}"),
        },
    })
}

/// Pull the suggested wait out of messages like
/// "you are doing that too much. try again in 9 minutes.".
fn parse_retry_after(message: &str) -> Option<u64> {
    let lower = message.to_lowercase();
    let mut words = lower.split_whitespace().peekable();
    while let Some(word) = words.next() {
        let digits = word.trim_matches(|c: char| !c.is_ascii_digit());
        if digits.is_empty() {
            continue;
        }
        if let Ok(n) = digits.parse::<u64>() {
            if let Some(unit) = words.peek() {
                if unit.starts_with("minute") {
                    return Some(n * 60);
                }
                if unit.starts_with("second") {
                    return Some(n);
                }
            }
        }
    }
    None
}
