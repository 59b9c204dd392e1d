use async_trait::async_trait;

use gleaner_common::{
    AccountStatus, CommentView, Discussion, GleanerError, OwnReply, Question, Reply, Result,
    SortOrder,
};
use reddit_client::{CommentData, RedditClient, RedditError, SubmissionData};

use crate::traits::Forum;

/// `Forum` wiring for the Reddit JSON API: one community, one account.
pub struct RedditForum {
    client: RedditClient,
    community: String,
    username: String,
}

impl RedditForum {
    pub fn new(client: RedditClient, community: &str, username: &str) -> Self {
        Self {
            client,
            community: community.to_string(),
            username: username.to_string(),
        }
    }
}

#[async_trait]
impl Forum for RedditForum {
    async fn questions(&self, sort: SortOrder, limit: u32) -> Result<Vec<Question>> {
        let submissions = self
            .client
            .listing(&self.community, &sort.to_string(), limit)
            .await
            .map_err(map_err)?;
        Ok(submissions.into_iter().map(to_question).collect())
    }

    async fn discussion(&self, id: &str, view: &CommentView) -> Result<Discussion> {
        let depth = if view.flatten { 1 } else { 10 };
        let (submission, comments) = self
            .client
            .submission(id, &view.sort.to_string(), view.limit, depth)
            .await
            .map_err(map_err)?;
        let created_at = submission.created_at();
        Ok(Discussion {
            id: submission.id,
            title: submission.title,
            score: submission.score,
            created_at,
            replies: comments.into_iter().map(to_reply).collect(),
        })
    }

    async fn post_reply(&self, question_id: &str, body: &str) -> Result<String> {
        // Questions are submissions, addressed by their `t3_` fullname.
        let parent = format!("t3_{question_id}");
        self.client.post_comment(&parent, body).await.map_err(map_err)
    }

    async fn delete_reply(&self, reply_id: &str) -> Result<()> {
        self.client.delete_comment(reply_id).await.map_err(map_err)
    }

    async fn me(&self) -> Result<AccountStatus> {
        let account = self.client.me().await.map_err(map_err)?;
        Ok(AccountStatus {
            name: account.name,
            link_karma: account.link_karma,
            comment_karma: account.comment_karma,
            suspended: account.is_suspended,
        })
    }

    async fn my_recent_replies(&self, limit: u32) -> Result<Vec<OwnReply>> {
        let comments = self
            .client
            .user_comments(&self.username, limit)
            .await
            .map_err(map_err)?;
        Ok(comments
            .into_iter()
            .map(|c| {
                let created_at = c.created_at();
                OwnReply {
                    id: c.fullname(),
                    score: c.score,
                    created_at,
                }
            })
            .collect())
    }
}

fn to_question(s: SubmissionData) -> Question {
    let author_present = s.author_present();
    let created_at = s.created_at();
    Question {
        id: s.id,
        title: s.title,
        author_present,
        created_at,
        comment_count: s.num_comments,
        self_text: s.selftext,
    }
}

fn to_reply(c: CommentData) -> Reply {
    let author_present = c.author_present();
    let id = c.fullname();
    Reply {
        id,
        body: c.body,
        score: c.score,
        author_present,
        edited: c.edited,
        pinned: c.stickied,
    }
}

fn map_err(err: RedditError) -> GleanerError {
    match err {
        RedditError::RateLimited { retry_after_secs } => {
            GleanerError::RateLimited { retry_after_secs }
        }
        RedditError::Forbidden => GleanerError::Forbidden,
        RedditError::BannedFromCommunity => GleanerError::CommunityBan,
        RedditError::Network(msg) => GleanerError::Forum(format!("network: {msg}")),
        RedditError::Parse(msg) => GleanerError::Forum(format!("parse: {msg}")),
        RedditError::Api { status, message } => {
            GleanerError::Forum(format!("api {status}: {message}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_errors_map_to_the_domain_taxonomy() {
        assert!(matches!(
            map_err(RedditError::Forbidden),
            GleanerError::Forbidden
        ));
        assert!(matches!(
            map_err(RedditError::BannedFromCommunity),
            GleanerError::CommunityBan
        ));
        assert!(matches!(
            map_err(RedditError::RateLimited {
                retry_after_secs: Some(120)
            }),
            GleanerError::RateLimited {
                retry_after_secs: Some(120)
            }
        ));
        assert!(matches!(
            map_err(RedditError::Network("boom".into())),
            GleanerError::Forum(_)
        ));
    }

    #[test]
    fn submissions_become_questions() {
        let wire: SubmissionData = serde_json::from_str(
            r#"{
                "id": "q1",
                "title": "What is the best advice?",
                "author": "asker",
                "created_utc": 1700000000.0,
                "num_comments": 7,
                "selftext": "context"
            }"#,
        )
        .unwrap();
        let q = to_question(wire);
        assert_eq!(q.id, "q1");
        assert!(q.author_present);
        assert_eq!(q.comment_count, 7);
        assert_eq!(q.self_text.as_deref(), Some("context"));
    }

    #[test]
    fn comments_become_replies() {
        let wire: CommentData = serde_json::from_str(
            r#"{
                "id": "c1",
                "name": "t1_c1",
                "body": "an answer",
                "author": "[deleted]",
                "score": 42,
                "edited": 1437465395.0,
                "stickied": true
            }"#,
        )
        .unwrap();
        let r = to_reply(wire);
        assert_eq!(r.id, "t1_c1");
        assert!(!r.author_present);
        assert!(r.edited);
        assert!(r.pinned);
        assert_eq!(r.score, 42);
    }
}
