use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::post::PostSummary;
use super::user::AuthorSummary;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub content: String,
    pub number_of_likes: i64,
    pub edited_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplyResponse {
    /// Zero-based position within the comment's reply sequence.
    pub index: i64,
    pub content: String,
    pub user_id: i64,
    pub author: AuthorSummary,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentResponse {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub author: AuthorSummary,
    pub content: String,
    pub likes: Vec<i64>,
    pub number_of_likes: i64,
    pub replies: Vec<ReplyResponse>,
    pub edited_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A comment left on one of the caller's posts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentOnPostResponse {
    #[serde(flatten)]
    pub comment: CommentResponse,
    pub post: PostSummary,
}

#[derive(Debug, Serialize)]
pub struct CommentsOnMyPosts {
    pub total_comments: usize,
    pub comments: Vec<CommentOnPostResponse>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LikeAction {
    Liked,
    Unliked,
}

impl LikeAction {
    pub fn message(self) -> &'static str {
        match self {
            Self::Liked => "Comment liked",
            Self::Unliked => "Comment unliked",
        }
    }
}

#[derive(Debug)]
pub struct LikeToggle {
    pub action: LikeAction,
    pub comment: CommentResponse,
}

/// Request body shared by create, edit and reply.
#[derive(Debug, Deserialize)]
pub struct CommentContent {
    #[serde(default)]
    pub content: Option<String>,
}
