use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{FromRow, Sqlite, SqlitePool, Transaction};

use crate::error::{AppError, AppResult};
use crate::models::{
    AuthorSummary, Comment, CommentOnPostResponse, CommentResponse, CommentsOnMyPosts,
    LikeAction, LikeToggle, PostSummary, ReplyResponse,
};

pub const MAX_CONTENT_CHARS: usize = 5000;

const COMMENT_SELECT: &str = r#"
    SELECT
        c.id AS id,
        c.post_id AS post_id,
        c.user_id AS user_id,
        c.content AS content,
        c.number_of_likes AS number_of_likes,
        c.edited_at AS edited_at,
        c.created_at AS created_at,
        c.updated_at AS updated_at,
        u.first_name AS author_first_name,
        u.last_name AS author_last_name,
        u.photo_url AS author_photo_url,
        p.title AS post_title
    FROM comments c
    JOIN users u ON u.id = c.user_id
    JOIN posts p ON p.id = c.post_id
"#;

#[derive(Debug, FromRow)]
struct CommentWithAuthorRow {
    id: i64,
    post_id: i64,
    user_id: i64,
    content: String,
    number_of_likes: i64,
    edited_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    author_first_name: String,
    author_last_name: String,
    author_photo_url: Option<String>,
    post_title: String,
}

#[derive(Debug, FromRow)]
struct ReplyWithAuthorRow {
    comment_id: i64,
    user_id: i64,
    content: String,
    created_at: DateTime<Utc>,
    author_first_name: String,
    author_last_name: String,
    author_photo_url: Option<String>,
}

/// Trims `raw` and rejects it when nothing is left or it is too long.
/// Create, edit and reply all go through here.
pub fn validate_content(field: &str, raw: Option<&str>) -> AppResult<String> {
    let content = raw.map(str::trim).unwrap_or_default();

    if content.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    if content.chars().count() > MAX_CONTENT_CHARS {
        return Err(AppError::Validation(format!(
            "{field} must be at most {MAX_CONTENT_CHARS} characters"
        )));
    }

    Ok(content.to_string())
}

pub async fn create_comment(
    pool: &SqlitePool,
    post_id: i64,
    caller_id: i64,
    content: Option<&str>,
) -> AppResult<CommentResponse> {
    let content = validate_content("Comment content", content)?;
    let now = Utc::now();

    let mut tx = pool.begin().await?;

    // The insert only happens when the post exists, so a missing post never
    // leaves a half-built comment behind.
    let inserted = sqlx::query(
        r#"
        INSERT INTO comments (post_id, user_id, content, number_of_likes, edited_at, created_at, updated_at)
        SELECT ?, ?, ?, 0, NULL, ?, ?
        WHERE EXISTS (SELECT 1 FROM posts WHERE id = ?)
        "#,
    )
    .bind(post_id)
    .bind(caller_id)
    .bind(&content)
    .bind(now)
    .bind(now)
    .bind(post_id)
    .execute(&mut *tx)
    .await?;

    if inserted.rows_affected() == 0 {
        return Err(AppError::NotFound("Post not found".into()));
    }
    let comment_id = inserted.last_insert_rowid();

    sqlx::query(
        r#"
        INSERT INTO post_comments (post_id, comment_id, position)
        SELECT ?, ?, COALESCE(MAX(position), -1) + 1
        FROM post_comments
        WHERE post_id = ?
        "#,
    )
    .bind(post_id)
    .bind(comment_id)
    .bind(post_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(comment_id, post_id, user_id = caller_id, "comment created");

    load_comment(pool, comment_id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("comment {comment_id} vanished after insert")))
}

pub async fn list_comments_for_post(
    pool: &SqlitePool,
    post_id: i64,
) -> AppResult<Vec<CommentResponse>> {
    let comments = load_scope(pool, CommentScope::Post(post_id))
        .await?
        .into_iter()
        .map(|entry| entry.comment)
        .collect();

    Ok(comments)
}

pub async fn reply_to_comment(
    pool: &SqlitePool,
    comment_id: i64,
    caller_id: i64,
    content: Option<&str>,
) -> AppResult<ReplyResponse> {
    let content = validate_content("Reply content", content)?;
    let now = Utc::now();

    let mut tx = pool.begin().await?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO comment_replies (comment_id, user_id, content, created_at)
        SELECT ?, ?, ?, ?
        WHERE EXISTS (SELECT 1 FROM comments WHERE id = ?)
        "#,
    )
    .bind(comment_id)
    .bind(caller_id)
    .bind(&content)
    .bind(now)
    .bind(comment_id)
    .execute(&mut *tx)
    .await?;

    if inserted.rows_affected() == 0 {
        return Err(AppError::NotFound("Comment not found".into()));
    }
    let reply_id = inserted.last_insert_rowid();

    sqlx::query("UPDATE comments SET updated_at = ? WHERE id = ?")
        .bind(now)
        .bind(comment_id)
        .execute(&mut *tx)
        .await?;

    let (index,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM comment_replies WHERE comment_id = ? AND id < ?")
            .bind(comment_id)
            .bind(reply_id)
            .fetch_one(&mut *tx)
            .await?;

    tx.commit().await?;

    tracing::info!(comment_id, index, user_id = caller_id, "reply added");

    let author = fetch_author(pool, caller_id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("reply author {caller_id} not found")))?;

    Ok(ReplyResponse {
        index,
        content,
        user_id: caller_id,
        author,
        created_at: now,
    })
}

pub async fn edit_comment(
    pool: &SqlitePool,
    comment_id: i64,
    caller_id: i64,
    content: Option<&str>,
) -> AppResult<CommentResponse> {
    let content = validate_content("Comment content", content)?;

    let comment = find_comment(pool, comment_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Comment not found".into()))?;

    if comment.user_id != caller_id {
        return Err(AppError::Forbidden(
            "Not authorized to edit this comment".into(),
        ));
    }

    let now = Utc::now();
    let updated = sqlx::query(
        "UPDATE comments SET content = ?, edited_at = ?, updated_at = ? WHERE id = ? AND user_id = ?",
    )
    .bind(&content)
    .bind(now)
    .bind(now)
    .bind(comment_id)
    .bind(caller_id)
    .execute(pool)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(AppError::NotFound("Comment not found".into()));
    }

    tracing::info!(comment_id, user_id = caller_id, "comment edited");

    load_comment(pool, comment_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Comment not found".into()))
}

/// Removes the comment and its reference from the owning post. Returns the
/// deleted comment as it was before removal.
pub async fn delete_comment(
    pool: &SqlitePool,
    comment_id: i64,
    caller_id: i64,
) -> AppResult<Comment> {
    let comment = find_comment(pool, comment_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Comment not found".into()))?;

    if comment.user_id != caller_id {
        return Err(AppError::Forbidden(
            "Unauthorized to delete this comment".into(),
        ));
    }

    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM post_comments WHERE comment_id = ?")
        .bind(comment_id)
        .execute(&mut *tx)
        .await?;

    let deleted = sqlx::query("DELETE FROM comments WHERE id = ? AND user_id = ?")
        .bind(comment_id)
        .bind(caller_id)
        .execute(&mut *tx)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(AppError::NotFound("Comment not found".into()));
    }

    tx.commit().await?;

    tracing::info!(comment_id, post_id = comment.post_id, user_id = caller_id, "comment deleted");

    Ok(comment)
}

/// Likes the comment for the caller, or takes the like back if it is already
/// there. Set membership and the counter change inside one write transaction,
/// and the counter is recounted by the store from the like set.
pub async fn toggle_like(
    pool: &SqlitePool,
    comment_id: i64,
    caller_id: i64,
) -> AppResult<LikeToggle> {
    let now = Utc::now();
    let mut tx = pool.begin().await?;

    let removed = sqlx::query("DELETE FROM comment_likes WHERE comment_id = ? AND user_id = ?")
        .bind(comment_id)
        .bind(caller_id)
        .execute(&mut *tx)
        .await?;

    let action = if removed.rows_affected() > 0 {
        LikeAction::Unliked
    } else {
        let inserted = sqlx::query(
            r#"
            INSERT INTO comment_likes (comment_id, user_id, created_at)
            SELECT ?, ?, ?
            WHERE EXISTS (SELECT 1 FROM comments WHERE id = ?)
            "#,
        )
        .bind(comment_id)
        .bind(caller_id)
        .bind(now)
        .bind(comment_id)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            return Err(AppError::NotFound("Comment not found".into()));
        }
        LikeAction::Liked
    };

    sqlx::query(
        r#"
        UPDATE comments
        SET number_of_likes = (SELECT COUNT(*) FROM comment_likes WHERE comment_id = ?),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(comment_id)
    .bind(now)
    .bind(comment_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(comment_id, user_id = caller_id, action = ?action, "comment like toggled");

    let comment = load_comment(pool, comment_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Comment not found".into()))?;

    Ok(LikeToggle { action, comment })
}

pub async fn list_comments_on_my_posts(
    pool: &SqlitePool,
    caller_id: i64,
) -> AppResult<CommentsOnMyPosts> {
    let comments = load_scope(pool, CommentScope::PostsAuthoredBy(caller_id)).await?;

    Ok(CommentsOnMyPosts {
        total_comments: comments.len(),
        comments,
    })
}

pub async fn find_comment(pool: &SqlitePool, comment_id: i64) -> Result<Option<Comment>, sqlx::Error> {
    sqlx::query_as::<_, Comment>(
        r#"
        SELECT id, post_id, user_id, content, number_of_likes, edited_at, created_at, updated_at
        FROM comments
        WHERE id = ?
        "#,
    )
    .bind(comment_id)
    .fetch_optional(pool)
    .await
}

pub async fn load_comment(
    pool: &SqlitePool,
    comment_id: i64,
) -> Result<Option<CommentResponse>, sqlx::Error> {
    Ok(load_scope(pool, CommentScope::Comment(comment_id))
        .await?
        .into_iter()
        .next()
        .map(|entry| entry.comment))
}

pub async fn fetch_author(
    pool: &SqlitePool,
    user_id: i64,
) -> Result<Option<AuthorSummary>, sqlx::Error> {
    sqlx::query_as::<_, AuthorSummary>(
        "SELECT id, first_name, last_name, photo_url FROM users WHERE id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Which comments a read covers. Each scope is a single bound filter, so the
/// like and reply lookups reuse it as a subquery instead of binding one
/// variable per comment id.
#[derive(Debug, Clone, Copy)]
enum CommentScope {
    Comment(i64),
    Post(i64),
    PostsAuthoredBy(i64),
}

impl CommentScope {
    /// Filter over `comments c JOIN posts p`, with one placeholder.
    fn filter(self) -> &'static str {
        match self {
            CommentScope::Comment(_) => "c.id = ?",
            CommentScope::Post(_) => "c.post_id = ?",
            CommentScope::PostsAuthoredBy(_) => "p.author_id = ?",
        }
    }

    fn key(self) -> i64 {
        match self {
            CommentScope::Comment(id)
            | CommentScope::Post(id)
            | CommentScope::PostsAuthoredBy(id) => id,
        }
    }

    fn comment_ids(self) -> String {
        format!(
            "SELECT c.id FROM comments c JOIN posts p ON p.id = c.post_id WHERE {}",
            self.filter()
        )
    }
}

/// Loads every comment in `scope`, newest first, with like sets and replies
/// attached. The three reads share one transaction so counters and sets agree.
async fn load_scope(
    pool: &SqlitePool,
    scope: CommentScope,
) -> Result<Vec<CommentOnPostResponse>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let rows = sqlx::query_as::<_, CommentWithAuthorRow>(&format!(
        "{COMMENT_SELECT} WHERE {} ORDER BY c.created_at DESC, c.id DESC",
        scope.filter()
    ))
    .bind(scope.key())
    .fetch_all(&mut *tx)
    .await?;

    if rows.is_empty() {
        tx.commit().await?;
        return Ok(Vec::new());
    }

    let mut likes = fetch_likes(&mut tx, scope).await?;
    let mut replies = fetch_replies(&mut tx, scope).await?;
    tx.commit().await?;

    let comments = rows
        .into_iter()
        .map(|row| CommentOnPostResponse {
            post: PostSummary {
                id: row.post_id,
                title: row.post_title,
            },
            comment: CommentResponse {
                id: row.id,
                post_id: row.post_id,
                user_id: row.user_id,
                author: AuthorSummary {
                    id: row.user_id,
                    first_name: row.author_first_name,
                    last_name: row.author_last_name,
                    photo_url: row.author_photo_url,
                },
                content: row.content,
                likes: likes.remove(&row.id).unwrap_or_default(),
                number_of_likes: row.number_of_likes,
                replies: replies.remove(&row.id).unwrap_or_default(),
                edited_at: row.edited_at,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
        })
        .collect();

    Ok(comments)
}

async fn fetch_likes(
    tx: &mut Transaction<'_, Sqlite>,
    scope: CommentScope,
) -> Result<HashMap<i64, Vec<i64>>, sqlx::Error> {
    let rows: Vec<(i64, i64)> = sqlx::query_as(&format!(
        r#"
        SELECT comment_id, user_id
        FROM comment_likes
        WHERE comment_id IN ({})
        ORDER BY comment_id, created_at, user_id
        "#,
        scope.comment_ids()
    ))
    .bind(scope.key())
    .fetch_all(&mut **tx)
    .await?;

    let mut likes: HashMap<i64, Vec<i64>> = HashMap::new();
    for (comment_id, user_id) in rows {
        likes.entry(comment_id).or_default().push(user_id);
    }
    Ok(likes)
}

async fn fetch_replies(
    tx: &mut Transaction<'_, Sqlite>,
    scope: CommentScope,
) -> Result<HashMap<i64, Vec<ReplyResponse>>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ReplyWithAuthorRow>(&format!(
        r#"
        SELECT
            r.comment_id AS comment_id,
            r.user_id AS user_id,
            r.content AS content,
            r.created_at AS created_at,
            u.first_name AS author_first_name,
            u.last_name AS author_last_name,
            u.photo_url AS author_photo_url
        FROM comment_replies r
        JOIN users u ON u.id = r.user_id
        WHERE r.comment_id IN ({})
        ORDER BY r.comment_id, r.id
        "#,
        scope.comment_ids()
    ))
    .bind(scope.key())
    .fetch_all(&mut **tx)
    .await?;

    let mut replies: HashMap<i64, Vec<ReplyResponse>> = HashMap::new();
    for row in rows {
        let thread = replies.entry(row.comment_id).or_default();
        thread.push(ReplyResponse {
            index: thread.len() as i64,
            content: row.content,
            user_id: row.user_id,
            author: AuthorSummary {
                id: row.user_id,
                first_name: row.author_first_name,
                last_name: row.author_last_name,
                photo_url: row.author_photo_url,
            },
            created_at: row.created_at,
        });
    }
    Ok(replies)
}
