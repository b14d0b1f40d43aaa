use chrono::Utc;
use sqlx::SqlitePool;

use crate::error::{AppError, AppResult};
use crate::models::{Post, PostResponse};
use crate::services::comments::fetch_author;

pub async fn create_post(
    pool: &SqlitePool,
    author_id: i64,
    title: &str,
    content: &str,
) -> AppResult<PostResponse> {
    let title = title.trim();
    let content = content.trim();
    if title.is_empty() || content.is_empty() {
        return Err(AppError::Validation("Title and content are required".into()));
    }

    let now = Utc::now();
    let result = sqlx::query(
        "INSERT INTO posts (title, content, author_id, created_at, updated_at) VALUES (?, ?, ?, ?, NULL)",
    )
    .bind(title)
    .bind(content)
    .bind(author_id)
    .bind(now)
    .execute(pool)
    .await?;

    let post_id = result.last_insert_rowid();
    tracing::info!(post_id, author_id, "post created");

    get_post(pool, post_id).await
}

pub async fn get_post(pool: &SqlitePool, post_id: i64) -> AppResult<PostResponse> {
    let post = sqlx::query_as::<_, Post>(
        "SELECT id, title, content, author_id, created_at, updated_at FROM posts WHERE id = ?",
    )
    .bind(post_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Post not found".into()))?;

    let author = fetch_author(pool, post.author_id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("post author {} not found", post.author_id)))?;

    let comments = post_comment_ids(pool, post.id).await?;

    Ok(PostResponse {
        id: post.id,
        title: post.title,
        content: post.content,
        author_id: post.author_id,
        author,
        comments,
        created_at: post.created_at,
        updated_at: post.updated_at,
    })
}

/// The post's ordered comment references. A reference whose comment no longer
/// exists, or belongs to another post, is skipped.
pub async fn post_comment_ids(pool: &SqlitePool, post_id: i64) -> Result<Vec<i64>, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT pc.comment_id
        FROM post_comments pc
        JOIN comments c ON c.id = pc.comment_id AND c.post_id = pc.post_id
        WHERE pc.post_id = ?
        ORDER BY pc.position ASC
        "#,
    )
    .bind(post_id)
    .fetch_all(pool)
    .await
}
