use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post, put},
};

use crate::error::AppResult;
use crate::extract::{ApiJson, ApiPath};
use crate::models::CommentContent;
use crate::routes::auth::extract_current_user;
use crate::services::comments;
use crate::state::AppState;

// `{id}` is a post id on create and list, a comment id everywhere else.
pub fn comments_routes() -> Router<AppState> {
    Router::new()
        .route("/my-blogs/comments", get(list_comments_on_my_posts))
        .route("/{id}/create", post(create_comment))
        .route("/{id}/comment/all", get(list_comments))
        .route("/{id}/reply", post(reply_to_comment))
        .route("/{id}/edit", put(edit_comment))
        .route("/{id}/delete", delete(delete_comment))
        .route("/{id}/like", post(like_comment))
}

async fn create_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiPath(post_id): ApiPath<i64>,
    ApiJson(input): ApiJson<CommentContent>,
) -> AppResult<impl IntoResponse> {
    let current_user = extract_current_user(&state, &headers).await?;
    let comment =
        comments::create_comment(&state.pool, post_id, current_user.id, input.content.as_deref())
            .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "success": true,
            "message": "Comment added",
            "comment": comment,
        })),
    ))
}

async fn list_comments(
    State(state): State<AppState>,
    ApiPath(post_id): ApiPath<i64>,
) -> AppResult<impl IntoResponse> {
    let comments = comments::list_comments_for_post(&state.pool, post_id).await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Comments fetched",
        "comments": comments,
    })))
}

async fn reply_to_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiPath(comment_id): ApiPath<i64>,
    ApiJson(input): ApiJson<CommentContent>,
) -> AppResult<impl IntoResponse> {
    let current_user = extract_current_user(&state, &headers).await?;
    let reply = comments::reply_to_comment(
        &state.pool,
        comment_id,
        current_user.id,
        input.content.as_deref(),
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "success": true,
            "message": "Reply added successfully",
            "reply": reply,
        })),
    ))
}

async fn edit_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiPath(comment_id): ApiPath<i64>,
    ApiJson(input): ApiJson<CommentContent>,
) -> AppResult<impl IntoResponse> {
    let current_user = extract_current_user(&state, &headers).await?;
    let comment = comments::edit_comment(
        &state.pool,
        comment_id,
        current_user.id,
        input.content.as_deref(),
    )
    .await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Comment updated successfully",
        "comment": comment,
    })))
}

async fn delete_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiPath(comment_id): ApiPath<i64>,
) -> AppResult<impl IntoResponse> {
    let current_user = extract_current_user(&state, &headers).await?;
    let deleted = comments::delete_comment(&state.pool, comment_id, current_user.id).await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Comment deleted successfully",
        "comment_id": deleted.id,
        "post_id": deleted.post_id,
    })))
}

async fn like_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiPath(comment_id): ApiPath<i64>,
) -> AppResult<impl IntoResponse> {
    let current_user = extract_current_user(&state, &headers).await?;
    let toggle = comments::toggle_like(&state.pool, comment_id, current_user.id).await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "message": toggle.action.message(),
        "action": toggle.action,
        "updated_comment": toggle.comment,
    })))
}

async fn list_comments_on_my_posts(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let current_user = extract_current_user(&state, &headers).await?;
    let result = comments::list_comments_on_my_posts(&state.pool, current_user.id).await?;

    let message = if result.total_comments == 0 {
        "No comments on your posts yet"
    } else {
        "Comments fetched"
    };

    Ok(Json(serde_json::json!({
        "success": true,
        "message": message,
        "total_comments": result.total_comments,
        "comments": result.comments,
    })))
}
