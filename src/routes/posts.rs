use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};

use crate::error::AppResult;
use crate::extract::{ApiJson, ApiPath};
use crate::models::CreatePost;
use crate::routes::auth::extract_current_user;
use crate::services::posts;
use crate::state::AppState;

pub fn posts_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_post))
        .route("/{post_id}", get(get_post))
}

async fn create_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(input): ApiJson<CreatePost>,
) -> AppResult<impl IntoResponse> {
    let current_user = extract_current_user(&state, &headers).await?;
    let post = posts::create_post(&state.pool, current_user.id, &input.title, &input.content).await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "success": true,
            "message": "Post created",
            "post": post,
        })),
    ))
}

async fn get_post(
    State(state): State<AppState>,
    ApiPath(post_id): ApiPath<i64>,
) -> AppResult<impl IntoResponse> {
    let post = posts::get_post(&state.pool, post_id).await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Post fetched",
        "post": post,
    })))
}
