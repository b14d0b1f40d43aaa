mod common;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use blog_comments::routes::auth::generate_jwt;
use blog_comments::{build_router, state::AppState};

use common::{TEST_PASSWORD, create_post, create_user, setup_pool, test_config};

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

struct Harness {
    app: Router,
    pool: sqlx::SqlitePool,
}

impl Harness {
    async fn new() -> Self {
        let pool = setup_pool().await;
        let app = build_router(AppState::new(pool.clone(), test_config()));
        Self { app, pool }
    }

    fn token_for(&self, username: &str) -> String {
        generate_jwt(&test_config(), username).unwrap()
    }
}

#[tokio::test]
async fn health_check_reports_healthy() {
    let harness = Harness::new().await;
    let (status, body) = send(&harness.app, "GET", "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn register_login_and_me() {
    let harness = Harness::new().await;

    let (status, body) = send(
        &harness.app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "username": "ada",
            "email": "ada@example.com",
            "password": TEST_PASSWORD,
            "first_name": "Ada",
            "last_name": "Lovelace",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["username"], "ada");
    assert!(body["user"].get("hashed_password").is_none());

    let (status, body) = send(
        &harness.app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "username": "ada",
            "email": "other@example.com",
            "password": "pw",
            "first_name": "Ada",
            "last_name": "Again",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);

    let login = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!(
            "username=ada&password={}",
            TEST_PASSWORD.replace(' ', "+")
        )))
        .unwrap();
    let response = harness.app.clone().oneshot(login).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let token: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(token["token_type"], "bearer");
    let access_token = token["access_token"].as_str().unwrap().to_string();

    let (status, body) = send(&harness.app, "GET", "/api/auth/me", Some(&access_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["first_name"], "Ada");
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let harness = Harness::new().await;
    create_user(&harness.pool, "ada").await;

    let login = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("username=ada&password=nope"))
        .unwrap();
    let response = harness.app.clone().oneshot(login).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn mutating_routes_require_a_token() {
    let harness = Harness::new().await;
    let owner = create_user(&harness.pool, "owner").await;
    let post_id = create_post(&harness.pool, owner.id, "Post").await;

    let cases = [
        ("POST", format!("/api/comments/{post_id}/create"), Some(json!({"content": "hi"}))),
        ("POST", "/api/comments/1/reply".to_string(), Some(json!({"content": "hi"}))),
        ("PUT", "/api/comments/1/edit".to_string(), Some(json!({"content": "hi"}))),
        ("DELETE", "/api/comments/1/delete".to_string(), None),
        ("POST", "/api/comments/1/like".to_string(), None),
        ("GET", "/api/comments/my-blogs/comments".to_string(), None),
    ];

    for (method, uri, body) in cases {
        let (status, body) = send(&harness.app, method, &uri, None, body).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Missing authorization header");
    }

    let (status, _) = send(
        &harness.app,
        "POST",
        &format!("/api/comments/{post_id}/create"),
        Some("not-a-jwt"),
        Some(json!({"content": "hi"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn listing_comments_is_public_and_empty_is_success() {
    let harness = Harness::new().await;
    let owner = create_user(&harness.pool, "owner").await;
    let post_id = create_post(&harness.pool, owner.id, "Post").await;

    let (status, body) = send(
        &harness.app,
        "GET",
        &format!("/api/comments/{post_id}/comment/all"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["comments"], json!([]));
}

#[tokio::test]
async fn error_envelopes_carry_status_and_message() {
    let harness = Harness::new().await;
    let owner = create_user(&harness.pool, "owner").await;
    let post_id = create_post(&harness.pool, owner.id, "Post").await;
    let token = harness.token_for("owner");

    let (status, body) = send(
        &harness.app,
        "POST",
        &format!("/api/comments/{post_id}/create"),
        Some(&token),
        Some(json!({"content": "   "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"success": false, "message": "Comment content is required"}));

    let (status, body) = send(
        &harness.app,
        "POST",
        "/api/comments/999/create",
        Some(&token),
        Some(json!({"content": "hello"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"success": false, "message": "Post not found"}));

    let (status, body) = send(
        &harness.app,
        "POST",
        "/api/comments/999/like",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Comment not found");
}

#[tokio::test]
async fn malformed_requests_use_the_error_envelope() {
    let harness = Harness::new().await;
    let owner = create_user(&harness.pool, "owner").await;
    let post_id = create_post(&harness.pool, owner.id, "Post").await;
    let token = harness.token_for("owner");

    let (status, body) = send(
        &harness.app,
        "POST",
        &format!("/api/comments/{post_id}/create"),
        Some(&token),
        Some(json!({"content": 5})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({"success": false, "message": "Request body has invalid fields"})
    );

    let (status, body) = send(&harness.app, "GET", "/api/comments/abc/comment/all", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({"success": false, "message": "Invalid path parameter"})
    );

    let request = Request::builder()
        .method("PUT")
        .uri("/api/comments/1/edit")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"content\": "))
        .unwrap();
    let response = harness.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["message"], "Request body is not valid JSON");

    let request = Request::builder()
        .method("POST")
        .uri("/api/comments/1/reply")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from("content=hi"))
        .unwrap();
    let response = harness.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Expected a JSON request body");

    let login = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("username=owner"))
        .unwrap();
    let response = harness.app.clone().oneshot(login).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, json!({"success": false, "message": "Invalid form body"}));
}

#[tokio::test]
async fn comment_lifecycle_over_http() {
    let harness = Harness::new().await;
    let u1 = create_user(&harness.pool, "u1").await;
    let u2 = create_user(&harness.pool, "u2").await;
    let u1_token = harness.token_for("u1");
    let u2_token = harness.token_for("u2");

    let (status, body) = send(
        &harness.app,
        "POST",
        "/api/posts",
        Some(&u1_token),
        Some(json!({"title": "P1", "content": "hello world"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let p1 = body["post"]["id"].as_i64().unwrap();
    assert_eq!(body["post"]["comments"], json!([]));

    let (status, body) = send(
        &harness.app,
        "POST",
        &format!("/api/comments/{p1}/create"),
        Some(&u2_token),
        Some(json!({"content": "nice post"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["comment"]["author"]["first_name"], "u2-first");
    assert!(body["comment"]["author"].get("email").is_none());
    let c1 = body["comment"]["id"].as_i64().unwrap();

    let (_, body) = send(&harness.app, "GET", &format!("/api/posts/{p1}"), None, None).await;
    assert_eq!(body["post"]["comments"], json!([c1]));

    let (status, body) = send(
        &harness.app,
        "POST",
        &format!("/api/comments/{c1}/like"),
        Some(&u2_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Comment liked");
    assert_eq!(body["action"], "liked");
    assert_eq!(body["updated_comment"]["likes"], json!([u2.id]));
    assert_eq!(body["updated_comment"]["number_of_likes"], 1);

    let (_, body) = send(
        &harness.app,
        "POST",
        &format!("/api/comments/{c1}/like"),
        Some(&u2_token),
        None,
    )
    .await;
    assert_eq!(body["message"], "Comment unliked");
    assert_eq!(body["updated_comment"]["likes"], json!([]));
    assert_eq!(body["updated_comment"]["number_of_likes"], 0);

    let (status, body) = send(
        &harness.app,
        "PUT",
        &format!("/api/comments/{c1}/edit"),
        Some(&u1_token),
        Some(json!({"content": "not yours"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);

    let (status, body) = send(
        &harness.app,
        "POST",
        &format!("/api/comments/{c1}/reply"),
        Some(&u1_token),
        Some(json!({"content": "thanks!"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["reply"]["index"], 0);
    assert_eq!(body["reply"]["author"]["id"], u1.id);
    assert!(body.get("comment").is_none());

    let (status, body) = send(
        &harness.app,
        "GET",
        "/api/comments/my-blogs/comments",
        Some(&u1_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_comments"], 1);
    assert_eq!(body["comments"][0]["id"], c1);
    assert_eq!(body["comments"][0]["post"]["title"], "P1");

    let (status, body) = send(
        &harness.app,
        "PUT",
        &format!("/api/comments/{c1}/edit"),
        Some(&u2_token),
        Some(json!({"content": "very nice post"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["comment"]["content"], "very nice post");
    assert!(body["comment"]["edited_at"].is_string());

    let (status, body) = send(
        &harness.app,
        "DELETE",
        &format!("/api/comments/{c1}/delete"),
        Some(&u2_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["comment_id"], c1);

    let (_, body) = send(
        &harness.app,
        "GET",
        &format!("/api/comments/{p1}/comment/all"),
        None,
        None,
    )
    .await;
    assert_eq!(body["comments"], json!([]));

    let (_, body) = send(&harness.app, "GET", &format!("/api/posts/{p1}"), None, None).await;
    assert_eq!(body["post"]["comments"], json!([]));
}
