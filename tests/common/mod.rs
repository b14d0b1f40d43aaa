#![allow(dead_code)]

use sqlx::SqlitePool;

use blog_comments::config::AppConfig;
use blog_comments::db;
use blog_comments::models::{CreateUser, User};
use blog_comments::services::{posts, users};

pub const TEST_SECRET: &str = "integration-test-secret";
pub const TEST_PASSWORD: &str = "correct horse battery staple";
// Cheapest cost bcrypt accepts.
pub const TEST_BCRYPT_COST: u32 = 4;

pub async fn setup_pool() -> SqlitePool {
    db::init_memory_db().await.expect("in-memory database")
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::with_secret("sqlite::memory:", TEST_SECRET);
    config.bcrypt_cost = TEST_BCRYPT_COST;
    config
}

pub async fn create_user(pool: &SqlitePool, username: &str) -> User {
    let input = CreateUser {
        username: username.to_string(),
        email: format!("{username}@example.com"),
        password: TEST_PASSWORD.to_string(),
        first_name: format!("{username}-first"),
        last_name: format!("{username}-last"),
        photo_url: Some(format!("https://img.example.com/{username}.png")),
    };
    users::register_user(pool, &input, TEST_BCRYPT_COST)
        .await
        .expect("register user")
}

pub async fn create_post(pool: &SqlitePool, author_id: i64, title: &str) -> i64 {
    posts::create_post(pool, author_id, title, "post body")
        .await
        .expect("create post")
        .id
}

pub async fn comment_count(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM comments")
        .fetch_one(pool)
        .await
        .expect("count comments")
}
