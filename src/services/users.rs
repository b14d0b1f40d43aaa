use bcrypt::{hash, verify};
use chrono::Utc;
use sqlx::SqlitePool;

use crate::error::{AppError, AppResult};
use crate::models::{CreateUser, User};

pub async fn register_user(pool: &SqlitePool, input: &CreateUser, cost: u32) -> AppResult<User> {
    let username = input.username.trim();
    let email = input.email.trim();
    let first_name = input.first_name.trim();
    let last_name = input.last_name.trim();

    if username.is_empty() || email.is_empty() || input.password.is_empty() {
        return Err(AppError::Validation(
            "Username, email and password are required".into(),
        ));
    }
    if first_name.is_empty() || last_name.is_empty() {
        return Err(AppError::Validation(
            "First name and last name are required".into(),
        ));
    }

    // Check if user exists
    let existing: Option<i64> =
        sqlx::query_scalar("SELECT id FROM users WHERE username = ? OR email = ?")
            .bind(username)
            .bind(email)
            .fetch_optional(pool)
            .await?;

    if existing.is_some() {
        return Err(AppError::Conflict(
            "Username or email already registered".into(),
        ));
    }

    let hashed = hash(&input.password, cost)
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))?;

    let now = Utc::now();
    let result = sqlx::query(
        r#"INSERT INTO users (username, email, hashed_password, first_name, last_name, photo_url, created_at)
           VALUES (?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(username)
    .bind(email)
    .bind(&hashed)
    .bind(first_name)
    .bind(last_name)
    .bind(&input.photo_url)
    .bind(now)
    .execute(pool)
    .await
    .map_err(|e| match e {
        // A concurrent registration can win between the check above and this insert.
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::Conflict("Username or email already registered".into())
        }
        other => AppError::Database(other),
    })?;

    let user_id = result.last_insert_rowid();
    tracing::info!(user_id, username, "user registered");

    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .map_err(AppError::from)
}

/// Checks a username/password pair. Unknown users and wrong passwords produce
/// the same error.
pub async fn authenticate(pool: &SqlitePool, username: &str, password: &str) -> AppResult<User> {
    let user = find_by_username(pool, username)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Incorrect username or password".into()))?;

    let valid = verify(password, &user.hashed_password)
        .map_err(|e| AppError::Internal(format!("password verification failed: {e}")))?;

    if !valid {
        return Err(AppError::Unauthorized(
            "Incorrect username or password".into(),
        ));
    }

    Ok(user)
}

pub async fn find_by_username(pool: &SqlitePool, username: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(pool)
        .await
}
