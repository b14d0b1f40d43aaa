use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::IntoResponse,
    routing::{get, post},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::extract::{ApiForm, ApiJson};
use crate::models::{CreateUser, LoginUser, TokenResponse, User, UserResponse};
use crate::services::users;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(get_me))
}

async fn register(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CreateUser>,
) -> AppResult<impl IntoResponse> {
    let user = users::register_user(&state.pool, &input, state.config.bcrypt_cost).await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "success": true,
            "message": "Account created",
            "user": UserResponse::from(user),
        })),
    ))
}

async fn login(
    State(state): State<AppState>,
    ApiForm(input): ApiForm<LoginUser>,
) -> AppResult<impl IntoResponse> {
    let user = users::authenticate(&state.pool, &input.username, &input.password).await?;
    let token = generate_jwt(&state.config, &user.username)?;

    Ok(Json(TokenResponse {
        access_token: token,
        token_type: "bearer".to_string(),
    }))
}

async fn get_me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let user = extract_current_user(&state, &headers).await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Authenticated",
        "user": UserResponse::from(user),
    })))
}

/// Resolves the caller from an `Authorization: Bearer <jwt>` header.
pub async fn extract_current_user(state: &AppState, headers: &HeaderMap) -> AppResult<User> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".into()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization header".into()))?;

    let claims = decode_jwt(&state.config, token)?;

    users::find_by_username(&state.pool, &claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))
}

pub fn generate_jwt(config: &AppConfig, username: &str) -> AppResult<String> {
    let expiration = chrono::Duration::try_hours(config.token_ttl_hours)
        .and_then(|ttl| chrono::Utc::now().checked_add_signed(ttl))
        .ok_or_else(|| AppError::Internal("token expiry out of range".into()))?
        .timestamp() as usize;

    let claims = Claims {
        sub: username.to_string(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret_key.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("token encoding failed: {e}")))
}

pub fn decode_jwt(config: &AppConfig, token: &str) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret_key.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::Unauthorized("Invalid token".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trips_subject() {
        let config = AppConfig::with_secret("sqlite::memory:", "test-secret");
        let token = generate_jwt(&config, "ada").unwrap();
        let claims = decode_jwt(&config, &token).unwrap();
        assert_eq!(claims.sub, "ada");
    }

    #[test]
    fn token_signed_with_another_secret_is_rejected() {
        let issuer = AppConfig::with_secret("sqlite::memory:", "issuer-secret");
        let verifier = AppConfig::with_secret("sqlite::memory:", "other-secret");
        let token = generate_jwt(&issuer, "ada").unwrap();

        assert!(matches!(
            decode_jwt(&verifier, &token),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn out_of_range_ttl_is_an_error_not_a_panic() {
        for hours in [i64::MAX, i64::MIN, i64::MAX / 2] {
            let mut config = AppConfig::with_secret("sqlite::memory:", "test-secret");
            config.token_ttl_hours = hours;
            assert!(matches!(
                generate_jwt(&config, "ada"),
                Err(AppError::Internal(_))
            ));
        }
    }
}
