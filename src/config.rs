use anyhow::Context;

const DEFAULT_DATABASE_URL: &str = "sqlite://data/blog.db";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;
const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub secret_key: String,
    pub token_ttl_hours: i64,
    pub bcrypt_cost: u32,
}

impl AppConfig {
    /// Reads settings from the process environment. Call `dotenvy::dotenv()`
    /// first if a `.env` file should be honoured.
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
        let bind_addr =
            std::env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let secret_key = std::env::var("SECRET_KEY").context("SECRET_KEY must be set")?;
        let token_ttl_hours = match std::env::var("TOKEN_TTL_HOURS") {
            Ok(raw) => raw
                .parse::<i64>()
                .with_context(|| format!("TOKEN_TTL_HOURS is not a number: {raw}"))?,
            Err(_) => DEFAULT_TOKEN_TTL_HOURS,
        };
        let token_ttl_hours = check_token_ttl(token_ttl_hours)?;

        let bcrypt_cost = match std::env::var("BCRYPT_COST") {
            Ok(raw) => raw
                .parse::<u32>()
                .with_context(|| format!("BCRYPT_COST is not a number: {raw}"))?,
            Err(_) => bcrypt::DEFAULT_COST,
        };

        if secret_key.is_empty() {
            anyhow::bail!("SECRET_KEY must not be empty");
        }

        Ok(Self {
            database_url,
            bind_addr,
            secret_key,
            token_ttl_hours,
            bcrypt_cost,
        })
    }

    pub fn with_secret(database_url: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            secret_key: secret_key.into(),
            token_ttl_hours: DEFAULT_TOKEN_TTL_HOURS,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

/// Token lifetimes are bounded to a year so expiry arithmetic cannot overflow.
pub fn check_token_ttl(hours: i64) -> anyhow::Result<i64> {
    if !(1..=MAX_TOKEN_TTL_HOURS).contains(&hours) {
        anyhow::bail!("TOKEN_TTL_HOURS must be between 1 and {MAX_TOKEN_TTL_HOURS}, got {hours}");
    }
    Ok(hours)
}
