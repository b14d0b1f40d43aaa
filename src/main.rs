use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use blog_comments::{build_router, config::AppConfig, db, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "blog_comments=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    let pool = db::init_db(&config.database_url).await?;
    tracing::info!(database_url = %config.database_url, "Database initialized");

    let addr = config.bind_addr.clone();
    let app = build_router(AppState::new(pool, config));

    tracing::info!("Server running on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
