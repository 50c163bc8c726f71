//! Plant-Vita API server

use std::sync::Arc;

use anyhow::Context;
use plantvita_api::{auth::SessionService, routes::create_router, AppState, Config};
use plantvita_shared::{create_pool, run_migrations, PgAccountStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Refuse to start on any configuration problem, before logging is even up
    let config = Config::from_env().context("invalid configuration")?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "plantvita_api=info,plantvita_shared=info,tower_http=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if config.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!(
        algorithm = ?config.auth.algorithm,
        access_token_minutes = config.auth.access_token_minutes,
        refresh_token_days = config.auth.refresh_token_days,
        "Starting Plant-Vita API"
    );

    let pool = create_pool(&config.database_url, config.database_max_connections)
        .await
        .context("failed to connect to database")?;
    run_migrations(&pool)
        .await
        .context("failed to run migrations")?;

    let store = Arc::new(PgAccountStore::new(pool));
    let sessions = SessionService::from_config(store, &config.auth)?;

    let bind_address = config.bind_address;
    let app = create_router(AppState::new(sessions));

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {bind_address}"))?;
    tracing::info!(address = %bind_address, "Listening");

    axum::serve(listener, app).await?;
    Ok(())
}
