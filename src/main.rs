use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storyreel::api::{ApiServer, ApiServerConfig, AppState};
use storyreel::config::AppConfig;
use storyreel::database;
use storyreel::services::ServiceContainer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storyreel=info,sqlx=warn,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Arc::new(AppConfig::from_env_or_default());
    if config.ai.api_key.is_empty() {
        tracing::warn!("OPENAI_API_KEY is not set; AI collaborator calls will fail");
    }

    // Initialize database
    let pool = database::init_pool(&config.database_url).await?;
    database::run_migrations(&pool).await?;

    // Construct all services once and inject them into the request handlers.
    let services = ServiceContainer::new(pool, &config).await?;
    let state = AppState::new(config, &services);

    let server = ApiServer::with_state(ApiServerConfig::from_env_or_default(), state);
    let cancel_token = server.cancel_token();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl-C, shutting down");
            cancel_token.cancel();
        }
    });

    server.run().await?;
    Ok(())
}
