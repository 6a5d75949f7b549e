use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use classifieds_common::FilesystemMediaStore;
use classifieds_server::config::AppConfig;
use classifieds_server::database::init_db;
use classifieds_server::rate_limit::RateLimiter;
use classifieds_server::seed::seed_demo_data;
use classifieds_server::state::AppState;
use tracing::{Level, info};

const RATE_LIMIT_SWEEP_SECS: u64 = 300;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = init_db(&config.database)
        .await
        .context("Failed to connect to database")?;
    info!("Database ready");

    let media_store = FilesystemMediaStore::new(config.storage.media_root.clone())
        .await
        .context("Failed to create media root")?;
    info!(root = %config.storage.media_root.display(), "Media store ready");

    if config.database.seed_demo_data {
        seed_demo_data(&db, &media_store)
            .await
            .context("Failed to seed demo data")?;
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit.enabled));
    rate_limiter.spawn_sweeper(Duration::from_secs(RATE_LIMIT_SWEEP_SECS));

    let state = AppState {
        db,
        media_store: Arc::new(media_store),
        rate_limiter,
        config,
    };

    let app = classifieds_server::build_router(state);

    info!("Server running at http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
