use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use consultant_research::{
    config::Config,
    db,
    research::{DeepResearchService, PgResearchStore},
    routes::create_router,
    utils::init_tracing,
    AppState,
};
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    // Load configuration
    let config = Config::from_env()?;
    info!("Configuration loaded: {:?}", config.server);

    // Connect to database
    let pool = db::create_pool(&config.database).await?;

    // Run migrations
    info!("Running database migrations...");
    db::run_migrations(&pool).await?;
    info!("Database migrations completed");

    let research = DeepResearchService::with_engine_url(
        Arc::new(PgResearchStore::new(pool.clone())),
        &config.research.api_url,
    );
    info!(api_url = %config.research.api_url, "Deep research engine configured");

    if config.research.reconcile_on_startup {
        if let Err(e) = research.reconcile_interrupted().await {
            warn!(error = %e, "Startup reconciliation of research jobs failed");
        }
    }

    // Create shared state
    let state = AppState {
        pool,
        config: config.clone(),
        research,
    };

    let app = create_router(state);

    let ip = config
        .server
        .host
        .parse()
        .with_context(|| format!("Invalid HOST: {}", config.server.host))?;
    let addr = SocketAddr::new(ip, config.server.port);
    info!("Server listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
