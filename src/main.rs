use coinstats_backend::{
    config::AppConfig,
    jobs::price_refresh_sync::{start_price_refresh_job, RetentionPolicy},
    routes::build_router,
    services::{
        catalog::Catalog, clock::SystemClock, coingecko::CoinGeckoService,
        refresh::RefreshPipeline, snapshot_store::SeaOrmSnapshotStore,
    },
    AppState,
};
use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,coinstats_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    // Connect to database
    tracing::info!("Connecting to database...");
    let db = Database::connect(&config.database_url).await?;

    // Run migrations
    tracing::info!("Running migrations...");
    migration::Migrator::up(&db, None).await?;

    let catalog = Catalog::tracked();
    let clock = Arc::new(SystemClock);
    let store = Arc::new(SeaOrmSnapshotStore::new(db.clone()));
    let coingecko = CoinGeckoService::new(
        config.coingecko_api_key.clone(),
        config.coingecko_api_tier,
        config.coingecko_base_url.clone(),
        config.coingecko_timeout,
    )?;

    let refresh = RefreshPipeline::new(
        Arc::new(coingecko),
        store.clone(),
        catalog.clone(),
        clock.clone(),
    );

    let refresh_job = start_price_refresh_job(
        refresh.clone(),
        config.refresh_interval,
        config
            .history_retention
            .map(|keep| RetentionPolicy { keep }),
    );

    let state = AppState {
        store,
        refresh,
        catalog,
        clock,
        refresh_interval: config.refresh_interval,
    };

    let app = build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!("Server is running on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutdown signal received, draining connections");
        })
        .await?;

    refresh_job.abort();
    db.close().await?;
    tracing::info!("Database connection closed");

    Ok(())
}
