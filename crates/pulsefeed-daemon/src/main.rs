//! The aggregation daemon.
//!
//! Loads configuration, connects to Postgres, runs migrations, then starts
//! the feed scheduler and an immediate warm-up cycle. Runs until SIGTERM or
//! ctrl-c, shutting the scheduler down cleanly.

use std::sync::Arc;

use pulsefeed_db::PgStore;
use pulsefeed_ingest::{FeedFetcher, FeedScheduler};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = pulsefeed_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(?config, "starting pulsefeed daemon");

    let pool_config = pulsefeed_db::PoolConfig::from_app_config(&config);
    let pool = pulsefeed_db::connect_pool(&config.database_url, pool_config).await?;
    pulsefeed_db::run_migrations(&pool).await?;

    let store = PgStore::new(pool);
    let fetcher = Arc::new(FeedFetcher::from_config(&config)?);
    let mut scheduler = FeedScheduler::from_config(store, fetcher, &config);

    scheduler.start().await?;

    // First cycle fires immediately rather than one interval from now.
    scheduler.run_now().await;

    shutdown_signal().await;

    scheduler.shutdown().await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
